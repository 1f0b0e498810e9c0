// src/services/google_auth.rs
// DOCUMENTATION: Google Application Default Credentials
// PURPOSE: Mint and cache OAuth2 access tokens for the Firestore REST API

use crate::errors::BackendError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// OAuth2 scope granting Firestore access
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const WELL_KNOWN_CREDENTIALS: &str = ".config/gcloud/application_default_credentials.json";

/// Tokens are refreshed this long before they expire
const REFRESH_MARGIN_SECS: i64 = 60;
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Where access tokens come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Fixed bearer token (the Firestore emulator accepts "owner")
    Static(String),
    /// Service account or authorized user JSON key file
    KeyFile(PathBuf),
    /// GCE / Cloud Run metadata server
    MetadataServer,
}

impl CredentialSource {
    /// Application Default Credentials lookup order: explicit key file,
    /// then the gcloud well-known file under `home`, then the metadata server.
    pub fn resolve(explicit: Option<PathBuf>, home: Option<PathBuf>) -> Self {
        if let Some(path) = explicit {
            return CredentialSource::KeyFile(path);
        }

        match home.map(|dir| dir.join(WELL_KNOWN_CREDENTIALS)) {
            Some(path) if path.is_file() => CredentialSource::KeyFile(path),
            _ => CredentialSource::MetadataServer,
        }
    }
}

/// Contents of a credentials JSON file, keyed on its `type` field
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialsFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUserKey),
}

#[derive(Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
pub struct AuthorizedUserKey {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Bearer token with its expiry
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

/// Hands out access tokens, fetching a new one only when the cached
/// token is about to expire
pub struct TokenProvider {
    client: Client,
    source: CredentialSource,
    metadata_token_url: String,
    cached: RwLock<Option<AccessToken>>,
}

impl TokenProvider {
    pub fn new(client: Client, source: CredentialSource) -> Self {
        Self {
            client,
            source,
            metadata_token_url: METADATA_TOKEN_URL.to_string(),
            cached: RwLock::new(None),
        }
    }

    /// Point the metadata flow at another server
    pub fn with_metadata_url(mut self, url: impl Into<String>) -> Self {
        self.metadata_token_url = url.into();
        self
    }

    /// Current bearer token for Firestore requests
    pub async fn access_token(&self) -> Result<String, BackendError> {
        if let CredentialSource::Static(token) = &self.source {
            return Ok(token.clone());
        }

        if let Some(token) = self.cached.read().await.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.value.clone());
            }
        }

        let mut cached = self.cached.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.value.clone());
            }
        }

        let token = self.fetch().await?;
        log::debug!("Obtained Google access token valid until {}", token.expires_at);
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch(&self) -> Result<AccessToken, BackendError> {
        match &self.source {
            CredentialSource::Static(token) => Ok(AccessToken {
                value: token.clone(),
                expires_at: Utc::now() + Duration::days(365),
            }),
            CredentialSource::KeyFile(path) => match load_credentials_file(path).await? {
                CredentialsFile::ServiceAccount(key) => self.exchange_assertion(&key).await,
                CredentialsFile::AuthorizedUser(key) => self.exchange_refresh_token(&key).await,
            },
            CredentialSource::MetadataServer => {
                let response = self
                    .client
                    .get(&self.metadata_token_url)
                    .header("Metadata-Flavor", "Google")
                    .query(&[("scopes", DATASTORE_SCOPE)])
                    .send()
                    .await
                    .map_err(|e| {
                        BackendError::StoreUnavailable(format!(
                            "Could not load the default credentials from the metadata server: {}",
                            e
                        ))
                    })?;
                read_token_response(response).await
            }
        }
    }

    /// Service account flow: signed JWT exchanged at the key's token URI
    async fn exchange_assertion(&self, key: &ServiceAccountKey) -> Result<AccessToken, BackendError> {
        let assertion = sign_assertion(key, Utc::now())?;
        let response = self
            .client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        read_token_response(response).await
    }

    /// gcloud user credentials flow
    async fn exchange_refresh_token(
        &self,
        key: &AuthorizedUserKey,
    ) -> Result<AccessToken, BackendError> {
        let response = self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", key.client_id.as_str()),
                ("client_secret", key.client_secret.as_str()),
                ("refresh_token", key.refresh_token.as_str()),
            ])
            .send()
            .await?;
        read_token_response(response).await
    }
}

/// Parse a credentials file body
pub fn parse_credentials(contents: &str) -> Result<CredentialsFile, BackendError> {
    serde_json::from_str(contents)
        .map_err(|e| BackendError::StoreUnavailable(format!("Invalid credentials file: {}", e)))
}

async fn load_credentials_file(path: &Path) -> Result<CredentialsFile, BackendError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        BackendError::StoreUnavailable(format!(
            "Failed to read credentials file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_credentials(&contents)
}

/// RS256 assertion for the JWT bearer grant
pub fn sign_assertion(key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<String, BackendError> {
    let iat = now.timestamp();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: DATASTORE_SCOPE,
        aud: &key.token_uri,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };
    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
    Ok(encode(&Header::new(Algorithm::RS256), &claims, &signing_key)?)
}

async fn read_token_response(response: reqwest::Response) -> Result<AccessToken, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::StoreUnavailable(format!(
            "Token request failed with status {}: {}",
            status, body
        )));
    }

    let token: TokenResponse = response.json().await?;
    Ok(AccessToken {
        value: token.access_token,
        expires_at: Utc::now() + Duration::seconds(token.expires_in),
    })
}
