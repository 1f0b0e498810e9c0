// src/services/firestore_client.rs
// DOCUMENTATION: Firestore REST API client
// PURPOSE: List every document of the `users` collection as plain JSON

use crate::errors::BackendError;
use crate::models::{UserRecord, DOCUMENT_ID_KEY};
use crate::services::google_auth::TokenProvider;
use crate::services::user_store::UserStore;
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";
const USERS_COLLECTION: &str = "users";
const PAGE_SIZE: &str = "300";
const VECTOR_TYPE_KEY: &str = "__type__";
const VECTOR_TYPE: &str = "__vector__";
const VECTOR_VALUE_KEY: &str = "value";

/// Firestore client
/// DOCUMENTATION: One long-lived instance is shared by all requests
pub struct FirestoreClient {
    /// HTTP client for making requests
    client: Client,
    /// `https://firestore.googleapis.com`, or the emulator's address
    base_url: String,
    project_id: String,
    database: String,
    auth: TokenProvider,
}

/// One page of `documents.list`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    /// `projects/{p}/databases/{d}/documents/users/{id}`
    name: String,
    /// Absent for documents without fields
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Typed Firestore value as encoded by the REST API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
enum FirestoreValue {
    NullValue(()),
    BooleanValue(bool),
    /// int64 travels as a decimal string
    IntegerValue(String),
    /// A number, or "NaN" / "Infinity" / "-Infinity"
    DoubleValue(Value),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(LatLng),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
    VectorValue(ArrayValue),
}

#[derive(Debug, Default, Deserialize)]
struct LatLng {
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
}

#[derive(Debug, Default, Deserialize)]
struct ArrayValue {
    #[serde(default)]
    values: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct MapValue {
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreClient {
    /// Create client against production Firestore
    pub fn new(client: Client, project_id: String, auth: TokenProvider) -> Self {
        Self::with_base_url(client, FIRESTORE_BASE_URL.to_string(), project_id, auth)
    }

    /// Create client against an arbitrary endpoint, e.g. `http://localhost:8081`
    pub fn with_base_url(
        client: Client,
        base_url: String,
        project_id: String,
        auth: TokenProvider,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id,
            database: "(default)".to_string(),
            auth,
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/v1/projects/{}/databases/{}/documents/{}",
            self.base_url, self.project_id, self.database, collection
        )
    }

    /// Fetch all documents in a collection, following page tokens
    pub async fn list_collection(&self, collection: &str) -> Result<Vec<UserRecord>, BackendError> {
        let url = self.collection_url(collection);
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = self.auth.access_token().await?;
            let mut request = self
                .client
                .get(&url)
                .bearer_auth(token)
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(page) = &page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(BackendError::StoreUnavailable(format!(
                    "Firestore returned {}: {}",
                    status,
                    error_message(&body)
                )));
            }

            let page: ListDocumentsResponse = response.json().await?;
            for document in page.documents {
                records.push(document_to_record(document)?);
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => {
                    log::debug!("Fetching next page of {} ({} so far)", collection, records.len());
                    page_token = Some(next);
                }
                None => break,
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl UserStore for FirestoreClient {
    fn name(&self) -> &'static str {
        "Firestore"
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, BackendError> {
        self.list_collection(USERS_COLLECTION).await
    }
}

/// Google API errors wrap the useful text in `error.message`
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Flatten a document into `{id, ...fields}`. The document id always wins
/// over a stored field named `id`.
fn document_to_record(document: Document) -> Result<UserRecord, BackendError> {
    let id = document.name.rsplit('/').next().unwrap_or_default().to_string();

    let mut record = Map::with_capacity(document.fields.len() + 1);
    record.insert(DOCUMENT_ID_KEY.to_string(), Value::String(id));
    for (key, value) in decode_fields(document.fields)? {
        if key != DOCUMENT_ID_KEY {
            record.insert(key, value);
        }
    }
    Ok(record)
}

fn decode_fields(fields: Map<String, Value>) -> Result<Map<String, Value>, BackendError> {
    fields
        .into_iter()
        .map(|(key, value)| decode_value(value).map(|decoded| (key, decoded)))
        .collect()
}

/// Convert one typed value to plain JSON, serialising timestamps and geo
/// points the way the Node admin SDK does. Value kinds this client does not
/// know are passed through untouched.
fn decode_value(raw: Value) -> Result<Value, BackendError> {
    let value: FirestoreValue = match serde_json::from_value(raw.clone()) {
        Ok(value) => value,
        Err(e) => {
            log::debug!("Passing through unrecognised Firestore value {}: {}", raw, e);
            return Ok(raw);
        }
    };

    Ok(match value {
        FirestoreValue::NullValue(()) => Value::Null,
        FirestoreValue::BooleanValue(b) => Value::Bool(b),
        FirestoreValue::IntegerValue(n) => n
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| BackendError::StoreUnavailable(format!("Invalid integerValue {:?}", n)))?,
        FirestoreValue::DoubleValue(d) => match d {
            Value::Number(n) => Value::Number(n),
            // NaN and infinities have no JSON form
            _ => Value::Null,
        },
        FirestoreValue::TimestampValue(ts) => {
            let parsed = DateTime::parse_from_rfc3339(&ts).map_err(|e| {
                BackendError::StoreUnavailable(format!("Invalid timestampValue {:?}: {}", ts, e))
            })?;
            json!({
                "_seconds": parsed.timestamp(),
                "_nanoseconds": parsed.timestamp_subsec_nanos(),
            })
        }
        FirestoreValue::StringValue(s) | FirestoreValue::BytesValue(s) => Value::String(s),
        FirestoreValue::ReferenceValue(path) => {
            let relative = path
                .split_once("/documents/")
                .map(|(_, rest)| rest.to_string())
                .unwrap_or(path);
            Value::String(relative)
        }
        FirestoreValue::GeoPointValue(point) => json!({
            "_latitude": point.latitude,
            "_longitude": point.longitude,
        }),
        FirestoreValue::ArrayValue(array) | FirestoreValue::VectorValue(array) => {
            decode_array(array)?
        }
        FirestoreValue::MapValue(mut map) => {
            // Vector embeddings are stored as {__type__: "__vector__", value: [...]}
            if map.fields.get(VECTOR_TYPE_KEY) == Some(&json!({"stringValue": VECTOR_TYPE})) {
                match map.fields.remove(VECTOR_VALUE_KEY) {
                    Some(values) => decode_value(values)?,
                    None => Value::Array(Vec::new()),
                }
            } else {
                Value::Object(decode_fields(map.fields)?)
            }
        }
    })
}

fn decode_array(array: ArrayValue) -> Result<Value, BackendError> {
    array
        .values
        .into_iter()
        .map(decode_value)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::google_auth::CredentialSource;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USERS_PATH: &str = "/v1/projects/frame/databases/(default)/documents/users";

    fn emulator_client(base_url: String) -> FirestoreClient {
        FirestoreClient::with_base_url(
            Client::new(),
            base_url,
            "frame".to_string(),
            TokenProvider::new(Client::new(), CredentialSource::Static("owner".to_string())),
        )
    }

    fn user_doc(id: &str, name: &str) -> Value {
        json!({
            "name": format!("projects/frame/databases/(default)/documents/users/{}", id),
            "fields": {"name": {"stringValue": name}}
        })
    }

    fn document(raw: Value) -> Document {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_documents_flatten_with_id_first() {
        let page: ListDocumentsResponse = serde_json::from_value(json!({
            "documents": [
                {
                    "name": "projects/frame/databases/(default)/documents/users/a",
                    "fields": {"name": {"stringValue": "Ann"}},
                    "createTime": "2024-01-01T00:00:00Z",
                    "updateTime": "2024-01-01T00:00:00Z"
                },
                {
                    "name": "projects/frame/databases/(default)/documents/users/b",
                    "fields": {"name": {"stringValue": "Bo"}}
                }
            ]
        }))
        .unwrap();

        let records: Vec<UserRecord> = page
            .documents
            .into_iter()
            .map(|d| document_to_record(d).unwrap())
            .collect();

        assert_eq!(
            serde_json::to_string(&records).unwrap(),
            r#"[{"id":"a","name":"Ann"},{"id":"b","name":"Bo"}]"#
        );
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_empty_collection_has_no_documents() {
        let page: ListDocumentsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(page.documents.is_empty());
    }

    #[test]
    fn test_document_id_overrides_id_field() {
        let record = document_to_record(document(json!({
            "name": "projects/frame/databases/(default)/documents/users/xyz",
            "fields": {
                "id": {"stringValue": "stale"},
                "email": {"stringValue": "x@frame.dev"}
            }
        })))
        .unwrap();

        assert_eq!(record["id"], "xyz");
        assert_eq!(record["email"], "x@frame.dev");
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_document_without_fields() {
        let record = document_to_record(document(json!({
            "name": "projects/frame/databases/(default)/documents/users/empty"
        })))
        .unwrap();
        assert_eq!(Value::Object(record), json!({"id": "empty"}));
    }

    #[test]
    fn test_scalar_values() {
        assert_eq!(decode_value(json!({"nullValue": null})).unwrap(), Value::Null);
        assert_eq!(decode_value(json!({"booleanValue": false})).unwrap(), json!(false));
        assert_eq!(decode_value(json!({"integerValue": "42"})).unwrap(), json!(42));
        assert_eq!(decode_value(json!({"doubleValue": 1.5})).unwrap(), json!(1.5));
        assert_eq!(decode_value(json!({"doubleValue": "NaN"})).unwrap(), Value::Null);
        assert_eq!(decode_value(json!({"bytesValue": "AQID"})).unwrap(), json!("AQID"));
    }

    #[test]
    fn test_timestamp_and_geo_point() {
        assert_eq!(
            decode_value(json!({"timestampValue": "2024-03-01T12:00:00.250Z"})).unwrap(),
            json!({"_seconds": 1709294400, "_nanoseconds": 250000000})
        );
        assert_eq!(
            decode_value(json!({"geoPointValue": {"latitude": 41.65}})).unwrap(),
            json!({"_latitude": 41.65, "_longitude": 0.0})
        );
    }

    #[test]
    fn test_reference_is_relative_path() {
        assert_eq!(
            decode_value(json!({
                "referenceValue": "projects/frame/databases/(default)/documents/teams/t1"
            }))
            .unwrap(),
            json!("teams/t1")
        );
    }

    #[test]
    fn test_nested_values() {
        let decoded = decode_value(json!({
            "mapValue": {"fields": {
                "tags": {"arrayValue": {"values": [
                    {"stringValue": "admin"},
                    {"integerValue": "7"}
                ]}},
                "empty": {"arrayValue": {}},
                "profile": {"mapValue": {}}
            }}
        }))
        .unwrap();

        assert_eq!(
            decoded,
            json!({"tags": ["admin", 7], "empty": [], "profile": {}})
        );
    }

    #[test]
    fn test_vector_values() {
        assert_eq!(
            decode_value(json!({"vectorValue": {"values": [
                {"doubleValue": 0.25},
                {"doubleValue": -1.5}
            ]}}))
            .unwrap(),
            json!([0.25, -1.5])
        );
        assert_eq!(
            decode_value(json!({"mapValue": {"fields": {
                "__type__": {"stringValue": "__vector__"},
                "value": {"arrayValue": {"values": [{"doubleValue": 1.0}, {"doubleValue": 2.0}]}}
            }}}))
            .unwrap(),
            json!([1.0, 2.0])
        );
    }

    #[test]
    fn test_unknown_value_type_passes_through() {
        assert_eq!(
            decode_value(json!({"someFutureValue": {"x": 1}})).unwrap(),
            json!({"someFutureValue": {"x": 1}})
        );

        let record = document_to_record(document(json!({
            "name": "projects/frame/databases/(default)/documents/users/c",
            "fields": {
                "name": {"stringValue": "Cy"},
                "extra": {"someFutureValue": "opaque"}
            }
        })))
        .unwrap();
        assert_eq!(record["name"], "Cy");
        assert_eq!(record["extra"], json!({"someFutureValue": "opaque"}));
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(error_message(body), "Missing or insufficient permissions.");
        assert_eq!(error_message("upstream connect error"), "upstream connect error");
    }

    #[test]
    fn test_collection_url() {
        let client = emulator_client("http://localhost:8081/".to_string());
        assert_eq!(
            client.collection_url("users"),
            "http://localhost:8081/v1/projects/frame/databases/(default)/documents/users"
        );
    }

    #[tokio::test]
    async fn test_unreachable_firestore_is_store_unavailable() {
        let client = emulator_client("http://127.0.0.1:1".to_string());

        match client.list_users().await {
            Err(BackendError::StoreUnavailable(msg)) => assert!(!msg.is_empty()),
            other => panic!("expected StoreUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_users_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERS_PATH))
            .and(header("authorization", "Bearer owner"))
            .and(query_param("pageSize", "300"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [user_doc("a", "Ann"), user_doc("b", "Bo")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let users = emulator_client(server.uri()).list_users().await.unwrap();
        assert_eq!(
            serde_json::to_string(&users).unwrap(),
            r#"[{"id":"a","name":"Ann"},{"id":"b","name":"Bo"}]"#
        );
    }

    #[tokio::test]
    async fn test_follows_next_page_token() {
        let server = MockServer::start().await;
        // Mounted first so it takes precedence for the second request
        Mock::given(method("GET"))
            .and(path(USERS_PATH))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [user_doc("c", "Cy")]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(USERS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [user_doc("a", "Ann"), user_doc("b", "Bo")],
                "nextPageToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let users = emulator_client(server.uri()).list_users().await.unwrap();
        let ids: Vec<&str> = users.iter().map(|u| u["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_empty_page_token_ends_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [user_doc("a", "Ann")],
                "nextPageToken": ""
            })))
            .expect(1)
            .mount(&server)
            .await;

        let users = emulator_client(server.uri()).list_users().await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_store_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERS_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "code": 403,
                    "message": "Missing or insufficient permissions.",
                    "status": "PERMISSION_DENIED"
                }
            })))
            .mount(&server)
            .await;

        match emulator_client(server.uri()).list_users().await {
            Err(BackendError::StoreUnavailable(msg)) => {
                assert!(msg.contains("403"));
                assert!(msg.ends_with("Missing or insufficient permissions."));
            }
            other => panic!("expected StoreUnavailable, got {:?}", other),
        }
    }
}
