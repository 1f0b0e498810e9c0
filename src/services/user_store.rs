// src/services/user_store.rs
// DOCUMENTATION: Read capability shared by both stores
// PURPOSE: Let handlers depend on an injected store instead of a global client

use crate::errors::BackendError;
use crate::models::UserRecord;
use async_trait::async_trait;
use std::sync::Arc;

/// A store that can list the `users` records it holds.
/// Failures are reported as `BackendError::StoreUnavailable`.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Human readable store name used in logs
    fn name(&self) -> &'static str;

    async fn list_users(&self) -> Result<Vec<UserRecord>, BackendError>;
}

/// Stores injected into the router at startup
#[derive(Clone)]
pub struct UserStores {
    pub documents: Arc<dyn UserStore>,
    pub relational: Arc<dyn UserStore>,
}

impl UserStores {
    pub fn new(documents: Arc<dyn UserStore>, relational: Arc<dyn UserStore>) -> Self {
        Self {
            documents,
            relational,
        }
    }
}
