// src/models/user.rs
// DOCUMENTATION: User records as read from either store
// PURPOSE: Opaque field mapping, key order preserved as delivered

use serde_json::{Map, Value};

/// One user document or row. The backend never interprets its fields.
pub type UserRecord = Map<String, Value>;

/// Key under which a document's identifier is exposed
pub const DOCUMENT_ID_KEY: &str = "id";
