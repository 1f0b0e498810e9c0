// src/services/mod.rs
// DOCUMENTATION: Services module organization
// PURPOSE: Re-export service components

pub mod firestore_client;
pub mod google_auth;
pub mod user_store;

pub use firestore_client::*;
pub use google_auth::*;
pub use user_store::*;
