// src/handlers/mod.rs
// DOCUMENTATION: Handlers module organization
// PURPOSE: Re-export handler components

pub mod health;
pub mod users;

pub use health::config as health_config;
pub use users::config as users_config;
pub use users::json_config;
