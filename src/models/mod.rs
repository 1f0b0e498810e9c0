// src/models/mod.rs
// DOCUMENTATION: Models module organization
// PURPOSE: Re-export model components

pub mod envelope;
pub mod user;

pub use envelope::*;
pub use user::*;
