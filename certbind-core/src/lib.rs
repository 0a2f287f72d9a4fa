//! certbind Core
//!
//! Core library for certbind providers: resources and their state, attribute
//! schemas, composite identifiers, and the wait-for-state polling loop.

pub mod differ;
pub mod identity;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod waiter;
