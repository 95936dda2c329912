// src/web/mod.rs
pub mod lookup_handlers;
pub mod routes;
pub mod wizard_handlers;
pub mod wizard_session;
