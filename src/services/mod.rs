// src/services/mod.rs
pub mod backend;
pub mod conflict_service;
pub mod editor_service;
pub mod expansion_service;
pub mod submission_service;
pub mod wizard_service;

#[cfg(test)]
pub mod testing;
