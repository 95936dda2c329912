// src/models/mod.rs
pub mod catalog;
pub mod conflict;
pub mod notice;
pub mod schedule;
pub mod wizard;
