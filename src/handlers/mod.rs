//! HTTP handlers

pub mod callbacks;
pub mod health;
pub mod ingest;
pub mod sources;
pub mod stream;
pub mod transactions;
