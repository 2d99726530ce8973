//! Data models

pub mod callback;
pub mod pull_source;
pub mod transaction;

pub use callback::*;
pub use pull_source::*;
pub use transaction::*;
