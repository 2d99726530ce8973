//! Pipeline core: admission, scoring seams, fan-out, outbound delivery,
//! and pull polling.

pub mod bus;
pub mod classifier;
pub mod gateway;
pub mod notifier;
pub mod rate_limit;
pub mod sanitizer;
pub mod scheduler;
pub mod store;
