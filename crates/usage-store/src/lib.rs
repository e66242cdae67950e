//! SQLite-backed usage tracking.
//!
//! Four usage families (messages, reactions, mentions, commands) are kept
//! as rolling counters per (user, server, channel), alongside idea
//! submissions. Counters are updated with atomic upserts and can be ranked
//! per metric.

mod error;
mod metrics;
mod migrations;
mod store;
mod types;

pub use error::UsageStoreError;
pub use metrics::*;
pub use migrations::LATEST_VERSION;
pub use store::UsageStore;
pub use types::*;
