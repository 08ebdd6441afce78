pub mod cache;
pub mod tms;

#[allow(unused_imports)]
pub use cache::{LaneRateSnapshot, SnapshotError};
#[allow(unused_imports)]
pub use tms::{CacheStatus, CachedPayload, TmsClient, TmsClientError};
