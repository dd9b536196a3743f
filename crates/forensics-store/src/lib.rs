pub mod blob;
pub mod db;
pub mod dedup;
pub mod error;
pub mod phash;
pub mod rate_limit;
pub mod watermark;

pub use blob::{BlobStore, HttpBlobStore};
pub use dedup::DuplicateIndex;
pub use error::{Result, StoreError};
pub use rate_limit::RateLimiter;
pub use watermark::{scan_known_watermark, KnownWatermark};
