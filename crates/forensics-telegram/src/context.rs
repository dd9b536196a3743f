//! Telegram context interface.
//!
//! `TelegramAppContext` gathers every collaborator the ingress gateway (C1)
//! needs — the session store, user resolver, job queue, blob store,
//! middleware stores, and the geocoder C5 borrows for rendering. One trait,
//! one concrete implementation assembled by the gateway binary, the same
//! shape the teacher used for its own per-channel context trait.

use forensics_notify::GeoResolver;
use forensics_queue::JobQueue;
use forensics_sessions::SessionManager;
use forensics_store::{BlobStore, DuplicateIndex, RateLimiter};
use forensics_users::UserResolver;
use forensics_worker::AnalysesRepo;

pub trait TelegramAppContext: Send + Sync {
    fn sessions(&self) -> &SessionManager;
    fn users(&self) -> &UserResolver;
    fn queue(&self) -> &JobQueue;
    fn blobs(&self) -> &dyn BlobStore;
    fn dedup(&self) -> &DuplicateIndex;
    fn rate_limiter(&self) -> &RateLimiter;
    fn geo(&self) -> &dyn GeoResolver;
    fn analyses(&self) -> &AnalysesRepo;
    /// Upload size ceiling (spec §4.2 step 2, default 20 MB — `QuotaConfig::max_upload_bytes`).
    fn max_upload_bytes(&self) -> u64;
    /// Duplicate-upload rolling window in hours (spec §4.1, default 24).
    fn duplicate_window_hours(&self) -> i64;
}
