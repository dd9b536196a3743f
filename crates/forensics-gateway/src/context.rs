//! Concrete [`forensics_telegram::TelegramAppContext`] assembled from every
//! subsystem crate's storage handle (spec §6's collaborator list).
//!
//! Every field is an `Arc` because the same subsystem instance is also
//! shared with the analysis worker pool (e.g. `queue` and `dedup` are
//! written to from here and read from there).

use std::sync::Arc;

use forensics_notify::GeoResolver;
use forensics_queue::JobQueue;
use forensics_sessions::SessionManager;
use forensics_store::{BlobStore, DuplicateIndex, RateLimiter};
use forensics_telegram::TelegramAppContext;
use forensics_users::UserResolver;
use forensics_worker::AnalysesRepo;

pub struct GatewayContext {
    pub sessions: Arc<SessionManager>,
    pub users: Arc<UserResolver>,
    pub queue: Arc<JobQueue>,
    pub blobs: Arc<dyn BlobStore>,
    pub dedup: Arc<DuplicateIndex>,
    pub rate_limiter: Arc<RateLimiter>,
    pub geo: Arc<dyn GeoResolver>,
    pub analyses: Arc<AnalysesRepo>,
    pub max_upload_bytes: u64,
    pub duplicate_window_hours: i64,
}

impl TelegramAppContext for GatewayContext {
    fn sessions(&self) -> &SessionManager {
        self.sessions.as_ref()
    }

    fn users(&self) -> &UserResolver {
        self.users.as_ref()
    }

    fn queue(&self) -> &JobQueue {
        self.queue.as_ref()
    }

    fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    fn dedup(&self) -> &DuplicateIndex {
        self.dedup.as_ref()
    }

    fn rate_limiter(&self) -> &RateLimiter {
        self.rate_limiter.as_ref()
    }

    fn geo(&self) -> &dyn GeoResolver {
        self.geo.as_ref()
    }

    fn analyses(&self) -> &AnalysesRepo {
        self.analyses.as_ref()
    }

    fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    fn duplicate_window_hours(&self) -> i64 {
        self.duplicate_window_hours
    }
}
