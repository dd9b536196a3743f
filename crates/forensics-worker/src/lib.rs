//! `forensics-worker` — the Analysis Worker (C4): pulls a job, downloads
//! the blob, calls the detection API, fuses detector signals into a
//! verdict, persists the analysis record, and emits progress/result
//! messages (§4.4).

pub mod analyses;
pub mod error;
pub mod pipeline;
pub mod stage;
pub mod traits;

pub use analyses::{analysis_id_for, compute_sha256_hex, AnalysesRepo, AnalysisRecord};
pub use error::{Result, WorkerError};
pub use pipeline::Worker;
pub use stage::Stage;
pub use traits::{ProgressSink, ResultSink};

use std::sync::Arc;

use tokio::sync::watch;

/// Spawn `count` independent worker instances (§5: "three worker instances
/// by default; scale horizontally"). Each runs its own tick loop against
/// the shared [`forensics_queue::JobQueue`] — concurrency comes from
/// multiple instances, not from spawning tasks per job within one.
pub fn spawn_pool(
    workers: Vec<Worker>,
    shutdown: watch::Receiver<bool>,
) -> Vec<tokio::task::JoinHandle<()>> {
    workers
        .into_iter()
        .map(|w| {
            let shutdown = shutdown.clone();
            tokio::spawn(Arc::new(w).run(shutdown))
        })
        .collect()
}
