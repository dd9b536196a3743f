//! `forensics-detection` — the analysis API client and verdict-fusion rule.
//!
//! [`client::AnalysisClient`] speaks the external detection service's HTTP
//! contract (§6); [`fusion::fuse`] is the pure, network-free decision
//! function the worker calls once it has a [`types::DetectorSignals`]
//! bundle in hand (§4.5).

pub mod client;
pub mod error;
pub mod fusion;
pub mod types;

pub use client::{AnalysisClient, HttpAnalysisClient};
pub use error::{DetectionError, Result};
pub use fusion::{fuse, red_flag_candidates, RedFlagCandidate, VerdictOutcome};
pub use types::{
    AnalysisOutcome, AnalysisRequest, DetailLevel, DetectorSignals, ExtractedMetadata, GpsCoords,
    VisualWatermark,
};
