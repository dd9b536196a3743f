pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{ForensicsError, Result};
pub use types::{anonymize_user_id, Priority, Scenario, Tier, UserId, Verdict};
