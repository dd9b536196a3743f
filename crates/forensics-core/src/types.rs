use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Internal user identifier (UUIDv7 — time-sortable for log correlation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A user's subscription tier. Drives job priority and quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Free => write!(f, "free"),
            Tier::Pro => write!(f, "pro"),
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

/// User-declared conversation intent. Closed enum — no other values admitted.
///
/// A legacy `None` scenario observed in historical data is coerced to
/// `General` at read time; new writes never produce it (see spec §3, §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    AdultBlackmail,
    TeenagerSos,
    General,
}

impl Scenario {
    /// Coerce a possibly-legacy scenario tag read from storage.
    /// `None`/unrecognized values become `General` — new writes never produce them.
    pub fn coerce(raw: Option<&str>) -> Self {
        match raw {
            Some(s) => s.parse().unwrap_or(Scenario::General),
            None => Scenario::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::AdultBlackmail => "adult_blackmail",
            Scenario::TeenagerSos => "teenager_sos",
            Scenario::General => "general",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adult_blackmail" => Ok(Scenario::AdultBlackmail),
            "teenager_sos" => Ok(Scenario::TeenagerSos),
            "general" => Ok(Scenario::General),
            other => Err(format!("unknown scenario: {other}")),
        }
    }
}

/// Priority lane in the job queue (§4.3). Strictly ordered, never weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Default,
    High,
}

impl Priority {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Pro => Priority::High,
            Tier::Free => Priority::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Default => "default",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "default" => Ok(Priority::Default),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Verdict produced by fusing detector signals (§4.5). Always paired with a
/// confidence in `[0,1]` and a human-readable reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Real,
    AiGenerated,
    Manipulated,
    Inconclusive,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Real => "real",
            Verdict::AiGenerated => "ai_generated",
            Verdict::Manipulated => "manipulated",
            Verdict::Inconclusive => "inconclusive",
        }
    }

    /// Verdict emoji used as the header of the final message (§4.6).
    pub fn emoji(&self) -> &'static str {
        match self {
            Verdict::Real => "\u{2705}",
            Verdict::AiGenerated => "\u{1F916}",
            Verdict::Manipulated => "\u{26A0}\u{FE0F}",
            Verdict::Inconclusive => "\u{2753}",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Real => "Likely authentic",
            Verdict::AiGenerated => "AI-generated",
            Verdict::Manipulated => "Manipulated",
            Verdict::Inconclusive => "Inconclusive",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Anonymize a raw channel user id for logging: first 8 hex chars of
/// sha256(user_id). PII (raw ids, image bytes, text content) is never logged.
pub fn anonymize_user_id(raw: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(raw.as_bytes());
    hex::encode(&digest[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_coerces_legacy_none() {
        assert_eq!(Scenario::coerce(None), Scenario::General);
        assert_eq!(Scenario::coerce(Some("bogus")), Scenario::General);
        assert_eq!(Scenario::coerce(Some("adult_blackmail")), Scenario::AdultBlackmail);
    }

    #[test]
    fn priority_for_tier() {
        assert_eq!(Priority::for_tier(Tier::Pro), Priority::High);
        assert_eq!(Priority::for_tier(Tier::Free), Priority::Default);
    }

    #[test]
    fn priority_ordering_is_strict() {
        assert!(Priority::High > Priority::Default);
        assert!(Priority::Default > Priority::Low);
    }

    #[test]
    fn anonymize_is_stable_and_short() {
        let a = anonymize_user_id("12345");
        let b = anonymize_user_id("12345");
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert_ne!(a, anonymize_user_id("67890"));
    }
}
