//! Shared types used across the Aivis scanner.
//!
//! This module defines common newtypes and enums that provide type safety
//! and clear domain modeling.

use crate::error::AivisError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Validate an opaque identifier: 1-128 chars of alphanumerics, `-` or `_`.
fn validate_identifier(kind: &str, id: &str) -> Result<(), AivisError> {
    static ID_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = ID_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("valid regex"));

    if regex.is_match(id) {
        Ok(())
    } else {
        Err(AivisError::Validation(format!(
            "invalid {kind} ID: must be 1-128 alphanumeric, '-' or '_' characters, got '{id}'"
        )))
    }
}

/// Newtype for scan identifiers.
///
/// Scan IDs are assigned by the caller that created the scan record; the
/// scanner only requires them to be non-empty and path-safe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanId(String);

impl ScanId {
    /// Create a new `ScanId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID is empty, too long, or contains unsafe characters.
    pub fn new(id: impl Into<String>) -> Result<Self, AivisError> {
        let id = id.into();
        validate_identifier("scan", &id)?;
        Ok(Self(id))
    }

    /// Create a new random `ScanId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype for client (tracked brand) identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(String);

impl ClientId {
    /// Create a new `ClientId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID is empty, too long, or contains unsafe characters.
    pub fn new(id: impl Into<String>) -> Result<Self, AivisError> {
        let id = id.into();
        validate_identifier("client", &id)?;
        Ok(Self(id))
    }

    /// Create a new random `ClientId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The monitored AI answer surfaces.
///
/// Declaration order is the enumeration order used for reporting and for
/// best/worst engine tie-breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Engine {
    /// Conversational chat UI driven through a logged-in browser
    #[serde(rename = "CHATGPT")]
    ChatGpt,
    /// Chat UI rendered through a remote scrape service
    Perplexity,
    /// Search engine AI overview fetched through a SERP API
    GoogleAio,
}

impl Engine {
    /// All engines in enumeration order.
    pub const ALL: [Engine; 3] = [Engine::ChatGpt, Engine::Perplexity, Engine::GoogleAio];

    /// Human-readable engine name.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ChatGpt => "ChatGPT",
            Self::Perplexity => "Perplexity",
            Self::GoogleAio => "Google AI Overview",
        }
    }

    /// Lowercase slug used in screenshot file names.
    #[must_use]
    pub fn slug(&self) -> &'static str {
        match self {
            Self::ChatGpt => "chatgpt",
            Self::Perplexity => "perplexity",
            Self::GoogleAio => "google",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// How visible the client brand is in a single engine response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MentionType {
    /// Primary recommendation
    Featured,
    /// Named, but not as the primary recommendation
    Mentioned,
    /// Client absent while known competitors appear
    CompetitorOnly,
    /// Client absent
    NotFound,
}

impl MentionType {
    /// Whether the client counts as visible in the response.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Featured | Self::Mentioned)
    }

    /// Weight used by the overall visibility score (3 featured, 2 mentioned).
    #[must_use]
    pub fn score_weight(&self) -> u32 {
        match self {
            Self::Featured => 3,
            Self::Mentioned => 2,
            Self::CompetitorOnly | Self::NotFound => 0,
        }
    }
}

impl fmt::Display for MentionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Featured => "FEATURED",
            Self::Mentioned => "MENTIONED",
            Self::CompetitorOnly => "COMPETITOR_ONLY",
            Self::NotFound => "NOT_FOUND",
        };
        write!(f, "{label}")
    }
}

/// Lifecycle status of a scan record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanStatus {
    /// Waiting in the job queue
    Queued,
    /// Picked up by a worker
    Running,
    /// Report produced
    Completed,
    /// Aborted with an error
    Failed,
}

impl ScanStatus {
    /// Terminal states accept no further mutation.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "QUEUED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// The brand being tracked, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientProfile {
    /// Client identifier
    pub id: ClientId,
    /// Brand name searched for in responses
    pub name: String,
    /// Brand web domain (e.g. `acme.com`)
    pub domain: Option<String>,
    /// Known competitor names
    #[serde(default)]
    pub competitors: Vec<String>,
}

/// Opaque session token or API key, supplied already decrypted.
///
/// The secret is wiped from memory on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential(String);

impl Credential {
    /// Wrap a secret value. Returns `None` for empty or whitespace-only input.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            None
        } else {
            Some(Self(secret))
        }
    }

    /// Expose the secret for the one call that needs it.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential([REDACTED; {} bytes])", self.0.len())
    }
}

/// Per-user credentials made available to one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanCredentials {
    /// ChatGPT session cookie value
    pub chatgpt_session: Option<Credential>,
    /// Perplexity session cookie value (used only by token validation)
    pub perplexity_session: Option<Credential>,
    /// SERP API key for the Google AI overview engine
    pub serp_api_key: Option<Credential>,
    /// Firecrawl API key for the Perplexity engine
    pub firecrawl_api_key: Option<Credential>,
}

impl ScanCredentials {
    /// Credential handed to a given engine's adapter, if any.
    #[must_use]
    pub fn for_engine(&self, engine: Engine) -> Option<&Credential> {
        match engine {
            Engine::ChatGpt => self.chatgpt_session.as_ref(),
            Engine::Perplexity => self.firecrawl_api_key.as_ref(),
            Engine::GoogleAio => self.serp_api_key.as_ref(),
        }
    }
}

/// Wrapper around `chrono::DateTime<Utc>` for consistent timestamp handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Format as RFC3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub fn unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_id_valid() {
        let id = ScanId::new("scan_123-abc").expect("valid scan ID");
        assert_eq!(id.as_str(), "scan_123-abc");
        assert!(ScanId::new(uuid::Uuid::new_v4().to_string()).is_ok());
    }

    #[test]
    fn test_scan_id_invalid() {
        let too_long = "a".repeat(129);
        for id in ["", "../etc", "has space", too_long.as_str()] {
            assert!(ScanId::new(id).is_err(), "Should fail for: {id}");
        }
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(ScanId::generate(), ScanId::generate());
        assert_ne!(ClientId::generate(), ClientId::generate());
    }

    #[test]
    fn test_engine_serialization() {
        let json = serde_json::to_string(&Engine::ChatGpt).expect("serialize engine");
        assert_eq!(json, "\"CHATGPT\"");
        let json = serde_json::to_string(&Engine::GoogleAio).expect("serialize engine");
        assert_eq!(json, "\"GOOGLE_AIO\"");

        let parsed: Engine = serde_json::from_str("\"PERPLEXITY\"").expect("deserialize engine");
        assert_eq!(parsed, Engine::Perplexity);
    }

    #[test]
    fn test_engine_order_and_names() {
        assert_eq!(
            Engine::ALL,
            [Engine::ChatGpt, Engine::Perplexity, Engine::GoogleAio]
        );
        assert_eq!(Engine::GoogleAio.to_string(), "Google AI Overview");
        assert_eq!(Engine::ChatGpt.slug(), "chatgpt");
    }

    #[test]
    fn test_mention_type_weights() {
        assert_eq!(MentionType::Featured.score_weight(), 3);
        assert_eq!(MentionType::Mentioned.score_weight(), 2);
        assert_eq!(MentionType::CompetitorOnly.score_weight(), 0);
        assert!(MentionType::Mentioned.is_visible());
        assert!(!MentionType::CompetitorOnly.is_visible());

        let json = serde_json::to_string(&MentionType::CompetitorOnly).expect("serialize");
        assert_eq!(json, "\"COMPETITOR_ONLY\"");
    }

    #[test]
    fn test_scan_status_terminal() {
        assert!(!ScanStatus::Queued.is_terminal());
        assert!(!ScanStatus::Running.is_terminal());
        assert!(ScanStatus::Completed.is_terminal());
        assert!(ScanStatus::Failed.is_terminal());
        assert_eq!(ScanStatus::Running.to_string(), "RUNNING");
    }

    #[test]
    fn test_credential_rejects_blank() {
        assert!(Credential::new("").is_none());
        assert!(Credential::new("   ").is_none());
        assert_eq!(Credential::new("tok").map(|c| c.expose().to_string()), Some("tok".to_string()));
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("super-secret-session").expect("credential");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_scan_credentials_routing() {
        let creds = ScanCredentials {
            chatgpt_session: Credential::new("session"),
            perplexity_session: None,
            serp_api_key: Credential::new("serp"),
            firecrawl_api_key: None,
        };
        assert_eq!(creds.for_engine(Engine::ChatGpt).map(Credential::expose), Some("session"));
        assert_eq!(creds.for_engine(Engine::GoogleAio).map(Credential::expose), Some("serp"));
        assert!(creds.for_engine(Engine::Perplexity).is_none());
    }

    #[test]
    fn test_timestamp_ordering() {
        let ts1 = Timestamp::now();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let ts2 = Timestamp::now();
        assert!(ts2 > ts1);
        assert!(ts2.unix_millis() > 0);
    }
}
