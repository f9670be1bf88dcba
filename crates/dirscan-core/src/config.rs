//! Scan configuration types.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use derive_builder::Builder;

use crate::error::ConfigError;
use crate::tags::TagSet;

/// Default cap on concurrent scan calls.
pub const DEFAULT_MAX_WORKERS: usize = 100;

/// Default file size ceiling (1 GiB). Larger files are skipped.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// How many scan calls may run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concurrency {
    /// At most N concurrent scan calls.
    Limited(NonZeroUsize),
    /// No gate at all.
    Unlimited,
}

impl Concurrency {
    /// Limit to `n` concurrent scans; `0` is rejected.
    pub fn limited(n: usize) -> Result<Self, ConfigError> {
        NonZeroUsize::new(n)
            .map(Self::Limited)
            .ok_or_else(|| ConfigError::InvalidConcurrency {
                value: n.to_string(),
            })
    }

    /// The configured cap, if any.
    pub fn max(&self) -> Option<usize> {
        match self {
            Self::Limited(n) => Some(n.get()),
            Self::Unlimited => None,
        }
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Self::Limited(NonZeroUsize::new(DEFAULT_MAX_WORKERS).unwrap_or(NonZeroUsize::MIN))
    }
}

impl FromStr for Concurrency {
    type Err = ConfigError;

    /// Accepts a positive integer, or `-1` / `unlimited` for no gate.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "-1" || s.eq_ignore_ascii_case("unlimited") {
            return Ok(Self::Unlimited);
        }
        let invalid = || ConfigError::InvalidConcurrency {
            value: s.to_string(),
        };
        let n: usize = s.parse().map_err(|_| invalid())?;
        NonZeroUsize::new(n).map(Self::Limited).ok_or_else(invalid)
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => write!(f, "{n}"),
            Self::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// Where the scanning service lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Public service in a named region.
    Region(String),
    /// Internal service gateway.
    Internal { address: String, tls: bool },
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::Region("us-east-1".to_string())
    }
}

/// Options used to construct the scanning client.
#[derive(Clone, Default)]
pub struct ClientOptions {
    /// API key for the scanning service.
    pub api_key: String,
    /// Service endpoint.
    pub endpoint: Endpoint,
    /// Enable predictive machine learning detection.
    pub pml: bool,
    /// Enable SPN feedback.
    pub feedback: bool,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("pml", &self.pml)
            .field("feedback", &self.feedback)
            .finish()
    }
}

/// Configuration for a directory scan run.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root directory to scan.
    pub root: PathBuf,

    /// Cap on concurrent scan calls.
    #[builder(default)]
    pub concurrency: Concurrency,

    /// Tags attached to every scan call.
    #[builder(default)]
    pub tags: TagSet,

    /// Files larger than this are skipped (None = no ceiling).
    #[builder(default = "Some(DEFAULT_MAX_FILE_SIZE)")]
    pub max_file_size: Option<u64>,

    /// Echo every scanned file to stdout.
    #[builder(default = "false")]
    pub verbose: bool,

    /// Upper bound on a single scan call (None = wait forever).
    #[builder(default)]
    pub scan_timeout: Option<Duration>,
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        if let Some(Some(timeout)) = self.scan_timeout {
            if timeout.is_zero() {
                return Err("Scan timeout must be greater than zero".to_string());
            }
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a config with defaults for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            concurrency: Concurrency::default(),
            tags: TagSet::empty(),
            max_file_size: Some(DEFAULT_MAX_FILE_SIZE),
            verbose: false,
            scan_timeout: None,
        }
    }

    /// Check if a file of `size` bytes is above the ceiling.
    pub fn exceeds_size_limit(&self, size: u64) -> bool {
        self.max_file_size.is_some_and(|max| size > max)
    }
}
