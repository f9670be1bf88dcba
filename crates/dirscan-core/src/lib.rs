//! Core types and configuration for dirscan.
//!
//! This crate provides the data structures shared by the scanning engine
//! and the command line front end: the verdict model returned by the remote
//! scanning service, the tag set attached to every scan call, and the run
//! configuration.

mod config;
mod error;
mod tags;
mod verdict;

pub use config::{
    ClientOptions, Concurrency, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_WORKERS, Endpoint, ScanConfig,
    ScanConfigBuilder,
};
pub use error::{BackendError, ConfigError, FileScanError, ScanError};
pub use tags::{MAX_TAGS, TagSet};
pub use verdict::{FoundMalware, ScanResult, Verdict};
