//! Core types for cosmoclean.
//!
//! This crate holds the data structures shared by the scanning engine and
//! its front ends: target name sets, scan configuration, match records,
//! scan/deletion events and the error taxonomy.

mod config;
mod error;
mod event;
mod record;
mod state;
mod targets;

pub use config::{
    DEFAULT_TARGETS, ScanConfig, ScanConfigBuilder, ScanConfigBuilderError, ScanRequest,
    SymlinkPolicy,
};
pub use error::ScanError;
pub use event::{DeletionEvent, DeletionSummary, ScanEvent};
pub use record::{MatchRecord, ScanResult, ScanSummary};
pub use state::ScanState;
pub use targets::{CaseSensitivity, TargetSet};
