//! # autoprint core
//!
//! Scans watched directories for PDF documents whose names match a word
//! filter, sends each match to a printer through an external print utility,
//! and archives the file once it has been handled.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                           autoprint                           │
//! ├───────────────────────────────────────────────────────────────┤
//! │  DirectoryRegistry ──► Scheduler ──► FileLifecycleManager     │
//! │                                          │                    │
//! │                                          ▼                    │
//! │                ScanFilter, PrintDispatcher, ExclusionStore    │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry and the exclusion store are the only persisted state. Both
//! are written through to disk on every mutation.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod exclusion;
pub mod filter;
pub mod lifecycle;
pub mod registry;
pub mod scheduler;
mod store;

pub use config::{PrintCommand, ServiceConfig, WatchConfiguration, parse_include_words};
pub use dispatch::{CommandDispatcher, DispatchOutput, PrintDispatcher};
pub use error::{Result, StorageError, WatcherError};
pub use exclusion::ExclusionStore;
pub use filter::{qualifies, select_candidates};
pub use lifecycle::{FileLifecycleManager, FileOutcome, LifecycleStep, PassReport, StepFailure};
pub use registry::DirectoryRegistry;
pub use scheduler::{ScheduleState, Scheduler, StartOutcome};
