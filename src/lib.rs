//! margin: cached, model-written commentary for source files.
//!
//! Source files are annotated at one of five abstraction levels. Commentary is
//! cached per (file, level) in a workspace-local JSON document and reused until
//! the file's content fingerprint changes.

pub mod annotate;
pub mod cli;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod generation;
pub mod language;
pub mod level;
pub mod logging;
pub mod provider;
pub mod reconcile;
pub mod render;
pub mod store;
pub mod watch;
pub mod workspace;
