//! Logging utilities.
//!
//! Centralizes logger initialization. The crate logs through the standard
//! `log` facade; this module only wires up the `env_logger` backend.

mod init;

pub use init::{LoggingConfig, init_logging};
