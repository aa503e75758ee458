//! Runtime module — process boot: logging and detector setup.

pub mod boot;

pub use boot::{build_detector, init_logging, BootError, LoggingGuard};
