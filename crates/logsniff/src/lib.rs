// Domain-driven module structure for logsniff.

// Core classification
pub mod parser;
pub mod analyze;

// Process setup
pub mod conf;
pub mod runtime;
