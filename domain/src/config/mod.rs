//! Configuration value objects for the domain layer
//!
//! Loading and merging happen in infrastructure; this module only defines
//! how problems found while validating a configuration are reported.

pub mod validation;

pub use validation::{ConfigIssue, ConfigIssueCode, Severity};
