//! Core library for Intelligent To-Do
//!
//! This crate contains the pieces shared by the client and the
//! categorization service:
//! - Task model and the fixed category set
//! - Task repository seam and a file-backed store
//! - Keyword categorization rules

pub mod categorize;
pub mod error;
pub mod task;

pub use categorize::KeywordRules;
pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
