//! esm-inventory crate
//!
//! This crate is an implementation detail of the `esm-inventory` tool. This crate's API is fluid and may change without warning
//! and in a semver-incompatible way.

/// Result type alias using `ohno::AppError` as the default error type.
pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[doc(hidden)]
pub mod cache_doc;

#[doc(hidden)]
pub mod candidate;

#[doc(hidden)]
pub mod config;

#[doc(hidden)]
pub mod merge;

#[doc(hidden)]
pub mod net;

#[doc(hidden)]
pub mod progress;

#[doc(hidden)]
pub mod repo_spec;

#[doc(hidden)]
pub mod sources;

#[doc(hidden)]
pub mod stats;

#[doc(hidden)]
pub mod tables;

#[doc(hidden)]
pub mod users;
