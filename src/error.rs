//! Error handling for package operations
//!
//! This module re-exports the error types used throughout the crate. The
//! definitions live in [`crate::common`] next to the format constants; this
//! module keeps them reachable under the conventional path.

pub use crate::common::PackageError;
pub use crate::common::Result;
