//! # metarev testkit
//!
//! Test utilities for metarev.
//!
//! This crate provides:
//! - Fixtures that open engines in memory or over a temporary journal file
//! - Property-based generators for values and metadata maps
//! - A fault-injecting storage backend for store-failure paths
//!
//! ## Usage
//!
//! ```rust
//! use metarev_testkit::prelude::*;
//!
//! let t = TestVersioning::memory(sample_config());
//! let post = metarev_core::EntityId::new();
//! t.set_meta(post, "caption", vec![metarev_codec::Value::text("hi")]).unwrap();
//! let t = t.reopen();
//! assert_eq!(t.get_meta(post, "caption").len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
