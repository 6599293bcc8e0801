//! # Offliner Testkit
//!
//! Test utilities for Offliner.
//!
//! This crate provides:
//! - `Entity`, a reference domain model implementing every capability trait
//! - JSON graph snapshots for comparing graphs before and after a run
//! - `RecordingVisitor`, a scriptable visitor that logs every call
//! - Property-based graph generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use offliner_testkit::prelude::*;
//!
//! let order = Entity::remote("order", 1, 5);
//! let line = Entity::remote("line", 2, 1);
//! order.push_child("lines", &line);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod recording;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::recording::*;
}

pub use fixtures::*;
pub use generators::*;
pub use recording::*;
