//! Toolkit
//!
//! Credential provider resolution and resource caching for cloud IDE tooling.
//! Everything lives in `toolkit-core`; this crate re-exports it.

pub use toolkit_core::*;
