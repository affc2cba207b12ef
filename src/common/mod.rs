//! Common types and error definitions for swerve_nav
//!
//! This module provides the foundational building blocks used across
//! the navigation and trajectory pipeline.

pub mod types;
pub mod error;

pub use types::*;
pub use error::*;
