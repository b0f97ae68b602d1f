//! Data verification for post-hop validation
//!
//! This module provides the checks run after each write: object existence
//! and size, relational row counts and the round-trip checksum comparison.

pub mod checksum;
pub mod report;
pub mod verify;

pub use report::{CheckKind, VerificationFailure, VerificationReport};
pub use verify::{ObjectLocation, Verifier};
