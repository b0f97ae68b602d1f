//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod audit;
pub mod init;
pub mod invoke;
pub mod run;
pub mod status;
pub mod validate;
