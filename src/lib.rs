// Tierflow - NPPES Multi-Tier Data Pipeline
// Copyright (c) 2025 Tierflow Contributors
// Licensed under the MIT License

//! # Tierflow - NPPES Multi-Tier Data Pipeline
//!
//! Tierflow moves a filtered extract of the NPPES provider dissemination file
//! through five storage tiers and verifies every hop.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Extracting** cardiology providers from a multi-gigabyte CSV file
//! - **Staging** the extract in an S3-compatible store, raw and renamed
//! - **Loading** providers into PostgreSQL with NPI-keyed upserts
//! - **Archiving** the table to a cloud bucket and copying it back to staging
//! - **Verifying** object sizes, row counts and round-trip checksums
//!
//! ## Architecture
//!
//! Tierflow follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (extract, transform, pipeline, verification)
//! - [`adapters`] - Store integrations (S3-compatible object stores, PostgreSQL)
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//! - [`audit`] - Credential hygiene checks for a project directory
//! - [`handlers`] - Stateless request handlers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tierflow::adapters::create_stores;
//! use tierflow::config::load_config;
//! use tierflow::core::pipeline::{Pipeline, TracingSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("tierflow.toml")?;
//!     let stores = create_stores(&config).await?;
//!
//!     let summary = Pipeline::new(&config, stores, Arc::new(TracingSink))
//!         .run()
//!         .await?;
//!
//!     println!("Loaded {} providers", summary.rows_inserted);
//!     Ok(())
//! }
//! ```
//!
//! ## Dry Runs
//!
//! Every stage runs against in-memory stores when the live services are
//! not available:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tierflow::adapters::create_in_memory_stores;
//! use tierflow::config::load_config;
//! use tierflow::core::pipeline::{CollectingSink, Pipeline};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("tierflow.toml")?;
//! let sink = Arc::new(CollectingSink::new());
//! let pipeline = Pipeline::new(&config, create_in_memory_stores(&config), sink.clone());
//!
//! pipeline.run().await?;
//! println!("{} stages completed", sink.completed_stages().len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Tierflow uses the [`domain::TierflowError`] type for all errors. Each
//! variant maps to a process exit code through
//! [`domain::TierflowError::exit_code`].
//!
//! ## Logging
//!
//! Tierflow uses structured logging with the `tracing` crate. Stage events
//! carry the run id so one run can be followed across the log.

pub mod adapters;
pub mod audit;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod handlers;
pub mod logging;
