//! Core business logic for Tierflow.
//!
//! # Modules
//!
//! - [`extract`] - Streaming CSV extraction with predicate, projection and limit
//! - [`transform`] - Column rename between the raw and processed tiers
//! - [`pipeline`] - Stage state machine, events and run summary
//! - [`verification`] - Post-hop checks and checksums
//!
//! # Example
//!
//! ```rust,no_run
//! use tierflow::adapters::create_stores;
//! use tierflow::config::load_config;
//! use tierflow::core::pipeline::{Pipeline, TracingSink};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("tierflow.toml")?;
//! let stores = create_stores(&config).await?;
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let pipeline = Pipeline::new(&config, stores, Arc::new(TracingSink)).with_shutdown(shutdown_rx);
//!
//! let summary = pipeline.run().await?;
//! println!("{}", summary.format_summary());
//! # Ok(())
//! # }
//! ```

pub mod extract;
pub mod pipeline;
pub mod transform;
pub mod verification;
