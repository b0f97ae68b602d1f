//! Multi-tier pipeline orchestration
//!
//! A run walks the [`Stage`] state machine:
//!
//! ```text
//! Extract -> StageA_write -> StageB_read -> Transform -> StageB_write ->
//! StageC_read -> StageC_upsert -> StageD_read -> StageD_write ->
//! StageE_read -> StageE_write -> Done
//! ```
//!
//! Concurrent runs against the same buckets or table are not supported.

pub mod events;
pub mod runner;
pub mod stage;
pub mod summary;

pub use events::{CollectingSink, EventSink, StageEvent, StageStatus, TracingSink};
pub use runner::Pipeline;
pub use stage::Stage;
pub use summary::RunSummary;
