//! Online weight adaptation from outcome feedback.
//!
//! - `FeedbackBuffer`: bounded ring of validated feedback records
//! - `WeightAdapter`: correlation analysis and bounded weight updates
//! - `WeightStore`: copy-on-write publication of weight snapshots
//! - `EngineState`: persisted weights and adaptation history

pub mod adapter;
pub mod buffer;
pub mod history;
pub mod state;
pub mod stats;
pub mod store;

pub use adapter::{
    normalize_bounded, AdaptationConfig, AdaptationEvent, AdaptationOutcome, AdaptationStrength,
    AdjustmentPlan, ComponentPerformance, ConfigError, WeightAdapter, MIN_COMPONENT_SAMPLES,
    NEUTRAL_PERFORMANCE,
};
pub use buffer::{BufferConfig, DedupPolicy, FeedbackBuffer, IngestReceipt, IngestStatus, DEFAULT_CAPACITY};
pub use history::{AdaptationHistory, DEFAULT_HISTORY_LIMIT};
pub use state::{EngineState, StateError};
pub use store::{WeightSnapshot, WeightStore};
