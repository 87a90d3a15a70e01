//! Adaptive candidate-to-employee referral matching.
//!
//! `MatchEngine` ranks an employee pool for a candidate against the current
//! weight snapshot, buffers outcome feedback, and adapts the weights from it.
//!
//! ```no_run
//! use chrono::Utc;
//! use referral_engine::{EngineConfig, MatchEngine, MatchRequest};
//! use referral_model::{CandidateProfile, EmployeeProfile};
//!
//! let engine = MatchEngine::new(EngineConfig::default())?;
//! let candidate = CandidateProfile::new("c1").with_skills(["Rust", "Go"]);
//! let employees = vec![EmployeeProfile::new("e1").with_skills(["rust"])];
//!
//! let outcome = engine.match_candidate(&MatchRequest::new(&candidate, &employees, Utc::now()));
//! for m in outcome.result.matches() {
//!     println!("{} {:.1}", m.employee_id, m.overall_score);
//! }
//! # Ok::<(), referral_engine::EngineError>(())
//! ```

pub mod config;
pub mod engine;

pub use config::{ConfigLoadError, EngineConfig};
pub use engine::{
    EngineError, EngineStats, FeedbackAck, FeedbackRejected, MatchEngine, MatchOutcome, MatchRequest,
};
