//! Persisted weights and adaptation history.
//!
//! A restarted process resumes from the last published weights instead of
//! the hand-tuned defaults. Loading re-validates the weight vector, so a
//! corrupted or hand-edited file is refused rather than adopted.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use referral_model::WeightVector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapter::AdaptationEvent;

/// Errors reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Invalid state document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Exportable engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub weights: WeightVector,

    /// Version of the snapshot holding `weights`
    #[serde(default)]
    pub version: u64,

    #[serde(default)]
    pub history: Vec<AdaptationEvent>,

    pub saved_at: DateTime<Utc>,
}

impl EngineState {
    pub fn new(weights: WeightVector, version: u64, history: Vec<AdaptationEvent>) -> Self {
        Self {
            weights,
            version,
            history,
            saved_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a state document.
    pub fn from_json(json: &str) -> Result<Self, StateError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, StateError> {
        let json = std::fs::read_to_string(path).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}
