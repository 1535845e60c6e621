use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dimensionality produced by dlib-style face encoders.
pub const DEFAULT_ENCODING_DIM: usize = 128;

/// Face encoding vector produced by an external encoder (typically 128-dimensional).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceEncoding {
    values: Vec<f32>,
}

impl FaceEncoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.values
    }

    /// True if every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// Compute Euclidean (L2) distance between two encodings.
    ///
    /// Callers must check that both encodings have the same length; extra
    /// components on either side are ignored.
    pub fn euclidean_distance(&self, other: &FaceEncoding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

impl From<Vec<f32>> for FaceEncoding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

/// A registered face: the name is the primary key within a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub encoding: FaceEncoding,
    pub registered_at: DateTime<Utc>,
}

impl Record {
    pub fn new(name: impl Into<String>, encoding: FaceEncoding) -> Self {
        Self {
            name: name.into(),
            encoding,
            registered_at: Utc::now(),
        }
    }
}

/// Outcome of matching a probe encoding against the registered faces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchResult {
    /// No record lies strictly within the threshold.
    NoMatch,
    Match {
        name: String,
        /// L2 distance between the probe and the matched record.
        distance: f32,
        /// Distance mapped into [0, 1]. Higher = more similar.
        confidence: f32,
    },
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Match { .. })
    }

    /// Name of the matched record (if any).
    pub fn name(&self) -> Option<&str> {
        match self {
            MatchResult::Match { name, .. } => Some(name),
            MatchResult::NoMatch => None,
        }
    }
}
