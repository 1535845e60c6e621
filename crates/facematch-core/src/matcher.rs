//! Nearest-match engine.
//!
//! Compares a probe encoding against every registered record by L2
//! distance and classifies the closest one against a threshold.

use crate::types::{FaceEncoding, MatchResult, Record};
use thiserror::Error;

/// Match threshold used by dlib-style encoders. Lower is stricter.
pub const DEFAULT_THRESHOLD: f32 = 0.6;

/// Distance at which confidence reaches zero.
pub const DEFAULT_DISTANCE_SCALE: f32 = 1.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("probe has {probe} dimensions but record {name:?} has {record}")]
    DimensionMismatch {
        name: String,
        probe: usize,
        record: usize,
    },
    #[error("probe encoding contains non-finite values")]
    NonFiniteProbe,
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),
}

/// Strategy for comparing a probe encoding against the registered faces.
pub trait Matcher: Send + Sync {
    fn compare(
        &self,
        probe: &FaceEncoding,
        gallery: &[Record],
        threshold: f32,
    ) -> Result<MatchResult, MatchError>;
}

/// Euclidean distance matcher with linear confidence mapping.
///
/// Every gallery entry is compared; a record whose dimensionality differs
/// from the probe is an error rather than being skipped. Equal minimum
/// distances resolve to the earliest record in gallery order.
#[derive(Debug, Clone, Copy)]
pub struct EuclideanMatcher {
    distance_scale: f32,
}

impl EuclideanMatcher {
    pub fn new(distance_scale: f32) -> Result<Self, MatchError> {
        if !distance_scale.is_finite() || distance_scale <= 0.0 {
            return Err(MatchError::InvalidCalibration(format!(
                "distance scale must be positive and finite, got {distance_scale}"
            )));
        }
        Ok(Self { distance_scale })
    }

    pub fn distance_scale(&self) -> f32 {
        self.distance_scale
    }

    /// `max(0, 1 - distance / scale)`, clamped to [0, 1].
    pub fn confidence(&self, distance: f32) -> f32 {
        (1.0 - distance / self.distance_scale).clamp(0.0, 1.0)
    }
}

impl Default for EuclideanMatcher {
    fn default() -> Self {
        Self {
            distance_scale: DEFAULT_DISTANCE_SCALE,
        }
    }
}

impl Matcher for EuclideanMatcher {
    fn compare(
        &self,
        probe: &FaceEncoding,
        gallery: &[Record],
        threshold: f32,
    ) -> Result<MatchResult, MatchError> {
        if gallery.is_empty() {
            return Ok(MatchResult::NoMatch);
        }
        if !probe.is_finite() {
            return Err(MatchError::NonFiniteProbe);
        }

        let mut best: Option<(usize, f32)> = None;

        for (i, record) in gallery.iter().enumerate() {
            if record.encoding.len() != probe.len() {
                return Err(MatchError::DimensionMismatch {
                    name: record.name.clone(),
                    probe: probe.len(),
                    record: record.encoding.len(),
                });
            }

            let distance = probe.euclidean_distance(&record.encoding);
            // Strict comparison keeps the earliest record on ties.
            let is_better = match best {
                None => true,
                Some((_, best_distance)) => distance < best_distance,
            };
            if is_better {
                best = Some((i, distance));
            }
        }

        let result = match best {
            Some((idx, distance)) if distance < threshold => MatchResult::Match {
                name: gallery[idx].name.clone(),
                distance,
                confidence: self.confidence(distance),
            },
            _ => MatchResult::NoMatch,
        };

        tracing::debug!(
            gallery = gallery.len(),
            best_distance = best.map(|(_, d)| d),
            threshold,
            matched = result.is_match(),
            "compared probe against gallery"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, values: Vec<f32>) -> Record {
        Record::new(name, FaceEncoding::new(values))
    }

    /// 128 values cycling through 0.1, 0.2, ..., 0.9.
    fn pattern_128() -> Vec<f32> {
        (0..128).map(|i| (i % 9 + 1) as f32 / 10.0).collect()
    }

    #[test]
    fn test_empty_gallery_is_no_match() {
        let probe = FaceEncoding::new(vec![0.0; 4]);
        let result = EuclideanMatcher::default().compare(&probe, &[], 0.6).unwrap();
        assert_eq!(result, MatchResult::NoMatch);
    }

    #[test]
    fn test_empty_gallery_skips_probe_validation() {
        let probe = FaceEncoding::new(vec![f32::NAN]);
        let result = EuclideanMatcher::default().compare(&probe, &[], 0.6).unwrap();
        assert_eq!(result, MatchResult::NoMatch);
    }

    #[test]
    fn test_identical_probe_matches_with_full_confidence() {
        let values = pattern_128();
        let gallery = vec![record("alice", values.clone())];
        let result = EuclideanMatcher::default()
            .compare(&FaceEncoding::new(values), &gallery, DEFAULT_THRESHOLD)
            .unwrap();
        assert_eq!(
            result,
            MatchResult::Match {
                name: "alice".into(),
                distance: 0.0,
                confidence: 1.0,
            }
        );
    }

    #[test]
    fn test_distance_equal_to_threshold_is_no_match() {
        let gallery = vec![record("alice", vec![0.0; 128])];
        let mut probe = vec![0.0; 128];
        probe[0] = 0.5;
        let result = EuclideanMatcher::default()
            .compare(&FaceEncoding::new(probe), &gallery, 0.5)
            .unwrap();
        assert_eq!(result, MatchResult::NoMatch);
    }

    #[test]
    fn test_distance_just_below_threshold_matches() {
        let gallery = vec![record("alice", vec![0.0; 128])];
        let mut probe = vec![0.0; 128];
        probe[0] = 0.5;
        let result = EuclideanMatcher::default()
            .compare(&FaceEncoding::new(probe), &gallery, 0.5001)
            .unwrap();
        assert_eq!(result.name(), Some("alice"));
    }

    #[test]
    fn test_far_probe_is_no_match() {
        let values = pattern_128();
        let gallery = vec![record("alice", values.clone())];
        let mut probe = values;
        probe[10] += 0.9;
        let result = EuclideanMatcher::default()
            .compare(&FaceEncoding::new(probe), &gallery, 0.6)
            .unwrap();
        assert_eq!(result, MatchResult::NoMatch);
    }

    #[test]
    fn test_closest_record_wins() {
        let gallery = vec![
            record("far", vec![1.0, 0.0, 0.0]),
            record("near", vec![0.1, 0.0, 0.0]),
            record("mid", vec![0.3, 0.0, 0.0]),
        ];
        let probe = FaceEncoding::new(vec![0.0, 0.0, 0.0]);
        let result = EuclideanMatcher::default().compare(&probe, &gallery, 0.6).unwrap();
        match result {
            MatchResult::Match {
                name,
                distance,
                confidence,
            } => {
                assert_eq!(name, "near");
                assert!((distance - 0.1).abs() < 1e-6);
                assert!((confidence - 0.9).abs() < 1e-6);
            }
            MatchResult::NoMatch => panic!("expected a match"),
        }
    }

    #[test]
    fn test_tie_resolves_to_earliest_record() {
        let gallery = vec![
            record("decoy", vec![0.0, 1.0]),
            record("first", vec![0.2, 0.0]),
            record("second", vec![-0.2, 0.0]),
        ];
        let probe = FaceEncoding::new(vec![0.0, 0.0]);
        let matcher = EuclideanMatcher::default();
        for _ in 0..5 {
            let result = matcher.compare(&probe, &gallery, 0.6).unwrap();
            assert_eq!(result.name(), Some("first"));
        }
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let gallery = vec![
            record("ok", vec![0.0, 0.0, 0.0]),
            record("corrupt", vec![0.0, 0.0]),
        ];
        let probe = FaceEncoding::new(vec![0.0, 0.0, 0.0]);
        let err = EuclideanMatcher::default()
            .compare(&probe, &gallery, 0.6)
            .unwrap_err();
        assert_eq!(
            err,
            MatchError::DimensionMismatch {
                name: "corrupt".into(),
                probe: 3,
                record: 2,
            }
        );
    }

    #[test]
    fn test_non_finite_probe_is_error() {
        let gallery = vec![record("alice", vec![0.0, 0.0])];
        let probe = FaceEncoding::new(vec![f32::NAN, 0.0]);
        assert_eq!(
            EuclideanMatcher::default().compare(&probe, &gallery, 0.6),
            Err(MatchError::NonFiniteProbe)
        );
    }

    #[test]
    fn test_confidence_clamped_at_zero() {
        // Loose threshold beyond the distance scale.
        let gallery = vec![record("alice", vec![0.0, 0.0])];
        let probe = FaceEncoding::new(vec![1.5, 0.0]);
        let result = EuclideanMatcher::default().compare(&probe, &gallery, 2.0).unwrap();
        match result {
            MatchResult::Match { confidence, .. } => assert_eq!(confidence, 0.0),
            MatchResult::NoMatch => panic!("expected a match"),
        }
    }

    #[test]
    fn test_confidence_respects_distance_scale() {
        let matcher = EuclideanMatcher::new(0.5).unwrap();
        assert!((matcher.confidence(0.25) - 0.5).abs() < 1e-6);
        assert_eq!(matcher.confidence(0.0), 1.0);
        assert_eq!(matcher.confidence(0.75), 0.0);
    }

    #[test]
    fn test_invalid_distance_scale_rejected() {
        assert!(EuclideanMatcher::new(0.0).is_err());
        assert!(EuclideanMatcher::new(-1.0).is_err());
        assert!(EuclideanMatcher::new(f32::NAN).is_err());
    }
}
