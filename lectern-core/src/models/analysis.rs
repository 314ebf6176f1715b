use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Scalar affect scores for one attendee, written by the external analyzer
/// and overwritten each sampling interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSample {
    /// Keyed by attendee id
    pub id: UserId,
    pub neutral: f64,
    pub happy: f64,
    pub sad: f64,
    pub angry: f64,
    pub fearful: f64,
    pub disgusted: f64,
    pub surprised: f64,
    #[serde(default)]
    pub drowsiness: f64,
}

impl AnalysisSample {
    /// A sample with full neutral weight, the analyzer's starting point
    pub fn neutral(id: UserId) -> Self {
        Self {
            id,
            neutral: 1.0,
            happy: 0.0,
            sad: 0.0,
            angry: 0.0,
            fearful: 0.0,
            disgusted: 0.0,
            surprised: 0.0,
            drowsiness: 0.0,
        }
    }
}

/// Room-wide affect averages over the samples present at one instant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionSummary {
    pub neutral: f64,
    pub happy: f64,
    pub sad: f64,
    pub angry: f64,
    pub fearful: f64,
    pub disgusted: f64,
    pub surprised: f64,
    /// Per-attendee drowsiness scores, not averaged
    pub drowsiness: Vec<f64>,
}

impl EmotionSummary {
    /// Average the given samples; `None` when there are none.
    pub fn from_samples(samples: &[AnalysisSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let avg = |f: fn(&AnalysisSample) -> f64| samples.iter().map(f).sum::<f64>() / n;
        Some(Self {
            neutral: avg(|s| s.neutral),
            happy: avg(|s| s.happy),
            sad: avg(|s| s.sad),
            angry: avg(|s| s.angry),
            fearful: avg(|s| s.fearful),
            disgusted: avg(|s| s.disgusted),
            surprised: avg(|s| s.surprised),
            drowsiness: samples.iter().map(|s| s.drowsiness).collect(),
        })
    }
}

/// Periodic aggregate appended to the room's analysis log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisLogEntry {
    pub id: String,
    #[serde(flatten)]
    pub summary: EmotionSummary,
    /// Number of attendees the summary averaged over
    pub count: usize,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisLogEntry {
    pub fn new(summary: EmotionSummary, count: usize) -> Self {
        Self {
            id: super::id::generate_id(),
            summary,
            count,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_of_no_samples() {
        assert!(EmotionSummary::from_samples(&[]).is_none());
    }

    #[test]
    fn test_summary_averages() {
        let mut a = AnalysisSample::neutral(UserId::from("u1"));
        a.happy = 0.4;
        let mut b = AnalysisSample::neutral(UserId::from("u2"));
        b.happy = 0.8;
        b.neutral = 0.0;
        b.drowsiness = 0.5;

        let summary = EmotionSummary::from_samples(&[a, b]).unwrap();
        assert!((summary.happy - 0.6).abs() < f64::EPSILON);
        assert!((summary.neutral - 0.5).abs() < f64::EPSILON);
        assert_eq!(summary.drowsiness, vec![0.0, 0.5]);
    }
}
