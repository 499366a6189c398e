use serde::{Deserialize, Serialize};
use std::fmt;

/// Bucket of the composite score against the fixed thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    VeryLow,
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::VeryLow => "very_low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { high: 0.8, medium: 0.6, low: 0.4 }
    }
}

impl Thresholds {
    pub fn confidence(&self, score: f64) -> Confidence {
        if score >= self.high {
            Confidence::High
        } else if score >= self.medium {
            Confidence::Medium
        } else if score >= self.low {
            Confidence::Low
        } else {
            Confidence::VeryLow
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingMetrics {
    pub citation_coverage: f64,
    pub query_relevance: f64,
    pub citation_quality: f64,
}

impl GroundingMetrics {
    pub fn new(citation_coverage: f64, query_relevance: f64, citation_quality: f64) -> Self {
        Self { citation_coverage, query_relevance, citation_quality }
    }

    pub(crate) fn rounded(self) -> Self {
        Self::new(round3(self.citation_coverage), round3(self.query_relevance), round3(self.citation_quality))
    }
}

/// Verdict on whether an answer is supported by its citations.
///
/// `score` is the ungroundedness in `[0, 1]`; higher means more likely
/// hallucinated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingReport {
    pub is_hallucination: bool,
    pub confidence: Confidence,
    pub score: f64,
    pub metrics: GroundingMetrics,
    pub reason: String,
    pub suggestions: Vec<String>,
}

impl GroundingReport {
    pub(crate) fn new(
        is_hallucination: bool,
        confidence: Confidence,
        score: f64,
        metrics: GroundingMetrics,
        reason: impl Into<String>,
        suggestions: &[&str],
    ) -> Self {
        Self {
            is_hallucination,
            confidence,
            score,
            metrics,
            reason: reason.into(),
            suggestions: suggestions.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    pub fn generation_failed() -> Self {
        Self::new(
            false,
            Confidence::Low,
            0.0,
            GroundingMetrics::default(),
            "Response generation failed - no hallucination analysis possible",
            &["Try again with a different query", "Check API configuration"],
        )
    }

    pub fn honest_refusal() -> Self {
        Self::new(
            false,
            Confidence::High,
            0.0,
            GroundingMetrics::new(0.0, 0.5, 0.5),
            "Legitimate response indicating requested information not found in available data",
            &["Try a different query", "Check if the requested data exists in the dataset"],
        )
    }

    pub fn unsupported() -> Self {
        Self::new(
            true,
            Confidence::High,
            1.0,
            GroundingMetrics::default(),
            "No citations provided - answer not grounded in data",
            &["Upload more relevant data", "Try a different query"],
        )
    }

    /// Safe default when the analysis itself failed.
    pub fn fallback(error: &dyn std::error::Error) -> Self {
        Self::new(
            false,
            Confidence::Low,
            0.5,
            GroundingMetrics::default(),
            format!("Error in hallucination detection: {error} - using fallback"),
            &["Try the query again"],
        )
    }
}

pub(crate) fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
