//! ragdb-ground
//!
//! Estimates whether a generated answer is supported by the citations it was
//! generated from. [`GroundingVerifier::evaluate`] is a pure function of its
//! inputs and never fails: analysis errors produce a fallback report.
use thiserror::Error;
use tracing::{debug, warn};

use ragdb_core::config::GroundingSettings;
use ragdb_core::types::Citation;

pub mod metrics;
pub mod phrases;
pub mod report;
pub mod similarity;

pub use report::{Confidence, GroundingMetrics, GroundingReport, Thresholds};

use crate::report::round3;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("citation {index} has a non-finite score")]
    NonFiniteScore { index: usize },

    #[error("composite score is not finite")]
    NonFiniteComposite,
}

pub struct GroundingVerifier {
    thresholds: Thresholds,
    generation_failed: Vec<String>,
    no_information: Vec<String>,
}

impl Default for GroundingVerifier {
    fn default() -> Self {
        Self::new(&GroundingSettings::default())
    }
}

impl GroundingVerifier {
    pub fn new(settings: &GroundingSettings) -> Self {
        let lowered = |phrases: &[String]| -> Vec<String> {
            phrases.iter().map(|p| p.trim().to_lowercase()).filter(|p| !p.is_empty()).collect()
        };
        Self {
            thresholds: Thresholds::default(),
            generation_failed: lowered(&settings.generation_failed_phrases),
            no_information: lowered(&settings.no_information_phrases),
        }
    }

    pub fn thresholds(&self) -> Thresholds { self.thresholds }

    pub fn evaluate(&self, query: &str, answer: &str, citations: &[Citation]) -> GroundingReport {
        let answer_lower = answer.to_lowercase();

        if self.generation_failed.iter().any(|p| answer_lower.contains(p.as_str())) {
            debug!("answer reports a generation failure, skipping analysis");
            return GroundingReport::generation_failed();
        }
        if !citations.is_empty() && self.no_information.iter().any(|p| answer_lower.contains(p.as_str())) {
            debug!(citations = citations.len(), "answer declines for lack of information");
            return GroundingReport::honest_refusal();
        }
        if citations.is_empty() {
            debug!("no citations, answer is unsupported");
            return GroundingReport::unsupported();
        }

        match self.analyze(query, answer, citations) {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "grounding analysis failed, using fallback report");
                GroundingReport::fallback(&e)
            }
        }
    }

    fn analyze(&self, query: &str, answer: &str, citations: &[Citation]) -> Result<GroundingReport, VerificationError> {
        if let Some(index) = citations.iter().position(|c| !c.score.is_finite()) {
            return Err(VerificationError::NonFiniteScore { index });
        }

        let metrics = GroundingMetrics::new(
            metrics::citation_coverage(answer, citations),
            metrics::query_relevance(query, answer),
            metrics::citation_quality(citations),
        );
        let score = 1.0 - (metrics.citation_coverage * 0.5 + metrics.query_relevance * 0.3 + metrics.citation_quality * 0.2);
        if !score.is_finite() {
            return Err(VerificationError::NonFiniteComposite);
        }

        let confidence = self.thresholds.confidence(score);
        let is_hallucination = score > self.thresholds.medium;
        let (reason, suggestions) = feedback(score, &metrics);
        debug!(
            coverage = metrics.citation_coverage,
            relevance = metrics.query_relevance,
            quality = metrics.citation_quality,
            score,
            is_hallucination,
            "grounding evaluated"
        );

        Ok(GroundingReport {
            is_hallucination,
            confidence,
            score: round3(score),
            metrics: metrics.rounded(),
            reason,
            suggestions,
        })
    }
}

/// Reasons joined by `"; "` and one suggestion per reason, in a fixed order.
pub fn feedback(score: f64, metrics: &GroundingMetrics) -> (String, Vec<String>) {
    let checks = [
        (
            metrics.citation_coverage < 0.3,
            "Low citation coverage - answer may contain unsupported claims",
            "Ask for more specific information from the dataset",
        ),
        (
            metrics.query_relevance < 0.4,
            "Answer may not directly address the query",
            "Rephrase your question to be more specific",
        ),
        (
            metrics.citation_quality < 0.5,
            "Low-quality citations - consider uploading more relevant data",
            "Upload additional relevant datasets",
        ),
        (score > 0.7, "High likelihood of hallucination detected", "Verify information with original sources"),
    ];

    let (reasons, suggestions): (Vec<&str>, Vec<String>) = checks
        .iter()
        .filter(|(triggered, _, _)| *triggered)
        .map(|(_, reason, suggestion)| (*reason, (*suggestion).to_string()))
        .unzip();

    if reasons.is_empty() {
        return (
            "Response appears to be well-grounded in the provided data".to_string(),
            vec!["Continue with confidence".to_string()],
        );
    }
    (reasons.join("; "), suggestions)
}
