//! Aggregates strict-success metrics and reason-level failure statistics.

use super::EvaluationCaseResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated evaluation metrics.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EvaluationSummary {
    pub total_cases: usize,
    pub successful_cases: usize,
    pub strict_success_rate: f64,
    /// Keyed by failure label; ordered for stable artifacts.
    pub failure_counts_by_reason: BTreeMap<String, usize>,
}

pub fn summarize_evaluation_results(
    evaluation_case_results: &[EvaluationCaseResult],
) -> EvaluationSummary {
    let total_cases = evaluation_case_results.len();
    let successful_cases = evaluation_case_results
        .iter()
        .filter(|result| result.is_success)
        .count();
    let strict_success_rate = if total_cases > 0 {
        successful_cases as f64 / total_cases as f64
    } else {
        0.0
    };

    let mut failure_counts_by_reason: BTreeMap<String, usize> = BTreeMap::new();
    for result in evaluation_case_results {
        if result.is_success {
            continue;
        }
        let failure_reason = result
            .failure_reason
            .clone()
            .unwrap_or_else(|| "unknown_failure".to_string());
        *failure_counts_by_reason.entry(failure_reason).or_insert(0) += 1;
    }

    EvaluationSummary {
        total_cases,
        successful_cases,
        strict_success_rate,
        failure_counts_by_reason,
    }
}
