//! Winner selection and final payload shaping.

use crate::error::{AutoMlError, ModelTrainingError};
use crate::training::orchestrator::RunOutcome;
use crate::training::trainer::TrainingResult;
use serde::{Deserialize, Serialize};

/// Best result, each ranked by the direction of the metric it was scored
/// with. Ties keep the earlier result.
pub fn pick_best(results: &[TrainingResult]) -> Option<&TrainingResult> {
    results.iter().fold(None, |best, candidate| match best {
        Some(b) if candidate.search_score() <= b.search_score() => Some(b),
        _ => Some(candidate),
    })
}

/// SUCCESS payload of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    /// Always `"done"`.
    pub status: String,
    pub best_model: TrainingResult,
    pub all_results: Vec<TrainingResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_models: Vec<ModelTrainingError>,
}

/// Turn a run's results into the final payload.
///
/// Fails with [`AutoMlError::NoSuccessfulModels`] when no model trained.
pub fn shape_outcome(outcome: RunOutcome) -> Result<JobOutcome, AutoMlError> {
    let best = pick_best(&outcome.results).cloned();
    let Some(best_model) = best else {
        return Err(AutoMlError::NoSuccessfulModels {
            failures: outcome.failures,
        });
    };
    Ok(JobOutcome {
        status: "done".into(),
        best_model,
        all_results: outcome.results,
        failed_models: outcome.failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Metric;
    use pretty_assertions::assert_eq;

    fn result(name: &str, metric: Metric, score: f64) -> TrainingResult {
        TrainingResult {
            model_name: name.into(),
            metric,
            best_score: score,
            predictions: vec![],
            params: None,
            classes: None,
        }
    }

    fn mae(name: &str, score: f64) -> TrainingResult {
        result(name, Metric::MeanAbsoluteError, score)
    }

    fn f1(name: &str, score: f64) -> TrainingResult {
        result(name, Metric::F1, score)
    }

    #[test]
    fn test_regression_picks_lowest_error() {
        let results = vec![mae("a", 2.0), mae("b", 0.5), mae("c", 1.0)];
        assert_eq!(pick_best(&results).unwrap().model_name, "b");
    }

    #[test]
    fn test_classification_picks_highest_f1() {
        let results = vec![f1("a", 0.2), f1("b", 0.9), f1("c", 0.5)];
        assert_eq!(pick_best(&results).unwrap().model_name, "b");
    }

    #[test]
    fn test_ties_keep_first() {
        let results = vec![mae("a", 1.0), mae("b", 1.0)];
        assert_eq!(pick_best(&results).unwrap().model_name, "a");
        let results = vec![f1("a", 0.7), f1("b", 0.7)];
        assert_eq!(pick_best(&results).unwrap().model_name, "a");
    }

    #[test]
    fn test_direction_follows_each_results_metric() {
        // The same scores rank in opposite orders under the two metrics.
        let scores = [0.3, 0.8, 0.5];
        let as_f1: Vec<_> = scores.iter().map(|&s| f1(&format!("m{s}"), s)).collect();
        let as_mae: Vec<_> = scores.iter().map(|&s| mae(&format!("m{s}"), s)).collect();
        assert_eq!(pick_best(&as_f1).unwrap().best_score, 0.8);
        assert_eq!(pick_best(&as_mae).unwrap().best_score, 0.3);
    }

    #[test]
    fn test_empty_results_pick_nothing() {
        assert!(pick_best(&[]).is_none());
    }

    #[test]
    fn test_all_failed() {
        let outcome = RunOutcome {
            results: vec![],
            failures: vec![ModelTrainingError::new("Ridge", "boom")],
        };
        match shape_outcome(outcome) {
            Err(AutoMlError::NoSuccessfulModels { failures }) => assert_eq!(failures.len(), 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_payload_omits_empty_failures() {
        let outcome = RunOutcome {
            results: vec![mae("a", 1.0)],
            failures: vec![],
        };
        let payload = shape_outcome(outcome).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["status"], "done");
        assert_eq!(json["best_model"]["metric"], "mean_absolute_error");
        assert!(json.get("failed_models").is_none());
        assert!(json["best_model"].get("params").is_none());
    }
}
