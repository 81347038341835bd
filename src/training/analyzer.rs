//! Accuracy analysis of accumulated predictions

/// Analyzes parallel prediction/label sequences from a strategy run
pub struct ResultsAnalyzer {
    preds: Vec<f32>,
    labels: Vec<f32>,
    preds_bin: Vec<f32>,
}

impl ResultsAnalyzer {
    pub fn new(preds: Vec<f32>, labels: Vec<f32>) -> Self {
        let preds_bin = preds.iter().map(|p| p.round()).collect();
        ResultsAnalyzer {
            preds,
            labels,
            preds_bin,
        }
    }

    pub fn len(&self) -> usize {
        self.preds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preds.is_empty()
    }

    /// Accuracy over the predictions confident enough to count.
    ///
    /// A prediction is kept when |score| > threshold or
    /// |score| < 1 - threshold; kept scores are rounded to {0, 1} and
    /// compared to the labels. Returns 0 when nothing clears the bar.
    ///
    /// Confidence is measured as raw magnitude from zero, not distance
    /// from the 0.5 decision boundary, so the filter only behaves as
    /// intended for thresholds in [0.5, 1].
    pub fn get_accuracy(&self, threshold: f32) -> f64 {
        let mut correct = 0usize;
        let mut kept = 0usize;
        for ((pred, bin), label) in self
            .preds
            .iter()
            .zip(self.preds_bin.iter())
            .zip(self.labels.iter())
        {
            let magnitude = pred.abs();
            if magnitude > threshold || magnitude < 1.0 - threshold {
                kept += 1;
                if bin == label {
                    correct += 1;
                }
            }
        }
        if kept == 0 {
            return 0.0;
        }
        correct as f64 / kept as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_at_half_counts_everything() {
        let analyzer = ResultsAnalyzer::new(vec![0.9, 0.55, 0.3, 0.1], vec![1.0, 1.0, 0.0, 1.0]);
        // 0.1 rounds to 0 against a true 1: three of four correct
        assert!((analyzer.get_accuracy(0.5) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_higher_threshold_keeps_only_confident_scores() {
        let analyzer = ResultsAnalyzer::new(vec![0.9, 0.55, 0.3, 0.1], vec![1.0, 1.0, 0.0, 1.0]);
        // At 0.8 only 0.9 (> 0.8) and 0.1 (< 0.2) survive; 0.1 is wrong
        assert!((analyzer.get_accuracy(0.8) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_confident_predictions_returns_zero() {
        let analyzer = ResultsAnalyzer::new(vec![0.5, 0.5], vec![1.0, 0.0]);
        assert_eq!(analyzer.get_accuracy(0.9), 0.0);
    }

    #[test]
    fn test_empty_input_returns_zero() {
        let analyzer = ResultsAnalyzer::new(Vec::new(), Vec::new());
        assert_eq!(analyzer.get_accuracy(0.5), 0.0);
    }

    #[test]
    fn test_boundary_scores_are_not_kept() {
        // |0.7| equals the threshold exactly: strict comparison drops it
        let analyzer = ResultsAnalyzer::new(vec![0.7, 0.9], vec![0.0, 1.0]);
        assert!((analyzer.get_accuracy(0.7) - 1.0).abs() < 1e-9);
    }
}
