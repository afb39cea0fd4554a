use airtrend_core::{AirtrendError, AirtrendResult};

use crate::model::Prediction;

/// Binary classification statistics recorded per ledger row.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreStats {
    pub n_samples: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Undefined when the labels hold a single class
    pub auc: Option<f64>,
}

impl ScoreStats {
    pub fn compute(labels: &[u8], prediction: &Prediction) -> AirtrendResult<Self> {
        if labels.len() != prediction.classes.len() || labels.len() != prediction.scores.len() {
            return Err(AirtrendError::SchemaMismatch(format!(
                "{} labels but {} predictions",
                labels.len(),
                prediction.classes.len()
            )));
        }
        let (mut tp, mut fp, mut tn, mut fn_) = (0usize, 0usize, 0usize, 0usize);
        for (&y, &p) in labels.iter().zip(&prediction.classes) {
            match (y == 1, p == 1) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (false, false) => tn += 1,
                (true, false) => fn_ += 1,
            }
        }
        let n = labels.len();
        let accuracy = ratio(tp + tn, n);
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Ok(Self {
            n_samples: n,
            accuracy,
            precision,
            recall,
            f1,
            auc: roc_auc(labels, &prediction.scores),
        })
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Rank-based ROC AUC (Mann-Whitney U), ties share their average rank.
fn roc_auc(labels: &[u8], scores: &[f64]) -> Option<f64> {
    let positives = labels.iter().filter(|&&y| y == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if labels[idx] == 1 {
                rank_sum += avg_rank;
            }
        }
        i = j + 1;
    }
    let p = positives as f64;
    Some((rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}
