//! Held-out evaluation: accuracy and a per-class precision/recall/f1 table.

use std::fmt;

use serde::Serialize;

/// Metrics for a single class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class metrics plus accuracy and the usual averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    /// `None` when there were no held-out rows.
    pub accuracy: Option<f64>,
    pub macro_f1: f64,
    pub weighted_f1: f64,
    pub support: usize,
}

/// Fraction of matching predictions; `None` for empty input.
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> Option<f64> {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return None;
    }
    let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Some(hits as f64 / y_true.len() as f64)
}

/// Build the report. `labels[i]` names class `i`; undefined ratios are `0.0`.
pub fn classification_report(y_true: &[usize], y_pred: &[usize], labels: &[String]) -> ClassificationReport {
    let k = labels.len();
    let mut tp = vec![0usize; k];
    let mut predicted = vec![0usize; k];
    let mut actual = vec![0usize; k];

    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t < k {
            actual[t] += 1;
        }
        if p < k {
            predicted[p] += 1;
        }
        if t == p && t < k {
            tp[t] += 1;
        }
    }

    let classes: Vec<ClassMetrics> = labels
        .iter()
        .enumerate()
        .map(|(c, label)| {
            let precision = ratio(tp[c], predicted[c]);
            let recall = ratio(tp[c], actual[c]);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                label: label.clone(),
                precision,
                recall,
                f1,
                support: actual[c],
            }
        })
        .collect();

    let support: usize = actual.iter().sum();
    let macro_f1 = if k == 0 {
        0.0
    } else {
        classes.iter().map(|m| m.f1).sum::<f64>() / k as f64
    };
    let weighted_f1 = if support == 0 {
        0.0
    } else {
        classes.iter().map(|m| m.f1 * m.support as f64).sum::<f64>() / support as f64
    };

    ClassificationReport {
        classes,
        accuracy: accuracy(y_true, y_pred),
        macro_f1,
        weighted_f1,
        support,
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|m| m.label.chars().count())
            .max()
            .unwrap_or(0)
            .max("weighted avg".len());

        writeln!(f, "{:>width$} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for m in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.label, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        match self.accuracy {
            Some(acc) => writeln!(f, "{:>width$} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", acc, self.support)?,
            None => writeln!(f, "{:>width$} {:>9} {:>9} {:>9} {:>9}", "accuracy", "", "", "n/a", self.support)?,
        }
        writeln!(f, "{:>width$} {:>9} {:>9} {:>9.2} {:>9}", "macro avg", "", "", self.macro_f1, self.support)?;
        write!(f, "{:>width$} {:>9} {:>9} {:>9.2} {:>9}", "weighted avg", "", "", self.weighted_f1, self.support)
    }
}
