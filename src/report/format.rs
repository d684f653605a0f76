//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized

use crate::data::WeightMap;
use crate::domain::{CompatibilityRow, Population, SpecializationSummary};
use crate::fit::TrainingRun;
use crate::io::ingest::IngestStats;
use crate::predict::{ScoreStatus, SpecializationDiagnostic};
use crate::registry::ModelRegistry;

const NAME_WIDTH: usize = 28;

/// Dataset overview printed before generation/training.
pub fn format_dataset_summary(stats: &IngestStats, map: &WeightMap, population: &Population) -> String {
    let mut out = String::new();

    out.push_str("=== compat - Career Compatibility ===\n");
    out.push_str(&format!(
        "Tables: {} file(s) | rows read={} kept={} dropped={}\n",
        stats.files_read, stats.rows_read, stats.rows_kept, stats.rows_dropped
    ));
    out.push_str(&format!(
        "Specializations: {} | jobs: {} | traits: {}\n",
        map.specializations.len(),
        map.job_count(),
        map.all_traits.len()
    ));
    out.push_str(&format!("Population: {} applicant(s)\n", population.applicants.len()));

    out
}

/// Per-specialization training results.
pub fn format_training_summary(run: &TrainingRun) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Trained {} specialization(s) with {} (seed {}):\n",
        run.trained.len(),
        run.classifier_kind.display_name(),
        run.seed
    ));
    push_line(
        &mut out,
        format!("{:<NAME_WIDTH$} {:>8} {:>5} {:>9}", "specialization", "samples", "jobs", "accuracy"),
    );
    push_line(&mut out, format!("{:-<NAME_WIDTH$} {:-<8} {:-<5} {:-<9}", "", "", "", ""));
    for t in &run.trained {
        push_line(
            &mut out,
            format!(
                "{:<NAME_WIDTH$} {:>8} {:>5} {:>9}",
                truncate(&t.specialization, NAME_WIDTH),
                t.n_samples,
                t.n_classes,
                fmt_accuracy(t.test_accuracy)
            ),
        );
    }
    for s in &run.skipped {
        out.push_str(&format!("  (skipped {}) {}\n", s.specialization, s.reason));
    }

    out
}

/// The top `n` ranked rows.
pub fn format_top_matches(rows: &[CompatibilityRow], n: usize) -> String {
    let mut out = String::new();

    out.push_str(&format!("Top {} career match(es):\n", n.min(rows.len())));
    push_line(
        &mut out,
        format!("{:>4} {:<NAME_WIDTH$} {:<NAME_WIDTH$} {:>9}", "#", "specialization", "job", "percent"),
    );
    push_line(
        &mut out,
        format!("{:-<4} {:-<NAME_WIDTH$} {:-<NAME_WIDTH$} {:-<9}", "", "", "", ""),
    );
    for (i, r) in rows.iter().take(n).enumerate() {
        push_line(
            &mut out,
            format!(
                "{:>4} {:<NAME_WIDTH$} {:<NAME_WIDTH$} {:>9.3}",
                i + 1,
                truncate(&r.specialization, NAME_WIDTH),
                truncate(&r.job, NAME_WIDTH),
                r.compatibility_percent
            ),
        );
    }

    out
}

/// Mean compatibility per specialization.
pub fn format_specialization_summary(summary: &[SpecializationSummary]) -> String {
    let mut out = String::new();

    out.push_str("Specialization summary (mean %):\n");
    for s in summary {
        push_line(
            &mut out,
            format!(
                "{:<NAME_WIDTH$} {:>9.3}",
                truncate(&s.specialization, NAME_WIDTH),
                s.mean_compatibility_percent
            ),
        );
    }

    out
}

/// Only specializations that did not score cleanly; empty when all were fine.
pub fn format_diagnostics(diagnostics: &[SpecializationDiagnostic]) -> String {
    let mut out = String::new();
    for d in diagnostics {
        if let ScoreStatus::Degraded(reason) = &d.status {
            out.push_str(&format!(
                "  (degraded {}) {reason} [probabilities: {}]\n",
                d.specialization, d.probability_source
            ));
        }
    }
    out
}

/// Loaded models, for `compat models`.
pub fn format_registry(registry: &ModelRegistry) -> String {
    let mut out = String::new();

    out.push_str(&format!("{} specialization model(s):\n", registry.len()));
    push_line(
        &mut out,
        format!(
            "{:<NAME_WIDTH$} {:>8} {:>5} {:<16} {:>9} {:<20}",
            "specialization", "features", "jobs", "classifier", "accuracy", "trained"
        ),
    );
    push_line(
        &mut out,
        format!("{:-<NAME_WIDTH$} {:-<8} {:-<5} {:-<16} {:-<9} {:-<20}", "", "", "", "", "", ""),
    );
    for (a, manifest) in registry.entries() {
        let (classifier, accuracy, trained) = match manifest {
            Some(m) => (
                m.classifier_kind.display_name().to_string(),
                fmt_accuracy(m.test_accuracy),
                m.trained_at.format("%Y-%m-%d %H:%M").to_string(),
            ),
            None => (a.classifier.kind().display_name().to_string(), "n/a".to_string(), String::new()),
        };
        push_line(
            &mut out,
            format!(
                "{:<NAME_WIDTH$} {:>8} {:>5} {:<16} {:>9} {:<20}",
                truncate(&a.specialization, NAME_WIDTH),
                a.feature_order.len(),
                a.label_encoder.len(),
                classifier,
                accuracy,
                trained
            ),
        );
    }
    for s in registry.skipped() {
        out.push_str(&format!("  (skipped {}) {}\n", s.dir.display(), s.reason));
    }

    out
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn fmt_accuracy(accuracy: Option<f64>) -> String {
    accuracy
        .map(|a| format!("{a:.3}"))
        .unwrap_or_else(|| "n/a".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
