//! Per-job trait weight profiles.
//!
//! Trait tables say how much each job values a course or trait, on whatever
//! scale the author picked. To make jobs comparable we rescale each job's
//! weights by its own maximum, so the most important trait is always `1.0`.
//!
//! The mapper also fixes the feature space shared by every model: the sorted
//! union of all trait codes in the dataset.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{JobKey, JobTraitProfile, TraitRecord};

/// Output of the weight mapping stage.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMap {
    /// Normalized profiles keyed by `(specialization, job)`.
    pub profiles: BTreeMap<JobKey, JobTraitProfile>,
    /// Sorted distinct specializations.
    pub specializations: Vec<String>,
    /// Sorted distinct trait codes across every job (the global feature union).
    pub all_traits: Vec<String>,
}

impl WeightMap {
    pub fn job_count(&self) -> usize {
        self.profiles.len()
    }
}

/// Coerce a raw weight cell to a usable weight.
///
/// Unparsable, non-finite and negative values become `0.0`.
pub fn coerce_weight(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => v,
        _ => 0.0,
    }
}

/// Group records by job and build normalized trait profiles.
pub fn build_job_trait_map(records: &[TraitRecord]) -> WeightMap {
    let mut grouped: BTreeMap<JobKey, BTreeMap<String, f64>> = BTreeMap::new();
    let mut all_traits = BTreeSet::new();

    for record in records {
        let code = record.code_or_trait.trim();
        if code.is_empty() {
            continue;
        }
        all_traits.insert(code.to_string());

        let key = JobKey::new(record.specialization.trim(), record.job.trim());
        let weight = if record.weight.is_finite() && record.weight >= 0.0 {
            record.weight
        } else {
            0.0
        };

        // Duplicate entries for the same trait collapse to their largest weight.
        let slot = grouped.entry(key).or_default().entry(code.to_string()).or_insert(0.0);
        *slot = slot.max(weight);
    }

    let profiles: BTreeMap<JobKey, JobTraitProfile> = grouped
        .into_iter()
        .map(|(key, mut weights)| {
            normalize_by_max(&mut weights);
            (key.clone(), JobTraitProfile { key, weights })
        })
        .collect();

    let specializations: Vec<String> = profiles
        .keys()
        .map(|k| k.specialization.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    WeightMap {
        profiles,
        specializations,
        all_traits: all_traits.into_iter().collect(),
    }
}

/// Divide every weight by the group maximum. All-zero groups are left untouched.
pub fn normalize_by_max(weights: &mut BTreeMap<String, f64>) {
    let max_w = weights.values().copied().fold(0.0_f64, f64::max);
    if max_w <= 0.0 {
        return;
    }
    for w in weights.values_mut() {
        *w /= max_w;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TraitKind;

    fn record(spec: &str, job: &str, code: &str, weight: f64) -> TraitRecord {
        TraitRecord {
            specialization: spec.to_string(),
            job: job.to_string(),
            kind: TraitKind::Trait,
            code_or_trait: code.to_string(),
            weight,
        }
    }

    #[test]
    fn coerce_weight_rejects_garbage() {
        assert_eq!(coerce_weight("2.5"), 2.5);
        assert_eq!(coerce_weight(" 4 "), 4.0);
        assert_eq!(coerce_weight("n/a"), 0.0);
        assert_eq!(coerce_weight("-3"), 0.0);
        assert_eq!(coerce_weight("inf"), 0.0);
    }

    #[test]
    fn every_weighted_job_peaks_at_one() {
        let records = vec![
            record("DataScience", "Analyst", "SQL", 3.0),
            record("DataScience", "Analyst", "Statistics", 6.0),
            record("DataScience", "Engineer", "Python", 0.7),
            record("DataScience", "Engineer", "SQL", 0.35),
            record("Design", "Designer", "Color", 10.0),
        ];

        let map = build_job_trait_map(&records);
        for profile in map.profiles.values() {
            let max = profile.weights.values().copied().fold(0.0, f64::max);
            assert_eq!(max, 1.0, "{:?}", profile.key);
        }

        let analyst = &map.profiles[&JobKey::new("DataScience", "Analyst")];
        assert!((analyst.weight("SQL") - 0.5).abs() < 1e-12);
        assert_eq!(analyst.weight("Python"), 0.0);

        let engineer = &map.profiles[&JobKey::new("DataScience", "Engineer")];
        assert!((engineer.weight("SQL") - 0.5).abs() < 1e-12);
    }

    #[test]
    fn all_zero_job_keeps_zero_map() {
        let records = vec![record("S", "J", "A", 0.0), record("S", "J", "B", 0.0)];
        let map = build_job_trait_map(&records);
        let profile = &map.profiles[&JobKey::new("S", "J")];
        assert_eq!(profile.weights.len(), 2);
        assert!(profile.weights.values().all(|w| *w == 0.0));
    }

    #[test]
    fn trait_union_and_specializations_are_sorted() {
        let records = vec![
            record("Zeta", "J", "b", 1.0),
            record("Alpha", "J", "C", 1.0),
            record("Alpha", "K", "a", 1.0),
            record("Zeta", "J", "C", 2.0),
        ];
        let map = build_job_trait_map(&records);
        assert_eq!(map.specializations, vec!["Alpha", "Zeta"]);
        assert_eq!(map.all_traits, vec!["C", "a", "b"]);
        assert_eq!(map.job_count(), 3);
    }

    #[test]
    fn duplicate_traits_keep_the_largest_weight() {
        let records = vec![
            record("S", "J", "A", 2.0),
            record("S", "J", "A", 4.0),
            record("S", "J", "B", 1.0),
        ];
        let map = build_job_trait_map(&records);
        let profile = &map.profiles[&JobKey::new("S", "J")];
        assert_eq!(profile.weight("A"), 1.0);
        assert!((profile.weight("B") - 0.25).abs() < 1e-12);
    }
}
