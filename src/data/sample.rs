//! Synthetic applicant generation from normalized job trait profiles.
//!
//! Every job gets the same number of applicants so downstream classifiers are
//! not biased toward jobs that happen to have more rows. Each applicant is
//! scored on the *whole* feature union, not just the traits its job mentions:
//!
//! ```text
//! mean  = baseline + (ceiling - baseline) * w
//! sigma = noise_scale * (1 - dampening * w)
//! value = clip(mean + sigma * z + uniform(-jitter, jitter), 0, 1)
//! ```
//!
//! Traits a job emphasizes therefore land high with little spread, while
//! traits it ignores hover near the baseline with more noise.

use log::info;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::weights::WeightMap;
use crate::domain::{GeneratorConfig, JobTraitProfile, Population, SyntheticApplicant};
use crate::error::AppError;

/// Generate a balanced, shuffled population for every job in `map`.
///
/// The output is bit-reproducible for a given `seed`, weight map and config.
pub fn generate_population(map: &WeightMap, config: &GeneratorConfig, seed: u64) -> Result<Population, AppError> {
    validate_config(config)?;
    if map.profiles.is_empty() {
        return Err(AppError::new(3, "No job profiles to generate applicants for."));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut applicants = Vec::with_capacity(map.job_count() * config.samples_per_job);
    let mut next_id = 0u64;

    // BTreeMap iteration gives a fixed (specialization, job) order.
    for profile in map.profiles.values() {
        for _ in 0..config.samples_per_job {
            next_id += 1;
            let traits = synthesize_traits(&mut rng, &normal, &map.all_traits, profile, config);
            applicants.push(SyntheticApplicant {
                id: next_id,
                specialization: profile.key.specialization.clone(),
                job: profile.key.job.clone(),
                traits,
            });
        }
    }

    applicants.shuffle(&mut rng);

    info!(
        "generated {} synthetic applicants ({} per job, {} jobs, {} traits)",
        applicants.len(),
        config.samples_per_job,
        map.job_count(),
        map.all_traits.len()
    );

    Ok(Population {
        feature_names: map.all_traits.clone(),
        applicants,
    })
}

/// Draw one applicant's trait vector, aligned with `all_traits`.
pub fn synthesize_traits(
    rng: &mut StdRng,
    normal: &Normal<f64>,
    all_traits: &[String],
    profile: &JobTraitProfile,
    config: &GeneratorConfig,
) -> Vec<f64> {
    all_traits
        .iter()
        .map(|code| {
            let w = profile.weight(code);
            let z: f64 = normal.sample(rng);
            let mut value = trait_mean(w, config) + trait_sigma(w, config) * z;
            if config.jitter > 0.0 {
                value += rng.gen_range(-config.jitter..config.jitter);
            }
            value.clamp(0.0, 1.0)
        })
        .collect()
}

/// Expected trait value for a normalized weight (linear in `w`).
pub fn trait_mean(w: f64, config: &GeneratorConfig) -> f64 {
    config.baseline + (config.ceiling - config.baseline) * w
}

/// Noise level for a normalized weight; heavier traits are less noisy.
pub fn trait_sigma(w: f64, config: &GeneratorConfig) -> f64 {
    config.noise_scale * (1.0 - config.dampening * w)
}

fn validate_config(config: &GeneratorConfig) -> Result<(), AppError> {
    if config.samples_per_job == 0 {
        return Err(AppError::new(2, "Samples per job must be > 0."));
    }
    let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
    if !(in_unit(config.baseline) && in_unit(config.ceiling) && config.baseline <= config.ceiling) {
        return Err(AppError::new(
            2,
            format!(
                "Invalid trait range: baseline={} ceiling={} (need 0 <= baseline <= ceiling <= 1).",
                config.baseline, config.ceiling
            ),
        ));
    }
    if !(config.noise_scale.is_finite() && config.noise_scale >= 0.0) {
        return Err(AppError::new(2, "Noise scale must be finite and >= 0."));
    }
    if !in_unit(config.dampening) {
        return Err(AppError::new(2, "Noise dampening must be within [0, 1]."));
    }
    if !(config.jitter.is_finite() && config.jitter >= 0.0) {
        return Err(AppError::new(2, "Jitter must be finite and >= 0."));
    }
    Ok(())
}
