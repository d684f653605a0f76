//! Student profile sources that do not need a terminal.
//!
//! - `synthetic_profile`: a seeded, realistic-looking profile for demos
//! - `read_profile_csv`: `code_or_trait,score` rows from a file
//! - `normalize_score`: the shared 0-100 / 0-1 input convention

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::StudentProfile;
use crate::error::AppError;

/// Substrings that mark a feature as a course identifier.
const COURSE_MARKERS: [&str; 5] = ["CPE", "MATH", "ECE", "EE", "TECH"];

/// Heuristic: course codes carry digits or a department prefix.
pub fn looks_like_course_code(feature: &str) -> bool {
    feature.chars().any(|c| c.is_ascii_digit()) || COURSE_MARKERS.iter().any(|m| feature.contains(m))
}

/// Generate a deterministic profile covering every feature.
///
/// Course-like features draw from `N(0.75, 0.12)` (grades cluster high),
/// trait names from the wider `N(0.65, 0.18)`. A small uniform jitter is
/// added and every value is clipped to `[0, 1]`.
pub fn synthetic_profile(features: &[String], seed: u64) -> Result<StudentProfile, AppError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let course = Normal::new(0.75, 0.12).map_err(|e| AppError::new(4, format!("Profile distribution error: {e}")))?;
    let other = Normal::new(0.65, 0.18).map_err(|e| AppError::new(4, format!("Profile distribution error: {e}")))?;

    let mut profile = StudentProfile::new();
    for feature in features {
        let base: f64 = if looks_like_course_code(feature) {
            course.sample(&mut rng)
        } else {
            other.sample(&mut rng)
        };
        let jitter: f64 = rng.gen_range(-0.03..0.03);
        profile.insert(feature.clone(), (base + jitter).clamp(0.0, 1.0));
    }
    Ok(profile)
}

/// Parse a user-entered score.
///
/// - blank → `Some(0.0)`
/// - `,` is accepted as the decimal separator
/// - values above `1` are treated as percentages and divided by 100
/// - the result is clipped to `[0, 1]`
///
/// Returns `None` for non-numeric input.
pub fn normalize_score(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0.0);
    }
    let value: f64 = raw.replace(',', ".").parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let value = if value > 1.0 { value / 100.0 } else { value };
    Some(value.clamp(0.0, 1.0))
}

/// Read a profile from a CSV with `code_or_trait` and `score` columns.
pub fn read_profile_csv(path: &Path) -> Result<StudentProfile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open profile '{}': {e}", path.display())))?;
    parse_profile_csv(file, &path.display().to_string())
}

/// Parse profile CSV content. `label` is only used in error messages.
pub fn parse_profile_csv<R: Read>(reader: R, label: &str) -> Result<StudentProfile, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read headers of '{label}': {e}")))?
        .clone();
    let mut header_map: HashMap<String, usize> = HashMap::new();
    for (idx, h) in headers.iter().enumerate() {
        // First occurrence wins for repeated headers.
        header_map
            .entry(h.trim().trim_start_matches('\u{feff}').to_ascii_lowercase())
            .or_insert(idx);
    }

    let (Some(&code_idx), Some(&score_idx)) = (header_map.get("code_or_trait"), header_map.get("score")) else {
        return Err(AppError::new(
            2,
            format!("Profile '{label}' must have `code_or_trait` and `score` columns."),
        ));
    };

    let mut profile = StudentProfile::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| AppError::new(2, format!("{label}:{line}: CSV parse error: {e}")))?;

        let Some(code) = record.get(code_idx).filter(|s| !s.is_empty()) else {
            continue;
        };
        let raw = record.get(score_idx).unwrap_or("");
        let score = normalize_score(raw).ok_or_else(|| {
            AppError::new(2, format!("{label}:{line}: invalid score '{raw}' for '{code}'."))
        })?;
        profile.insert(code.to_string(), score);
    }

    Ok(profile)
}
