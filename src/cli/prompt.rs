//! Interactive student profile entry.
//!
//! This is intentionally kept separate from clap parsing:
//! - clap handles structured flags/subcommands
//! - the prompt asks for one score per trait on the terminal
//!
//! Input and output are injected so the loop can be driven from tests.

use std::io::{self, BufRead, Write};

use crate::data::profile::normalize_score;
use crate::domain::StudentProfile;
use crate::error::AppError;

/// Prompt on the process terminal.
pub fn prompt_profile_stdin(features: &[String]) -> Result<StudentProfile, AppError> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    prompt_profile(features, stdin.lock(), stdout.lock())
}

/// Ask for a score for every feature, in order.
///
/// Behavior:
/// - blank input scores `0`
/// - `0.85`, `0,85` and `85` are all accepted
/// - anything else is rejected and asked again
/// - `q` cancels; end of input is an error
pub fn prompt_profile<R: BufRead, W: Write>(
    features: &[String],
    mut reader: R,
    mut writer: W,
) -> Result<StudentProfile, AppError> {
    let write_err = |e: io::Error| AppError::new(2, format!("Failed to write prompt: {e}"));

    writeln!(
        writer,
        "Enter a score for each of {} trait(s): 0-1 or 0-100, blank for 0, q to quit.",
        features.len()
    )
    .map_err(write_err)?;

    let mut profile = StudentProfile::new();
    for (idx, feature) in features.iter().enumerate() {
        loop {
            write!(writer, "[{}/{}] {feature}: ", idx + 1, features.len()).map_err(write_err)?;
            writer.flush().map_err(write_err)?;

            let mut input = String::new();
            let bytes = reader
                .read_line(&mut input)
                .map_err(|e| AppError::new(2, format!("Failed to read input: {e}")))?;
            if bytes == 0 {
                return Err(AppError::new(
                    2,
                    "Input ended before every trait was scored. Use `--mode file` to pass a profile CSV.",
                ));
            }

            let input = input.trim();
            if input.eq_ignore_ascii_case("q") {
                return Err(AppError::new(2, "Canceled."));
            }

            match normalize_score(input) {
                Some(score) => {
                    profile.insert(feature.clone(), score);
                    break;
                }
                None => {
                    writeln!(writer, "Invalid score: {input}. Enter a number such as 0.8 or 80.").map_err(write_err)?;
                }
            }
        }
    }

    Ok(profile)
}
