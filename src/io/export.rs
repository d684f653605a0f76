//! CSV exports: ranked results, the training population and the
//! specialization summary.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts. Parent directories are created as needed.

use std::fs::{self, File};
use std::path::Path;

use csv::Writer;
use log::info;

use crate::domain::{CompatibilityRow, Population, SpecializationSummary};
use crate::error::AppError;

/// Write the ranked compatibility table.
pub fn write_results_csv(path: &Path, rows: &[CompatibilityRow]) -> Result<(), AppError> {
    let mut writer = create_writer(path)?;
    write_row(&mut writer, ["specialization", "job", "compatibility_percent"])?;
    for r in rows {
        write_row(
            &mut writer,
            [
                r.specialization.as_str(),
                r.job.as_str(),
                &format!("{:.3}", r.compatibility_percent),
            ],
        )?;
    }
    finish(writer, path, rows.len())
}

/// Write the synthetic population, one column per feature.
pub fn write_population_csv(path: &Path, population: &Population) -> Result<(), AppError> {
    let mut writer = create_writer(path)?;

    let mut header = vec!["applicant_id", "specialization", "job"];
    header.extend(population.feature_names.iter().map(String::as_str));
    write_row(&mut writer, &header)?;

    let mut record: Vec<String> = Vec::with_capacity(header.len());
    for a in &population.applicants {
        record.clear();
        record.push(a.id.to_string());
        record.push(a.specialization.clone());
        record.push(a.job.clone());
        // Shortest representation that parses back to the same f64.
        record.extend(a.traits.iter().map(|v| v.to_string()));
        write_row(&mut writer, &record)?;
    }
    finish(writer, path, population.applicants.len())
}

/// Write the per-specialization mean compatibility.
pub fn write_summary_csv(path: &Path, summary: &[SpecializationSummary]) -> Result<(), AppError> {
    let mut writer = create_writer(path)?;
    write_row(&mut writer, ["specialization", "mean_compatibility_percent"])?;
    for s in summary {
        write_row(
            &mut writer,
            [
                s.specialization.as_str(),
                &format!("{:.3}", s.mean_compatibility_percent),
            ],
        )?;
    }
    finish(writer, path, summary.len())
}

fn create_writer(path: &Path) -> Result<Writer<File>, AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::new(
                2,
                format!("Failed to create export directory '{}': {e}", parent.display()),
            )
        })?;
    }
    Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))
}

fn write_row<I, T>(writer: &mut Writer<File>, record: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    writer
        .write_record(record)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))
}

fn finish(mut writer: Writer<File>, path: &Path, n_rows: usize) -> Result<(), AppError> {
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV '{}': {e}", path.display())))?;
    info!("Wrote {n_rows} row(s) to '{}'.", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SyntheticApplicant;
    use tempfile::TempDir;

    #[test]
    fn results_csv_creates_parent_and_uses_three_decimals() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sources/results/out.csv");
        let rows = vec![CompatibilityRow {
            specialization: "Data, Science".to_string(),
            job: "Analyst".to_string(),
            compatibility_percent: 12.5,
        }];
        write_results_csv(&path, &rows).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "specialization,job,compatibility_percent\n\"Data, Science\",Analyst,12.500\n"
        );
    }

    #[test]
    fn population_csv_keeps_full_precision() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("population.csv");
        let population = Population {
            feature_names: vec!["CPE 101".to_string(), "Teamwork".to_string()],
            applicants: vec![SyntheticApplicant {
                id: 1,
                specialization: "Networks".to_string(),
                job: "Admin".to_string(),
                traits: vec![0.5, 0.1 + 0.2],
            }],
        };
        write_population_csv(&path, &population).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("applicant_id,specialization,job,CPE 101,Teamwork"));
        let row = lines.next().unwrap();
        assert_eq!(row, "1,Networks,Admin,0.5,0.30000000000000004");
        let exported: f64 = row.rsplit(',').next().unwrap().parse().unwrap();
        assert_eq!(exported, population.applicants[0].traits[1]);
    }

    #[test]
    fn summary_csv() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("summary.csv");
        let summary = vec![SpecializationSummary {
            specialization: "Networks".to_string(),
            mean_compatibility_percent: 33.3333,
        }];
        write_summary_csv(&path, &summary).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("Networks,33.333\n"));
    }
}
