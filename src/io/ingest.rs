//! Trait-table CSV ingest.
//!
//! This module turns one or more trait-weight CSVs into a flat list of
//! `TraitRecord`s.
//!
//! Design goals:
//! - **Strict schema**: a table missing a required column aborts the whole ingest
//! - **Tolerant rows**: rows without a trait code or weight are dropped and counted
//! - **Deterministic behavior**: files are read in sorted path order
//! - **Separation of concerns**: no weighting logic here

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use log::{debug, info};

use crate::data::weights::coerce_weight;
use crate::domain::{TraitKind, TraitRecord};
use crate::error::AppError;

/// Columns every trait table must expose (after header normalization).
pub const REQUIRED_COLUMNS: [&str; 5] = ["specialization", "job", "type", "code_or_trait", "weight"];

/// Row counters for an ingest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub files_read: usize,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
}

/// Ingest output: concatenated records from every table + counters.
#[derive(Debug, Clone)]
pub struct IngestedTables {
    pub records: Vec<TraitRecord>,
    pub files: Vec<PathBuf>,
    pub stats: IngestStats,
}

/// Load every trait table under `source` (a directory of `*.csv`, or one CSV file).
pub fn load_trait_tables(source: &Path) -> Result<IngestedTables, AppError> {
    let files = discover_tables(source)?;

    let mut records = Vec::new();
    let mut stats = IngestStats::default();

    for path in &files {
        let file = File::open(path)
            .map_err(|e| AppError::new(2, format!("Failed to open trait table '{}': {e}", path.display())))?;
        let label = path.display().to_string();
        let table = read_trait_table(file, &label)?;

        debug!(
            "read {label}: {} rows, {} kept",
            table.stats.rows_read, table.stats.rows_kept
        );

        stats.files_read += 1;
        stats.rows_read += table.stats.rows_read;
        stats.rows_kept += table.stats.rows_kept;
        stats.rows_dropped += table.stats.rows_dropped;
        records.extend(table.records);
    }

    info!(
        "ingested {} trait table(s): {} rows read, {} kept, {} dropped",
        stats.files_read, stats.rows_read, stats.rows_kept, stats.rows_dropped
    );

    if records.is_empty() {
        return Err(AppError::new(3, "No usable trait rows found in the trait tables."));
    }

    Ok(IngestedTables { records, files, stats })
}

/// Resolve the list of CSV files to ingest, sorted by path.
pub fn discover_tables(source: &Path) -> Result<Vec<PathBuf>, AppError> {
    if source.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }

    let entries = fs::read_dir(source).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to read trait table directory '{}': {e}", source.display()),
        )
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_csv(p))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(AppError::new(
            2,
            format!("No CSV files found in '{}'.", source.display()),
        ));
    }
    Ok(files)
}

/// Records parsed from a single table.
#[derive(Debug, Clone)]
pub struct TableRead {
    pub records: Vec<TraitRecord>,
    pub stats: IngestStats,
}

/// Parse one trait table. `label` is only used in error messages.
pub fn read_trait_table<R: Read>(reader: R, label: &str) -> Result<TableRead, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read headers of '{label}': {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map, label)?;

    let mut records = Vec::new();
    let mut stats = IngestStats {
        files_read: 1,
        ..IngestStats::default()
    };

    for result in reader.records() {
        stats.rows_read += 1;

        let parsed = result.ok().and_then(|record| parse_row(&record, &header_map));
        match parsed {
            Some(row) => {
                stats.rows_kept += 1;
                records.push(row);
            }
            None => stats.rows_dropped += 1,
        }
    }

    Ok(TableRead { records, stats })
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        let mut name = normalize_header_name(name);
        if name == "kind" {
            name = "type".to_string();
        }
        // First occurrence wins for repeated headers.
        map.entry(name).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}').trim();
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>, label: &str) -> Result<(), AppError> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !header_map.contains_key(*c))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    Err(AppError::new(
        2,
        format!(
            "Trait table '{label}' is missing required column(s): {}. Expected: {}.",
            missing.join(", "),
            REQUIRED_COLUMNS.join(", ")
        ),
    ))
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Option<TraitRecord> {
    let specialization = get_value(record, header_map, "specialization")?;
    let job = get_value(record, header_map, "job")?;
    let code_or_trait = get_value(record, header_map, "code_or_trait")?;
    let weight = get_value(record, header_map, "weight")?;
    let kind = get_value(record, header_map, "type")
        .map(TraitKind::parse)
        .unwrap_or(TraitKind::Trait);

    Some(TraitRecord {
        specialization: specialization.to_string(),
        job: job.to_string(),
        kind,
        code_or_trait: code_or_trait.to_string(),
        weight: coerce_weight(weight),
    })
}

fn get_value<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_valid_table_and_drops_incomplete_rows() {
        let csv = "\u{feff} specialization , Job,type,code_or_trait,weight\n\
                   DataScience,Analyst,course,MATH 101,3\n\
                   DataScience,Analyst,trait,Curiosity,\n\
                   DataScience,Analyst,trait,,2\n\
                   DataScience,Engineer,skill,Python,abc\n";

        let table = read_trait_table(csv.as_bytes(), "inline").unwrap();
        assert_eq!(table.stats.rows_read, 4);
        assert_eq!(table.stats.rows_kept, 2);
        assert_eq!(table.stats.rows_dropped, 2);

        assert_eq!(table.records[0].kind, TraitKind::Course);
        assert_eq!(table.records[0].code_or_trait, "MATH 101");
        assert!((table.records[0].weight - 3.0).abs() < 1e-12);

        // Non-numeric weight is kept and coerced to zero.
        assert_eq!(table.records[1].kind, TraitKind::Trait);
        assert_eq!(table.records[1].weight, 0.0);
    }

    #[test]
    fn missing_required_column_is_a_schema_error() {
        let csv = "specialization,job,code_or_trait,weight\nA,B,C,1\n";
        let err = read_trait_table(csv.as_bytes(), "broken.csv").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("type"));
        assert!(err.message().contains("broken.csv"));
    }

    #[test]
    fn kind_header_is_accepted_for_type() {
        let csv = "specialization,job,kind,code_or_trait,weight\nA,B,course,C1,1\n";
        let table = read_trait_table(csv.as_bytes(), "alias").unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].kind, TraitKind::Course);
    }

    #[test]
    fn one_bad_table_aborts_the_whole_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.csv"),
            "specialization,job,type,code_or_trait,weight\nA,B,trait,C,1\n",
        )
        .unwrap();
        fs::write(dir.path().join("b.csv"), "specialization,job,weight\nA,B,1\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let err = load_trait_tables(dir.path()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("b.csv"));
    }

    #[test]
    fn directory_tables_are_concatenated_in_path_order() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(
            dir.path().join("b.csv"),
            "specialization,job,type,code_or_trait,weight\nS,J2,trait,Second,1\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("a.csv"),
            "specialization,job,type,code_or_trait,weight\nS,J1,trait,First,1\n",
        )
        .unwrap();

        let ingested = load_trait_tables(dir.path()).unwrap();
        assert_eq!(ingested.stats.files_read, 2);
        assert_eq!(ingested.records[0].code_or_trait, "First");
        assert_eq!(ingested.records[1].code_or_trait, "Second");
    }

    #[test]
    fn empty_directory_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_trait_tables(dir.path()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
