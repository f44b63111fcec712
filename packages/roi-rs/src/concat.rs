//! Per-subject concatenation of run-wise time-series tables.

use crate::error::{Result, RoiError};
use crate::naming::{self, TIMESERIES_PATTERN};
use crate::table::{self, TableData};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const CONCATENATED_SUFFIX: &str = "_concatenated_timeseries.csv";

/// Outcome for one subject
#[derive(Debug, Clone, Serialize)]
pub struct SubjectConcat {
    pub subject: String,
    /// Tables whose rows were appended, in order
    pub inputs: Vec<PathBuf>,
    pub excluded: Vec<PathBuf>,
    /// Tables that could not be read or whose columns differ
    pub rejected: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub n_rows: usize,
    pub n_columns: usize,
}

/// Result of concatenating a list of tables
#[derive(Debug, Clone)]
pub struct ConcatOutcome {
    pub table: Option<TableData>,
    pub used: Vec<PathBuf>,
    pub rejected: Vec<PathBuf>,
}

/// Every extracted table under `data_dir`, sorted, excluding earlier concatenations.
pub fn find_tables(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&data_dir.to_string_lossy()),
        TIMESERIES_PATTERN
    );
    let paths = glob::glob(&pattern)
        .map_err(|e| RoiError::InvalidParameter(format!("Invalid glob pattern '{}': {}", pattern, e)))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                let is_concatenated = path
                    .file_name()
                    .map(|n| n.to_string_lossy().ends_with(CONCATENATED_SUFFIX))
                    .unwrap_or(false);
                if path.is_file() && !is_concatenated {
                    files.push(path);
                }
            }
            Err(e) => log::warn!("glob error: {}", e),
        }
    }
    files.sort();
    Ok(files)
}

/// Group files by the subject id in their file name.
///
/// Returns the groups (each sorted by path) and the files without a subject id.
pub fn group_by_subject(files: Vec<PathBuf>) -> (BTreeMap<String, Vec<PathBuf>>, Vec<PathBuf>) {
    let mut subjects: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    let mut unmatched = Vec::new();

    for path in files {
        let subject = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(naming::subject_id)
            .map(str::to_string);
        match subject {
            Some(subject) => subjects.entry(subject).or_default().push(path),
            None => unmatched.push(path),
        }
    }

    for files in subjects.values_mut() {
        files.sort();
    }
    (subjects, unmatched)
}

/// Append the rows of `paths` in order.
///
/// The first readable table fixes the header; later tables with a different
/// header, and unreadable tables, are rejected with a warning.
pub fn concat_tables(paths: &[PathBuf]) -> ConcatOutcome {
    let mut combined: Option<TableData> = None;
    let mut used = Vec::new();
    let mut rejected = Vec::new();

    for path in paths {
        let table = match table::read_table(path) {
            Ok(table) => table,
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                rejected.push(path.clone());
                continue;
            }
        };

        if let Some(acc) = combined.as_mut() {
            if acc.header != table.header {
                log::warn!(
                    "Columns of {} differ from the first table; skipping",
                    path.display()
                );
                rejected.push(path.clone());
                continue;
            }
            acc.records.extend(table.records);
        } else {
            combined = Some(table);
        }
        used.push(path.clone());
    }

    ConcatOutcome {
        table: combined,
        used,
        rejected,
    }
}

/// Concatenate every subject's tables under `data_dir` into `output_dir`.
pub fn concat_subjects(
    data_dir: &Path,
    output_dir: &Path,
    exclude_runs: &[String],
) -> Result<Vec<SubjectConcat>> {
    if !data_dir.is_dir() {
        return Err(RoiError::FileNotFound(data_dir.display().to_string()));
    }
    std::fs::create_dir_all(output_dir)?;

    let files = find_tables(data_dir)?;
    let (subjects, unmatched) = group_by_subject(files);
    for path in &unmatched {
        log::warn!(
            "Could not extract subject ID from {}; skipping",
            path.display()
        );
    }
    log::info!("Found {} subjects", subjects.len());

    let mut results = Vec::with_capacity(subjects.len());
    for (subject, files) in subjects {
        let (excluded, kept): (Vec<PathBuf>, Vec<PathBuf>) = files.into_iter().partition(|path| {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            naming::matching_entity(&name, exclude_runs).is_some()
        });
        for path in &excluded {
            log::info!("{}: excluding {}", subject, path.display());
        }

        let outcome = concat_tables(&kept);
        let mut result = SubjectConcat {
            subject: subject.clone(),
            inputs: outcome.used,
            excluded,
            rejected: outcome.rejected,
            output: None,
            n_rows: 0,
            n_columns: 0,
        };

        match outcome.table {
            Some(table) => {
                let output = output_dir.join(naming::concatenated_file_name(&subject));
                table::write_table_data(&output, &table)?;
                log::info!(
                    "{}: saved {} ({} rows x {} columns)",
                    subject,
                    output.display(),
                    table.n_rows(),
                    table.n_columns()
                );
                result.n_rows = table.n_rows();
                result.n_columns = table.n_columns();
                result.output = Some(output);
            }
            None => log::warn!("{}: no files left to concatenate", subject),
        }
        results.push(result);
    }

    Ok(results)
}
