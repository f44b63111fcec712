use crate::cli::BatchArgs;
use crate::exit_codes;
use crate::output;
use crate::params;
use rayon::prelude::*;
use roi_rs::naming;
use roi_rs::{ExtractRequest, ExtractionReport, Pipeline};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum ItemStatus {
    Pending,
    Succeeded,
    Skipped,
    Failed,
}

#[derive(Debug, Serialize)]
struct BatchItem {
    input: PathBuf,
    output: PathBuf,
    status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<ExtractionReport>,
}

#[derive(Debug, Serialize)]
struct Exclusion {
    input: PathBuf,
    reason: String,
}

#[derive(Debug, Serialize)]
struct BatchSummary {
    total: usize,
    succeeded: usize,
    skipped: usize,
    failed: usize,
    elapsed_secs: f64,
    excluded: Vec<Exclusion>,
    items: Vec<BatchItem>,
}

pub fn execute(args: BatchArgs) -> i32 {
    if !args.data_dir.is_dir() {
        eprintln!("Error: Data directory not found: {}", args.data_dir.display());
        return exit_codes::INPUT_ERROR;
    }

    let shared_inputs = [
        Some(args.atlas.as_path()),
        args.alignment.mask.as_deref(),
        args.alignment.transform.as_deref(),
    ];
    if let Err(msg) = params::check_inputs(shared_inputs.into_iter().flatten()) {
        eprintln!("Error: {}", msg);
        return exit_codes::INPUT_ERROR;
    }

    let files = match resolve_glob(&args.data_dir, &args.pattern) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if files.is_empty() {
        eprintln!(
            "Error: No files matching '{}' found in {}",
            args.pattern,
            args.data_dir.display()
        );
        return exit_codes::INPUT_ERROR;
    }

    let exclude_subjects = naming::parse_list(&args.exclude_subjects);
    let exclude_runs = naming::parse_list(&args.exclude_runs);
    let (kept, excluded) = filter_excluded(files, &exclude_subjects, &exclude_runs);
    for exclusion in &excluded {
        log::info!("Excluding {} ({})", exclusion.input.display(), exclusion.reason);
    }

    let mut items: Vec<BatchItem> = kept
        .into_iter()
        .map(|input| {
            let output = naming::timeseries_output_path(&input, args.output_dir.as_deref());
            let status = if output.exists() && !args.overwrite {
                ItemStatus::Skipped
            } else {
                ItemStatus::Pending
            };
            BatchItem {
                input,
                output,
                status,
                error: None,
                report: None,
            }
        })
        .collect();

    // Dry-run mode: print the plan and exit
    if args.dry_run {
        for item in &items {
            let marker = if item.status == ItemStatus::Skipped {
                "  (exists, skipped)"
            } else {
                ""
            };
            println!("{} -> {}{}", item.input.display(), item.output.display(), marker);
        }
        if !args.quiet {
            eprintln!(
                "Found {} file(s), {} excluded",
                items.len() + excluded.len(),
                excluded.len()
            );
        }
        return exit_codes::SUCCESS;
    }

    let pipeline = match params::build_pipeline(&args.alignment) {
        Ok(p) => p,
        Err((code, msg)) => {
            eprintln!("Error: {}", msg);
            return code;
        }
    };

    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "Error: Failed to create output directory '{}': {}",
                dir.display(),
                e
            );
            return exit_codes::EXECUTION_ERROR;
        }
    }

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(usize::from(args.jobs))
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Error: Failed to start worker pool: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    let total = items.len();
    let start_time = Instant::now();

    pool.install(|| {
        items.par_iter_mut().enumerate().for_each(|(i, item)| {
            if item.status == ItemStatus::Skipped {
                if !args.quiet {
                    eprintln!(
                        "[{}/{}] {} (output exists, skipping)",
                        i + 1,
                        total,
                        item.input.display()
                    );
                }
                return;
            }
            if !args.quiet {
                eprintln!("[{}/{}] {}...", i + 1, total, item.input.display());
            }
            process_item(&pipeline, &args, item);
        });
    });

    let elapsed = start_time.elapsed();
    let count = |status: ItemStatus| items.iter().filter(|item| item.status == status).count();
    let summary = BatchSummary {
        total,
        succeeded: count(ItemStatus::Succeeded),
        skipped: count(ItemStatus::Skipped),
        failed: count(ItemStatus::Failed),
        elapsed_secs: elapsed.as_secs_f64(),
        excluded,
        items,
    };

    if !args.quiet {
        eprintln!(
            "Batch complete: {} succeeded, {} skipped, {} failed, {} excluded, {:.1}s",
            summary.succeeded,
            summary.skipped,
            summary.failed,
            summary.excluded.len(),
            summary.elapsed_secs
        );
        for item in summary.items.iter().filter(|item| item.status == ItemStatus::Failed) {
            eprintln!(
                "  Failed: {}: {}",
                item.input.display(),
                item.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    if let Err(e) = output::emit_report(&summary, &args.report) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    summary_exit_code(summary.succeeded, summary.failed)
}

fn process_item(pipeline: &Pipeline, args: &BatchArgs, item: &mut BatchItem) {
    let mut request = ExtractRequest::new(&item.input, &args.atlas, &item.output);
    request.mask_path = args.alignment.mask.clone();
    request.transform_path = args.alignment.transform.clone();

    match pipeline.run(&request) {
        Ok(report) => {
            if !report.is_complete() {
                log::warn!(
                    "{}: zero-filled regions {:?}",
                    item.input.display(),
                    report.zero_filled
                );
            }
            item.status = ItemStatus::Succeeded;
            item.report = Some(report);
        }
        Err(e) => {
            log::error!("Error processing {}: {}", item.input.display(), e);
            item.status = ItemStatus::Failed;
            item.error = Some(e.to_string());
        }
    }
}

fn summary_exit_code(succeeded: usize, failed: usize) -> i32 {
    if failed == 0 {
        exit_codes::SUCCESS
    } else if succeeded > 0 {
        exit_codes::PARTIAL_FAILURE
    } else {
        exit_codes::EXECUTION_ERROR
    }
}

fn resolve_glob(data_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, String> {
    let full_pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&data_dir.to_string_lossy()),
        pattern
    );
    let paths = glob::glob(&full_pattern)
        .map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    files.push(path);
                }
            }
            Err(e) => {
                log::warn!("glob error: {}", e);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Split `files` into those to process and those excluded by subject or run.
fn filter_excluded(
    files: Vec<PathBuf>,
    exclude_subjects: &[String],
    exclude_runs: &[String],
) -> (Vec<PathBuf>, Vec<Exclusion>) {
    let mut kept = Vec::new();
    let mut excluded = Vec::new();

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let subject = naming::subject_id(&name);
        let reason = if let Some(subject) =
            subject.filter(|s| exclude_subjects.iter().any(|e| e.as_str() == *s))
        {
            Some(format!("subject {}", subject))
        } else {
            naming::matching_entity(&name, exclude_runs).map(|run| format!("run {}", run))
        };

        match reason {
            Some(reason) => excluded.push(Exclusion {
                input: path,
                reason,
            }),
            None => kept.push(path),
        }
    }

    (kept, excluded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_resolve_glob_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let func = tmp.path().join("sub-01").join("func");
        fs::create_dir_all(&func).unwrap();
        fs::write(func.join("sub-01_run-02_cleaned.nii.gz"), "").unwrap();
        fs::write(func.join("sub-01_run-01_cleaned.nii.gz"), "").unwrap();
        fs::write(func.join("sub-01_run-01_bold.nii.gz"), "").unwrap();

        let result = resolve_glob(tmp.path(), naming::DEFAULT_INPUT_PATTERN).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result[0].ends_with("sub-01_run-01_cleaned.nii.gz"));
    }

    #[test]
    fn test_resolve_glob_no_matches() {
        let result = resolve_glob(Path::new("/nonexistent_dir_12345"), "*.nii").unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_filter_excluded() {
        let files = vec![
            PathBuf::from("/d/sub-01_run-01_cleaned.nii.gz"),
            PathBuf::from("/d/sub-01_run-10_cleaned.nii.gz"),
            PathBuf::from("/d/sub-02_run-01_cleaned.nii.gz"),
            PathBuf::from("/d/sub-03_run-02_cleaned.nii.gz"),
        ];
        let (kept, excluded) =
            filter_excluded(files, &["sub-02".to_string()], &["run-01".to_string()]);

        assert_eq!(
            kept,
            vec![
                PathBuf::from("/d/sub-01_run-10_cleaned.nii.gz"),
                PathBuf::from("/d/sub-03_run-02_cleaned.nii.gz"),
            ]
        );
        assert_eq!(excluded.len(), 2);
        assert_eq!(excluded[1].reason, "subject sub-02");
    }

    #[test]
    fn test_summary_exit_code() {
        assert_eq!(summary_exit_code(3, 0), exit_codes::SUCCESS);
        assert_eq!(summary_exit_code(0, 0), exit_codes::SUCCESS);
        assert_eq!(summary_exit_code(2, 1), exit_codes::PARTIAL_FAILURE);
        assert_eq!(summary_exit_code(0, 2), exit_codes::EXECUTION_ERROR);
    }
}
