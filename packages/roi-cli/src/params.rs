use crate::cli::AlignmentArgs;
use crate::exit_codes;
use roi_rs::{AntsRunner, Pipeline};
use std::path::Path;

/// Resolve the registration tool from an explicit path or the search order.
pub fn resolve_runner(ants_path: &Option<String>) -> Result<AntsRunner, String> {
    match ants_path {
        Some(path) => AntsRunner::new(roi_rs::runner::expand_path(path)).map_err(|e| e.to_string()),
        None => AntsRunner::discover().map_err(|e| e.to_string()),
    }
}

/// Existence check for every path an invocation reads.
pub fn check_inputs<'a, I>(paths: I) -> Result<(), String>
where
    I: IntoIterator<Item = &'a Path>,
{
    for path in paths {
        if !path.exists() {
            return Err(format!("Input file not found: {}", path.display()));
        }
    }
    Ok(())
}

/// Pipeline configured from shared alignment options.
///
/// On failure returns the exit code alongside the message.
pub fn build_pipeline(args: &AlignmentArgs) -> Result<Pipeline, (i32, String)> {
    let mut pipeline = Pipeline::new();

    if let Some(dir) = &args.scratch_dir {
        std::fs::create_dir_all(dir).map_err(|e| {
            (
                exit_codes::EXECUTION_ERROR,
                format!("Failed to create scratch directory '{}': {}", dir.display(), e),
            )
        })?;
        pipeline = pipeline.with_scratch_dir(dir);
    }

    if args.transform.is_some() {
        let runner =
            resolve_runner(&args.ants).map_err(|msg| (exit_codes::TOOL_NOT_FOUND, msg))?;
        log::info!("Using {}", runner.binary_path().display());
        pipeline = pipeline.with_backend(runner);
    }

    Ok(pipeline)
}
