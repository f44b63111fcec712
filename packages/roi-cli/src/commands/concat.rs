use crate::cli::ConcatArgs;
use crate::exit_codes;
use crate::output;
use roi_rs::{concat, naming};

pub fn execute(args: ConcatArgs) -> i32 {
    let exclude_runs = naming::parse_list(&args.exclude_runs);
    if !args.quiet && !exclude_runs.is_empty() {
        eprintln!("Excluding runs: {}", exclude_runs.join(", "));
    }

    let results = match concat::concat_subjects(&args.data_dir, &args.output_dir, &exclude_runs) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::for_error(&e);
        }
    };

    if results.is_empty() {
        eprintln!(
            "Error: No subject tables found in {}",
            args.data_dir.display()
        );
        return exit_codes::INPUT_ERROR;
    }

    if !args.quiet {
        for result in &results {
            match &result.output {
                Some(path) => eprintln!(
                    "{}: {} file(s) -> {} ({} rows x {} columns)",
                    result.subject,
                    result.inputs.len(),
                    path.display(),
                    result.n_rows,
                    result.n_columns
                ),
                None => eprintln!("{}: nothing to concatenate", result.subject),
            }
        }
        let written = results.iter().filter(|r| r.output.is_some()).count();
        eprintln!(
            "Concatenated {} of {} subject(s) into {}",
            written,
            results.len(),
            args.output_dir.display()
        );
    }

    if args.json {
        if let Err(e) = output::print_json(&results) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    exit_codes::SUCCESS
}
