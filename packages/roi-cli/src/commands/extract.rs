use crate::cli::ExtractArgs;
use crate::exit_codes;
use crate::output;
use crate::params;
use roi_rs::ExtractRequest;

pub fn execute(args: ExtractArgs) -> i32 {
    let inputs = [
        Some(args.input.as_path()),
        Some(args.atlas.as_path()),
        args.alignment.mask.as_deref(),
        args.alignment.transform.as_deref(),
    ];
    if let Err(msg) = params::check_inputs(inputs.into_iter().flatten()) {
        eprintln!("Error: {}", msg);
        return exit_codes::INPUT_ERROR;
    }

    let mut pipeline = match params::build_pipeline(&args.alignment) {
        Ok(p) => p,
        Err((code, msg)) => {
            eprintln!("Error: {}", msg);
            return code;
        }
    };
    if let Some(path) = &args.save_aligned {
        pipeline = pipeline.with_aligned_output(path);
    }

    let mut request = ExtractRequest::new(&args.input, &args.atlas, &args.output);
    request.mask_path = args.alignment.mask.clone();
    request.transform_path = args.alignment.transform.clone();

    if !args.quiet {
        eprintln!("Extracting region time series from {}...", args.input.display());
        eprintln!("  Atlas: {}", args.atlas.display());
        if let Some(mask) = &request.mask_path {
            eprintln!("  Mask: {}", mask.display());
        }
        match &request.transform_path {
            Some(transform) => eprintln!("  Alignment: transform {}", transform.display()),
            None => eprintln!("  Alignment: nearest-neighbor resampling"),
        }
    }

    let report = match pipeline.run(&request) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::for_error(&e);
        }
    };

    if !args.quiet {
        eprintln!(
            "Saved {} ({} time points x {} regions)",
            report.output_path.display(),
            report.n_timepoints,
            report.n_regions
        );
        if !report.is_complete() {
            eprintln!(
                "  {} region(s) zero-filled: {:?}",
                report.zero_filled.len(),
                report.zero_filled
            );
        }
    }

    if let Err(e) = output::emit_report(&report, &args.report) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    exit_codes::SUCCESS
}
