use crate::cli::ValidateArgs;
use crate::exit_codes;
use crate::output;
use roi_rs::{LabelVolume, Volume};
use serde::Serialize;

#[derive(Serialize, Default)]
struct ValidateOutput {
    file: String,
    exists: bool,
    readable: bool,
    ndim: Option<usize>,
    shape: Option<Vec<usize>>,
    voxel_size: Option<[f64; 3]>,
    n_timepoints: Option<usize>,
    n_regions: Option<usize>,
    regions: Option<Vec<u32>>,
    error: Option<String>,
}

pub fn execute(args: ValidateArgs) -> i32 {
    let mut result = ValidateOutput {
        file: args.file.display().to_string(),
        exists: args.file.exists(),
        ..Default::default()
    };

    if !result.exists {
        result.error = Some(format!("File not found: {}", result.file));
    } else {
        match Volume::load(&args.file) {
            Ok(volume) => {
                result.readable = true;
                result.ndim = Some(volume.ndim());
                result.shape = Some(volume.shape().to_vec());
                result.voxel_size = Some(volume.voxel_size());
                result.n_timepoints = Some(volume.n_timepoints());

                if args.atlas {
                    match LabelVolume::from_volume(&volume) {
                        Ok(atlas) => {
                            let regions = atlas.canonical_regions();
                            if regions.is_empty() {
                                result.error = Some("Atlas contains no labeled regions".into());
                            }
                            result.n_regions = Some(regions.len());
                            result.regions = Some(regions.labels().to_vec());
                        }
                        Err(e) => result.error = Some(e.to_string()),
                    }
                }
            }
            Err(e) => result.error = Some(e.to_string()),
        }
    }

    if args.json {
        if let Err(e) = output::print_json(&result) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else if let Some(err) = &result.error {
        eprintln!("Error: {}", err);
    } else {
        let shape = result.shape.clone().unwrap_or_default();
        let [vx, vy, vz] = result.voxel_size.unwrap_or_default();
        println!(
            "File '{}' is valid ({}D, shape {:?}, voxel {:.2}x{:.2}x{:.2} mm)",
            result.file,
            result.ndim.unwrap_or_default(),
            shape,
            vx,
            vy,
            vz
        );
        if let Some(n) = result.n_regions {
            println!("Atlas regions: {}", n);
        } else {
            println!("Time points: {}", result.n_timepoints.unwrap_or_default());
        }
    }

    if result.error.is_some() {
        exit_codes::INPUT_ERROR
    } else {
        exit_codes::SUCCESS
    }
}
