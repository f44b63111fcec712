use ndarray::{Array3, Array4};
use roi_rs::labels::LabelVolume;
use roi_rs::table::read_table;
use roi_rs::volume::scaled_affine;
use roi_rs::{ExtractRequest, Pipeline, RoiError, StrategyKind, Volume};
use std::path::{Path, PathBuf};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 6x2x2 atlas at 1mm: x 0-1 -> region 1, x 2-3 -> region 3, x 4-5 -> region 2
fn write_atlas(dir: &Path) -> PathBuf {
    let labels = Array3::from_shape_fn((6, 2, 2), |(x, _, _)| match x {
        0 | 1 => 1,
        2 | 3 => 3,
        _ => 2,
    });
    let atlas = LabelVolume::new(labels, scaled_affine([1.0; 3], [0.0; 3]));
    let path = dir.join("atlas.nii.gz");
    atlas.save(&path).unwrap();
    path
}

/// Functional run on a 2mm grid covering atlas x = 0 and x = 2 only.
/// Voxel i at time t holds (i + 1) * 10 + t.
fn write_functional(dir: &Path, name: &str, n_timepoints: usize) -> PathBuf {
    let data = Array4::from_shape_fn((2, 1, 1, n_timepoints), |(i, _, _, t)| {
        ((i + 1) * 10 + t) as f64
    });
    let volume = Volume::from_array4(data, scaled_affine([2.0; 3], [0.0; 3]));
    let path = dir.join(name);
    volume.save(&path).unwrap();
    path
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

// =============================================================================
// RESAMPLE PATH
// =============================================================================

#[test]
fn test_region_outside_fov_is_zero_filled() {
    init_logging();
    let tmp = tempfile::tempdir().unwrap();
    let atlas = write_atlas(tmp.path());
    let func = write_functional(tmp.path(), "sub-01_run-01_cleaned.nii.gz", 5);
    let output = tmp.path().join("sub-01_run-01_cleaned_timeseries.csv");

    let request = ExtractRequest::new(&func, &atlas, &output);
    let report = Pipeline::new()
        .with_scratch_dir(tmp.path())
        .run(&request)
        .unwrap();

    assert_eq!(report.strategy, StrategyKind::Resample);
    assert_eq!(report.n_timepoints, 5);
    assert_eq!(report.n_regions, 3);
    assert_eq!(report.n_extracted, 2);
    assert_eq!(report.zero_filled, vec![2]);

    let lines = read_lines(&output);
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "1,2,3");
    assert_eq!(lines[1], "10.0,0.0,20.0");
    assert_eq!(lines[5], "14.0,0.0,24.0");
}

#[test]
fn test_tables_have_fixed_width_across_subjects() {
    let tmp = tempfile::tempdir().unwrap();
    let atlas = write_atlas(tmp.path());

    // Second subject's grid covers the whole atlas
    let data = Array4::from_shape_fn((6, 2, 2, 3), |(x, _, _, t)| (x * t) as f64);
    let full = tmp.path().join("sub-02_cleaned.nii");
    Volume::from_array4(data, scaled_affine([1.0; 3], [0.0; 3]))
        .save(&full)
        .unwrap();
    let partial = write_functional(tmp.path(), "sub-01_cleaned.nii", 3);

    let pipeline = Pipeline::new().with_scratch_dir(tmp.path());
    for (i, func) in [partial, full].iter().enumerate() {
        let output = tmp.path().join(format!("out_{}.csv", i));
        let report = pipeline
            .run(&ExtractRequest::new(func, &atlas, &output))
            .unwrap();

        let table = read_table(&output).unwrap();
        assert_eq!(table.header.iter().collect::<Vec<_>>(), vec!["1", "2", "3"]);
        assert_eq!(table.n_rows(), report.n_timepoints);
    }
}

#[test]
fn test_resampled_atlas_matches_functional_grid() {
    let tmp = tempfile::tempdir().unwrap();
    let atlas = write_atlas(tmp.path());
    let func = write_functional(tmp.path(), "func.nii.gz", 4);
    let output = tmp.path().join("out.csv");
    let aligned_path = tmp.path().join("aligned.nii.gz");

    Pipeline::new()
        .with_scratch_dir(tmp.path())
        .with_aligned_output(&aligned_path)
        .run(&ExtractRequest::new(&func, &atlas, &output))
        .unwrap();

    let functional = Volume::load(&func).unwrap();
    let aligned = Volume::load(&aligned_path).unwrap();
    assert!(aligned.same_grid(&functional));
    assert!(aligned
        .data
        .iter()
        .all(|&v| v.fract() == 0.0 && [0.0, 1.0, 2.0, 3.0].contains(&v)));
}

#[test]
fn test_flipped_functional_axis_reverses_regions() {
    let tmp = tempfile::tempdir().unwrap();

    // RAS atlas: x increases to the right, labels 1..4 along x
    let labels = Array3::from_shape_vec((4, 1, 1), vec![1, 2, 3, 4]).unwrap();
    let atlas = tmp.path().join("atlas_ras.nii.gz");
    LabelVolume::new(labels, scaled_affine([1.0; 3], [0.0; 3]))
        .save(&atlas)
        .unwrap();

    // LAS functional: voxel i sits at world x = 3 - i
    let mut las = scaled_affine([1.0; 3], [0.0; 3]);
    las[(0, 0)] = -1.0;
    las[(0, 3)] = 3.0;
    let data = Array4::from_shape_fn((4, 1, 1, 2), |(i, _, _, t)| ((i + 1) * 10 + t) as f64);
    let func = tmp.path().join("func_las.nii.gz");
    Volume::from_array4(data, las).save(&func).unwrap();

    let output = tmp.path().join("out.csv");
    let aligned_path = tmp.path().join("aligned.nii.gz");
    let report = Pipeline::new()
        .with_scratch_dir(tmp.path())
        .with_aligned_output(&aligned_path)
        .run(&ExtractRequest::new(&func, &atlas, &output))
        .unwrap();

    let aligned = LabelVolume::load(&aligned_path).unwrap();
    assert_eq!(
        aligned.labels().iter().copied().collect::<Vec<_>>(),
        vec![4, 3, 2, 1]
    );

    assert!(report.is_complete());
    let lines = read_lines(&output);
    assert_eq!(lines[0], "1,2,3,4");
    assert_eq!(lines[1], "40.0,30.0,20.0,10.0");
    assert_eq!(lines[2], "41.0,31.0,21.0,11.0");
}

#[test]
fn test_mask_excludes_region() {
    let tmp = tempfile::tempdir().unwrap();
    let atlas = write_atlas(tmp.path());
    let func = write_functional(tmp.path(), "func.nii", 2);

    let mask = Volume::from_array3(
        Array3::from_shape_vec((2, 1, 1), vec![1.0, 0.0]).unwrap(),
        scaled_affine([2.0; 3], [0.0; 3]),
    );
    let mask_path = tmp.path().join("mask.nii");
    mask.save(&mask_path).unwrap();

    let output = tmp.path().join("out.csv");
    let report = Pipeline::new()
        .run(&ExtractRequest::new(&func, &atlas, &output).with_mask(&mask_path))
        .unwrap();

    assert_eq!(report.zero_filled, vec![2, 3]);
    assert_eq!(read_lines(&output)[1], "10.0,0.0,0.0");
}

#[test]
fn test_mask_grid_mismatch_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let atlas = write_atlas(tmp.path());
    let func = write_functional(tmp.path(), "func.nii", 2);

    let mask = Volume::from_array3(Array3::ones((3, 3, 3)), scaled_affine([2.0; 3], [0.0; 3]));
    let mask_path = tmp.path().join("mask.nii");
    mask.save(&mask_path).unwrap();

    let output = tmp.path().join("out.csv");
    let result = Pipeline::new()
        .run(&ExtractRequest::new(&func, &atlas, &output).with_mask(&mask_path));

    assert!(matches!(result, Err(RoiError::GeometryMismatch(_))));
    assert!(!output.exists());
}

#[test]
fn test_missing_input_reports_path() {
    let tmp = tempfile::tempdir().unwrap();
    let atlas = write_atlas(tmp.path());
    let missing = tmp.path().join("missing.nii.gz");

    let result = roi_rs::extract(&missing, &atlas, &tmp.path().join("o.csv"), None, None);
    match result {
        Err(RoiError::FileNotFound(path)) => assert!(path.ends_with("missing.nii.gz")),
        other => panic!("expected FileNotFound, got {:?}", other),
    }
}

#[test]
fn test_empty_atlas_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let atlas = LabelVolume::new(Array3::zeros((2, 2, 2)), scaled_affine([1.0; 3], [0.0; 3]));
    let atlas_path = tmp.path().join("empty.nii");
    atlas.save(&atlas_path).unwrap();
    let func = write_functional(tmp.path(), "func.nii", 2);

    let result = Pipeline::new().run(&ExtractRequest::new(&func, &atlas_path, tmp.path().join("o.csv")));
    assert!(matches!(result, Err(RoiError::InvalidVolume(_))));
}

#[test]
fn test_transform_without_backend_is_tool_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let atlas = write_atlas(tmp.path());
    let func = write_functional(tmp.path(), "func.nii", 2);
    let transform = tmp.path().join("xfm.mat");
    std::fs::write(&transform, "").unwrap();

    let result = Pipeline::new()
        .run(&ExtractRequest::new(&func, &atlas, tmp.path().join("o.csv")).with_transform(&transform));
    assert!(matches!(result, Err(RoiError::ToolNotFound(_))));
}

// =============================================================================
// TRANSFORM PATH (fake registration tool)
// =============================================================================

#[cfg(unix)]
mod transform_path {
    use super::*;
    use roi_rs::AntsRunner;
    use std::os::unix::fs::PermissionsExt;

    fn fake_tool(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("antsApplyTransforms");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Atlas already on the functional grid, so copying it is a valid alignment
    fn write_grid_atlas(dir: &Path) -> PathBuf {
        let labels = Array3::from_shape_vec((2, 1, 1), vec![4, 9]).unwrap();
        let path = dir.join("atlas_on_grid.nii");
        LabelVolume::new(labels, scaled_affine([2.0; 3], [0.0; 3]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_tool_output_is_used_and_scratch_cleaned() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = tmp.path().join("scratch");
        std::fs::create_dir(&scratch).unwrap();

        // $4 = atlas, ${10} = output
        let tool = fake_tool(tmp.path(), r#"cp "$4" "${10}""#);
        let atlas = write_grid_atlas(tmp.path());
        let func = write_functional(tmp.path(), "func.nii.gz", 3);
        let transform = tmp.path().join("xfm.mat");
        std::fs::write(&transform, "").unwrap();
        let output = tmp.path().join("out.csv");

        let report = Pipeline::new()
            .with_scratch_dir(&scratch)
            .with_backend(AntsRunner::new(&tool).unwrap())
            .run(&ExtractRequest::new(&func, &atlas, &output).with_transform(&transform))
            .unwrap();

        assert_eq!(report.strategy, StrategyKind::Transform);
        assert!(report.is_complete());
        let lines = read_lines(&output);
        assert_eq!(lines[0], "4,9");
        assert_eq!(lines[3], "12.0,22.0");
        assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
    }

    #[test]
    fn test_tool_failure_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = tmp.path().join("scratch");
        std::fs::create_dir(&scratch).unwrap();

        let tool = fake_tool(tmp.path(), "echo 'Transform file could not be read' >&2\nexit 1");
        let atlas = write_atlas(tmp.path());
        let func = write_functional(tmp.path(), "func.nii.gz", 5);
        let transform = tmp.path().join("xfm.mat");
        std::fs::write(&transform, "").unwrap();
        let output = tmp.path().join("out.csv");

        let result = Pipeline::new()
            .with_scratch_dir(&scratch)
            .with_backend(AntsRunner::new(&tool).unwrap())
            .run(&ExtractRequest::new(&func, &atlas, &output).with_transform(&transform));

        match result {
            Err(RoiError::AlignmentFailed { stderr, .. }) => {
                assert!(stderr.contains("could not be read"))
            }
            other => panic!("expected AlignmentFailed, got {:?}", other),
        }
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
    }
}
