//! BIDS-style file naming used by the batch driver and concatenation.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Default pattern for cleaned functional runs
pub const DEFAULT_INPUT_PATTERN: &str = "**/*cleaned.nii.gz";

/// Suffix appended to extracted tables
pub const TIMESERIES_SUFFIX: &str = "_timeseries.csv";

/// Pattern for extracted tables, relative to a data directory
pub const TIMESERIES_PATTERN: &str = "**/*_timeseries.csv";

static SUBJECT_RE: OnceLock<Regex> = OnceLock::new();

fn subject_re() -> &'static Regex {
    SUBJECT_RE.get_or_init(|| Regex::new(r"sub-[a-zA-Z0-9]+").expect("valid subject regex"))
}

/// First `sub-<label>` token in a file name.
pub fn subject_id(file_name: &str) -> Option<&str> {
    subject_re().find(file_name).map(|m| m.as_str())
}

/// Whether `file_name` carries `token` as a whole entity.
///
/// The token must be followed by a non-alphanumeric character or the end of
/// the name, so `run-1` does not match `run-10`.
pub fn has_entity(file_name: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    file_name.match_indices(token).any(|(start, _)| {
        file_name[start + token.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_ascii_alphanumeric())
    })
}

/// The first of `tokens` present in `file_name`, if any.
pub fn matching_entity<'a>(file_name: &str, tokens: &'a [String]) -> Option<&'a str> {
    tokens
        .iter()
        .map(String::as_str)
        .find(|token| has_entity(file_name, token))
}

/// Split a comma-separated option value into trimmed, non-empty tokens.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// File name with a `.nii.gz` or `.nii` extension removed.
pub fn volume_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.strip_suffix(".nii.gz")
        .or_else(|| name.strip_suffix(".nii"))
        .unwrap_or(name.as_str())
        .to_string()
}

/// Where the table for `input` goes: in `output_dir` if given, else beside the input.
pub fn timeseries_output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let file_name = format!("{}{}", volume_stem(input), TIMESERIES_SUFFIX);
    match output_dir {
        Some(dir) => dir.join(file_name),
        None => input
            .parent()
            .map(|parent| parent.join(&file_name))
            .unwrap_or_else(|| PathBuf::from(&file_name)),
    }
}

pub fn concatenated_file_name(subject: &str) -> String {
    format!("{}_concatenated_timeseries.csv", subject)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_id() {
        assert_eq!(
            subject_id("sub-0042_ses-01_task-rest_run-01_cleaned.nii.gz"),
            Some("sub-0042")
        );
        assert_eq!(subject_id("group_average.nii.gz"), None);
    }

    #[test]
    fn test_has_entity_requires_boundary() {
        let name = "sub-01_ses-01_run-10_cleaned_timeseries.csv";
        assert!(has_entity(name, "run-10"));
        assert!(!has_entity(name, "run-1"));
        assert!(has_entity("sub-01_run-02", "run-02"));
        assert!(!has_entity(name, ""));
    }

    #[test]
    fn test_has_entity_is_literal() {
        assert!(!has_entity("sub-01_runX01", "run.01"));
        assert!(has_entity("sub-01_run.01.csv", "run.01"));
    }

    #[test]
    fn test_has_entity_checks_every_occurrence() {
        // first "run-1" is followed by "0", the second by "_"
        assert!(has_entity("sub-01_run-10_echo-run-1_bold", "run-1"));
        assert!(has_entity("run-02", "run-02"));
    }

    #[test]
    fn test_matching_entity_returns_first_token() {
        let tokens = vec!["run-1".to_string(), "run-10".to_string()];
        assert_eq!(matching_entity("sub-01_run-10_timeseries.csv", &tokens), Some("run-10"));
        assert_eq!(matching_entity("sub-01_run-2_timeseries.csv", &tokens), None);
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("run-01, run-03,,"), vec!["run-01", "run-03"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_timeseries_output_path() {
        let input = Path::new("/data/sub-01/func/sub-01_run-01_cleaned.nii.gz");
        assert_eq!(
            timeseries_output_path(input, None),
            PathBuf::from("/data/sub-01/func/sub-01_run-01_cleaned_timeseries.csv")
        );
        assert_eq!(
            timeseries_output_path(Path::new("x/a.nii"), Some(Path::new("/out"))),
            PathBuf::from("/out/a_timeseries.csv")
        );
    }
}
