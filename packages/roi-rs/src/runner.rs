use crate::error::{Result, RoiError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Name of the ANTs resampling executable
pub const TOOL_NAME: &str = "antsApplyTransforms";

/// Environment variable holding the full path to the tool
pub const TOOL_ENV_VAR: &str = "ANTS_APPLY_TRANSFORMS";

/// Environment variable naming the ANTs installation's binary directory
pub const ANTSPATH_ENV_VAR: &str = "ANTSPATH";

/// Directories searched after `$PATH`
pub const DEFAULT_TOOL_PATHS: &[&str] =
    &["~/.local/bin", "~/bin", "/usr/local/bin", "/opt/ants/bin"];

/// Interpolation mode that never blends two labels
pub const LABEL_INTERPOLATION: &str = "GenericLabel";

/// One transform application: atlas in, label image on the reference grid out.
#[derive(Debug, Clone)]
pub struct TransformJob<'a> {
    pub input: &'a Path,
    pub reference: &'a Path,
    pub transform: &'a Path,
    pub output: &'a Path,
}

/// Captured streams of a successful tool run
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Port to the external registration/resampling tool.
///
/// Implementations must write a label image to `job.output` using
/// nearest-label interpolation, and report a non-zero exit as
/// [`RoiError::AlignmentFailed`].
pub trait RegistrationBackend: Send + Sync {
    fn name(&self) -> &str;

    fn apply_transform(&self, job: &TransformJob<'_>) -> Result<ToolOutput>;
}

/// Runs `antsApplyTransforms` as a blocking subprocess.
#[derive(Debug, Clone)]
pub struct AntsRunner {
    binary_path: PathBuf,
}

impl AntsRunner {
    /// Create a runner for the given executable
    ///
    /// # Returns
    /// An error if the binary doesn't exist
    pub fn new<P: AsRef<Path>>(binary_path: P) -> Result<Self> {
        let binary_path = binary_path.as_ref().to_path_buf();

        if !binary_path.exists() {
            return Err(RoiError::ToolNotFound(binary_path.display().to_string()));
        }

        Ok(Self { binary_path })
    }

    /// Locate the tool with [`find_tool`]
    pub fn discover() -> Result<Self> {
        find_tool(None)
            .map(|binary_path| Self { binary_path })
            .ok_or_else(|| {
                RoiError::ToolNotFound(format!(
                    "{} (set ${} or ${}, or add it to $PATH)",
                    TOOL_NAME, TOOL_ENV_VAR, ANTSPATH_ENV_VAR
                ))
            })
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Arguments for one invocation, in the fixed order the tool expects.
    pub fn build_args(job: &TransformJob<'_>) -> Vec<OsString> {
        vec![
            "-d".into(),
            "3".into(),
            "-i".into(),
            job.input.into(),
            "-r".into(),
            job.reference.into(),
            "-t".into(),
            job.transform.into(),
            "-o".into(),
            job.output.into(),
            "-n".into(),
            LABEL_INTERPOLATION.into(),
        ]
    }
}

impl RegistrationBackend for AntsRunner {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn apply_transform(&self, job: &TransformJob<'_>) -> Result<ToolOutput> {
        let mut command = Command::new(&self.binary_path);
        command.args(Self::build_args(job));

        log::info!("Executing registration command: {:?}", command);

        let start_time = std::time::Instant::now();
        let output = command.output().map_err(|e| RoiError::AlignmentFailed {
            status: "not started".to_string(),
            stdout: String::new(),
            stderr: format!("Failed to execute {}: {}", self.binary_path.display(), e),
        })?;

        log::info!(
            "{} completed in {:.2}s",
            TOOL_NAME,
            start_time.elapsed().as_secs_f64()
        );

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            log::error!("{} failed with status: {}", TOOL_NAME, output.status);
            log::error!("stdout: {}", stdout);
            log::error!("stderr: {}", stderr);

            return Err(RoiError::AlignmentFailed {
                status: output.status.to_string(),
                stdout,
                stderr,
            });
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn tool_file_name() -> String {
    if cfg!(target_os = "windows") {
        format!("{}.exe", TOOL_NAME)
    } else {
        TOOL_NAME.to_string()
    }
}

/// Find the registration tool.
///
/// Resolution order:
/// 1. Explicit path (if provided)
/// 2. `$ANTS_APPLY_TRANSFORMS`
/// 3. `$ANTSPATH/antsApplyTransforms`
/// 4. Each directory on `$PATH`
/// 5. [`DEFAULT_TOOL_PATHS`]
pub fn find_tool(explicit_path: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        let p = expand_path(path);
        return p.exists().then_some(p);
    }

    if let Ok(env_path) = std::env::var(TOOL_ENV_VAR) {
        let p = expand_path(&env_path);
        if p.exists() {
            return Some(p);
        }
    }

    let file_name = tool_file_name();

    if let Ok(ants_path) = std::env::var(ANTSPATH_ENV_VAR) {
        let p = expand_path(&ants_path).join(&file_name);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(path_var) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_var) {
            let p = dir.join(&file_name);
            if p.is_file() {
                return Some(p);
            }
        }
    }

    DEFAULT_TOOL_PATHS
        .iter()
        .map(|dir| expand_path(dir).join(&file_name))
        .find(|p| p.exists())
}
