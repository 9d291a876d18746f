//! Plot rendering: wrap the script, run it, harvest the figure file.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tempfile::TempDir;
use tracing::{debug, warn};

use super::OctaveRunner;
use crate::{
    context::CallContext,
    error::ExecError,
    gate::Slot,
    safety::{sanitize_script, validate_script},
};

const WORKSPACE_PREFIX: &str = "octave-plot-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotFormat {
    Png,
    Svg,
}

impl PlotFormat {
    /// Case-insensitive; anything but png or svg is refused.
    pub fn parse(raw: &str) -> Result<Self, ExecError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            other => Err(ExecError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Svg => "image/svg+xml",
        }
    }

    fn print_device(&self) -> &'static str {
        match self {
            Self::Png => "-dpng",
            Self::Svg => "-dsvg",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlotArtifact {
    pub format: PlotFormat,
    pub data: Vec<u8>,
}

impl PlotArtifact {
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Hidden figures on the given toolkit, the caller's script, then a print of
/// the current figure to `output`.
pub fn wrap_plot_script(toolkit: &str, script: &str, output: &Path, format: PlotFormat) -> String {
    // single-quoted Octave strings only escape the quote itself
    let path = output.to_string_lossy().replace('\'', "''");
    format!(
        "graphics_toolkit(\"{toolkit}\");\nset(0, \"defaultfigurevisible\", \"off\");\n{script}\nprint('{path}', '{device}');\n",
        device = format.print_device(),
    )
}

/// Owner-only scratch directory, removed when the call ends.
#[derive(Debug)]
struct PlotWorkspace {
    dir: TempDir,
}

impl PlotWorkspace {
    fn create(root: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        restrict_permissions(dir.path())?;
        debug!(path = %dir.path().display(), "plot workspace created");
        Ok(Self { dir })
    }

    fn output_path(&self, format: PlotFormat) -> PathBuf {
        self.dir.path().join(format!("plot.{}", format.extension()))
    }

    /// Removal errors are logged, never returned.
    fn cleanup(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %path.display(), "plot workspace removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove plot workspace"),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    fs::metadata(path).map(|_| ())
}

impl OctaveRunner {
    /// Renders the figure drawn by `script` as `format` ("png" or "svg").
    ///
    /// One slot is held for the whole call and handed to the nested run.
    pub async fn generate_plot(
        &self,
        ctx: &CallContext,
        script: &str,
        format: &str,
    ) -> Result<PlotArtifact, ExecError> {
        let format = PlotFormat::parse(format)?;
        if script.chars().all(|c| c == '\0') {
            return Err(ExecError::EmptyScript);
        }
        validate_script(script)?;

        let slot = self.gate().acquire(ctx).await?;
        let workspace = PlotWorkspace::create(self.settings().plot_dir.as_deref())
            .map_err(ExecError::Environment)?;

        let result = self.render(ctx, script, format, &workspace, slot).await;
        workspace.cleanup();
        result
    }

    async fn render(
        &self,
        ctx: &CallContext,
        script: &str,
        format: PlotFormat,
        workspace: &PlotWorkspace,
        slot: Slot,
    ) -> Result<PlotArtifact, ExecError> {
        let output = workspace.output_path(format);
        let toolkit = &self.settings().graphics_toolkit;

        // leave room for the wrapper so the trailing print survives the length cap
        let overhead = wrap_plot_script(toolkit, "", &output, format).chars().count();
        let limit = self.script_length_limit();
        let budget = limit.saturating_sub(overhead);
        if budget == 0 {
            warn!(limit, overhead, "length limit too small for plot wrapper");
            return Err(ExecError::PlotBudgetExhausted { limit, overhead });
        }
        let script = sanitize_script(script, budget);
        let wrapped = wrap_plot_script(toolkit, &script, &output, format);

        self.execute_with_slot(ctx, &wrapped, slot)
            .await
            .map_err(|e| match e {
                ExecError::Cancelled(_) => e,
                other => ExecError::PlotFailed(Box::new(other)),
            })?;

        let data = tokio::fs::read(&output).await.map_err(ExecError::MissingArtifact)?;
        debug!(bytes = data.len(), format = format.extension(), "plot rendered");
        Ok(PlotArtifact { format, data })
    }
}
