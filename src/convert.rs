use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::info;

use crate::archive::extract_file;
use crate::config::{ConvertConfig, PlanDefaults};
use crate::test_plan::build_with;

/// Where the plan for `archive_path` goes by default: next to the archive,
/// same stem, `.jmx` extension.
pub fn output_path_for(archive_path: &Path) -> PathBuf {
    archive_path.with_extension(PlanDefaults::default().output_extension)
}

/// Converts one session archive into a JMeter plan and returns the path written.
pub fn convert_archive(archive_path: &Path, output: Option<&Path>, config: &ConvertConfig) -> Result<PathBuf> {
    if !archive_path.is_file() {
        return Err(anyhow!(format!("file {:?} not found", archive_path.to_path_buf())));
    }

    let sessions = extract_file(archive_path, &config.filter())
        .context(format!("while reading archive {}", archive_path.display()))?;
    let document = build_with(&sessions, &PlanDefaults::default())
        .context(format!("while building test plan from {}", archive_path.display()))?;

    let output_path = output.map(Path::to_path_buf).unwrap_or_else(|| output_path_for(archive_path));
    document
        .write_to(&output_path)
        .context(format!("while writing {}", output_path.display()))?;

    info!("wrote {} sessions to {}", sessions.len(), output_path.display());
    return Ok(output_path);
}
