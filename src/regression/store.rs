//! Report history: timestamped copies and baseline seeding.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use super::report::ReportError;

/// File name for a saved report: `report_<branch>_<YYYYmmdd_HHMMSS>.json`,
/// with `/` in the branch name replaced by `_`.
#[must_use]
pub fn archive_name(branch: &str, at: DateTime<Local>) -> String {
    format!(
        "report_{}_{}.json",
        branch.replace('/', "_"),
        at.format("%Y%m%d_%H%M%S")
    )
}

/// Copy `current` into `reports_dir` under [`archive_name`].
///
/// Creates `reports_dir` if needed. Returns the path of the copy.
///
/// # Errors
/// [`ReportError::Io`] on any filesystem failure.
pub fn archive_report(
    current: &Path,
    reports_dir: &Path,
    branch: &str,
    at: DateTime<Local>,
) -> Result<PathBuf, ReportError> {
    fs::create_dir_all(reports_dir).map_err(|source| ReportError::Io {
        path: reports_dir.to_owned(),
        source,
    })?;
    let dest = reports_dir.join(archive_name(branch, at));
    copy_atomic(current, &dest)?;
    info!(dest = %dest.display(), "archived report");
    Ok(dest)
}

/// Copy `saved` to `baseline` unless a baseline already exists.
///
/// Returns `true` if the baseline was created.
///
/// # Errors
/// [`ReportError::Io`] on any filesystem failure.
pub fn seed_baseline(saved: &Path, baseline: &Path) -> Result<bool, ReportError> {
    if baseline.exists() {
        return Ok(false);
    }
    if let Some(parent) = baseline.parent() {
        fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            path: parent.to_owned(),
            source,
        })?;
    }
    copy_atomic(saved, baseline)?;
    info!(baseline = %baseline.display(), "seeded baseline");
    Ok(true)
}

/// Copy via a temp file in the destination directory, then rename.
fn copy_atomic(src: &Path, dest: &Path) -> Result<(), ReportError> {
    fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ReportError {
        let path = path.to_owned();
        move |source| ReportError::Io { path, source }
    }

    let bytes = fs::read(src).map_err(io_err(src))?;
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err(dir))?;
    tmp.write_all(&bytes).map_err(io_err(dest))?;
    tmp.as_file().sync_all().map_err(io_err(dest))?;
    tmp.persist(dest).map_err(|e| ReportError::Io {
        path: dest.to_owned(),
        source: e.error,
    })?;
    Ok(())
}
