use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};

/// Copies `data_file` into `backup_dir` as `<YYMMDD_HH_MM_SS>__<file name>`.
/// Returns `Ok(None)` when there is nothing to back up yet.
pub fn backup_data_file(data_file: &Path, backup_dir: &Path) -> io::Result<Option<PathBuf>> {
    if !data_file.exists() {
        warn!(path = %data_file.display(), "cannot create backup, data file not found");
        return Ok(None);
    }

    let file_name = data_file
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "data path has no file name"))?;

    fs::create_dir_all(backup_dir)?;
    let stamp = Local::now().format("%y%m%d_%H_%M_%S");
    let destination = backup_dir.join(format!("{stamp}__{}", file_name.to_string_lossy()));
    fs::copy(data_file, &destination)?;

    info!(path = %destination.display(), "created backup");
    Ok(Some(destination))
}
