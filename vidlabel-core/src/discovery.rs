//! File discovery module for finding videos to load.
//!
//! Only the top level of a directory is scanned. Every regular file is a
//! candidate; the prober decides later whether it is really a video.

use crate::error::{CoreError, CoreResult};

use std::path::{Path, PathBuf};

/// Finds the files a directory load turns into videos.
///
/// Returns the regular files directly inside `input_dir`, sorted by file name.
/// Subdirectories are not searched.
///
/// # Errors
///
/// * `CoreError::Io` - If the directory cannot be read
/// * `CoreError::NoFilesFound` - If the directory holds no regular files
///
/// # Examples
///
/// ```rust,no_run
/// use vidlabel_core::find_processable_files;
/// use std::path::Path;
///
/// let files = find_processable_files(Path::new("/path/to/videos")).unwrap();
/// for file in files {
///     println!("  {}", file.display());
/// }
/// ```
pub fn find_processable_files(input_dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let read_dir = std::fs::read_dir(input_dir)?;
    let mut files: Vec<PathBuf> = read_dir
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            path.is_file().then_some(path)
        })
        .collect();

    if files.is_empty() {
        return Err(CoreError::NoFilesFound(input_dir.display().to_string()));
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
