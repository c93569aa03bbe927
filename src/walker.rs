use crate::error::AppError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Walks `root` and feeds every file whose extension is on the allow-list to
/// the processing channel. Returns the number of files discovered.
pub fn start_walking(
    root: &Path,
    allowed_extensions: &HashSet<String>,
    paths_tx: crossbeam_channel::Sender<PathBuf>,
) -> Result<usize, AppError> {
    log::info!("Discovering images under {:?}", root);
    log::debug!("Allow-listed extensions: {:?}", allowed_extensions);

    let mut discovered = 0usize;
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            log::trace!("Skipping non-file entry: {:?}", entry.path());
            continue;
        }
        let path = entry.path();
        match path.extension().and_then(|s| s.to_str()) {
            Some(ext) if allowed_extensions.contains(&ext.to_lowercase()) => {
                log::debug!("Queueing image for stripping: {:?}", path);
                paths_tx.send(path.to_path_buf())?;
                discovered += 1;
            }
            Some(_) => log::trace!("Skipping file with unsupported extension: {:?}", path),
            None => log::trace!("Skipping file with no extension: {:?}", path),
        }
    }

    log::info!("Discovery complete: {} file(s)", discovered);
    Ok(discovered)
}
