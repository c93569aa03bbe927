//! Batch strip processing.
//!
//! Drains the discovery channel and re-encodes every file in a worker pool.
//! Each file is an independent operation with its own buffers; a failure is
//! logged and skipped, never fatal to the batch.

use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::reencode::{self, ImageCodec, OutputFormat};

/// What happened to one file of the batch.
#[derive(Debug)]
pub struct StripReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub bytes_written: u64,
    pub fell_back: bool,
}

pub fn start_processing(
    codec: &dyn ImageCodec,
    num_workers: usize,
    requested: Option<OutputFormat>,
    output_dir: Option<&Path>,
    paths_rx: crossbeam_channel::Receiver<PathBuf>,
    reports_tx: crossbeam_channel::Sender<StripReport>,
) -> Result<(), AppError> {
    let paths: Vec<PathBuf> = paths_rx.iter().collect();
    log::info!("Stripping {} file(s)", paths.len());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_workers)
        .build()
        .map_err(|e| AppError::Generic(e.to_string()))?;

    pool.install(|| {
        paths.into_par_iter().try_for_each(|path| {
            match strip_file(codec, &path, requested, output_dir) {
                Ok(report) => {
                    log::info!(
                        "Stripped {:?} -> {:?} ({} bytes)",
                        report.input,
                        report.output,
                        report.bytes_written
                    );
                    reports_tx.send(report)?;
                    Ok::<(), AppError>(())
                }
                Err(e) => {
                    // Keep going; the rest of the batch is unaffected.
                    log::warn!("Failed to strip {:?}: {}", path, e);
                    Ok::<(), AppError>(())
                }
            }
        })
    })?;

    log::info!("Batch complete.");
    Ok(())
}

/// Strips one file and writes the cleaned sibling (or into `output_dir`).
pub fn strip_file(
    codec: &dyn ImageCodec,
    path: &Path,
    requested: Option<OutputFormat>,
    output_dir: Option<&Path>,
) -> Result<StripReport, AppError> {
    log::debug!("Stripping {:?}", path);
    let bytes = std::fs::read(path)?;
    let outcome = reencode::strip_image(codec, &bytes, requested)?;

    let input_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let output_name = reencode::clean_file_name(&input_name, outcome.format);
    let output = match output_dir {
        Some(dir) => dir.join(&output_name),
        None => path.with_file_name(&output_name),
    };

    std::fs::write(&output, &outcome.bytes)?;
    Ok(StripReport {
        input: path.to_path_buf(),
        output,
        format: outcome.format,
        bytes_written: outcome.bytes.len() as u64,
        fell_back: outcome.fell_back,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reencode::NativeCodec;
    use std::io::Cursor;

    #[test]
    fn strip_file_writes_sibling_clean_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pic.png");
        let img = image::DynamicImage::new_rgb8(3, 3);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageOutputFormat::Png).unwrap();
        std::fs::write(&input, buf.into_inner()).unwrap();

        let report = strip_file(&NativeCodec::default(), &input, None, None).unwrap();
        assert_eq!(report.output, dir.path().join("pic-clean.png"));
        assert!(report.output.exists());
        assert!(!report.fell_back);
    }

    #[test]
    fn bad_file_in_batch_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"definitely not a png").unwrap();

        let (paths_tx, paths_rx) = crossbeam_channel::unbounded();
        let (reports_tx, reports_rx) = crossbeam_channel::unbounded();
        paths_tx.send(dir.path().join("broken.png")).unwrap();
        drop(paths_tx);

        start_processing(&NativeCodec::default(), 1, None, None, paths_rx, reports_tx).unwrap();
        assert_eq!(reports_rx.iter().count(), 0);
    }
}
