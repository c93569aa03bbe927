use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use file_toolbox::analyzer;
use file_toolbox::cli::{Cli, Command};
use file_toolbox::config::AppConfig;
use file_toolbox::error::AppError;
use file_toolbox::fields;
use file_toolbox::html_doc;
use file_toolbox::ip_lookup;
use file_toolbox::layout;
use file_toolbox::metadata::MetadataRecord;
use file_toolbox::pdf_text;
use file_toolbox::processor;
use file_toolbox::reencode::{NativeCodec, OutputFormat};
use file_toolbox::walker;
use file_toolbox::web_server;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::new()?;

    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    match cli.command {
        Command::Inspect { file, json } => inspect(&config, &file, json).await?,
        Command::Strip { path, format, output } => {
            strip(&config, &path, format.as_deref(), output.as_deref()).await?
        }
        Command::PdfToHtml { file, output, max_pages } => {
            pdf_to_html(&config, &file, output, max_pages).await?
        }
        Command::Ip => ip(&config).await?,
        Command::Serve { port } => {
            let mut config = config;
            if let Some(port) = port {
                config.web_port = port;
            }
            info!("Starting file_toolbox service");
            web_server::start_web_server(Arc::new(config)).await?;
        }
    }

    Ok(())
}

async fn inspect(config: &AppConfig, file: &Path, json: bool) -> Result<(), AppError> {
    let name = file_name(file);
    if !analyzer::is_supported_image(&name, &config.allowed_image_extensions) {
        return Err(AppError::UnsupportedMedia(format!(
            "{} is not a recognized image (JPEG, PNG, HEIC/HEIF, WebP, TIFF, ...)",
            name
        )));
    }

    let record = analyzer::analyze_file(file).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_summary(&record);
    }
    Ok(())
}

fn print_summary(record: &MetadataRecord) {
    println!(
        "{} \u{b7} {}{}",
        record.file_name,
        fields::format_bytes(record.file_size),
        record
            .media_type
            .as_deref()
            .map(|t| format!(" \u{b7} {}", t))
            .unwrap_or_default()
    );
    println!();

    let dash = "\u{2014}".to_string();
    println!("Date Taken  {}", record.date_taken.as_ref().unwrap_or(&dash));
    println!("Camera      {}", record.camera.as_ref().unwrap_or(&dash));
    println!("Resolution  {}", record.resolution().unwrap_or_else(|| dash.clone()));
    println!("Location    {}", record.location().unwrap_or_else(|| dash.clone()));

    let rows = record.detail_rows();
    if !rows.is_empty() {
        println!();
        for (key, value) in rows {
            println!("{:<18} {}", key, value);
        }
    }

    println!();
    println!("{}", record.raw_dump());
}

async fn strip(
    config: &AppConfig,
    path: &Path,
    format: Option<&str>,
    output: Option<&Path>,
) -> Result<(), AppError> {
    let requested = match format {
        Some(f) => Some(OutputFormat::from_extension(f).ok_or_else(|| {
            AppError::UnsupportedMedia(format!("{} is not a supported output format", f))
        })?),
        None => None,
    };
    if let Some(dir) = output {
        std::fs::create_dir_all(dir)?;
    }

    if path.is_dir() {
        return strip_batch(config, path, requested, output).await;
    }

    let codec = NativeCodec { jpeg_quality: config.jpeg_quality };
    let name = file_name(path);
    if !analyzer::is_supported_image(&name, &config.allowed_image_extensions) {
        return Err(AppError::UnsupportedMedia(format!(
            "{} is not a recognized image",
            name
        )));
    }
    let report = processor::strip_file(&codec, path, requested, output)?;
    println!(
        "All metadata removed \u{2022} {} \u{2022} {:?}{}",
        fields::format_bytes(report.bytes_written),
        report.output,
        if report.fell_back { " (PNG fallback)" } else { "" }
    );
    Ok(())
}

/// A discovery task feeds a worker pool over channels; results drain into a
/// summary once both sides finish.
async fn strip_batch(
    config: &AppConfig,
    root: &Path,
    requested: Option<OutputFormat>,
    output: Option<&Path>,
) -> Result<(), AppError> {
    let (paths_tx, paths_rx) = crossbeam_channel::unbounded();
    let (reports_tx, reports_rx) = crossbeam_channel::unbounded();

    let allowed = config.allowed_image_extensions.clone();
    let walk_root = root.to_path_buf();
    let walker_handle = tokio::task::spawn_blocking(move || {
        walker::start_walking(&walk_root, &allowed, paths_tx)
    });

    let jpeg_quality = config.jpeg_quality;
    let num_workers = config.num_workers;
    let output_dir = output.map(Path::to_path_buf);
    let processor_handle = tokio::task::spawn_blocking(move || {
        let codec = NativeCodec { jpeg_quality };
        processor::start_processing(
            &codec,
            num_workers,
            requested,
            output_dir.as_deref(),
            paths_rx,
            reports_tx,
        )
    });

    let (discovered, processed) = tokio::try_join!(walker_handle, processor_handle)?;
    let discovered = discovered?;
    processed?;

    let reports: Vec<_> = reports_rx.iter().collect();
    let written: u64 = reports.iter().map(|r| r.bytes_written).sum();
    println!(
        "Cleaned {}/{} file(s) \u{2022} {}",
        reports.len(),
        discovered,
        fields::format_bytes(written)
    );
    if reports.len() < discovered {
        println!("{} file(s) failed; see the log for details.", discovered - reports.len());
    }
    Ok(())
}

async fn pdf_to_html(
    config: &AppConfig,
    file: &Path,
    output: Option<PathBuf>,
    max_pages: usize,
) -> Result<(), AppError> {
    let name = file_name(file);
    let bytes = tokio::fs::read(file).await?;
    if !pdf_text::is_pdf(&name, &bytes) {
        return Err(AppError::UnsupportedMedia(format!(
            "{} is not a PDF (.pdf) file",
            name
        )));
    }

    let tolerance = config.pdf_line_tolerance;
    let (title, pages) = tokio::task::spawn_blocking(move || {
        let (title, pages) = pdf_text::extract_pages(&bytes, max_pages)?;
        Ok::<_, AppError>((title, layout::reconstruct_pages(&pages, tolerance)))
    })
    .await??;

    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let title = title.unwrap_or_else(|| stem.clone());
    let html = html_doc::build_standalone_html(&title, &pages);

    let output = output.unwrap_or_else(|| file.with_file_name(format!("{}.html", stem)));
    tokio::fs::write(&output, &html).await?;
    println!(
        "Done \u{2022} {} page(s) \u{2022} {} \u{2022} {:?}",
        pages.len(),
        fields::format_bytes(html.len() as u64),
        output
    );
    Ok(())
}

async fn ip(config: &AppConfig) -> Result<(), AppError> {
    let client = reqwest::Client::new();
    match ip_lookup::lookup(&client, &config.ip_endpoints, config.ip_timeout_secs).await {
        Ok(report) => {
            println!("{}", report.ip);
            info!("Public IP detected via {}", report.source);
            Ok(())
        }
        Err(e) => {
            log::error!("All IP endpoints failed");
            Err(e)
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}
