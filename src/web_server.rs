use actix_files::NamedFile;
use actix_web::http::header::CONTENT_DISPOSITION;
use actix_web::{web, App, HttpResponse, HttpServer};
use std::collections::HashMap;
use std::sync::Arc;

use crate::analyzer;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::html_doc;
use crate::ip_lookup;
use crate::layout;
use crate::pdf_text;
use crate::reencode::{self, NativeCodec, OutputFormat};

type Query = web::Query<HashMap<String, String>>;

async fn index() -> Result<NamedFile, AppError> {
    NamedFile::open_async("./static/index.html").await.map_err(|e| {
        log::error!("Error serving index.html: {}", e);
        AppError::Io(e)
    })
}

fn query_name<'a>(query: &'a Query, fallback: &'a str) -> &'a str {
    query.get("name").map(String::as_str).unwrap_or(fallback)
}

/// One uploaded image in, one metadata record out.
async fn inspect(
    config: web::Data<AppConfig>,
    query: Query,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let name = query_name(&query, "image").to_string();
    log::debug!("Inspect request for {} ({} bytes)", name, body.len());

    if !analyzer::is_supported_image(&name, &config.allowed_image_extensions) {
        return Err(AppError::UnsupportedMedia(format!(
            "{} is not a recognized image",
            name
        )));
    }

    let size = body.len() as u64;
    let record = analyzer::analyze_bytes(name, size, Arc::new(body.to_vec())).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Re-encode an uploaded image, shedding its metadata; the response is the
/// cleaned file as an attachment.
async fn strip(
    config: web::Data<AppConfig>,
    query: Query,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let name = query_name(&query, "image").to_string();
    log::debug!("Strip request for {} ({} bytes)", name, body.len());

    if !analyzer::is_supported_image(&name, &config.allowed_image_extensions) {
        return Err(AppError::UnsupportedMedia(format!(
            "{} is not a recognized image",
            name
        )));
    }

    let requested = query
        .get("format")
        .and_then(|f| OutputFormat::from_extension(f));
    let codec = NativeCodec { jpeg_quality: config.jpeg_quality };
    let bytes = body.to_vec();
    let outcome =
        tokio::task::spawn_blocking(move || reencode::strip_image(&codec, &bytes, requested))
            .await??;

    let download_name = reencode::clean_file_name(&name, outcome.format);
    log::info!(
        "Stripped {} -> {} ({} bytes{})",
        name,
        download_name,
        outcome.bytes.len(),
        if outcome.fell_back { ", PNG fallback" } else { "" }
    );
    Ok(HttpResponse::Ok()
        .content_type(outcome.format.media_type())
        .insert_header((
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_name),
        ))
        .body(outcome.bytes))
}

/// Extract a PDF's text into a standalone HTML document.
async fn pdf_to_html(
    config: web::Data<AppConfig>,
    query: Query,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let name = query_name(&query, "document.pdf").to_string();
    log::debug!("PDF request for {} ({} bytes)", name, body.len());

    if !pdf_text::is_pdf(&name, &body) {
        return Err(AppError::UnsupportedMedia(format!("{} is not a PDF", name)));
    }

    let max_pages = query
        .get("max_pages")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0usize);
    let tolerance = config.pdf_line_tolerance;
    let stem = file_stem(&name);
    let bytes = body.to_vec();
    let html = tokio::task::spawn_blocking(move || {
        let (title, pages) = pdf_text::extract_pages(&bytes, max_pages)?;
        let pages = layout::reconstruct_pages(&pages, tolerance);
        let title = title.unwrap_or_else(|| stem.clone());
        Ok::<_, AppError>(html_doc::build_standalone_html(&title, &pages))
    })
    .await??;

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .insert_header((
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.html\"", file_stem(&name)),
        ))
        .body(html))
}

async fn ip(
    config: web::Data<AppConfig>,
    client: web::Data<reqwest::Client>,
) -> Result<HttpResponse, AppError> {
    let report =
        ip_lookup::lookup(&client, &config.ip_endpoints, config.ip_timeout_secs).await?;
    Ok(HttpResponse::Ok().json(report))
}

fn file_stem(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

pub async fn start_web_server(config: Arc<AppConfig>) -> std::io::Result<()> {
    let port = config.web_port;
    let config_data = web::Data::from(config);
    let client_data = web::Data::new(reqwest::Client::new());

    log::info!("Starting web server on port: {}", port);
    log::debug!("Serving static files from ./static directory.");

    HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(client_data.clone())
            .service(actix_files::Files::new("/static", "./static"))
            .service(web::resource("/api/inspect").route(web::post().to(inspect)))
            .service(web::resource("/api/strip").route(web::post().to(strip)))
            .service(web::resource("/api/pdf-to-html").route(web::post().to(pdf_to_html)))
            .service(web::resource("/api/ip").route(web::get().to(ip)))
            .default_service(web::to(index))
    })
    .bind(format!("0.0.0.0:{}", port))?
    .run()
    .await
}
