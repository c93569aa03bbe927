use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use exif::Error as ExifError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("EXIF error: {0}")]
    Exif(#[from] ExifError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] SerdeJsonError),

    #[error("Tokio join error: {0}")]
    Join(#[from] JoinError),

    #[error("Channel send error")]
    SendError,

    #[error("Channel receive error")]
    RecvError,

    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("IP lookup failed: {0}")]
    IpLookup(String),

    #[error("Generic error: {0}")]
    Generic(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Walkdir(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Image(_) => StatusCode::BAD_REQUEST,
            AppError::Exif(_) => StatusCode::BAD_REQUEST,
            AppError::Pdf(_) => StatusCode::BAD_REQUEST,
            AppError::Http(_) => StatusCode::BAD_GATEWAY,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SendError => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RecvError => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Encode(_) => StatusCode::BAD_REQUEST,
            AppError::IpLookup(_) => StatusCode::BAD_GATEWAY,
            AppError::Generic(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl<T> From<crossbeam_channel::SendError<T>> for AppError {
    fn from(_: crossbeam_channel::SendError<T>) -> Self {
        AppError::SendError
    }
}

impl From<crossbeam_channel::RecvError> for AppError {
    fn from(_: crossbeam_channel::RecvError) -> Self {
        AppError::RecvError
    }
}
