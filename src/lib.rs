pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod fields;
pub mod gps;
pub mod html_doc;
pub mod ip_lookup;
pub mod layout;
pub mod metadata;
pub mod pdf_text;
pub mod processor;
pub mod reencode;
pub mod walker;
pub mod web_server;
