//! CLI arguments and server configuration defaults.

use clap::Parser;
use shadow_rs::formatcp;

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const SLOT_A_FILENAME: &str = "pdf_a.pdf";
pub const SLOT_B_FILENAME: &str = "pdf_b.pdf";
pub const UPLOAD_FIELD_NAME: &str = "file";
pub const UPLOAD_TEMP_DIR: &str = ".upload_tmp";
pub const DEFAULT_UPLOAD_MAX_SIZE: u64 = 50 * 1024 * 1024;
pub const DEFAULT_TEMP_TTL_SECS: u64 = 60 * 60;
pub const TEMP_CLEAN_INTERVAL_SECS: u64 = 300;

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug)]
#[command(name = "pdfpair", version = VERSION_INFO, about = "PdfPair server")]
pub struct Args {
    #[arg(
        short = 's',
        long,
        env = "PDFPAIR_STORAGE_DIR",
        default_value = ".pdfpair/storage",
        help = "Storage directory for uploaded PDFs"
    )]
    pub storage_dir: String,
    #[arg(
        short = 'b',
        long,
        env = "PDFPAIR_BIND",
        default_value = "0.0.0.0",
        help = "Bind address for HTTP"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "PDFPAIR_PORT",
        default_value_t = 5000,
        help = "HTTP port"
    )]
    pub port: u16,
    #[arg(
        long,
        env = "PDFPAIR_ANALYZER_URL",
        default_value = "http://127.0.0.1:8000/analyze",
        help = "External PDF analysis endpoint"
    )]
    pub analyzer_url: String,
    #[arg(
        long,
        env = "PDFPAIR_UPLOAD_MAX_SIZE",
        default_value_t = DEFAULT_UPLOAD_MAX_SIZE,
        help = "Max upload body size in bytes (0 to disable)"
    )]
    pub upload_max_size: u64,
    #[arg(long, env = "PDFPAIR_CORS_ORIGINS", help = "Comma separated CORS origins (default: allow all)")]
    pub cors_origins: Option<String>,
    #[arg(
        long,
        env = "PDFPAIR_TEMP_TTL_SECS",
        default_value_t = DEFAULT_TEMP_TTL_SECS,
        help = "Stale upload temp cleanup threshold in seconds (0 to disable)"
    )]
    pub temp_ttl_secs: u64,
}
