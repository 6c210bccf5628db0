use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the `lpi-export` binary.
#[derive(Debug, Parser)]
#[command(
    name = "lpi-export",
    version,
    about = "LPI report exporter and headless PDF render service"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "LPI_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the headless PDF render service.
    Serve(Box<ServeArgs>),
    /// Export the report contained in an HTML document to PDF.
    Export(ExportArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BrowserOverrides {
    /// Override the Chromium executable used for rendering.
    #[arg(long = "browser-executable", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub executable: Option<PathBuf>,

    /// Toggle the Chromium sandbox.
    #[arg(
        long = "browser-sandbox",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub sandbox: Option<bool>,

    /// Override the page load timeout.
    #[arg(long = "browser-navigation-timeout-seconds", value_name = "SECONDS")]
    pub navigation_timeout_seconds: Option<u64>,

    /// Override how many times canvases are checked for drawn content.
    #[arg(long = "browser-canvas-poll-attempts", value_name = "COUNT")]
    pub canvas_poll_attempts: Option<u32>,

    /// Override the pause between canvas checks.
    #[arg(long = "browser-canvas-poll-interval-ms", value_name = "MILLIS")]
    pub canvas_poll_interval_ms: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub browser: BrowserOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the maximum accepted request body size in bytes.
    #[arg(long = "server-max-body-bytes", value_name = "BYTES")]
    pub server_max_body_bytes: Option<u64>,

    /// Override the `Access-Control-Allow-Origin` value.
    #[arg(long = "server-cors-allow-origin", value_name = "ORIGIN")]
    pub server_cors_allow_origin: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override the id of the element holding the report.
    #[arg(long = "content-id", value_name = "ID")]
    pub content_id: Option<String>,

    /// Render endpoint to try, in order; replaces the configured list when given.
    #[arg(long = "endpoint", value_name = "URL")]
    pub endpoints: Vec<String>,

    /// Suggested name for the downloaded PDF.
    #[arg(long = "filename", value_name = "NAME")]
    pub filename: Option<String>,

    /// Directory receiving the PDF or the print fallback page.
    #[arg(long = "output-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// Never open a print view; a failed render abandons the export instead.
    #[arg(long = "no-print-view")]
    pub no_print_view: bool,

    /// HTML document containing the report view.
    #[arg(value_name = "DOCUMENT", value_hint = ValueHint::FilePath)]
    pub document: PathBuf,
}
