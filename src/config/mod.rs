//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;
#[cfg(test)]
mod tests;

pub use cli::{
    BrowserOverrides, CliArgs, Command, ExportArgs, LoggingOverrides, ServeArgs, ServeOverrides,
};

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use lpi_render_types::{DEFAULT_FILENAME, DEFAULT_MARGIN, Margins, PageFormat, RenderOptions};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::length::CssLength;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "lpi-export";
const ENV_PREFIX: &str = "LPI";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 10;
const DEFAULT_MAX_BODY_BYTES: u64 = 50 * 1024 * 1024;
const DEFAULT_CORS_ALLOW_ORIGIN: &str = "*";
const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CANVAS_POLL_ATTEMPTS: u32 = 10;
const DEFAULT_CANVAS_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3001/api/generate-pdf";
const DEFAULT_CONTENT_ID: &str = "report-content";
const DEFAULT_FALLBACK_CONTENT_IDS: [&str; 2] = ["lpi-report", "report"];
const DEFAULT_EXCLUDE_SELECTOR: &str = "[data-export-controls]";
const DEFAULT_PAGE_BLOCK_SELECTOR: &str = ".report-page";
const DEFAULT_FONT_STYLESHEET: &str =
    "https://fonts.googleapis.com/css2?family=Inter:wght@400;500;600;700&display=swap";
const DEFAULT_OUTPUT_DIR: &str = "exports";
const LIST_KEYS: [&str; 3] = [
    "export.endpoints",
    "export.fallback_content_ids",
    "export.exclude_selectors",
];

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub browser: BrowserSettings,
    pub export: ExportSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
    pub max_body_bytes: NonZeroUsize,
    pub cors_allow_origin: String,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub executable: Option<PathBuf>,
    pub sandbox: bool,
    pub navigation_timeout: Duration,
    pub canvas_poll_attempts: NonZeroU32,
    pub canvas_poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub endpoints: Vec<Url>,
    pub content_id: String,
    pub fallback_content_ids: Vec<String>,
    pub exclude_selectors: Vec<String>,
    pub page_block_selector: String,
    pub font_stylesheet: Option<Url>,
    pub output_dir: PathBuf,
    pub default_filename: String,
    pub options: RenderOptions,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    let mut environment = Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .list_separator(",")
        .try_parsing(true);
    for key in LIST_KEYS {
        environment = environment.with_list_parse_key(key);
    }
    builder = builder.add_source(environment);

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Export(args)) => raw.apply_export_overrides(args),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    browser: RawBrowserSettings,
    export: RawExportSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(bytes) = overrides.server_max_body_bytes {
            self.server.max_body_bytes = Some(bytes);
        }
        if let Some(origin) = overrides.server_cors_allow_origin.as_ref() {
            self.server.cors_allow_origin = Some(origin.clone());
        }

        self.apply_logging_overrides(&overrides.logging);
        self.apply_browser_overrides(&overrides.browser);
    }

    fn apply_export_overrides(&mut self, args: &ExportArgs) {
        if let Some(id) = args.content_id.as_ref() {
            self.export.content_id = Some(id.clone());
        }
        if !args.endpoints.is_empty() {
            self.export.endpoints = Some(args.endpoints.clone());
        }
        if let Some(filename) = args.filename.as_ref() {
            self.export.filename = Some(filename.clone());
        }
        if let Some(dir) = args.output_dir.as_ref() {
            self.export.output_dir = Some(dir.clone());
        }

        self.apply_logging_overrides(&args.logging);
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_browser_overrides(&mut self, overrides: &BrowserOverrides) {
        if let Some(path) = overrides.executable.as_ref() {
            self.browser.executable = Some(path.clone());
        }
        if let Some(sandbox) = overrides.sandbox {
            self.browser.sandbox = Some(sandbox);
        }
        if let Some(seconds) = overrides.navigation_timeout_seconds {
            self.browser.navigation_timeout_seconds = Some(seconds);
        }
        if let Some(attempts) = overrides.canvas_poll_attempts {
            self.browser.canvas_poll_attempts = Some(attempts);
        }
        if let Some(millis) = overrides.canvas_poll_interval_ms {
            self.browser.canvas_poll_interval_ms = Some(millis);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            browser,
            export,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let browser = build_browser_settings(browser)?;
        let export = build_export_settings(export)?;

        Ok(Self {
            server,
            logging,
            browser,
            export,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }
    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    let max_body_value = server.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES);
    let max_body_usize = usize::try_from(max_body_value).map_err(|_| {
        LoadError::invalid(
            "server.max_body_bytes",
            "value exceeds supported range for usize",
        )
    })?;
    let max_body_bytes = NonZeroUsize::new(max_body_usize)
        .ok_or_else(|| LoadError::invalid("server.max_body_bytes", "must be greater than zero"))?;

    let cors_allow_origin = server
        .cors_allow_origin
        .map(|origin| origin.trim().to_string())
        .unwrap_or_else(|| DEFAULT_CORS_ALLOW_ORIGIN.to_string());
    if cors_allow_origin.is_empty() {
        return Err(LoadError::invalid(
            "server.cors_allow_origin",
            "must not be empty",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
        max_body_bytes,
        cors_allow_origin,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_browser_settings(browser: RawBrowserSettings) -> Result<BrowserSettings, LoadError> {
    let executable = browser
        .executable
        .filter(|path| !path.as_os_str().is_empty());

    let timeout_secs = browser
        .navigation_timeout_seconds
        .unwrap_or(DEFAULT_NAVIGATION_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "browser.navigation_timeout_seconds",
            "must be greater than zero",
        ));
    }

    let attempts = browser
        .canvas_poll_attempts
        .unwrap_or(DEFAULT_CANVAS_POLL_ATTEMPTS);
    let canvas_poll_attempts = NonZeroU32::new(attempts).ok_or_else(|| {
        LoadError::invalid("browser.canvas_poll_attempts", "must be greater than zero")
    })?;

    let interval_ms = browser
        .canvas_poll_interval_ms
        .unwrap_or(DEFAULT_CANVAS_POLL_INTERVAL_MS);

    Ok(BrowserSettings {
        executable,
        sandbox: browser.sandbox.unwrap_or(false),
        navigation_timeout: Duration::from_secs(timeout_secs),
        canvas_poll_attempts,
        canvas_poll_interval: Duration::from_millis(interval_ms),
    })
}

fn build_export_settings(export: RawExportSettings) -> Result<ExportSettings, LoadError> {
    let raw_endpoints = export
        .endpoints
        .unwrap_or_else(|| vec![DEFAULT_ENDPOINT.to_string()]);
    let endpoints = raw_endpoints
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(parse_endpoint)
        .collect::<Result<Vec<_>, _>>()?;
    if endpoints.is_empty() {
        return Err(LoadError::invalid(
            "export.endpoints",
            "at least one render endpoint is required",
        ));
    }

    let content_id = export
        .content_id
        .unwrap_or_else(|| DEFAULT_CONTENT_ID.to_string());
    validate_element_id(&content_id, "export.content_id")?;

    let fallback_content_ids = export.fallback_content_ids.unwrap_or_else(|| {
        DEFAULT_FALLBACK_CONTENT_IDS
            .iter()
            .map(|id| id.to_string())
            .collect()
    });
    for id in &fallback_content_ids {
        validate_element_id(id, "export.fallback_content_ids")?;
    }

    let exclude_selectors = export
        .exclude_selectors
        .unwrap_or_else(|| vec![DEFAULT_EXCLUDE_SELECTOR.to_string()]);
    for selector in &exclude_selectors {
        selector.parse::<lol_html::Selector>().map_err(|err| {
            LoadError::invalid(
                "export.exclude_selectors",
                format!("`{selector}` is not a supported selector: {err}"),
            )
        })?;
    }

    let page_block_selector = export
        .page_block_selector
        .map(|selector| selector.trim().to_string())
        .unwrap_or_else(|| DEFAULT_PAGE_BLOCK_SELECTOR.to_string());
    if page_block_selector.is_empty() || page_block_selector.contains(['{', '}']) {
        return Err(LoadError::invalid(
            "export.page_block_selector",
            "must be a non-empty selector without braces",
        ));
    }
    page_block_selector.parse::<lol_html::Selector>().map_err(|err| {
        LoadError::invalid(
            "export.page_block_selector",
            format!("`{page_block_selector}` is not a supported selector: {err}"),
        )
    })?;

    let font_stylesheet = match export.font_stylesheet {
        Some(value) if value.trim().is_empty() => None,
        Some(value) => Some(Url::parse(value.trim()).map_err(|err| {
            LoadError::invalid("export.font_stylesheet", format!("invalid URL: {err}"))
        })?),
        None => Some(Url::parse(DEFAULT_FONT_STYLESHEET).map_err(|err| {
            LoadError::invalid("export.font_stylesheet", format!("invalid URL: {err}"))
        })?),
    };

    let output_dir = export
        .output_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    if output_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "export.output_dir",
            "path must not be empty",
        ));
    }

    let default_filename = export
        .filename
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

    let format = match export.format.as_deref() {
        Some(value) => parse_page_format(value)?,
        None => PageFormat::default(),
    };

    let margin = export
        .margin
        .unwrap_or_else(|| DEFAULT_MARGIN.to_string());
    margin
        .parse::<CssLength>()
        .map_err(|err| LoadError::invalid("export.margin", err.to_string()))?;

    Ok(ExportSettings {
        endpoints,
        content_id,
        fallback_content_ids,
        exclude_selectors,
        page_block_selector,
        font_stylesheet,
        output_dir,
        default_filename,
        options: RenderOptions {
            format,
            print_background: export.print_background.unwrap_or(true),
            margin: Margins::uniform(margin.trim()),
        },
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
    max_body_bytes: Option<u64>,
    cors_allow_origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBrowserSettings {
    executable: Option<PathBuf>,
    sandbox: Option<bool>,
    navigation_timeout_seconds: Option<u64>,
    canvas_poll_attempts: Option<u32>,
    canvas_poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawExportSettings {
    endpoints: Option<Vec<String>>,
    content_id: Option<String>,
    fallback_content_ids: Option<Vec<String>>,
    exclude_selectors: Option<Vec<String>>,
    page_block_selector: Option<String>,
    font_stylesheet: Option<String>,
    output_dir: Option<PathBuf>,
    filename: Option<String>,
    format: Option<String>,
    margin: Option<String>,
    print_background: Option<bool>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_endpoint(value: &str) -> Result<Url, LoadError> {
    let url = Url::parse(value).map_err(|err| {
        LoadError::invalid("export.endpoints", format!("invalid URL `{value}`: {err}"))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LoadError::invalid(
            "export.endpoints",
            format!("unsupported scheme `{other}` in `{value}`"),
        )),
    }
}

fn parse_page_format(value: &str) -> Result<PageFormat, LoadError> {
    PageFormat::from_name(value).ok_or_else(|| {
        LoadError::invalid(
            "export.format",
            format!("unknown page format `{}`", value.trim()),
        )
    })
}

fn validate_element_id(id: &str, key: &'static str) -> Result<(), LoadError> {
    if id.trim().is_empty() {
        return Err(LoadError::invalid(key, "element id must not be empty"));
    }
    if id.chars().any(|ch| ch == '"' || ch == '\\' || ch.is_whitespace()) {
        return Err(LoadError::invalid(
            key,
            format!("element id `{id}` must not contain quotes, backslashes or whitespace"),
        ));
    }
    Ok(())
}
