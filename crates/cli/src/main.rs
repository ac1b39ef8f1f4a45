//! precog CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse arguments**: method, URL, payload, validation scope, and
//!    fingerprint options.
//! 2. **Wire observability**: configure `tracing-subscriber` with either a
//!    human-readable or a JSON layer. All `tracing` spans and structured
//!    events emitted by every crate in the workspace flow through it.
//!    `RUST_LOG` controls filtering (default `warn`).
//! 3. **Construct infrastructure**: build the `ReqwestTransport` and inject it
//!    into a `precognition::Client`.
//! 4. **Run one request**: every dispatch status gets a handler that labels
//!    the outcome, so a 422 prints the validation errors instead of failing.

use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use precognition::{Client, DispatchStatus, Method, Outcome, RequestConfig};
use serde_json::{json, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use transport::ReqwestTransport;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

/// Send a precognitive request and print the outcome as JSON.
#[derive(Debug, Parser)]
#[command(name = "precog", version)]
struct Cli {
    /// HTTP method: get, post, patch, put or delete.
    method: Method,

    /// Request URL, absolute or relative to --base-url.
    url: String,

    /// Base URL for relative request URLs.
    #[arg(long)]
    base_url: Option<String>,

    /// JSON payload. Defaults to `{}` for post, patch and put.
    #[arg(long, value_parser = parse_json)]
    data: Option<Value>,

    /// Extra request header as `Name: value`. Repeatable.
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Field path the server should validate. Repeatable.
    #[arg(long = "validate")]
    validate: Vec<String>,

    /// Also validate every parent of each dotted field path.
    #[arg(long)]
    auto_validate_parent_keys: bool,

    /// Explicit fingerprint for this request.
    #[arg(long, conflicts_with = "no_fingerprint")]
    fingerprint: Option<String>,

    /// Send without a fingerprint.
    #[arg(long)]
    no_fingerprint: bool,

    /// Total request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log output format (logs go to stderr).
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

impl Cli {
    fn request_config(&self) -> RequestConfig {
        let mut config = RequestConfig::new();

        if let Some(base_url) = &self.base_url {
            config = config.base_url(base_url.clone());
        }
        for (name, value) in &self.headers {
            config = config.header(name.clone(), value.clone());
        }
        if !self.validate.is_empty() {
            config = config.validate(self.validate.iter().cloned());
        }
        if let Some(fingerprint) = &self.fingerprint {
            config = config.fingerprint(fingerprint.as_str());
        } else if self.no_fingerprint {
            config = config.without_fingerprint();
        }

        let data = match self.method {
            Method::Post | Method::Patch | Method::Put => {
                Some(self.data.clone().unwrap_or_else(|| json!({})))
            }
            Method::Get | Method::Delete => self.data.clone(),
        };
        if let Some(data) = data {
            config = config.data(data);
        }

        for status in DispatchStatus::ALL {
            config = config.on_status(status, move |response, _| async move {
                Ok(Outcome::Value(json!({
                    "status": response.status,
                    "outcome": outcome_label(status),
                    "data": response.data,
                })))
            });
        }

        config
    }
}

fn outcome_label(status: DispatchStatus) -> &'static str {
    match status {
        DispatchStatus::PrecognitionSuccess => "precognition_success",
        DispatchStatus::Unauthorized => "unauthorized",
        DispatchStatus::Forbidden => "forbidden",
        DispatchStatus::NotFound => "not_found",
        DispatchStatus::Conflict => "conflict",
        DispatchStatus::ValidationError => "validation_error",
        DispatchStatus::Locked => "locked",
    }
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{raw}'"));
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Pretty => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut builder = ReqwestTransport::builder();
    if let Some(secs) = cli.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let transport = builder.build().context("failed to construct HTTP transport")?;

    let client = Client::new(transport);
    client.auto_validate_parent_keys(cli.auto_validate_parent_keys);

    info!(method = %cli.method, url = %cli.url, "Sending precognitive request");
    let outcome = client
        .request(cli.method, cli.url.as_str(), cli.request_config())
        .await
        .with_context(|| format!("{} {} failed", cli.method, cli.url))?;
    debug!(?outcome, "Request settled");

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers() {
        assert_eq!(
            parse_header("X-Requested-With: XMLHttpRequest"),
            Ok(("X-Requested-With".to_owned(), "XMLHttpRequest".to_owned()))
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn post_defaults_to_empty_object() {
        let cli = Cli::parse_from(["precog", "post", "https://x/users", "--validate", "name"]);
        let config = cli.request_config();

        assert_eq!(config.payload(), Some(&json!({})));
        assert_eq!(config.validate_fields(), Some(&["name".to_owned()][..]));
        assert_eq!(config.status_handlers().registered().len(), DispatchStatus::ALL.len());
    }

    #[test]
    fn get_has_no_payload_by_default() {
        let cli = Cli::parse_from(["precog", "GET", "/docs", "--no-fingerprint"]);
        let config = cli.request_config();

        assert_eq!(config.payload(), None);
        assert_eq!(
            config.fingerprint_setting(),
            &precognition::FingerprintSetting::Disabled
        );
    }

    #[test]
    fn fingerprint_flags_conflict() {
        let parsed = Cli::try_parse_from([
            "precog",
            "get",
            "/docs",
            "--fingerprint",
            "a",
            "--no-fingerprint",
        ]);
        assert!(parsed.is_err());
    }
}
