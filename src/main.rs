//! `courier`: perform one HTTP request from the command line.
//!
//! ```text
//! courier [--config FILE] [-X METHOD] [-H 'Name: value']... [-d DATA]
//!         [--adapter NAME]... [--timeout MS] URL
//! ```
//!
//! Settings (defaults, validation strictness, log level) come from the TOML
//! file; flags override them for this request only.

use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;

use http_courier::config::{load_config, CourierConfig, RequestConfig};
use http_courier::observability::{logging, metrics};
use http_courier::{AdapterSelection, Client, CourierError};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Send an HTTP request through the courier pipeline", long_about = None)]
struct Cli {
    /// Settings file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Request method
    #[arg(short = 'X', long, default_value = "get")]
    method: String,

    /// Extra header, `Name: value`; repeatable
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body; parsed as JSON when possible
    #[arg(short, long)]
    data: Option<String>,

    /// Adapter to try, in order; repeatable
    #[arg(long)]
    adapter: Vec<String>,

    /// Timeout in milliseconds (0 disables)
    #[arg(long)]
    timeout: Option<u64>,

    /// Target URL, absolute or relative to the configured base URL
    url: String,
}

impl Cli {
    fn request_config(&self) -> RequestConfig {
        let mut config = RequestConfig::from(self.url.as_str()).with_method(self.method.as_str());
        for raw in &self.headers {
            config.headers.apply(raw.as_str(), None);
        }
        if let Some(data) = &self.data {
            let body = serde_json::from_str::<Value>(data).unwrap_or_else(|_| Value::String(data.clone()));
            config.data = Some(body);
        }
        if !self.adapter.is_empty() {
            config.adapter = Some(AdapterSelection::from(self.adapter.clone()));
        }
        config.timeout = self.timeout;
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => load_config(path)?,
        None => CourierConfig::default(),
    };

    logging::init_logging(&settings.observability.log_level);
    metrics::set_enabled(settings.observability.metrics_enabled);

    tracing::info!(
        method = %cli.method,
        url = %cli.url,
        settings = ?cli.config,
        "courier starting"
    );

    let client = Client::from_settings(&settings);
    match client.send(cli.request_config()).await {
        Ok(response) => {
            print_response(response.status, &response.status_text, &response.headers, &response.data)?;
            Ok(())
        }
        Err(err) => {
            if let Some(response) = err.response() {
                print_response(response.status, &response.status_text, &response.headers, &response.data)?;
            }
            report(&err);
            std::process::exit(1);
        }
    }
}

fn print_response(
    status: u16,
    status_text: &str,
    headers: &http_courier::Headers,
    data: &Value,
) -> Result<(), serde_json::Error> {
    println!("{} {}", status, status_text);
    if !headers.is_empty() {
        println!("{}", headers);
    }
    println!();
    match data {
        Value::String(text) => println!("{}", text),
        Value::Null => {}
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(())
}

fn report(err: &CourierError) {
    match err.code() {
        Some(code) => eprintln!("Error [{}]: {}", code, err),
        None => eprintln!("Error: {}", err),
    }
    tracing::error!(error = %err, "Request failed");
}
