//! VeriLens Server CLI
//!
//! Starts the HTTP server that classifies and fact-checks posts.

use std::env;
use std::process;
use tracing_subscriber::EnvFilter;
use verilens_server::{config::ServerConfig, start_server, ServerError};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let args: Vec<String> = env::args().collect();

    let config = if args.len() > 2 && args[1] == "--config" {
        ServerConfig::from_file(&args[2])?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        eprintln!("Warning: No config file specified, using development configuration");
        eprintln!("Usage: verilens-server --config <path-to-config.toml>");
        eprintln!();
        ServerConfig::development()
    };

    start_server(config).await?;

    Ok(())
}

fn print_help() {
    println!("VeriLens Server - Post classification and fact-checking API");
    println!();
    println!("USAGE:");
    println!("    verilens-server --config <path-to-config.toml>");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    GEMINI_API_KEY     Model provider API key (required; name set by provider.api_key_env)");
    println!("    RUST_LOG           Log filter (default: info)");
    println!();
    println!("CONFIGURATION:");
    println!("    The TOML config file may contain:");
    println!("    - bind_address, bind_port: listen address (default 127.0.0.1:8000)");
    println!("    - max_upload_bytes: request body and image download limit (default 10 MiB)");
    println!("    - image_fetch_timeout_secs: time allowed for an image_url download (default 15)");
    println!("    - [provider]: base_url, model, api_key_env, timeout_secs");
    println!("    - [ocr]: enabled, command, language, timeout_secs");
    println!("    - [analyzer]: max_text_length, model_call_timeout_secs");
    println!();
}
