use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Management CLI for the reliability service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, env = "RELIABILITY_ADMIN_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Service version and registry sizes
    Status,
    /// Run all health checks and print the report
    Health,
    /// List circuit breakers
    Breakers,
    /// Show one circuit breaker
    Breaker { name: String },
    /// Force a circuit breaker closed
    Reset { name: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Status => {
            client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Health => client.get(format!("{}/health", cli.url)).send().await?,
        Commands::Breakers => {
            client
                .get(format!("{}/admin/breakers", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Breaker { name } => {
            client
                .get(format!("{}/admin/breakers/{}", cli.url, name))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Reset { name } => {
            client
                .post(format!("{}/admin/breakers/{}/reset", cli.url, name))
                .headers(headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    // /health answers 503 with a full report when unhealthy.
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if !status.is_success() => {
            eprintln!("Error: API returned status {}", status);
            if !text.is_empty() {
                eprintln!("Response: {}", text);
            }
        }
        Err(e) => return Err(e.into()),
    }

    if !status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
