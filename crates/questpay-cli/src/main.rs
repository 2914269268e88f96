//! questpay CLI
//!
//! Developer tool for poking at checkout flows without a browser.
//!
//! ## Usage
//!
//! ```bash
//! questpay classify '{"subscription":"basic_3mo"}'
//! questpay paypal-link '{"gemsBlock":{"key":"21gems","gems":21}}'
//! questpay simulate '{"sku":"Pet-Gryphon-Gryphatrice"}' --complete
//! ```

mod simulate;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use questpay_core::{CheckoutConfig, IntentBuilder, PurchaseOptions, PurchaseRequest, WatchOutcome};

use crate::simulate::Provider;

#[derive(Parser)]
#[command(name = "questpay")]
#[command(about = "Inspect and simulate questpay checkout flows", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify purchase options and show the Stripe session call and intent
    Classify {
        /// Purchase options as JSON
        #[arg(value_name = "JSON")]
        options: String,
    },

    /// Print the PayPal page a purchase would open
    PaypalLink {
        /// Purchase options as JSON
        #[arg(value_name = "JSON")]
        options: String,
    },

    /// Run a full checkout handshake across two in-memory browsing contexts
    Simulate {
        /// Purchase options as JSON
        #[arg(value_name = "JSON")]
        options: String,

        #[arg(short, long, value_enum, default_value = "paypal")]
        provider: Provider,

        /// Have the callback page mark the payment completed
        #[arg(long)]
        complete: bool,
    },
}

fn parse_options(raw: &str) -> anyhow::Result<PurchaseOptions> {
    serde_json::from_str(raw).context("purchase options must be a JSON object")
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify { options } => {
            let request = PurchaseRequest::classify(parse_options(&options)?)?;
            let session = IntentBuilder::stripe_session(&request);
            let intent = IntentBuilder::stripe_intent(&request, None, true);

            print_json(&json!({
                "paymentType": request.payment_type(),
                "stripe": {
                    "endpoint": session.endpoint.path(),
                    "body": session.body,
                },
                "intent": intent,
            }))?;
        }
        Commands::PaypalLink { options } => {
            let request = PurchaseRequest::classify(parse_options(&options)?)?;
            let redirect = IntentBuilder::paypal(&request)?;
            println!("{}", redirect.url);
        }
        Commands::Simulate {
            options,
            provider,
            complete,
        } => {
            let config = CheckoutConfig::from_env()?;
            tracing::info!(provider = ?provider, complete, "Simulating checkout");

            let report =
                simulate::run(parse_options(&options)?, provider, complete, config).await?;

            for url in &report.opened {
                println!("opened:    {url}");
            }
            match &report.outcome {
                WatchOutcome::Completed(intent) => {
                    println!("completed: {}", intent.payment_type());
                }
                WatchOutcome::Ignored(_) => println!("ignored:   no completion recorded"),
            }
            println!("reloads:   {}", report.reloads);
        }
    }

    Ok(())
}
