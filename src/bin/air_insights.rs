use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use reqwest::Url;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use air_quality_service::client::{AqiClient, InsightsView, SearchController, SearchState};

const POPULAR_CITIES: [&str; 4] = ["Los Angeles", "New York", "Tokyo", "London"];
const QUIT: &str = ":q";

#[derive(Parser)]
#[command(name = "air-insights")]
#[command(about = "Look up live air quality and health guidance for a city", long_about = None)]
struct Cli {
    /// City to look up; omit to start the interactive prompt
    city: Option<String>,

    /// Show the stricter guidance for people with asthma
    #[arg(long)]
    asthma: bool,

    /// API base: a path such as "/api-proxy" or a URL such as "http://backend:8080"
    #[arg(long, env = "AQI_API_BASE")]
    api_base: Option<String>,

    /// Origin the client behaves as if it were served from
    #[arg(long, default_value = "http://localhost")]
    page_origin: Url,

    /// Print the raw reading as JSON instead of the insights view
    #[arg(long)]
    json: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_seconds: u64,
}

/// Run one search to completion and print the result
async fn search_and_render(
    controller: &SearchController<AqiClient>,
    city: &str,
    asthma: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(rejected) = controller.submit(city, asthma) {
        println!("{rejected}");
        return Ok(());
    }

    println!("{}", InsightsView::build(&controller.state(), true, Utc::now()));

    let mut updates = controller.subscribe();
    let settled = updates.wait_for(SearchState::is_settled).await?.clone();

    match (&settled, json) {
        (SearchState::Success(result), true) => {
            println!("{}", serde_json::to_string_pretty(&result.reading)?);
        }
        _ => print!("{}", InsightsView::build(&settled, true, Utc::now())),
    }
    Ok(())
}

async fn landing_loop(
    controller: &SearchController<AqiClient>,
    asthma: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Check the air before you head out.");
    println!("Popular: {}", POPULAR_CITIES.join(", "));
    println!("Type a city and press enter ({QUIT} to quit).");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input == QUIT {
            break;
        }
        debug!("Landing input {:?}", input);
        search_and_render(controller, input, asthma, json).await?;
        println!();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Diagnostics go to stderr so the rendered view stays readable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let client = AqiClient::for_page(
        cli.api_base.as_deref(),
        cli.page_origin.clone(),
        Duration::from_secs(cli.timeout_seconds),
    )?;
    debug!("Using API base {}", client.base());
    let controller = SearchController::new(client);

    match cli.city.as_deref() {
        Some(city) => search_and_render(&controller, city, cli.asthma, cli.json).await?,
        None => landing_loop(&controller, cli.asthma, cli.json).await?,
    }

    if controller.state().is_loading() {
        warn!("Exiting with a search still in flight");
        controller.cancel();
    }
    Ok(())
}
