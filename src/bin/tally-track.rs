use anyhow::Result;
use clap::{Parser, Subcommand};
use tally::client::{Tier, VisitOutcome, VisitTracker};
use tally::config::Config;

#[derive(Parser)]
#[command(name = "tally-track")]
#[command(about = "Record and display visitor statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a visit through the fallback chain (at most once per
    /// 30-minute session window)
    Visit,
    /// Show the current statistics without recording anything
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let tracker = VisitTracker::new(&config.client)?;

    let outcome = match cli.command {
        Commands::Visit => {
            let now_ms = chrono::Utc::now().timestamp_millis();
            let outcome = tracker.visit(now_ms).await;
            if outcome.recorded {
                println!("✓ Visit recorded via {}", tier_name(outcome.tier));
            } else {
                println!("Visit already counted this session, showing current stats");
            }
            outcome
        }
        Commands::Show => tracker.current().await,
    };

    print_stats(&outcome);
    Ok(())
}

fn tier_name(tier: Tier) -> &'static str {
    match tier {
        Tier::Remote => "the tracking server",
        Tier::CounterApi => "the public counter API",
        Tier::LocalOnly => "local storage only",
    }
}

fn print_stats(outcome: &VisitOutcome) {
    println!("Total visitors: {}", outcome.stats.total_visitors);

    if outcome.stats.countries.is_empty() {
        println!("No country data yet");
        return;
    }

    // Sort countries by count, descending
    let mut countries: Vec<_> = outcome.stats.countries.iter().collect();
    countries.sort_by(|a, b| b.1.count.cmp(&a.1.count));

    for (code, entry) in countries {
        println!("  {} {} ({code}): {}", entry.flag, entry.name, entry.count);
    }
}
