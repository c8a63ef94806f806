use anyhow::{Context, Result};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use autoilty_scraper::{BusinessStore, Orchestrator, RunSummary, ScraperConfig};

const USAGE: &str = "\
Usage:
  autoilty-scraper [run] [CITY...]   scrape the given cities (default: SCRAPE_CITIES or the test cities)
  autoilty-scraper --all             scrape all major Canadian cities
  autoilty-scraper stats             show stored listings per category
  autoilty-scraper help              show this message";

#[derive(Debug, PartialEq)]
enum Command {
    /// Explicit city list; empty means "use the configured cities"
    Run(Vec<String>),
    RunAll,
    Stats,
    Help,
}

impl Command {
    fn parse(args: &[String]) -> Command {
        let mut args = args.iter().map(|a| a.as_str()).peekable();

        match args.peek().copied() {
            Some("stats") => Command::Stats,
            Some("help") | Some("--help") | Some("-h") => Command::Help,
            Some("--all") => Command::RunAll,
            Some("run") => {
                args.next();
                if args.peek() == Some(&"--all") {
                    Command::RunAll
                } else {
                    Command::Run(args.map(|a| a.to_string()).collect())
                }
            }
            _ => Command::Run(args.map(|a| a.to_string()).collect()),
        }
    }
}

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialise logging: {:#}", e);
    }

    let args: Vec<String> = env::args().skip(1).collect();

    if let Err(e) = run(Command::parse(&args)) {
        error!(error = %format!("{:#}", e), "Scraper failed");
        std::process::exit(1);
    }
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("autoilty_scraper=info".parse()?))
        .init();
    Ok(())
}

fn run(command: Command) -> Result<()> {
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = ScraperConfig::from_env()?;

    match command {
        Command::Stats => run_stats(&config),
        Command::RunAll => run_scrape(&config, ScraperConfig::major_cities()),
        Command::Run(cities) if cities.is_empty() => run_scrape(&config, config.cities.clone()),
        Command::Run(cities) => run_scrape(&config, cities),
        Command::Help => Ok(()),
    }
}

fn run_scrape(config: &ScraperConfig, cities: Vec<String>) -> Result<()> {
    let store = BusinessStore::open(&config.database_path)?;
    info!(path = %config.database_path.display(), "Store opened");

    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = interrupt.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Could not install Ctrl-C handler");
    }

    let summary = Orchestrator::live(config, &store)
        .with_interrupt(interrupt)
        .scrape_all(&cities);

    // Report, then always release the store
    let report = print_summary(&store, &summary);
    store.close()?;
    report
}

fn print_summary(store: &BusinessStore, summary: &RunSummary) -> Result<()> {
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📊 Scrape summary");
    for city in &summary.cities {
        match &city.error {
            Some(e) => println!("  ❌ {:<16} failed: {}", city.city, e),
            None => println!("  ✓ {:<16} {} new", city.city, city.saved),
        }
    }
    println!("  Total new listings: {}", summary.total_saved);
    println!("  Elapsed: {:.1} min", summary.elapsed.as_secs_f64() / 60.0);
    if summary.interrupted {
        println!("  ⚠️  Interrupted before all cities were scraped");
    }

    let stored = store.count().context("Failed to count stored listings")?;
    println!("  Listings in store: {}", stored);

    Ok(())
}

fn run_stats(config: &ScraperConfig) -> Result<()> {
    let store = BusinessStore::open(&config.database_path)?;

    let total = store.count()?;
    let by_category = store.count_by_category()?;

    println!("📊 {} listings in {}", total, config.database_path.display());
    for (category, count) in by_category {
        println!("  {:<18} {}", category.as_str(), count);
    }

    store.close()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(&args(&[])), Command::Run(vec![]));
        assert_eq!(Command::parse(&args(&["run"])), Command::Run(vec![]));
        assert_eq!(
            Command::parse(&args(&["run", "Halifax", "Regina"])),
            Command::Run(args(&["Halifax", "Regina"]))
        );
        assert_eq!(Command::parse(&args(&["Kelowna"])), Command::Run(args(&["Kelowna"])));
        assert_eq!(Command::parse(&args(&["--all"])), Command::RunAll);
        assert_eq!(Command::parse(&args(&["run", "--all"])), Command::RunAll);
        assert_eq!(Command::parse(&args(&["stats"])), Command::Stats);
        assert_eq!(Command::parse(&args(&["--help"])), Command::Help);
    }
}
