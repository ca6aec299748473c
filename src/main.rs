//! polyedge: prediction market mispricing scanner
//!
//! Modes:
//!   scan          one-off scan, print ranked opportunities
//!   run           autonomous loop: scan, size, paper-log, monitor resolutions
//!   run --live    same pipeline with real execution (requires a signer)
//!   status        tracker status
//!   calibration   calibration report

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use polyedge::adapters::{
    GammaClient, MarketDataProvider, Notifier, NullNotifier, PaperExecutor, TradeExecutor,
    UnconfiguredLiveExecutor,
};
use polyedge::config::AppConfig;
use polyedge::error::{PolyedgeError, Result};
use polyedge::services::{PositionMonitor, ScanService};
use polyedge::strategy::{OpportunityRanker, PositionSizer};
use polyedge::tracker::CalibrationTracker;

#[derive(Parser)]
#[command(name = "polyedge", version, about = "Prediction market mispricing scanner")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Override the paper bankroll
    #[arg(long, global = true, env = "POLYEDGE_BANKROLL")]
    bankroll: Option<Decimal>,
}

#[derive(Subcommand)]
enum Command {
    /// Scan once and print ranked opportunities
    Scan {
        /// Max markets to fetch
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Run the autonomous scan + monitor loops
    Run {
        /// Execute real orders instead of paper logging
        #[arg(long)]
        live: bool,
    },
    /// Show tracker status
    Status,
    /// Show the calibration report
    Calibration,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    if let Some(bankroll) = cli.bankroll {
        config.scan.starting_bankroll = bankroll;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .init();

    let tracker = Arc::new(CalibrationTracker::new(PathBuf::from(
        &config.tracker.store_path,
    )));
    tracker.load().await?;

    match cli.command {
        Command::Scan { limit } => scan_once(config, limit).await,
        Command::Run { live } => run_loops(config, tracker, live).await,
        Command::Status => {
            println!("{}", tracker.format_status().await);
            Ok(())
        }
        Command::Calibration => {
            match tracker.get_calibration_report().await {
                Some(report) => {
                    println!(
                        "\nResolved: {} | WR: {:.1}% | P&L: ${:+.2} | ROI: {:+.1}%",
                        report.total_resolved,
                        report.win_rate * 100.0,
                        report.total_pnl,
                        report.roi_pct
                    );
                    println!("High confidence WR: {:.1}%", report.high_confidence_win_rate * 100.0);
                    println!("\nBucket   N    Actual   Error");
                    for bucket in &report.buckets {
                        println!(
                            "{:>5.0}%  {:>3}  {:>6.1}%  {:>6.1}%",
                            bucket.bucket * 100.0,
                            bucket.n,
                            bucket.actual_frequency * 100.0,
                            bucket.calibration_error * 100.0
                        );
                    }
                    println!(
                        "\n{}",
                        if report.ready_for_live {
                            "READY FOR LIVE"
                        } else {
                            "Not ready for live yet (need 50+ resolved and positive P&L)"
                        }
                    );
                }
                None => println!("\nNo resolved bets yet. Need 50+ for meaningful stats.\n"),
            }
            Ok(())
        }
    }
}

/// One-off scan, report to stdout
async fn scan_once(config: AppConfig, limit: Option<usize>) -> Result<()> {
    let provider = GammaClient::new();
    let ranker = OpportunityRanker::new(config.ranker.clone());

    let markets = provider
        .fetch_markets(limit.unwrap_or(config.scan.market_limit))
        .await?;
    let opportunities = ranker.rank(&markets, chrono::Utc::now());

    println!(
        "\nScanned {} markets, {} opportunities above threshold\n",
        markets.len(),
        opportunities.len()
    );
    for (i, opp) in opportunities.iter().take(10).enumerate() {
        let m = &opp.market;
        println!("#{} [{}] {}", i + 1, opp.confidence, m.question);
        println!(
            "   Market: YES={:.1}% NO={:.1}% | our est: {:.1}% | edge: {:+.1}%",
            m.yes_price * 100.0,
            m.no_price * 100.0,
            opp.our_probability * 100.0,
            opp.edge * 100.0
        );
        println!(
            "   EV(YES)={:+.1}% EV(NO)={:+.1}% | Kelly={:.1}% -> BET {}",
            opp.ev_yes * 100.0,
            opp.ev_no * 100.0,
            opp.best_kelly() * 100.0,
            opp.recommended_side
        );
        println!("   {}\n", opp.rationale);
    }
    Ok(())
}

/// Autonomous mode: scan loop + resolution monitor until ctrl-c
async fn run_loops(config: AppConfig, tracker: Arc<CalibrationTracker>, live: bool) -> Result<()> {
    let provider = Arc::new(GammaClient::new());
    let notifier = NullNotifier::from_env_or_null();

    let executor: Arc<dyn TradeExecutor> = if live {
        let live_executor = UnconfiguredLiveExecutor;
        if !live_executor.is_configured() {
            return Err(PolyedgeError::MissingCapability(
                "live mode requires a configured exchange signer; run without --live to paper trade"
                    .into(),
            ));
        }
        Arc::new(live_executor)
    } else {
        Arc::new(PaperExecutor::new(config.scan.starting_bankroll))
    };

    let scanner = Arc::new(ScanService::new(
        provider.clone(),
        executor,
        notifier.clone(),
        tracker.clone(),
        OpportunityRanker::new(config.ranker.clone()),
        PositionSizer::new(config.sizer.clone()),
        config.scan.clone(),
        live,
    ));
    let monitor = Arc::new(PositionMonitor::new(
        provider,
        tracker,
        notifier.clone(),
        config.monitor.clone(),
    ));

    info!(live, "starting polyedge");
    notifier
        .send(&format!(
            "polyedge started ({} mode). Scanning for mispricings.",
            if live { "LIVE" } else { "PAPER" }
        ))
        .await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scan_handle = {
        let scanner = scanner.clone();
        let rx = shutdown_rx.clone();
        tokio::spawn(async move { scanner.run(rx).await })
    };
    let monitor_handle = {
        let monitor = monitor.clone();
        let rx = shutdown_rx;
        tokio::spawn(async move { monitor.run(rx).await })
    };

    tokio::signal::ctrl_c().await?;
    warn!("shutdown signal received, stopping loops");
    let _ = shutdown_tx.send(true);

    // Loops exit at their next select point; in-flight collaborator calls
    // are bounded by their own timeouts
    let _ = scan_handle.await;
    let _ = monitor_handle.await;

    notifier.send("polyedge stopped.").await;
    info!("shut down cleanly");
    Ok(())
}
