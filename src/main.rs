mod assembler;
mod config;
mod error;
mod filter;
mod indicator;
mod insight;
mod model;
mod presenter;
mod report;
mod sentiment;
mod source;
mod strategy;
mod trend;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use assembler::{BatchOutcome, Refresh, RefreshController, ScanSettings, assemble_batch};
use config::{AppConfig, MarketConfig};
use filter::FilterCriteria;
use presenter::Presenter;
use presenter::json::JsonPresenter;
use presenter::terminal::TerminalPresenter;
use source::MarketDataSource;
use source::yahoo::YahooSource;
use strategy::{RecommendationStrategy, StrategyKind, build_strategy};

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("invalid command-line argument")]
    Argument,
    #[display("report error")]
    Report,
    #[display("runtime error")]
    Runtime,
}

#[derive(Parser)]
#[command(name = "stock-advisor", about = "Stock screening and recommendation tool")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate the configured markets and list the best opportunities
    Scan(ScanArgs),
    /// Detailed analysis of a single symbol, printed as JSON
    Insight(InsightArgs),
}

#[derive(Args)]
struct ScanArgs {
    /// Recommendation strategy: "rating" or "technical"
    #[arg(long)]
    strategy: Option<String>,
    /// Restrict to these markets (repeatable)
    #[arg(long = "market")]
    markets: Vec<String>,
    #[arg(long)]
    strong_buy_only: bool,
    /// Drop stocks whose low analyst target is below the current price
    #[arg(long)]
    hide_downside_risk: bool,
    /// Print results as JSON instead of text
    #[arg(long)]
    json: bool,
    /// Number of stocks to show, ranked by potential return
    #[arg(long, default_value_t = 10)]
    top: usize,
    /// Save the top stocks as JSON; without a value uses `general.report_path`
    #[arg(long)]
    report: Option<Option<PathBuf>>,
    /// Re-run the scan every SECS seconds until Ctrl+C
    #[arg(long, value_name = "SECS")]
    watch: Option<u64>,
}

#[derive(Args)]
struct InsightArgs {
    symbol: String,
    /// Recommendation strategy: "rating" or "technical"
    #[arg(long)]
    strategy: Option<String>,
    /// News text to run sentiment analysis on
    #[arg(long)]
    news: Option<String>,
}

/// What a finished scan is turned into.
struct Output {
    criteria: FilterCriteria,
    top: usize,
    presenter: Box<dyn Presenter>,
    report_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = config::load(Path::new(&cli.config)).change_context(AppError::Config)?;

    init_tracing(&config);

    let source: Arc<dyn MarketDataSource> = Arc::new(YahooSource::new(&config.source));

    match cli.command {
        Command::Scan(args) => scan(&config, source, args).await,
        Command::Insight(args) => insight(&config, source.as_ref(), args).await,
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    // Logs go to stderr so JSON results on stdout stay parseable
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

fn resolve_strategy(
    config: &AppConfig,
    requested: Option<&str>,
) -> Result<StrategyKind, Report<AppError>> {
    match requested {
        None => Ok(config.strategy_kind()),
        Some(s) => StrategyKind::from_str(s).ok_or_else(|| {
            Report::new(AppError::Argument).attach(format!("unknown strategy \"{s}\""))
        }),
    }
}

fn scan_settings(config: &AppConfig) -> ScanSettings {
    ScanSettings {
        history_period: config.history_period(),
        indicators: config.indicator_settings(),
        fetch_timeout: config.fetch_timeout(),
        max_concurrent_fetches: config.general.max_concurrent_fetches,
    }
}

/// Config filter criteria with the command-line overrides applied.
fn scan_criteria(config: &AppConfig, args: &ScanArgs) -> Result<FilterCriteria, Report<AppError>> {
    let mut criteria = config.filter_criteria();
    if !args.markets.is_empty() {
        if let Some(unknown) = args
            .markets
            .iter()
            .find(|name| !config.markets.iter().any(|m| &m.name == *name))
        {
            return Err(
                Report::new(AppError::Argument).attach(format!("unknown market \"{unknown}\""))
            );
        }
        criteria.markets = args.markets.iter().cloned().collect();
    }
    criteria.strong_buy_only |= args.strong_buy_only;
    criteria.hide_downside_risk |= args.hide_downside_risk;
    Ok(criteria)
}

async fn scan(
    config: &AppConfig,
    source: Arc<dyn MarketDataSource>,
    args: ScanArgs,
) -> Result<(), Report<AppError>> {
    let kind = resolve_strategy(config, args.strategy.as_deref())?;
    let strategy: Arc<dyn RecommendationStrategy> =
        Arc::from(build_strategy(kind, &config.indicator_settings()));
    let criteria = scan_criteria(config, &args)?;

    // Markets the filter would reject are not fetched at all
    let universe: Arc<Vec<MarketConfig>> = Arc::new(
        config
            .markets
            .iter()
            .filter(|m| criteria.markets.contains(&m.name))
            .cloned()
            .collect(),
    );
    let settings = Arc::new(scan_settings(config));
    info!(
        strategy = kind.as_str(),
        markets = universe.len(),
        top = args.top,
        "scan started"
    );

    let output = Output {
        criteria,
        top: args.top,
        presenter: if args.json {
            Box::new(JsonPresenter)
        } else {
            Box::new(TerminalPresenter)
        },
        report_path: args
            .report
            .map(|path| path.unwrap_or_else(|| PathBuf::from(&config.general.report_path))),
    };

    match args.watch {
        None => {
            let cancel = CancellationToken::new();
            let ctrl_c_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("ctrl+c received, cancelling refresh");
                    ctrl_c_cancel.cancel();
                }
            });

            match assemble_batch(
                source.as_ref(),
                &universe,
                strategy.as_ref(),
                &settings,
                &cancel,
            )
            .await
            {
                Refresh::Completed(batch) => publish(&batch, &output),
                Refresh::Cancelled => Ok(()),
            }
        }
        Some(secs) => watch(source, universe, strategy, settings, &output, secs).await,
    }
}

async fn watch(
    source: Arc<dyn MarketDataSource>,
    universe: Arc<Vec<MarketConfig>>,
    strategy: Arc<dyn RecommendationStrategy>,
    settings: Arc<ScanSettings>,
    output: &Output,
    secs: u64,
) -> Result<(), Report<AppError>> {
    let shutdown = CancellationToken::new();
    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("ctrl+c received, shutting down");
                ctrl_c_shutdown.cancel();
            }
            Err(e) => warn!(error = %e, "failed to listen for ctrl+c"),
        }
    });

    let period = Duration::from_secs(secs.max(1));
    info!(interval_secs = period.as_secs(), "watch mode started");

    let summary = watch_loop(
        period,
        |cancel| {
            let source = Arc::clone(&source);
            let universe = Arc::clone(&universe);
            let strategy = Arc::clone(&strategy);
            let settings = Arc::clone(&settings);
            async move {
                assemble_batch(
                    source.as_ref(),
                    &universe,
                    strategy.as_ref(),
                    &settings,
                    &cancel,
                )
                .await
            }
        },
        shutdown,
        |batch| publish(batch, output),
    )
    .await?;

    info!(
        published = summary.published,
        superseded = summary.superseded,
        "shutdown complete"
    );
    Ok(())
}

/// Counts of what a watch session did with its refreshes.
#[derive(Debug, Default, PartialEq, Eq)]
struct WatchSummary {
    published: usize,
    superseded: usize,
}

/// Start a refresh on every tick of `period` until `shutdown` fires.
///
/// Each tick cancels the refresh still in flight; only completed batches
/// reach `on_batch`.
async fn watch_loop<S, F>(
    period: Duration,
    start_refresh: S,
    shutdown: CancellationToken,
    mut on_batch: impl FnMut(&BatchOutcome) -> Result<(), Report<AppError>>,
) -> Result<WatchSummary, Report<AppError>>
where
    S: Fn(CancellationToken) -> F,
    F: Future<Output = Refresh> + Send + 'static,
{
    let (refresh_tx, mut refresh_rx) = mpsc::channel::<Refresh>(4);
    let mut controller = RefreshController::default();
    let mut interval = tokio::time::interval(period);
    let mut summary = WatchSummary::default();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                controller.cancel();
                break;
            }
            _ = interval.tick() => {
                let refresh = start_refresh(controller.begin());
                let tx = refresh_tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(refresh.await).await;
                });
            }
            Some(refresh) = refresh_rx.recv() => match refresh {
                Refresh::Completed(batch) => {
                    on_batch(&batch)?;
                    summary.published += 1;
                }
                Refresh::Cancelled => {
                    debug!("superseded refresh discarded");
                    summary.superseded += 1;
                }
            },
        }
    }

    Ok(summary)
}

fn publish(batch: &BatchOutcome, output: &Output) -> Result<(), Report<AppError>> {
    let matched = filter::apply(&batch.records, &output.criteria);
    let ranked = filter::rank_by_potential_return(matched, output.top);

    if ranked.is_empty() {
        output.presenter.no_results();
    } else {
        output.presenter.present(&ranked);
    }

    if let Some(path) = &output.report_path {
        report::save_report(&ranked, path, chrono::Local::now().date_naive())
            .change_context(AppError::Report)?;
    }
    Ok(())
}

async fn insight(
    config: &AppConfig,
    source: &dyn MarketDataSource,
    args: InsightArgs,
) -> Result<(), Report<AppError>> {
    let kind = resolve_strategy(config, args.strategy.as_deref())?;
    let strategy = build_strategy(kind, &config.indicator_settings());

    let insight = insight::market_insight(
        source,
        &args.symbol,
        strategy.as_ref(),
        &scan_settings(config),
        args.news.as_deref(),
    )
    .await;

    let json = serde_json::to_string_pretty(&insight).change_context(AppError::Runtime)?;
    println!("{json}");
    Ok(())
}
