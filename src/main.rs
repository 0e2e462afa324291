use anyhow::Context;
use clap::Parser;
use sessionpool::config::{Config, LoggingConfig};
use sessionpool::SessionPool;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "sessionpool")]
#[command(about = "Exercise a bounded session pool against a configured endpoint", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Generate example configuration file
    #[arg(long, value_name = "FILE")]
    generate_config: Option<PathBuf>,

    /// Log level (overrides config)
    #[arg(long)]
    log_level: Option<String>,

    /// Idle capacity (overrides config)
    #[arg(long)]
    capacity: Option<usize>,

    /// Number of concurrent borrowers
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Get/put cycles per borrower
    #[arg(long, default_value_t = 100)]
    cycles: usize,

    /// Print final pool statistics as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle config generation
    if let Some(config_path) = args.generate_config {
        println!("Generating example configuration file: {:?}", config_path);
        Config::create_example(&config_path)?;
        println!("Example configuration file created successfully!");
        println!(
            "Edit the file and run: sessionpool --config {:?}",
            config_path
        );
        return Ok(());
    }

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)
            .with_context(|| format!("loading configuration from {}", config_path.display()))?,
        None => Config::default(),
    };

    // Apply CLI overrides
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(capacity) = args.capacity {
        config.pool.capacity = capacity;
    }

    init_logging(&config.logging)?;

    info!("sessionpool v{} starting", env!("CARGO_PKG_VERSION"));
    match &args.config {
        Some(path) => info!("Loaded configuration from: {:?}", path),
        None => info!("No configuration file specified, using defaults"),
    }
    info!(
        "Endpoint: {} mode, addresses {:?}",
        config.endpoint.mode, config.endpoint.addresses
    );

    let pool = Arc::new(SessionPool::from_config(&config));
    pool.dump();

    let stop = Arc::new(AtomicBool::new(false));
    let failures = Arc::new(AtomicU64::new(0));

    let mut workers = Vec::with_capacity(args.workers);
    for worker in 0..args.workers {
        let pool = Arc::clone(&pool);
        let stop = Arc::clone(&stop);
        let failures = Arc::clone(&failures);
        let cycles = args.cycles;

        workers.push(tokio::task::spawn_blocking(move || {
            for _ in 0..cycles {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                match pool.get() {
                    Ok(session) => pool.put(session),
                    Err(e) => {
                        warn!(worker, "Failed to get session: {}", e);
                        failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }));
    }

    let probe = async move {
        for handle in workers {
            if let Err(e) = handle.await {
                error!("Probe worker failed: {}", e);
            }
        }
    };

    // Handle Ctrl+C by stopping the borrowers early
    tokio::select! {
        _ = probe => {
            info!("Probe complete");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, stopping probe...");
            stop.store(true, Ordering::Relaxed);
        }
    }

    let closed = pool.shutdown();
    let stats = pool.stats();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Closed {} idle sessions on shutdown", closed);
        println!(
            "hits={} misses={} create_errors={} returned={} discarded={} closed={}",
            stats.hits,
            stats.misses,
            stats.create_errors,
            stats.returned,
            stats.discarded,
            stats.closed
        );
    }

    let failed = failures.load(Ordering::Relaxed);
    if failed > 0 {
        warn!("{} get calls failed", failed);
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_new(&logging.level)
        .with_context(|| format!("Invalid log level: {}", logging.level))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }

    Ok(())
}
