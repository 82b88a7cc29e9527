use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use queuevisor::{
    Completion, Config, Dashboard, EngineBuilder, EventLog, LogWriter, RunSummary, Subscribe,
    wait_for_shutdown_signal,
};

const EXIT_OK: u8 = 0;
const EXIT_USAGE: u8 = 2;
const EXIT_INCOMPLETE: u8 = 3;

const DASHBOARD_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(
    name = "queuevisor",
    version = env!("CARGO_PKG_VERSION"),
    about = "Producer/consumer simulation over a fair bounded channel",
    long_about = "Runs producers and consumers over a bounded channel, scales consumers \
                  up under load and shuts down in three phases. Without arguments the \
                  four counts are read interactively from stdin."
)]
struct Cli {
    /// Use the built-in configuration (4 producers x 20 items, 2 consumers, capacity 10)
    #[arg(long = "default", conflicts_with = "counts")]
    use_defaults: bool,

    /// Producers, items per producer, consumers and queue capacity
    #[arg(
        num_args = 4,
        value_names = ["PRODUCERS", "ITEMS_PER_PRODUCER", "CONSUMERS", "CAPACITY"]
    )]
    counts: Vec<usize>,

    /// Execution history file (truncated on start)
    #[arg(long, default_value = "execution_history.log")]
    log_file: PathBuf,

    /// Do not print the live status line
    #[arg(long)]
    no_dashboard: bool,

    /// Increase stderr verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let cfg = match resolve_config(&cli).await {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            print_usage();
            return Ok(ExitCode::from(EXIT_USAGE));
        }
    };

    let mut subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let log_file = match EventLog::create(&cli.log_file).await {
        Ok(sink) => {
            subs.push(Arc::new(sink));
            Some(cli.log_file.as_path())
        }
        Err(err) => {
            tracing::warn!(
                path = %cli.log_file.display(),
                error = %err,
                "cannot open execution log; continuing without it"
            );
            None
        }
    };

    let engine = match EngineBuilder::new(cfg).with_subscribers(subs).build() {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("ERROR: {err}");
            print_usage();
            return Ok(ExitCode::from(EXIT_USAGE));
        }
    };

    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(()) => on_signal.cancel(),
            Err(err) => tracing::warn!(error = %err, "signal handler unavailable"),
        }
    });

    println!("Starting System...");
    let dashboard =
        (!cli.no_dashboard).then(|| Dashboard::spawn(engine.probe(), DASHBOARD_INTERVAL));
    engine.start();
    let completion = engine.wait_for_completion(&token).await;
    if completion == Completion::Cancelled {
        engine.interrupt();
    }

    println!("\n\nSystem Stopping...");
    if let Some(dashboard) = dashboard {
        dashboard.stop().await;
    }
    let report = engine.shutdown().await;
    for err in report.errors() {
        tracing::warn!(label = err.as_label(), "{}", err.as_message());
    }

    let summary = engine.summarize(completion, report);
    print_analysis(&summary, log_file);
    engine.bus().log("SYSTEM", "Analysis results printed to console.");
    engine.close().await;
    println!("\n=== System Exited ===");

    Ok(ExitCode::from(if summary.is_success() {
        EXIT_OK
    } else {
        EXIT_INCOMPLETE
    }))
}

fn setup_logging(verbose: u8) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            _ => tracing_subscriber::EnvFilter::new("debug"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn resolve_config(cli: &Cli) -> Result<Config> {
    if cli.use_defaults {
        let cfg = Config::defaults();
        println!("\nUsing default configuration...");
        println!("{cfg}");
        return Ok(cfg);
    }

    let counts = match cli.counts.as_slice() {
        [p, i, c, q] => {
            println!("\nUsing command-line configuration:");
            [*p, *i, *c, *q]
        }
        [] => tokio::task::spawn_blocking(prompt_counts)
            .await
            .context("interactive input task failed")??,
        _ => bail!("expected exactly four numbers"),
    };

    let [p, i, c, q] = counts;
    let cfg = Config::new(p, i, c, q)?;
    println!("{cfg}");
    Ok(cfg)
}

fn prompt_counts() -> Result<[usize; 4]> {
    const LABELS: [&str; 4] = [
        "Number of Producers",
        "Items per Producer",
        "Number of Consumers",
        "Queue Capacity",
    ];

    println!("\n=== SIMULATION CONFIGURATION ===\n");
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut counts = [0usize; 4];
    for (slot, label) in counts.iter_mut().zip(LABELS) {
        print!("Enter {label}: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("unexpected end of input while reading {label}");
        }
        let raw = line.trim();
        *slot = raw
            .parse()
            .with_context(|| format!("{label} must be a positive integer, got {raw:?}"))?;
    }
    println!("\nConfiguration Loaded.");
    Ok(counts)
}

fn print_usage() {
    println!("\n=== USAGE ===");
    println!("Interactive mode:  queuevisor");
    println!("Default config:    queuevisor --default");
    println!("Custom config:     queuevisor <producers> <itemsPerProducer> <consumers> <capacity>");
    println!("\nExample: queuevisor 4 20 2 10");
}

fn print_analysis(s: &RunSummary, log_file: Option<&Path>) {
    let rule = "=".repeat(70);
    let cfg = &s.config;

    println!("\n\n\n{rule}");
    println!("                    SIMULATION ANALYSIS RESULTS");
    println!("{rule}");

    println!("\n[CONFIGURATION]");
    println!("  Producers Started:         {}", cfg.producers());
    println!("  Items per Producer:        {}", cfg.items_per_producer());
    println!("  Consumers Started:         {}", cfg.consumers());
    println!("  Emergency Consumers Added: {}", s.emergency_consumers);
    println!("  Queue Capacity:            {}", cfg.queue_capacity());
    println!("  Total Items Expected:      {}", s.expected);

    println!("\n[EXECUTION RESULTS]");
    println!("  Items Produced:            {}", s.produced);
    println!("  Items Consumed:            {}", s.consumed);
    println!("  Final Queue Size:          {}", s.final_size);

    println!("\n[ANALYSIS]");
    println!("  Production Rate:           {:.1}%", s.rate(s.produced));
    println!("  Consumption Rate:          {:.1}%", s.rate(s.consumed));
    println!(
        "  Status:                    {}",
        if s.is_success() {
            "SUCCESS - All items processed"
        } else {
            "INCOMPLETE"
        }
    );

    println!("\n[SYSTEM SUMMARY]");
    println!(
        "  Total Consumers Used:      {} ({} initial + {} emergency)",
        cfg.consumers() + s.emergency_consumers,
        cfg.consumers(),
        s.emergency_consumers
    );
    println!(
        "  Shutdown Status:           {}",
        if s.is_clean_shutdown() {
            "Clean (All workers terminated)"
        } else {
            "WARNING: Workers had to be force-stopped"
        }
    );
    println!("  Shutdown Took:             {:?}", s.shutdown.elapsed);

    println!("\n{rule}");
    match log_file {
        Some(path) => println!("  Execution log: {}", path.display()),
        None => println!("  Execution log: unavailable (see warnings above)"),
    }
    println!("{rule}\n");
}
