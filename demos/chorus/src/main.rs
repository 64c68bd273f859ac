//! Print from many concurrent producers without interleaving.
//!
//! Spawns `--producers` tasks on a multi-threaded runtime. Each task composes `--lines` lines
//! from several fragments (yielding between them, which would interleave output written directly
//! to stdout) and commits each line through its own `BufferedWriter`. Every line reaches the
//! sink intact, and each producer's lines appear in the order it wrote them.
//!
//! Diagnostics are logged to stderr so they never mix with the printed lines.
//!
//! # Usage
//!
//! ```sh
//! cargo run --release --bin funnel-chorus -- --producers 8 --lines 100
//! ```
//!
//! ```sh
//! cargo run --release --bin funnel-chorus -- --producers 8 --lines 100 --sink /tmp/chorus.log --metrics
//! ```

use clap::{value_parser, Arg, ArgAction, Command};
use funnel_print::{
    funnel::{Config, Funnel, Sink},
    BufferedWriter, Registry,
};
use std::{fmt::Write, str::FromStr};
use tracing::{info, Level};

fn main() {
    // Parse arguments
    let matches = Command::new("funnel-chorus")
        .about("print from many concurrent producers without interleaving")
        .arg(
            Arg::new("producers")
                .long("producers")
                .required(false)
                .default_value("4")
                .value_parser(value_parser!(usize))
                .help("Number of concurrent producers"),
        )
        .arg(
            Arg::new("lines")
                .long("lines")
                .required(false)
                .default_value("10")
                .value_parser(value_parser!(usize))
                .help("Lines printed by each producer"),
        )
        .arg(
            Arg::new("sink")
                .long("sink")
                .required(false)
                .default_value("stdout")
                .help("Where to print: stdout, stderr, or a file path"),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .required(false)
                .help("Name to register the funnel under"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .required(false)
                .default_value("info"),
        )
        .arg(
            Arg::new("metrics")
                .long("metrics")
                .action(ArgAction::SetTrue)
                .help("Log the funnel's metrics after shutdown"),
        )
        .get_matches();

    // Create logger
    let level = matches
        .get_one::<String>("log-level")
        .expect("Please provide log level");
    let level = Level::from_str(level).expect("Log level not well-formed");
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    // Configure producers
    let producers = *matches
        .get_one::<usize>("producers")
        .expect("Please provide producers");
    let lines = *matches
        .get_one::<usize>("lines")
        .expect("Please provide lines");
    let sink = match matches
        .get_one::<String>("sink")
        .expect("Please provide sink")
        .as_str()
    {
        "stdout" => Sink::Stdout,
        "stderr" => Sink::Stderr,
        path => Sink::File(path.into()),
    };
    info!(producers, lines, ?sink, "configured");

    // Start the funnel before any producer
    let registry = Registry::new();
    let funnel = Funnel::start(
        &registry,
        Config {
            name: matches.get_one::<String>("name").cloned(),
            sink,
        },
    )
    .expect("Failed to start funnel");
    let mut metrics = prometheus_client::registry::Registry::default();
    funnel.register(&mut metrics);
    info!(name = funnel.name(), "funnel started");

    // Run producers to completion
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create runtime");
    runtime.block_on(async {
        let handles = (0..producers).map(|producer| {
            let registry = registry.clone();
            tokio::spawn(async move {
                let mut writer = BufferedWriter::from_registry(&registry);
                for line in 0..lines {
                    let _ = write!(writer, "[producer {producer:>3}]");
                    tokio::task::yield_now().await;
                    let _ = write!(writer, " line {line:>4}");
                    tokio::task::yield_now().await;
                    let _ = write!(writer, " of {lines}");
                    writer.flush();
                }
            })
        });
        for result in futures::future::join_all(handles).await {
            result.expect("Producer failed");
        }
    });

    // Shut down after all producers have stopped
    funnel.shutdown().expect("Failed to shut down funnel");
    if matches.get_flag("metrics") {
        let mut encoded = String::new();
        prometheus_client::encoding::text::encode(&mut encoded, &metrics)
            .expect("Failed to encode metrics");
        info!(metrics = %encoded, "funnel metrics");
    }
}
