//! Microgrid simulator entry point: CLI wiring, sampled run, and optional API.

use std::path::Path;
use std::process;

use chrono::DateTime;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

use microgrid_sim::config::MicrogridConfig;
use microgrid_sim::forecast::ForecastEngine;
use microgrid_sim::io::export::export_csv;
use microgrid_sim::runner::run_samples;
use microgrid_sim::sim::clock::ClockSample;

/// Parsed CLI arguments.
struct CliArgs {
    config_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    samples_override: Option<usize>,
    start: Option<String>,
    telemetry_out: Option<String>,
    forecast: Option<String>,
    #[cfg(feature = "api")]
    serve: bool,
    #[cfg(feature = "api")]
    port: u16,
}

fn print_help() {
    eprintln!("microgrid-sim — hybrid microgrid telemetry and grid-shift simulator");
    eprintln!();
    eprintln!("Usage: microgrid-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>          Load configuration from TOML file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        MicrogridConfig::PRESETS.join(", ")
    );
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --samples <n>            Override number of snapshots");
    eprintln!("  --start <rfc3339>        First sample instant (default: now)");
    eprintln!("  --telemetry-out <path>   Export snapshots to CSV");
    eprintln!("  --forecast <type>        Print forecast JSON (load, solar, battery, weather, all)");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                  Start REST API server after the run");
        eprintln!("  --port <u16>             API server port (default: 3000)");
    }
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --config or --preset is given, the baseline preset is used.");
}

/// Returns the value following flag `args[*i]`, or exits with an error.
fn value<'a>(args: &'a [String], i: &mut usize, what: &str) -> &'a str {
    let flag = &args[*i];
    *i += 1;
    match args.get(*i) {
        Some(v) => v.as_str(),
        None => {
            eprintln!("error: {flag} requires {what}");
            process::exit(1);
        }
    }
}

fn parse_number<T: std::str::FromStr>(flag: &str, raw: &str, kind: &str) -> T {
    raw.parse::<T>().unwrap_or_else(|_| {
        eprintln!("error: {flag} value \"{raw}\" is not a valid {kind}");
        process::exit(1);
    })
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        preset: None,
        seed_override: None,
        samples_override: None,
        start: None,
        telemetry_out: None,
        forecast: None,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port: 3000,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--config" => cli.config_path = Some(value(&args, &mut i, "a path argument").into()),
            "--preset" => cli.preset = Some(value(&args, &mut i, "a name argument").into()),
            "--seed" => {
                let raw = value(&args, &mut i, "a u64 argument");
                cli.seed_override = Some(parse_number("--seed", raw, "u64"));
            }
            "--samples" => {
                let raw = value(&args, &mut i, "a count argument");
                cli.samples_override = Some(parse_number("--samples", raw, "count"));
            }
            "--start" => cli.start = Some(value(&args, &mut i, "an RFC 3339 instant").into()),
            "--telemetry-out" => {
                cli.telemetry_out = Some(value(&args, &mut i, "a path argument").into());
            }
            "--forecast" => cli.forecast = Some(value(&args, &mut i, "a forecast type").into()),
            #[cfg(feature = "api")]
            "--serve" => cli.serve = true,
            #[cfg(feature = "api")]
            "--port" => {
                let raw = value(&args, &mut i, "a u16 argument");
                cli.port = parse_number("--port", raw, "u16");
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn load_config(cli: &CliArgs) -> MicrogridConfig {
    let loaded = if let Some(ref path) = cli.config_path {
        MicrogridConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        MicrogridConfig::from_preset(name)
    } else {
        Ok(MicrogridConfig::baseline())
    };
    let mut config = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if let Some(seed) = cli.seed_override {
        config.simulation.seed = Some(seed);
    }
    if let Some(samples) = cli.samples_override {
        config.simulation.samples = samples;
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    config
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();
    let config = load_config(&cli);

    let start = match cli.start {
        Some(ref raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(at) => ClockSample::new(at),
            Err(e) => {
                eprintln!("error: --start value \"{raw}\" is not RFC 3339: {e}");
                process::exit(1);
            }
        },
        None => ClockSample::now(),
    };

    let output = run_samples(&config, start);
    for (snapshot, grid) in output.snapshots.iter().zip(&output.grid_states) {
        println!(
            "{snapshot} | tie={:?} L{}",
            grid.sync_status, grid.shedding_level
        );
    }
    println!("\n{}", output.report);

    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&output.snapshots, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        tracing::info!(path = %path, "telemetry written");
    }

    if let Some(ref kind) = cli.forecast {
        let engine = ForecastEngine::new(config.forecast.clone());
        let mut draws = match config.simulation.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let printed = engine
            .query_str(kind, &start, &mut draws)
            .map_err(|e| e.to_string())
            .and_then(|bundle| serde_json::to_string_pretty(&bundle).map_err(|e| e.to_string()));
        match printed {
            Ok(json) => println!("\n{json}"),
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(microgrid_sim::api::AppState::from_config(&config));
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(microgrid_sim::api::serve(state, addr)) {
            eprintln!("error: API server failed: {e}");
            process::exit(1);
        }
    }
}
