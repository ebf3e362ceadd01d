//! Binary entry point: config loading, logging setup, and command dispatch.

mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};

fn main() {
    let code = match real_main() {
        Ok(()) => 0,
        Err(err) => {
            if JSON_MODE.get().copied().unwrap_or(false) {
                println!("{}", error_fmt::format_error_json(&err));
            } else {
                eprintln!("{}", error_fmt::humanize(&err));
            }
            error_fmt::exit_code_for_error(&err)
        }
    };
    std::process::exit(code);
}

fn real_main() -> eyre::Result<()> {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    color_eyre::install()?;

    let text = std::fs::read_to_string(&cli.config)
        .wrap_err_with(|| format!("read config {:?}", cli.config))?;
    let cfg = armpick_config::load_toml(&text)
        .map_err(|e| eyre::eyre!("invalid configuration: {e}"))?;
    cfg.validate()?;

    init_tracing(&cli, &cfg.logging)?;

    let slots_override = match &cli.slots {
        Some(path) => Some(armpick_config::load_slots_csv(path)?),
        None => None,
    };

    match cli.cmd {
        Commands::CheckConfig => {
            // Force CSV resolution so a bad slot table fails here, not mid-run.
            let _ = cfg.resolved_slots()?;
            if cli.json {
                println!("{}", serde_json::json!({ "status": "ok" }));
            } else {
                println!("config ok: {:?}", cli.config);
            }
            Ok(())
        }
        Commands::SelfCheck => self_check(cli.json),
        Commands::Run {
            max_placements,
            max_run_ms,
            detect_hz,
            print_runtime,
        } => {
            let overrides = run::SessionOverrides {
                max_placements,
                max_run_ms,
                detect_hz,
            };
            run_cmd(&cfg, slots_override, overrides, cli.json, print_runtime)
        }
    }
}

/// Console layer honors `--log-level` (pretty, or JSON lines with `--json`);
/// an optional file layer from `[logging]` always writes JSON lines.
fn init_tracing(cli: &Cli, logging: &armpick_config::Logging) -> eyre::Result<()> {
    let level = logging.level.as_deref().unwrap_or(&cli.log_level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .map_err(|e| eyre::eyre!("invalid log level '{level}': {e}"))?;

    let (console_pretty, console_json) = if cli.json {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
        )
    } else {
        (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        )
    };

    let file_layer = match &logging.file {
        Some(path) => {
            let p = Path::new(path);
            let dir = p.parent().filter(|d| !d.as_os_str().is_empty());
            let name = p
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {path}"))?;
            let dir = dir.unwrap_or_else(|| Path::new("."));
            let appender = match logging.rotation.as_deref() {
                None | Some("never") => tracing_appender::rolling::never(dir, name),
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                Some(other) => {
                    eyre::bail!("logging.rotation must be never|daily|hourly, got '{other}'")
                }
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_pretty)
        .with(console_json)
        .with(file_layer)
        .init();
    Ok(())
}

/// Exercise the transports without moving anything the operator would notice.
fn self_check(json: bool) -> eyre::Result<()> {
    use armpick_traits::{Detector, FrameSource};

    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let mut arm = armpick_hardware::dofbot::DofbotArm::new()
            .map_err(|e| eyre::eyre!("open arm bus: {e}"))?;
        let deg = armpick_traits::ServoArm::read_joint(&mut arm, 1)
            .map_err(|e| eyre::eyre!("read joint 1: {e}"))?;
        tracing::info!(joint = 1, deg, "arm responded");
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        let arm = armpick_hardware::SimulatedArm::new();
        tracing::info!(angles = ?arm.angles(), "simulated arm ready");
    }

    let mut camera = armpick_hardware::SimulatedCamera::new();
    let mut detector = armpick_hardware::SimulatedDetector::new();
    let frame = camera.grab().map_err(|e| eyre::eyre!("grab frame: {e}"))?;
    let detections = detector
        .detect(&frame)
        .map_err(|e| eyre::eyre!("detect: {e}"))?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "status": "ok", "detections": detections.len() })
        );
    } else {
        println!("self-check ok ({} detections)", detections.len());
    }
    Ok(())
}

fn run_cmd(
    cfg: &armpick_config::Config,
    slots_override: Option<Vec<[f32; 3]>>,
    overrides: run::SessionOverrides,
    json: bool,
    print_runtime: bool,
) -> eyre::Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .wrap_err("install Ctrl-C handler")?;

    #[cfg(all(feature = "hardware", target_os = "linux"))]
    let arm = armpick_hardware::dofbot::DofbotArm::new()
        .map_err(|e| eyre::eyre!("open arm bus: {e}"))?;
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    let arm = armpick_hardware::SimulatedArm::new();

    let camera = armpick_hardware::SimulatedCamera::new();
    let detector = armpick_hardware::SimulatedDetector::new();

    let started = std::time::Instant::now();
    let report = run::run_session(cfg, slots_override, overrides, (arm, camera, detector), shutdown)?;
    let runtime_ms = started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64;

    if json {
        let rt = print_runtime.then_some(runtime_ms);
        println!("{}", run::report_json(&report, rt));
    } else {
        println!(
            "session complete: placed {} ({} failed cycles)",
            report.placed, report.failed_cycles
        );
        if print_runtime {
            println!("runtime: {runtime_ms} ms");
        }
    }
    Ok(())
}
