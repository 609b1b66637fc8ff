mod logging;
mod monitor;
mod repl;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::Colorize;
use kobuki_hal::{SimConnector, SimState};
use kobuki_rtc::config::{self, ComponentConfig};
use kobuki_rtc::{ComponentFactory, KobukiComponent, PeriodicExecutionContext};
use kobuki_types::KobukiError;
use tracing::{error, info, warn};

use crate::monitor::StatusBoard;

fn main() -> ExitCode {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(config::config_path);

    let cfg = match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    // ── Structured logging ────────────────────────────────────────────────
    logging::init(cfg.debug);
    print_banner(&cfg, &path);

    // ── Component instance ────────────────────────────────────────────────
    let sim = SimState::new();
    let connector = SimConnector::new(sim.clone());
    let mut factory = ComponentFactory::new();
    {
        let cfg = cfg.clone();
        factory.register(KobukiComponent::profile(), move || {
            KobukiComponent::new(cfg.clone(), connector.clone())
        });
    }

    let mut instance = match factory.create("KobukiRTC") {
        Ok(instance) => instance,
        Err(e) => {
            error!(error = %e, "failed to create component");
            return ExitCode::FAILURE;
        }
    };
    info!(
        instance = %instance.instance_name,
        live = factory.live_instances(&instance.type_name),
        registered = ?factory.type_names(),
        port = %cfg.port,
        "component created"
    );

    let writers = instance.component.writers();
    let readers = instance.component.readers();
    let ctx = match PeriodicExecutionContext::from_config(&cfg) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = %e, "invalid execution rate");
            return ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start the async runtime");
            return ExitCode::FAILURE;
        }
    };

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            println!();
            println!("{}", "Ctrl-C received, stopping the component.".yellow().bold());
            flag.store(true, Ordering::SeqCst);
        }) {
            warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    // ── Background tasks ──────────────────────────────────────────────────
    let board = StatusBoard::default();
    let runner = {
        let flag = shutdown.clone();
        rt.spawn(async move {
            let result = ctx.run(&mut instance.component, flag.clone()).await;
            if let Some(notice) = stop_notice(&result, flag.load(Ordering::SeqCst)) {
                println!("{notice}");
            }
            flag.store(true, Ordering::SeqCst);
            (instance, result)
        })
    };
    rt.spawn(monitor::simulate(sim, ctx.period(), shutdown.clone()));
    rt.spawn(monitor::monitor(readers, board.clone()));

    println!(
        "  Type {} for a list of commands.\n",
        "help".bold().cyan()
    );

    // ── Interactive REPL ──────────────────────────────────────────────────
    repl::run(&writers, &board, shutdown.clone());
    shutdown.store(true, Ordering::SeqCst);

    let code = match rt.block_on(runner) {
        Ok((instance, result)) => {
            let code = match result {
                Ok(cycles) => {
                    info!(cycles, "component stopped");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!(error = %e, "component stopped with an error");
                    ExitCode::FAILURE
                }
            };
            factory.destroy(instance);
            code
        }
        Err(e) => {
            error!(error = %e, "execution task failed");
            ExitCode::FAILURE
        }
    };

    rt.shutdown_timeout(Duration::from_secs(1));
    code
}

/// Message for the operator when the component stops on its own while the
/// prompt is still waiting for input.
fn stop_notice(result: &Result<u64, KobukiError>, shutdown_requested: bool) -> Option<String> {
    match result {
        Err(e) if !shutdown_requested => Some(format!(
            "\n  {}: {}. Press {} to exit.",
            "Component stopped".red().bold(),
            e,
            "Enter".bold()
        )),
        _ => None,
    }
}

/// Load `path`, writing the defaults there on first run.
fn load_config(path: &std::path::Path) -> Result<ComponentConfig, KobukiError> {
    if let Some(cfg) = config::load(path)? {
        return Ok(cfg);
    }

    let mut cfg = ComponentConfig::default();
    match config::save_to(&cfg, path) {
        Ok(()) => println!(
            "  {} Default config written to {}",
            "✓".green().bold(),
            path.display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Could not save default config".yellow(), e),
    }
    config::apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner(cfg: &ComponentConfig, path: &std::path::Path) {
    let profile = KobukiComponent::profile();
    println!();
    println!("{}", "  Kobuki RTC".bold().cyan());
    println!(
        "  {} {}  {}",
        profile.type_name.bold(),
        profile.version.dimmed(),
        profile.vendor.dimmed()
    );
    println!();
    println!("  config   {}", path.display().to_string().bold());
    println!("  port     {}", cfg.port.bold());
    println!("  rate     {} Hz", cfg.rate_hz);
    println!("  driver   {}", "simulated base".yellow());
    println!();
}
