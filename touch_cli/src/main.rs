mod cli;
mod error_fmt;
mod inspect;
mod simulate;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::simulate::SimParams;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(err) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn load_config(path: &Path) -> eyre::Result<touch_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg: touch_config::Config = toml::from_str(&text).wrap_err("parse config TOML")?;
    cfg.validate().wrap_err("invalid touch configuration")?;
    Ok(cfg)
}

/// Console logs go to stderr so stdout stays clean for results. A JSON log
/// file is added when `logging.file` is set.
fn init_tracing(json: bool, level: Option<&str>, logging: &touch_config::Logging) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = level.or(logging.level.as_deref()).unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_json = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let console_text = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let file = logging.file.as_deref().map(|file| {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "touch.log".into(), std::ffi::OsStr::to_os_string);
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        fmt::layer().json().with_ansi(false).with_writer(writer)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_json)
        .with(console_text)
        .with(file)
        .try_init();
}

fn run(cli: Cli) -> eyre::Result<()> {
    let _ = color_eyre::install();
    let cfg = load_config(&cli.config)?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli.cmd {
        Commands::Simulate {
            cycles,
            period_ms,
            baseline,
            noise,
            seed,
            script,
            save,
            realtime,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            if realtime {
                let flag = Arc::clone(&shutdown);
                if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                    tracing::warn!(error = %e, "Ctrl-C handler not installed");
                }
            }
            let params = SimParams {
                cycles,
                period_ms,
                baseline,
                noise,
                seed,
                script,
                save,
                realtime,
            };
            let report = simulate::run_simulation(&cfg, &params, cli.json, &mut out, &shutdown)?;
            simulate::print_report(&mut out, cli.json, &report)?;
        }
        Commands::Schedule => inspect::run_schedule(&cfg, cli.json, &mut out)?,
        Commands::Inspect { image, offset } => {
            inspect::run_inspect(&cfg, image, offset, cli.json, &mut out)?;
        }
    }
    Ok(())
}
