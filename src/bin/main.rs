use std::{
    error::Error,
    io::{self, BufRead, Write},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Instant,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use aw_supervisor::{
    cli::{Cli, InteractiveCommand, parse_args},
    config::{load_settings, parse_autostart_override},
    constants::{HEALTH_CHECK_INTERVAL, SHUTDOWN_POLL_INTERVAL},
    locate::Locator,
    manager::Manager,
    platform,
};

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args();
    init_logging(&args);

    platform::become_group_leader();

    let settings = load_settings(args.config.as_deref(), args.testing)?;
    let autostart = match &args.autostart_modules {
        Some(raw) => parse_autostart_override(raw),
        None => settings.autostart_modules.clone(),
    };

    info!(
        "Starting aw-qt{}",
        if args.testing { " in testing mode" } else { "" }
    );

    let mut manager = Manager::from_settings(&Locator::from_env(), &settings, args.testing)?;
    if let Err(err) = manager.autostart(&autostart) {
        error!("Autostart incomplete: {err}");
    }

    if args.interactive {
        run_interactive(&mut manager)?;
    } else {
        run_headless(&mut manager)?;
    }

    shutdown(&mut manager);
    Ok(())
}

fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_filter() {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn register_signal_handler(running: Arc<AtomicBool>) -> Result<(), Box<dyn Error>> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })?;

    Ok(())
}

/// Runs until interrupted, checking for crashed modules on every tick.
fn run_headless(manager: &mut Manager) -> Result<(), Box<dyn Error>> {
    let running = Arc::new(AtomicBool::new(true));
    register_signal_handler(running.clone())?;

    let mut next_check = Instant::now() + HEALTH_CHECK_INTERVAL;
    while running.load(Ordering::SeqCst) {
        if Instant::now() >= next_check {
            check_unexpected_stops(manager);
            next_check = Instant::now() + HEALTH_CHECK_INTERVAL;
        }
        thread::sleep(SHUTDOWN_POLL_INTERVAL);
    }

    info!("Received termination signal");
    Ok(())
}

/// Reports crashed modules once, then marks them stopped.
fn check_unexpected_stops(manager: &mut Manager) {
    let crashed: Vec<String> = manager
        .get_unexpected_stops()
        .into_iter()
        .map(|module| module.name().to_string())
        .collect();

    for name in crashed {
        let log = manager.read_log(&name).unwrap_or_default();
        warn!("Module {name} quit unexpectedly\n\nLast log output:\n{log}");

        if let Err(err) = manager.stop(&name) {
            error!("Failed to clean up module {name}: {err}");
        }
    }
}

fn run_interactive(manager: &mut Manager) -> Result<(), Box<dyn Error>> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        check_unexpected_stops(manager);

        let command = match InteractiveCommand::parse(&line?) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        let result = match command {
            InteractiveCommand::Start(name) => manager.start(&name),
            InteractiveCommand::Stop(name) => manager.stop(&name),
            InteractiveCommand::Toggle(name) => manager.toggle(&name),
            InteractiveCommand::Status(name) => {
                manager.print_status(name.as_deref());
                Ok(())
            }
            InteractiveCommand::Json(name) => {
                let statuses = manager.status(name.as_deref());
                println!("{}", serde_json::to_string_pretty(&statuses)?);
                Ok(())
            }
            InteractiveCommand::Log(name) => manager.read_log(&name).map(|log| print!("{log}")),
            InteractiveCommand::Quit => break,
        };

        if let Err(err) = result {
            println!("{err}");
        }
        stdout.flush()?;
    }

    Ok(())
}

fn shutdown(manager: &mut Manager) {
    info!("Shutting down");
    if let Err(err) = manager.stop_all() {
        error!("Failed to stop all modules: {err}");
    }
    platform::broadcast_termination();
}
