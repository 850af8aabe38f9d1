use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use radiobot_core::tasks::{spawn_auto_fix_task, spawn_presence_task, spawn_watchdog_task};
use radiobot_core::Error;

mod context;
use context::RadioContext;

#[derive(Parser, Debug, Clone)]
#[command(name = "radiobot")]
#[command(author, version, about = "Discord internet-radio bot with self-healing playback")]
pub struct Args {
    /// Path to the INI settings file.
    #[arg(long, short = 'c', default_value = "config.ini")]
    config: PathBuf,

    /// Log file, appended to alongside console output.
    #[arg(long, default_value = "radiobot.log")]
    log_file: PathBuf,
}

fn init_tracing(log_file: &Path) -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("radiobot=info,radiobot_core=info,radiobot_server=info"));
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()
        .map_err(|e| Error::Config(format!("failed to set global subscriber: {e}")))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_file)?;
    info!("RadioBot starting. config={}", args.config.display());

    let restart = match run_bot(&args).await {
        Ok(restart) => restart,
        Err(Error::Config(msg)) => {
            error!("Configuration error: {msg}");
            std::process::exit(1);
        }
        Err(e) => {
            error!("Bot error: {e:?}");
            return Err(e.into());
        }
    };

    if restart {
        relaunch()?;
    }
    info!("Main finished. Goodbye!");
    Ok(())
}

/// Runs until shutdown. Returns true if a restart was requested.
async fn run_bot(args: &Args) -> Result<bool, Error> {
    let mut ctx = RadioContext::new(args).await?;
    let settings = ctx.config.snapshot().settings.clone();

    // 1) Background tasks
    let watchdog_handle = spawn_watchdog_task(ctx.supervisor.clone());
    let presence_handle = spawn_presence_task(
        ctx.announcer.clone(),
        settings.presence_interval,
        ctx.event_bus.shutdown_rx.clone(),
    );
    let auto_fix_handle = settings.auto_fix_interval.map(|period| {
        spawn_auto_fix_task(
            ctx.supervisor.clone(),
            ctx.chat.clone(),
            ctx.config.clone(),
            period,
            ctx.event_bus.shutdown_rx.clone(),
        )
    });

    // 2) Event routing
    let event_rx = ctx
        .event_rx
        .take()
        .ok_or_else(|| Error::Platform("event receiver already taken".into()))?;
    let event_service = ctx.event_service.clone();
    let event_handle = tokio::spawn(event_service.start(event_rx));

    // 3) Ctrl-C => signal
    let eb_for_ctrlc = ctx.event_bus.clone();
    let _ctrlc_handle = tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e:?}");
            return;
        }
        info!("Ctrl-C detected; shutting down event bus...");
        eb_for_ctrlc.shutdown();
    });

    // 4) Wait for shutdown
    let mut shutdown_rx = ctx.event_bus.shutdown_rx.clone();
    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }
    info!("Shutdown signaled; stopping playback.");

    // Cleanup
    for guild_id in ctx.supervisor.active_guilds().await {
        if let Err(e) = ctx.supervisor.leave(guild_id).await {
            warn!("Guild {guild_id}: leave on shutdown failed: {e}");
        }
    }
    ctx.discord.disconnect().await;

    let _ = event_handle.await;
    let _ = presence_handle.await;
    if let Some(handle) = auto_fix_handle {
        let _ = handle.await;
    }
    if let Some(handle) = watchdog_handle {
        handle.abort();
    }

    info!("Shutdown complete.");
    Ok(ctx.event_bus.restart_requested())
}

/// Starts a fresh copy of this binary with the same arguments.
fn relaunch() -> Result<(), Error> {
    let exe = std::env::current_exe()?;
    info!("Restarting {}", exe.display());
    std::process::Command::new(exe)
        .args(std::env::args_os().skip(1))
        .spawn()?;
    Ok(())
}
