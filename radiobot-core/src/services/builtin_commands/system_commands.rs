// File: radiobot-core/src/services/builtin_commands/system_commands.rs

use std::time::Duration;

use sysinfo::{Disks, System};
use tracing::{info, warn};

use radiobot_common::models::message::{EmbedSpec, OutgoingMessage};
use radiobot_common::models::station::UNKNOWN_STATION;
use radiobot_common::traits::platform_traits::ConnectionStatus;
use crate::Error;
use crate::services::command_service::CommandContext;

const STATS_COLOR: u32 = 0x00FF00;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Point-in-time host and process figures.
#[derive(Debug, Clone, Default)]
pub struct SystemStats {
    pub os: String,
    pub cpu_percent: f32,
    pub ram_used: u64,
    pub ram_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
    pub process_memory: u64,
}

impl SystemStats {
    /// Blocks for one CPU sampling interval; run it off the async workers.
    pub fn collect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu();

        let process_memory = sysinfo::get_current_pid()
            .ok()
            .and_then(|pid| sys.process(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        let disks = Disks::new_with_refreshed_list();
        let (disk_total, disk_free) = disks
            .list()
            .iter()
            .fold((0u64, 0u64), |(t, f), d| (t + d.total_space(), f + d.available_space()));

        Self {
            os: format!(
                "{} {}",
                System::name().unwrap_or_else(|| "Unknown".into()),
                System::os_version().unwrap_or_default()
            )
            .trim()
            .to_string(),
            cpu_percent: sys.global_cpu_info().cpu_usage(),
            ram_used: sys.used_memory(),
            ram_total: sys.total_memory(),
            disk_used: disk_total.saturating_sub(disk_free),
            disk_total,
            process_memory,
        }
    }
}

pub async fn handle_restart(ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>, Error> {
    info!("Restart requested by {}", ctx.message.author_name);
    ctx.chat
        .send_message(ctx.message.channel_id, &OutgoingMessage::text("Restarting bot..."))
        .await?;
    ctx.event_bus.request_restart();
    Ok(Vec::new())
}

pub async fn handle_stats(ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>, Error> {
    let stats = tokio::task::spawn_blocking(SystemStats::collect)
        .await
        .map_err(|e| Error::Platform(format!("stats collection panicked: {e}")))?;

    let station = ctx
        .supervisor
        .current_station()
        .map(|s| s.name)
        .unwrap_or_else(|| UNKNOWN_STATION.to_string());
    let status = match ctx.chat.connection_status().await {
        ConnectionStatus::Connected => "🟢 Online".to_string(),
        ConnectionStatus::Reconnecting => "🟡 Reconnecting".to_string(),
        ConnectionStatus::Disconnected => "🔴 Offline".to_string(),
        ConnectionStatus::Error(e) => format!("🔴 Error: {e}"),
    };

    let embed = EmbedSpec::new()
        .title("📊 Bot Statistics & System Information")
        .color(STATS_COLOR)
        .field(
            "🤖 Bot Status",
            format!(
                "```\nStatus: {status}\nMemory: {:.2}MB\nVersion: {}```",
                stats.process_memory as f64 / MIB,
                env!("CARGO_PKG_VERSION")
            ),
        )
        .field(
            "💻 System Info",
            format!(
                "```\nOS: {}\nCPU Usage: {:.1}%\nRAM: {:.1}% ({:.1}/{:.1}GB)\nDisk: {:.1}% ({:.1}/{:.1}GB)```",
                stats.os,
                stats.cpu_percent,
                percent(stats.ram_used, stats.ram_total),
                stats.ram_used as f64 / GIB,
                stats.ram_total as f64 / GIB,
                percent(stats.disk_used, stats.disk_total),
                stats.disk_used as f64 / GIB,
                stats.disk_total as f64 / GIB,
            ),
        )
        .field("⏰ Uptime", format!("```\n{}```", format_uptime(ctx.started_at.elapsed())))
        .field("📻 Current Station", format!("```\n{station}```"))
        .footer(format!("Requested by {}", ctx.message.author_name))
        .with_timestamp();
    Ok(vec![OutgoingMessage::embed(embed)])
}

pub async fn handle_status(ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>, Error> {
    let guild_id = ctx.message.guild_id;
    let config = ctx.config.snapshot();

    let (state, volume, station) = match ctx.supervisor.snapshot(guild_id).await {
        Some(session) => (
            format!("{:?}", session.state),
            (session.volume * 100.0).round() as u32,
            session
                .active_url
                .as_deref()
                .map(|u| config.directory.resolve_by_url(u).name)
                .unwrap_or_else(|| "none".to_string()),
        ),
        None => ("Idle".to_string(), u32::from(config.settings.default_volume), "none".to_string()),
    };

    let voice = match ctx.supervisor.current_channel(guild_id).await {
        Some(ch) => ctx.chat.channel_name(ch).await.unwrap_or_else(|| ch.to_string()),
        None => {
            warn!("Status requested while not connected to voice in guild {guild_id}");
            "not connected".to_string()
        }
    };

    let embed = EmbedSpec::new()
        .title("📡 Playback Status")
        .color(STATS_COLOR)
        .field("Station", station)
        .field("State", state)
        .field("Volume", format!("{volume}%"))
        .field("Voice Channel", voice);
    Ok(vec![OutgoingMessage::embed(embed)])
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 * 100.0 / total as f64
    }
}

/// `1d 02:03:04` style.
pub fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (h, m, s) = (rem / 3600, (rem % 3600) / 60, rem % 60);
    if days > 0 {
        format!("{days}d {h:02}:{m:02}:{s:02}")
    } else {
        format!("{h:02}:{m:02}:{s:02}")
    }
}
