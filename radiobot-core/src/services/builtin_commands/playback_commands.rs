// File: radiobot-core/src/services/builtin_commands/playback_commands.rs

use tracing::{info, warn};

use radiobot_common::models::message::{EmbedSpec, OutgoingMessage};
use radiobot_common::models::playback::PlayOutcome;
use radiobot_common::models::station::Station;
use radiobot_common::traits::media_traits::UNKNOWN_TITLE;
use crate::Error;
use crate::services::command_service::CommandContext;
use super::validate_stream_url;

const STATION_LIST_COLOR: u32 = 0x3498DB;

/// Nickname label for a custom URL that is not in the directory.
const CUSTOM_URL_LABEL: &str = "Custom URL";

pub async fn handle_play(ctx: &CommandContext<'_>, args: &[String]) -> Result<Vec<OutgoingMessage>, Error> {
    let arg = args
        .first()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .ok_or_else(|| Error::InvalidArgument("usage: !play <number/URL>".into()))?;

    let guild_id = ctx.message.guild_id;
    let config = ctx.config.snapshot();

    let (station, probed_title) = if arg.chars().all(|c| c.is_ascii_digit()) {
        let index: usize = arg
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("invalid station number '{arg}'")))?;
        (config.directory.resolve_by_index(index)?.clone(), None)
    } else {
        let url = validate_stream_url(arg)?;
        if let Err(e) = ctx.chat.trigger_typing(ctx.message.channel_id).await {
            warn!("Typing indicator failed: {e}");
        }
        let title = ctx.prober.probe(&url, config.settings.probe_timeout).await;
        (config.directory.resolve_by_url(&url), Some(title))
    };

    let outcome = ctx
        .supervisor
        .play(guild_id, &station, ctx.message.author_voice_channel)
        .await?;

    let reply = match outcome {
        PlayOutcome::AlreadyPlaying(station) => format!("Already playing: {}", station.name),
        PlayOutcome::Started { station, .. } => {
            sync_nickname(ctx, &station).await;
            match probed_title.filter(|t| t != UNKNOWN_TITLE && station.is_unknown()) {
                Some(title) => format!("Now playing: {title}"),
                None if station.is_unknown() => format!("Now playing: {}", station.url),
                None => format!("Now playing: {}", station.name),
            }
        }
    };
    Ok(vec![OutgoingMessage::text(reply)])
}

/// Numbered station picker. The current station is marked.
pub async fn handle_radio(ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>, Error> {
    let config = ctx.config.snapshot();
    if config.directory.is_empty() {
        return Ok(vec![OutgoingMessage::text("No radio stations available.")]);
    }

    let current = ctx.supervisor.current_selection().map(|s| s.url);
    let lines: Vec<String> = config
        .directory
        .stations()
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let marker = if current.as_deref() == Some(s.url.as_str()) { " ◀ now playing" } else { "" };
            format!("`{}.` {}{marker}", i + 1, s.name)
        })
        .collect();

    let embed = EmbedSpec::new()
        .title("📻 Available Radio Stations")
        .description(lines.join("\n"))
        .color(STATION_LIST_COLOR)
        .footer("Use !play <number> to switch station");
    Ok(vec![OutgoingMessage::embed(embed)])
}

pub async fn handle_stop(ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>, Error> {
    let guild_id = ctx.message.guild_id;
    let active = ctx
        .supervisor
        .snapshot(guild_id)
        .await
        .is_some_and(|s| s.active_url.is_some());
    if !active {
        return Ok(vec![OutgoingMessage::text("Not playing anything!")]);
    }
    ctx.supervisor.stop(guild_id).await?;
    Ok(vec![OutgoingMessage::text("Playback stopped")])
}

pub async fn handle_vol(ctx: &CommandContext<'_>, args: &[String]) -> Result<Vec<OutgoingMessage>, Error> {
    let raw = args
        .first()
        .ok_or_else(|| Error::InvalidArgument("usage: !vol <0-100>".into()))?;
    let requested: i64 = raw
        .parse()
        .map_err(|_| Error::InvalidArgument("volume must be between 0 and 100".into()))?;
    let applied = ctx.supervisor.set_volume(ctx.message.guild_id, requested).await?;
    info!("Volume set to {applied}% in guild {}", ctx.message.guild_id);
    Ok(vec![OutgoingMessage::text(format!("Volume set to {applied}%"))])
}

pub async fn handle_fix(ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>, Error> {
    let guild_id = ctx.message.guild_id;
    let had_stream = ctx
        .supervisor
        .snapshot(guild_id)
        .await
        .is_some_and(|s| s.active_url.is_some());

    let mut messages = Vec::new();
    if !had_stream {
        messages.push(OutgoingMessage::text("No current stream found, starting default station."));
    }

    let PlayOutcome::Started { station, .. } = ctx.supervisor.restart(guild_id).await? else {
        return Ok(messages);
    };
    sync_nickname(ctx, &station).await;
    messages.push(OutgoingMessage::text(format!("Stream restarted: {}", station.name)));
    Ok(messages)
}

pub async fn handle_join(ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>, Error> {
    let (channel_id, is_default) = match ctx.message.author_voice_channel {
        Some(ch) => (ch, false),
        None => (ctx.config.snapshot().settings.default_voice_channel_id, true),
    };

    if is_default && ctx.chat.channel_guild(channel_id).await != Some(ctx.message.guild_id) {
        return Ok(vec![OutgoingMessage::text("Default voice channel not found!")]);
    }

    ctx.supervisor.join(ctx.message.guild_id, channel_id).await?;
    let name = ctx
        .chat
        .channel_name(channel_id)
        .await
        .unwrap_or_else(|| channel_id.to_string());
    let text = if is_default {
        format!("Joined default channel: {name}")
    } else {
        format!("Joined {name}")
    };
    Ok(vec![OutgoingMessage::text(text)])
}

pub async fn handle_leave(ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>, Error> {
    let guild_id = ctx.message.guild_id;
    if ctx.supervisor.current_channel(guild_id).await.is_none() {
        return Ok(vec![OutgoingMessage::text("I am not in a voice channel!")]);
    }
    ctx.supervisor.leave(guild_id).await?;
    Ok(vec![OutgoingMessage::text("Left voice channel")])
}

/// Nickname failures never fail the command.
async fn sync_nickname(ctx: &CommandContext<'_>, station: &Station) {
    let name = if station.is_unknown() { CUSTOM_URL_LABEL } else { station.name.as_str() };
    if let Err(e) = ctx.identity.sync_station(ctx.message.guild_id, name).await {
        warn!("Nickname sync after station change failed: {e}");
    }
}
