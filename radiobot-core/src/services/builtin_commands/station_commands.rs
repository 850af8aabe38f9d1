// File: radiobot-core/src/services/builtin_commands/station_commands.rs

use radiobot_common::models::message::{EmbedSpec, OutgoingMessage};
use radiobot_common::models::station::Station;
use crate::Error;
use crate::services::command_service::CommandContext;
use super::validate_stream_url;

const LIST_COLOR: u32 = 0x3498DB;

pub async fn handle_add(ctx: &CommandContext<'_>, args: &[String]) -> Result<Vec<OutgoingMessage>, Error> {
    let (name, url) = match args {
        [name, url, ..] if !name.trim().is_empty() => (name.trim(), url.trim()),
        _ => return Err(Error::InvalidArgument("usage: !add <name> <url>".into())),
    };
    let url = validate_stream_url(url)?;

    let config = ctx.config.add_station(Station::new(name, url.clone())).await?;
    Ok(vec![OutgoingMessage::text(format!(
        "Added station #{}: {name} ({url})",
        config.directory.len()
    ))])
}

/// Without an index, lists the stations so the caller can pick one.
pub async fn handle_remove(ctx: &CommandContext<'_>, args: &[String]) -> Result<Vec<OutgoingMessage>, Error> {
    let Some(raw) = args.first() else {
        let config = ctx.config.snapshot();
        if config.directory.is_empty() {
            return Ok(vec![OutgoingMessage::text("No radio stations available.")]);
        }
        let embed = station_list_embed(config.directory.stations(), false)
            .title("➖ Remove a Radio Station")
            .footer("Use !remove <number> to delete a station");
        return Ok(vec![OutgoingMessage::embed(embed)]);
    };

    let index: usize = raw
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("invalid station number '{raw}'")))?;
    let removed = ctx.config.remove_station(index).await?;
    Ok(vec![OutgoingMessage::text(format!("Removed station: {}", removed.name))])
}

pub async fn handle_setdefault(ctx: &CommandContext<'_>, args: &[String]) -> Result<Vec<OutgoingMessage>, Error> {
    let raw = args
        .first()
        .ok_or_else(|| Error::InvalidArgument("usage: !setdefault <url>".into()))?;
    let url = validate_stream_url(raw)?;
    ctx.config.set_default_stream_url(&url).await?;
    Ok(vec![OutgoingMessage::text(format!("Default stream URL set to {url}"))])
}

pub async fn handle_listradio(ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>, Error> {
    let config = ctx.config.snapshot();
    if config.directory.is_empty() {
        return Ok(vec![OutgoingMessage::text("No radio stations available.")]);
    }
    let embed = station_list_embed(config.directory.stations(), true)
        .title("📋 Radio Stations")
        .footer(format!("{} stations configured", config.directory.len()));
    Ok(vec![OutgoingMessage::embed(embed)])
}

pub async fn handle_reload(ctx: &CommandContext<'_>) -> Result<Vec<OutgoingMessage>, Error> {
    let config = ctx.config.reload().await?;
    Ok(vec![OutgoingMessage::text(format!(
        "Configuration reloaded: {} stations, {} banned titles",
        config.directory.len(),
        config.ban_list.len()
    ))])
}

fn station_list_embed(stations: &[Station], with_urls: bool) -> EmbedSpec {
    let lines: Vec<String> = stations
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if with_urls {
                format!("`{}.` **{}**\n{}", i + 1, s.name, s.url)
            } else {
                format!("`{}.` {}", i + 1, s.name)
            }
        })
        .collect();
    EmbedSpec::new().description(lines.join("\n")).color(LIST_COLOR)
}
