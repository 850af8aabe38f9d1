// File: radiobot-core/src/services/builtin_commands/mod.rs

pub mod help_commands;
pub mod playback_commands;
pub mod station_commands;
pub mod system_commands;

use radiobot_common::models::message::OutgoingMessage;
use crate::Error;
use crate::services::command_service::CommandContext;

/// Static description of a built-in command.
#[derive(Debug, Clone, Copy)]
pub struct CommandInfo {
    pub name: &'static str,
    /// Needs the command channel and an allowed role.
    pub gated: bool,
    pub title: &'static str,
    pub summary: &'static str,
    pub usage: &'static str,
    pub example: &'static str,
}

pub const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "radio",
        gated: true,
        title: "📻 Radio Command",
        summary: "Shows a numbered list of the available radio stations.",
        usage: "!radio",
        example: "!radio, then !play <number>",
    },
    CommandInfo {
        name: "play",
        gated: true,
        title: "▶️ Play Command",
        summary: "Plays a radio station by number or direct stream URL.",
        usage: "!play <number/URL>",
        example: "!play 1\n!play http://stream.url",
    },
    CommandInfo {
        name: "stop",
        gated: true,
        title: "⏹️ Stop Command",
        summary: "Stops the current playback.",
        usage: "!stop",
        example: "!stop",
    },
    CommandInfo {
        name: "vol",
        gated: true,
        title: "🔊 Volume Command",
        summary: "Adjusts the playback volume.",
        usage: "!vol <0-100>",
        example: "!vol 50",
    },
    CommandInfo {
        name: "fix",
        gated: true,
        title: "🔧 Fix Command",
        summary: "Fixes stream issues by restarting the current stream.",
        usage: "!fix",
        example: "Just type !fix when experiencing audio issues.",
    },
    CommandInfo {
        name: "join",
        gated: true,
        title: "➡️ Join Command",
        summary: "Makes the bot join your voice channel, or the default one.",
        usage: "!join",
        example: "Just type !join while in a voice channel.",
    },
    CommandInfo {
        name: "leave",
        gated: true,
        title: "⬅️ Leave Command",
        summary: "Makes the bot leave the current voice channel.",
        usage: "!leave",
        example: "!leave",
    },
    CommandInfo {
        name: "add",
        gated: true,
        title: "➕ Add Command",
        summary: "Adds a new radio station to the list.",
        usage: "!add <name> <url>",
        example: "!add \"My Station\" http://stream.url",
    },
    CommandInfo {
        name: "remove",
        gated: true,
        title: "➖ Remove Command",
        summary: "Removes a radio station from the list.",
        usage: "!remove [number]",
        example: "!remove to list stations, then !remove 3",
    },
    CommandInfo {
        name: "setdefault",
        gated: true,
        title: "⚙️ Set Default Command",
        summary: "Sets the default stream URL.",
        usage: "!setdefault <url>",
        example: "!setdefault http://stream.url",
    },
    CommandInfo {
        name: "listradio",
        gated: true,
        title: "📋 List Radio Command",
        summary: "Shows a list of all configured radio stations.",
        usage: "!listradio",
        example: "!listradio",
    },
    CommandInfo {
        name: "reload",
        gated: true,
        title: "🔃 Reload Command",
        summary: "Reloads the bot configuration.",
        usage: "!reload",
        example: "!reload",
    },
    CommandInfo {
        name: "restart",
        gated: true,
        title: "🔄 Restart Command",
        summary: "Restarts the bot completely.",
        usage: "!restart",
        example: "!restart",
    },
    CommandInfo {
        name: "stats",
        gated: true,
        title: "📊 Stats Command",
        summary: "Shows bot statistics and system information.",
        usage: "!stats",
        example: "!stats",
    },
    CommandInfo {
        name: "status",
        gated: true,
        title: "📡 Status Command",
        summary: "Shows the playback state of this server.",
        usage: "!status",
        example: "!status",
    },
    CommandInfo {
        name: "help",
        gated: false,
        title: "❓ Help Command",
        summary: "Shows all commands, or details for one.",
        usage: "!help [command]",
        example: "!help play",
    },
    CommandInfo {
        name: "about",
        gated: false,
        title: "ℹ️ About Command",
        summary: "Shows information about the bot.",
        usage: "!about",
        example: "!about",
    },
    CommandInfo {
        name: "commands",
        gated: false,
        title: "📜 Commands Command",
        summary: "Lists every command name.",
        usage: "!commands",
        example: "!commands",
    },
];

pub fn find_command(name: &str) -> Option<&'static CommandInfo> {
    COMMANDS.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

pub async fn handle_builtin_command(
    name: &str,
    ctx: &CommandContext<'_>,
    args: &[String],
) -> Result<Vec<OutgoingMessage>, Error> {
    match name {
        "play" => playback_commands::handle_play(ctx, args).await,
        "radio" => playback_commands::handle_radio(ctx).await,
        "stop" => playback_commands::handle_stop(ctx).await,
        "vol" => playback_commands::handle_vol(ctx, args).await,
        "fix" => playback_commands::handle_fix(ctx).await,
        "join" => playback_commands::handle_join(ctx).await,
        "leave" => playback_commands::handle_leave(ctx).await,
        "add" => station_commands::handle_add(ctx, args).await,
        "remove" => station_commands::handle_remove(ctx, args).await,
        "setdefault" => station_commands::handle_setdefault(ctx, args).await,
        "listradio" => station_commands::handle_listradio(ctx).await,
        "reload" => station_commands::handle_reload(ctx).await,
        "restart" => system_commands::handle_restart(ctx).await,
        "stats" => system_commands::handle_stats(ctx).await,
        "status" => system_commands::handle_status(ctx).await,
        "help" => help_commands::handle_help(args),
        "about" => help_commands::handle_about(),
        "commands" => help_commands::handle_commands(),
        other => Err(Error::NotFound(format!("unknown command '{other}'"))),
    }
}

/// Accepts absolute http(s) URLs only.
pub(crate) fn validate_stream_url(raw: &str) -> Result<String, Error> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| Error::InvalidArgument(format!("invalid URL '{raw}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(raw.to_string()),
        other => Err(Error::InvalidArgument(format!(
            "unsupported URL scheme '{other}', use http or https"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_info_commands_are_ungated() {
        let ungated: Vec<_> = COMMANDS.iter().filter(|c| !c.gated).map(|c| c.name).collect();
        assert_eq!(ungated, vec!["help", "about", "commands"]);
    }

    #[test]
    fn test_validate_stream_url() {
        assert!(validate_stream_url("https://radio.example/live.mp3").is_ok());
        assert!(matches!(validate_stream_url("ftp://x/y"), Err(Error::InvalidArgument(_))));
        assert!(matches!(validate_stream_url("not a url"), Err(Error::InvalidArgument(_))));
    }
}
