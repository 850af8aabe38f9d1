// File: radiobot-core/src/services/builtin_commands/help_commands.rs

use radiobot_common::models::message::{EmbedSpec, OutgoingMessage};
use crate::Error;
use super::{find_command, COMMANDS};

const HELP_COLOR: u32 = 0x3498DB;

pub fn handle_help(args: &[String]) -> Result<Vec<OutgoingMessage>, Error> {
    if let Some(topic) = args.first() {
        let topic = topic.trim_start_matches('!');
        let Some(info) = find_command(topic) else {
            return Ok(vec![OutgoingMessage::text(format!(
                "No detailed help available for command: {topic}"
            ))]);
        };
        let embed = EmbedSpec::new()
            .title(info.title)
            .description(info.summary)
            .color(HELP_COLOR)
            .field("Usage", format!("```{}```", info.usage))
            .field("Example", format!("```{}```", info.example));
        return Ok(vec![OutgoingMessage::embed(embed)]);
    }

    let section = |names: &[&str]| -> String {
        let lines: Vec<String> = names
            .iter()
            .filter_map(|n| find_command(n))
            .map(|c| format!("{:<14}- {}", c.usage, c.summary))
            .collect();
        format!("```\n{}```", lines.join("\n"))
    };

    let embed = EmbedSpec::new()
        .title("📻 Radio Bot Commands")
        .description("Use `!help <command>` for detailed information about a specific command.")
        .color(HELP_COLOR)
        .field("📻 Radio Controls", section(&["radio", "play", "stop", "vol", "fix"]))
        .field("🎤 Voice Channel Controls", section(&["join", "leave"]))
        .field("⚙️ Station Management", section(&["add", "remove", "listradio", "setdefault"]))
        .field("🖥️ System Commands", section(&["stats", "status", "reload", "restart"]))
        .field("ℹ️ Info", section(&["help", "about", "commands"]));
    Ok(vec![OutgoingMessage::embed(embed)])
}

pub fn handle_about() -> Result<Vec<OutgoingMessage>, Error> {
    let embed = EmbedSpec::new()
        .title("📻 Discord Radio Bot")
        .description("Streams internet radio into a voice channel and keeps it running.")
        .color(HELP_COLOR)
        .field(
            "Features",
            "• Multiple radio station support\n• Automatic stream recovery\n• Volume control\n• Station management\n• Now-playing updates\n• Auto-fix system",
        )
        .field("Version", env!("CARGO_PKG_VERSION"))
        .footer("Use !help to see available commands");
    Ok(vec![OutgoingMessage::embed(embed)])
}

pub fn handle_commands() -> Result<Vec<OutgoingMessage>, Error> {
    let names: Vec<String> = COMMANDS.iter().map(|c| format!("`!{}`", c.name)).collect();
    Ok(vec![OutgoingMessage::text(format!("Commands: {}", names.join(", ")))])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_for_known_command() {
        let msgs = handle_help(&["!vol".to_string()]).unwrap();
        let embed = msgs[0].embed.as_ref().unwrap();
        assert_eq!(embed.title.as_deref(), Some("🔊 Volume Command"));
        assert_eq!(embed.fields[0].value, "```!vol <0-100>```");
    }

    #[test]
    fn test_help_for_unknown_command() {
        let msgs = handle_help(&["dance".to_string()]).unwrap();
        assert_eq!(msgs[0].summary(), "No detailed help available for command: dance");
    }

    #[test]
    fn test_commands_lists_everything() {
        let text = handle_commands().unwrap()[0].summary();
        for c in COMMANDS {
            assert!(text.contains(&format!("!{}", c.name)));
        }
    }
}
