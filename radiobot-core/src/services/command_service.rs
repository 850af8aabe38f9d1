// File: radiobot-core/src/services/command_service.rs

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;

use radiobot_common::models::message::OutgoingMessage;
use radiobot_common::traits::media_traits::TitleSource;
use radiobot_common::traits::platform_traits::ChatGateway;
use crate::Error;
use crate::eventbus::{CommandMessage, EventBus};
use crate::services::builtin_commands::{find_command, handle_builtin_command};
use crate::services::config_service::ConfigService;
use crate::services::identity_sync::IdentitySync;
use crate::services::playback_supervisor::PlaybackSupervisor;

pub const COMMAND_PREFIX: char = '!';

pub const PERMISSION_DENIED: &str = "You don't have permission to use this command or wrong channel.";

/// Context passed to built-in command handlers.
pub struct CommandContext<'a> {
    pub message: &'a CommandMessage,
    pub chat: &'a Arc<dyn ChatGateway>,
    pub supervisor: &'a Arc<PlaybackSupervisor>,
    pub config: &'a Arc<ConfigService>,
    pub identity: &'a IdentitySync,
    pub prober: &'a Arc<dyn TitleSource>,
    pub event_bus: &'a Arc<EventBus>,
    pub started_at: Instant,
}

/// Messages to send back, in order, to the channel the command came from.
#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub channel_id: Id<ChannelMarker>,
    pub messages: Vec<OutgoingMessage>,
}

impl CommandResponse {
    pub fn first_text(&self) -> String {
        self.messages.first().map(|m| m.summary()).unwrap_or_default()
    }
}

pub struct CommandService {
    chat: Arc<dyn ChatGateway>,
    supervisor: Arc<PlaybackSupervisor>,
    config: Arc<ConfigService>,
    identity: IdentitySync,
    prober: Arc<dyn TitleSource>,
    event_bus: Arc<EventBus>,
    started_at: Instant,
}

impl CommandService {
    pub fn new(
        chat: Arc<dyn ChatGateway>,
        supervisor: Arc<PlaybackSupervisor>,
        config: Arc<ConfigService>,
        identity: IdentitySync,
        prober: Arc<dyn TitleSource>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        debug!("Initializing CommandService");
        Self {
            chat,
            supervisor,
            config,
            identity,
            prober,
            event_bus,
            started_at: Instant::now(),
        }
    }

    /// Runs a command and folds any error into a single reply.
    pub async fn dispatch(&self, message: &CommandMessage) -> Option<CommandResponse> {
        match self.handle_chat_line(message).await {
            Ok(resp) => resp,
            Err(e) => {
                let text = match &e {
                    Error::Permission(_) => {
                        info!("Denied '{}' from {} in channel {}", message.text, message.author_name, message.channel_id);
                        PERMISSION_DENIED.to_string()
                    }
                    Error::InvalidArgument(msg) | Error::NotFound(msg) | Error::NoVoiceChannel(msg) => {
                        warn!("Command '{}' rejected: {e}", message.text);
                        capitalize(msg)
                    }
                    other => {
                        error!("Command '{}' failed: {other}", message.text);
                        format!("An error occurred: {other}")
                    }
                };
                Some(CommandResponse {
                    channel_id: message.channel_id,
                    messages: vec![OutgoingMessage::text(text)],
                })
            }
        }
    }

    /// Parses a chat line and runs the matching built-in command. Lines
    /// without the prefix and unknown commands yield `Ok(None)`.
    pub async fn handle_chat_line(&self, message: &CommandMessage) -> Result<Option<CommandResponse>, Error> {
        let Some((name, args)) = parse_command_line(&message.text) else {
            return Ok(None);
        };
        let Some(info) = find_command(&name) else {
            debug!("No command found matching '{name}'");
            return Ok(None);
        };

        if info.gated && !self.is_authorized(message) {
            return Err(Error::Permission(format!("'{name}' by {}", message.author_id)));
        }

        info!("Command '{}' invoked by {} with args {:?}", info.name, message.author_name, args);

        let ctx = CommandContext {
            message,
            chat: &self.chat,
            supervisor: &self.supervisor,
            config: &self.config,
            identity: &self.identity,
            prober: &self.prober,
            event_bus: &self.event_bus,
            started_at: self.started_at,
        };
        let messages = handle_builtin_command(info.name, &ctx, &args).await?;
        if messages.is_empty() {
            return Ok(None);
        }
        Ok(Some(CommandResponse {
            channel_id: message.channel_id,
            messages,
        }))
    }

    /// The command channel plus at least one allowed role.
    pub fn is_authorized(&self, message: &CommandMessage) -> bool {
        let config = self.config.snapshot();
        message.channel_id == config.settings.channel_id
            && message
                .author_roles
                .iter()
                .any(|r| config.settings.allowed_role_ids.contains(r))
    }
}

/// Splits `!name arg "quoted arg"` into a lowercased command name and its arguments.
pub fn parse_command_line(text: &str) -> Option<(String, Vec<String>)> {
    let body = text.trim().strip_prefix(COMMAND_PREFIX)?;
    let mut parts = split_args(body).into_iter();
    let name = parts.next()?.to_lowercase();
    if name.is_empty() {
        return None;
    }
    Some((name, parts.collect()))
}

/// Whitespace split that keeps double-quoted runs together.
pub fn split_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;

    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() || quoted {
                    args.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() || quoted {
        args.push(current);
    }
    args
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
