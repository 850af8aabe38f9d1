//! src/eventbus/mod.rs
//!
//! Provides an in-process event bus that supports guaranteed delivery
//! to multiple subscribers via bounded MPSC queues.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch, Mutex};
use chrono::{DateTime, Utc};
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

/// A `!command` line typed in a guild text channel, with the bits of the
/// author the command layer needs.
#[derive(Debug, Clone)]
pub struct CommandMessage {
    pub guild_id: Id<GuildMarker>,
    pub channel_id: Id<ChannelMarker>,
    pub author_id: Id<UserMarker>,
    pub author_name: String,
    pub author_roles: Vec<Id<RoleMarker>>,
    /// The author's current voice channel, if any.
    pub author_voice_channel: Option<Id<ChannelMarker>>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Global event type that various parts of the bot can publish or subscribe to.
#[derive(Debug, Clone)]
pub enum BotEvent {
    /// The gateway session is up. Carries the guilds the bot is a member of.
    Ready { guild_ids: Vec<Id<GuildMarker>> },

    ChatCommand(CommandMessage),

    /// Somebody (possibly the bot) joined, left or moved between voice channels.
    VoiceStateChanged {
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
        channel_id: Option<Id<ChannelMarker>>,
    },
}

impl BotEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            BotEvent::Ready { .. } => "ready",
            BotEvent::ChatCommand(_) => "chat_command",
            BotEvent::VoiceStateChanged { .. } => "voice_state_changed",
        }
    }
}

/// Each subscriber gets its own `mpsc::Sender<BotEvent>` for guaranteed delivery.
///
/// - If the subscriber’s channel buffer fills, `publish` will await
///   until there's space (backpressure).
/// - If the subscriber has dropped the `Receiver`, the channel is closed
///   and sending returns an error.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<BotEvent>>>>,
    shutdown_tx: watch::Sender<bool>,
    pub shutdown_rx: watch::Receiver<bool>,
    restart_requested: Arc<AtomicBool>,
}

/// Default size for each subscriber’s buffer. Adjust as needed.
const DEFAULT_BUFFER_SIZE: usize = 1024;

impl EventBus {
    /// Create a new, empty event bus.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: tx,
            shutdown_rx: rx,
            restart_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn shutdown(&self) {
        // Setting watch to true
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Shuts down and asks the process owner to start us again.
    pub fn request_restart(&self) {
        self.restart_requested.store(true, Ordering::SeqCst);
        self.shutdown();
    }

    pub fn restart_requested(&self) -> bool {
        self.restart_requested.load(Ordering::SeqCst)
    }

    /// Returns a receiver on which events will be delivered.
    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<BotEvent> {
        let size = buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        let (tx, rx) = mpsc::channel(size);
        let mut subs = self.subscribers.lock().await;
        subs.push(tx);
        rx
    }

    /// Publish an event to all subscribers.
    pub async fn publish(&self, event: BotEvent) {
        let senders = {
            let subs = self.subscribers.lock().await;
            subs.clone()
        };
        for s in senders {
            let _ = s.send(event.clone()).await;
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout, Duration};

    fn voice_update(user: u64) -> BotEvent {
        BotEvent::VoiceStateChanged {
            guild_id: Id::new(10),
            user_id: Id::new(user),
            channel_id: None,
        }
    }

    fn user_of(event: &BotEvent) -> Option<u64> {
        match event {
            BotEvent::VoiceStateChanged { user_id, .. } => Some(user_id.get()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new();

        let mut rx1 = bus.subscribe(Some(5)).await;
        let mut rx2 = bus.subscribe(Some(5)).await;

        bus.publish(BotEvent::Ready { guild_ids: vec![Id::new(10)] }).await;

        let evt1 = rx1.recv().await.expect("rx1 should get event");
        let evt2 = rx2.recv().await.expect("rx2 should get event");

        assert_eq!(evt1.event_type(), "ready", "rx1 got the wrong event type");
        assert_eq!(evt2.event_type(), "ready", "rx2 got the wrong event type");
    }

    #[tokio::test]
    async fn test_backpressure_blocking() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe(Some(1)).await; // queue size = 1

        bus.publish(voice_update(1)).await;

        let handle = tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            let first = rx.recv().await.expect("expected first message");
            let second = rx.recv().await.expect("expected second message");
            (first, second)
        });

        // This call waits until the reader makes room.
        let second_publish = bus.publish(voice_update(2));
        let result = timeout(Duration::from_millis(500), second_publish).await;
        assert!(result.is_ok(), "publish should eventually unblock");

        let (evt1, evt2) = handle.await.unwrap();
        assert_eq!(user_of(&evt1), Some(1));
        assert_eq!(user_of(&evt2), Some(2));
    }

    #[tokio::test]
    async fn test_restart_request_also_shuts_down() {
        let bus = EventBus::new();
        assert!(!bus.is_shutdown());
        bus.request_restart();
        assert!(bus.is_shutdown());
        assert!(bus.restart_requested());
    }

    #[test]
    fn test_event_type_names() {
        assert_eq!(voice_update(20).event_type(), "voice_state_changed");
        assert_eq!(BotEvent::Ready { guild_ids: vec![] }.event_type(), "ready");
    }
}
