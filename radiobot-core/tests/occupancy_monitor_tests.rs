// File: radiobot-core/tests/occupancy_monitor_tests.rs

use std::sync::Arc;

use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};

use radiobot_core::{
    services::{ChannelOccupancyMonitor, ConfigService, OccupancyOutcome, PlaybackSupervisor},
    test_utils::fakes::*,
    Error,
};

struct Harness {
    sink: Arc<FakeVoiceSink>,
    chat: Arc<FakeChat>,
    supervisor: Arc<PlaybackSupervisor>,
    monitor: ChannelOccupancyMonitor,
}

fn harness() -> Harness {
    let sink = Arc::new(FakeVoiceSink::new());
    let chat = Arc::new(FakeChat::new());
    let repo = Arc::new(InMemoryConfigRepository::new(sample_config()));
    let config = Arc::new(ConfigService::with_config(repo, sample_config()));
    let supervisor = Arc::new(PlaybackSupervisor::new(sink.clone(), config.clone()));
    let monitor = ChannelOccupancyMonitor::new(chat.clone(), supervisor.clone(), config);
    Harness { sink, chat, supervisor, monitor }
}

fn guild() -> Id<GuildMarker> {
    Id::new(TEST_GUILD)
}

fn other_channel() -> Id<ChannelMarker> {
    Id::new(OTHER_VOICE_CHANNEL)
}

fn bot() -> Id<UserMarker> {
    Id::new(BOT_USER)
}

#[tokio::test]
async fn test_not_connected_does_nothing() -> Result<(), Error> {
    let h = harness();
    assert_eq!(h.monitor.on_voice_state_change(guild()).await?, OccupancyOutcome::NotConnected);
    assert!(h.sink.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_alone_elsewhere_returns_to_default() -> Result<(), Error> {
    let h = harness();
    h.sink.set_channel(guild(), other_channel());
    h.chat.set_members(other_channel(), vec![bot()]);

    let outcome = h.monitor.on_voice_state_change(guild()).await?;
    assert_eq!(outcome, OccupancyOutcome::Relocated(Id::new(DEFAULT_VOICE_CHANNEL)));
    assert_eq!(
        h.sink.calls(),
        vec![SinkCall::Connect(guild(), Id::new(DEFAULT_VOICE_CHANNEL))]
    );
    Ok(())
}

#[tokio::test]
async fn test_relocation_keeps_playback() -> Result<(), Error> {
    let h = harness();
    let alpha = sample_config().directory.resolve_by_index(1)?.clone();
    h.supervisor.play(guild(), &alpha, Some(other_channel())).await?;
    h.chat.set_members(other_channel(), vec![bot()]);

    h.monitor.on_voice_state_change(guild()).await?;

    let session = h.supervisor.snapshot(guild()).await.unwrap();
    assert_eq!(session.active_url.as_deref(), Some("http://alpha.example/stream"));
    assert_eq!(session.generation, 1);
    assert_eq!(h.sink.start_count(), 1);
    assert_eq!(h.supervisor.current_channel(guild()).await, Some(Id::new(DEFAULT_VOICE_CHANNEL)));
    Ok(())
}

#[tokio::test]
async fn test_listener_present_stays_put() -> Result<(), Error> {
    let h = harness();
    h.sink.set_channel(guild(), other_channel());
    h.chat.set_members(other_channel(), vec![bot(), Id::new(901)]);

    assert_eq!(h.monitor.on_voice_state_change(guild()).await?, OccupancyOutcome::Occupied(2));
    assert!(h.sink.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_alone_in_default_stays() -> Result<(), Error> {
    let h = harness();
    h.sink.set_channel(guild(), Id::new(DEFAULT_VOICE_CHANNEL));
    h.chat.set_members(Id::new(DEFAULT_VOICE_CHANNEL), vec![bot()]);

    assert_eq!(h.monitor.on_voice_state_change(guild()).await?, OccupancyOutcome::AlreadyHome);
    Ok(())
}

#[tokio::test]
async fn test_default_in_other_guild_is_ignored() -> Result<(), Error> {
    let h = harness();
    h.chat.set_channel_guild(Id::new(DEFAULT_VOICE_CHANNEL), Id::new(777));
    h.sink.set_channel(guild(), other_channel());
    h.chat.set_members(other_channel(), vec![bot()]);

    assert_eq!(h.monitor.on_voice_state_change(guild()).await?, OccupancyOutcome::NoDefault);

    h.chat.clear_channel_guild(Id::new(DEFAULT_VOICE_CHANNEL));
    assert_eq!(h.monitor.on_voice_state_change(guild()).await?, OccupancyOutcome::NoDefault);
    assert!(h.sink.calls().is_empty());
    Ok(())
}
