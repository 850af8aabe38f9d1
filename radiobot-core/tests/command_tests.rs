// File: radiobot-core/tests/command_tests.rs

use std::sync::Arc;

use twilight_model::id::Id;
use twilight_model::id::marker::GuildMarker;

use radiobot_core::{
    eventbus::EventBus,
    services::command_service::PERMISSION_DENIED,
    services::{CommandService, ConfigService, IdentitySync, PlaybackSupervisor},
    test_utils::fakes::*,
    Error,
};

struct Harness {
    sink: Arc<FakeVoiceSink>,
    chat: Arc<FakeChat>,
    config: Arc<ConfigService>,
    bus: Arc<EventBus>,
    commands: CommandService,
}

fn harness_with_titles(titles: &[&str]) -> Harness {
    let sink = Arc::new(FakeVoiceSink::new());
    let chat = Arc::new(FakeChat::new());
    let repo = Arc::new(InMemoryConfigRepository::new(sample_config()));
    let config = Arc::new(ConfigService::with_config(repo, sample_config()));
    let supervisor = Arc::new(PlaybackSupervisor::new(sink.clone(), config.clone()));
    let bus = Arc::new(EventBus::new());
    let commands = CommandService::new(
        chat.clone(),
        supervisor,
        config.clone(),
        IdentitySync::new(chat.clone()),
        Arc::new(ScriptedProber::new(titles.iter().copied())),
        bus.clone(),
    );
    Harness { sink, chat, config, bus, commands }
}

fn harness() -> Harness {
    harness_with_titles(&[])
}

fn guild() -> Id<GuildMarker> {
    Id::new(TEST_GUILD)
}

async fn reply(h: &Harness, text: &str) -> String {
    h.commands
        .dispatch(&command_from(text))
        .await
        .map(|r| r.first_text())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_gated_command_in_wrong_channel_is_denied() -> Result<(), Error> {
    let h = harness();
    let mut msg = command_from("!play 1");
    msg.channel_id = Id::new(999);

    let resp = h.commands.dispatch(&msg).await.expect("reply");
    assert_eq!(resp.first_text(), PERMISSION_DENIED);
    assert_eq!(resp.channel_id, Id::new(999));
    assert_eq!(h.sink.start_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_gated_command_without_role_is_denied() -> Result<(), Error> {
    let h = harness();
    let mut msg = command_from("!stop");
    msg.author_roles.clear();

    let resp = h.commands.dispatch(&msg).await.expect("reply");
    assert_eq!(resp.first_text(), PERMISSION_DENIED);
    Ok(())
}

#[tokio::test]
async fn test_help_is_open_everywhere() -> Result<(), Error> {
    let h = harness();
    let mut msg = command_from("!help play");
    msg.channel_id = Id::new(999);
    msg.author_roles.clear();

    let resp = h.commands.dispatch(&msg).await.expect("reply");
    let embed = resp.messages[0].embed.as_ref().expect("help embed");
    assert!(embed.fields.iter().any(|f| f.name == "Usage"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_and_plain_lines_are_ignored() -> Result<(), Error> {
    let h = harness();
    assert!(h.commands.dispatch(&command_from("!dance")).await.is_none());
    assert!(h.commands.dispatch(&command_from("hello there")).await.is_none());
    assert!(h.chat.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_play_by_index_sets_station_and_nickname() -> Result<(), Error> {
    let h = harness();

    assert_eq!(reply(&h, "!play 2").await, "Now playing: Bravo");
    assert_eq!(h.sink.playing_url(guild()).as_deref(), Some("http://bravo.example/stream"));
    assert_eq!(h.chat.nickname(guild()).as_deref(), Some("# Bravo"));

    assert_eq!(reply(&h, "!play 2").await, "Already playing: Bravo");
    assert_eq!(h.sink.start_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_play_out_of_range_reports_not_found() -> Result<(), Error> {
    let h = harness();
    let text = reply(&h, "!play 9").await;
    assert!(text.starts_with("Station #9"), "got: {text}");
    assert_eq!(h.sink.start_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_play_custom_url_uses_probed_title() -> Result<(), Error> {
    let h = harness_with_titles(&["Live Set"]);

    assert_eq!(reply(&h, "!play https://custom.example/live").await, "Now playing: Live Set");
    assert_eq!(h.chat.typing_count(), 1);
    assert_eq!(h.chat.nickname(guild()).as_deref(), Some("# Custom URL"));

    let text = reply(&h, "!play ftp://custom.example/live").await;
    assert!(text.contains("http"), "got: {text}");
    Ok(())
}

#[tokio::test]
async fn test_stop_and_volume_replies() -> Result<(), Error> {
    let h = harness();
    assert_eq!(reply(&h, "!stop").await, "Not playing anything!");

    reply(&h, "!play 1").await;
    assert_eq!(reply(&h, "!vol 40").await, "Volume set to 40%");
    assert!(reply(&h, "!vol 150").await.to_lowercase().contains("volume"));
    assert_eq!(reply(&h, "!stop").await, "Playback stopped");
    assert!(h.sink.playing_url(guild()).is_none());
    Ok(())
}

#[tokio::test]
async fn test_fix_without_stream_starts_default() -> Result<(), Error> {
    let h = harness();
    let resp = h.commands.dispatch(&command_from("!fix")).await.expect("reply");
    let texts: Vec<String> = resp.messages.iter().map(|m| m.summary()).collect();
    assert_eq!(
        texts,
        vec!["No current stream found, starting default station.", "Stream restarted: Alpha"]
    );
    Ok(())
}

#[tokio::test]
async fn test_station_management_updates_directory() -> Result<(), Error> {
    let h = harness();

    assert_eq!(
        reply(&h, r#"!add "Delta Radio" http://delta.example/stream"#).await,
        "Added station #4: Delta Radio (http://delta.example/stream)"
    );
    assert!(reply(&h, "!add Alpha http://x.example/").await.contains("already exists"));

    assert_eq!(reply(&h, "!remove 1").await, "Removed station: Alpha");
    let dir = h.config.snapshot().directory.clone();
    assert_eq!(dir.len(), 3);
    assert_eq!(dir.resolve_by_index(1)?.name, "Bravo");
    assert_eq!(dir.resolve_by_index(3)?.name, "Delta Radio");

    assert_eq!(
        reply(&h, "!setdefault http://bravo.example/stream").await,
        "Default stream URL set to http://bravo.example/stream"
    );
    assert_eq!(h.config.snapshot().settings.default_stream_url, "http://bravo.example/stream");
    Ok(())
}

#[tokio::test]
async fn test_radio_marks_current_station() -> Result<(), Error> {
    let h = harness();
    reply(&h, "!play 3").await;

    let resp = h.commands.dispatch(&command_from("!radio")).await.expect("reply");
    let embed = resp.messages[0].embed.as_ref().expect("station list");
    let description = embed.description.as_deref().unwrap_or_default();
    assert!(description.contains("`3.` Charlie ◀ now playing"));
    assert!(!description.contains("Alpha ◀"));
    Ok(())
}

#[tokio::test]
async fn test_join_and_leave() -> Result<(), Error> {
    let h = harness();
    assert_eq!(reply(&h, "!leave").await, "I am not in a voice channel!");
    assert_eq!(reply(&h, "!join").await, "Joined default channel: Radio Lounge");

    let mut msg = command_from("!join");
    msg.author_voice_channel = Some(Id::new(OTHER_VOICE_CHANNEL));
    let resp = h.commands.dispatch(&msg).await.expect("reply");
    assert_eq!(resp.first_text(), "Joined Gaming");

    assert_eq!(reply(&h, "!leave").await, "Left voice channel");
    Ok(())
}

#[tokio::test]
async fn test_restart_replies_then_requests_restart() -> Result<(), Error> {
    let h = harness();
    assert!(h.commands.dispatch(&command_from("!restart")).await.is_none());
    assert_eq!(h.chat.sent_summaries(), vec!["Restarting bot..."]);
    assert!(h.bus.restart_requested());
    assert!(h.bus.is_shutdown());
    Ok(())
}
