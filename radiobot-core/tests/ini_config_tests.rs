// File: radiobot-core/tests/ini_config_tests.rs

use std::sync::Arc;

use tempfile::TempDir;

use radiobot_common::models::station::Station;
use radiobot_common::traits::repository_traits::ConfigRepository;
use radiobot_core::{repositories::IniConfigRepository, services::ConfigService, Error};

const CONFIG: &str = r#"
[settings]
token = abc.def
channel_id = 1001
default_voice_channel_id = 2002
default_stream_url = http://a.example/stream
default_volume = 50
allowed_role_ids = 11
banned_titles = Advert

[radio_stations]
station1_name = Alpha
station1_url = http://a.example/stream
station2_name = Bravo
station2_url = http://b.example/stream
station3_name = Charlie
station3_url = http://c.example/stream
"#;

fn write_config(contents: &str) -> Result<(TempDir, IniConfigRepository), Error> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.ini");
    std::fs::write(&path, contents)?;
    Ok((dir, IniConfigRepository::new(path)))
}

fn names(repo_config: &radiobot_common::models::config::RadioConfig) -> Vec<String> {
    repo_config
        .directory
        .stations()
        .iter()
        .map(|s| s.name.clone())
        .collect()
}

#[tokio::test]
async fn test_add_station_appends_after_highest_index() -> Result<(), Error> {
    let (_dir, repo) = write_config(CONFIG)?;

    repo.add_station(&Station::new("Delta", "http://d.example/stream")).await?;

    let raw = std::fs::read_to_string(repo.path())?;
    assert!(raw.contains("station4_name=Delta") || raw.contains("station4_name = Delta"));
    let cfg = repo.load().await?;
    assert_eq!(names(&cfg), vec!["Alpha", "Bravo", "Charlie", "Delta"]);
    Ok(())
}

#[tokio::test]
async fn test_add_station_keeps_stations_of_every_section() -> Result<(), Error> {
    let extra = format!(
        "{CONFIG}\n[radio_stations_extra]\nstation1_name = Echo\nstation1_url = http://e.example/stream\n"
    );
    let (_dir, repo) = write_config(&extra)?;
    assert_eq!(names(&repo.load().await?), vec!["Alpha", "Bravo", "Charlie", "Echo"]);

    repo.add_station(&Station::new("Delta", "http://d.example/stream")).await?;

    let cfg = repo.load().await?;
    assert_eq!(names(&cfg), vec!["Alpha", "Bravo", "Charlie", "Echo", "Delta"]);
    assert_eq!(cfg.directory.resolve_by_index(2)?.url, "http://b.example/stream");
    Ok(())
}

#[tokio::test]
async fn test_remove_station_renumbers_survivors() -> Result<(), Error> {
    let (_dir, repo) = write_config(CONFIG)?;

    let removed = repo.remove_station(2).await?;
    assert_eq!(removed.name, "Bravo");

    let cfg = repo.load().await?;
    assert_eq!(names(&cfg), vec!["Alpha", "Charlie"]);
    let raw = std::fs::read_to_string(repo.path())?;
    assert!(!raw.contains("station3_"));

    assert!(matches!(repo.remove_station(5).await, Err(Error::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn test_set_default_stream_url_persists() -> Result<(), Error> {
    let (_dir, repo) = write_config(CONFIG)?;
    repo.set_default_stream_url("http://c.example/stream").await?;

    let cfg = repo.load().await?;
    assert_eq!(cfg.settings.default_stream_url, "http://c.example/stream");
    assert_eq!(cfg.directory.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_reload_picks_up_edits_and_keeps_snapshot_on_error() -> Result<(), Error> {
    let (_dir, repo) = write_config(CONFIG)?;
    let path = repo.path().to_path_buf();
    let service = ConfigService::load(Arc::new(repo)).await?;
    assert_eq!(service.snapshot().ban_list.len(), 1);

    std::fs::write(&path, CONFIG.replace("banned_titles = Advert", "banned_titles = Advert, Jingle"))?;
    let cfg = service.reload().await?;
    assert_eq!(cfg.ban_list.len(), 2);

    std::fs::write(&path, CONFIG.replace("token = abc.def\n", ""))?;
    assert!(matches!(service.reload().await, Err(Error::Config(_))));
    assert_eq!(service.snapshot().ban_list.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_missing_file_is_config_error() -> Result<(), Error> {
    let dir = tempfile::tempdir()?;
    let repo = IniConfigRepository::new(dir.path().join("absent.ini"));
    assert!(matches!(repo.load().await, Err(Error::Config(_))));
    Ok(())
}
