// File: radiobot-core/src/repositories/ini/config.rs
//
// INI-backed settings store. Layout:
//
//   [settings]        token, channel_id, default_voice_channel_id, default_stream_url,
//                     default_volume, allowed_role_ids, banned_titles, ...
//   [radio_stations]  station1_name / station1_url, station2_name / ...
//   [spotify]         client_id, client_secret, update_channel_id, default_cover_url

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use ini::{Ini, Properties};
use regex::Regex;
use tokio::sync::Mutex;
use tracing::{debug, info};
use twilight_model::id::Id;

use radiobot_common::traits::repository_traits::ConfigRepository;
use radiobot_common::models::config::{
    BotSettings, RadioConfig, SpotifySettings, DEFAULT_AUTO_FIX_HOURS, DEFAULT_PRESENCE_INTERVAL,
    DEFAULT_PROBE_TIMEOUT, DEFAULT_RESTART_DELAY,
};
use radiobot_common::models::station::{BanList, Station, StationDirectory};
use crate::Error;

const SETTINGS: &str = "settings";
const STATIONS: &str = "radio_stations";
const SPOTIFY: &str = "spotify";

static STATION_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^station(\d+)_(name|url)$").expect("static regex")
});

pub struct IniConfigRepository {
    path: PathBuf,
    /// Serialises read-modify-write cycles on the file.
    write_lock: Mutex<()>,
}

impl IniConfigRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_ini(&self) -> Result<Ini, Error> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", self.path.display()))
        })?;
        Ini::load_from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", self.path.display())))
    }

    async fn write_ini(&self, ini: &Ini) -> Result<(), Error> {
        let mut buf = Vec::new();
        ini.write_to(&mut buf)?;
        tokio::fs::write(&self.path, buf).await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigRepository for IniConfigRepository {
    async fn load(&self) -> Result<RadioConfig, Error> {
        let ini = self.read_ini().await?;
        let config = parse_radio_config(&ini)?;
        info!(
            "Configuration loaded from {} ({} stations, {} banned title patterns)",
            self.path.display(),
            config.directory.len(),
            config.ban_list.len()
        );
        Ok(config)
    }

    async fn add_station(&self, station: &Station) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;
        let mut ini = self.read_ini().await?;

        // Append to the last station section so the new entry lists last.
        let section = ini
            .iter()
            .filter_map(|(name, _)| name)
            .filter(|name| name.starts_with(STATIONS))
            .last()
            .unwrap_or(STATIONS)
            .to_string();
        let mut highest = 0;
        if let Some(props) = ini.section(Some(section.as_str())) {
            for (key, _) in props.iter() {
                if let Some(caps) = STATION_KEY.captures(key) {
                    highest = highest.max(parse_station_index(&caps[1])?);
                }
            }
        }
        let next = highest + 1;
        ini.with_section(Some(section.as_str()))
            .set(format!("station{next}_name"), station.name.clone())
            .set(format!("station{next}_url"), station.url.clone());

        self.write_ini(&ini).await?;
        debug!("Added station{next} '{}' => {} in [{section}]", station.name, station.url);
        Ok(())
    }

    async fn remove_station(&self, index: usize) -> Result<Station, Error> {
        let _guard = self.write_lock.lock().await;
        let mut ini = self.read_ini().await?;

        let directory = build_directory(&station_entries(&ini)?)?;
        let removed = directory.resolve_by_index(index)?.clone();

        // Drop every station key, then write the survivors back renumbered.
        let sections: Vec<String> = ini
            .iter()
            .filter_map(|(name, _)| name)
            .filter(|name| name.starts_with(STATIONS))
            .map(str::to_string)
            .collect();
        for section in &sections {
            if let Some(props) = ini.section_mut(Some(section.as_str())) {
                let keys: Vec<String> = props
                    .iter()
                    .filter(|(k, _)| STATION_KEY.is_match(k))
                    .map(|(k, _)| k.to_string())
                    .collect();
                for key in keys {
                    props.remove(key.as_str());
                }
            }
        }

        let mut n = 0;
        for station in directory.stations().iter().filter(|s| s.name != removed.name) {
            n += 1;
            ini.with_section(Some(STATIONS))
                .set(format!("station{n}_name"), station.name.clone())
                .set(format!("station{n}_url"), station.url.clone());
        }

        self.write_ini(&ini).await?;
        debug!("Removed station #{index} '{}'", removed.name);
        Ok(removed)
    }

    async fn set_default_stream_url(&self, url: &str) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;
        let mut ini = self.read_ini().await?;
        ini.with_section(Some(SETTINGS)).set("default_stream_url", url);
        self.write_ini(&ini).await
    }
}

/// Validates and converts a parsed INI document.
pub fn parse_radio_config(ini: &Ini) -> Result<RadioConfig, Error> {
    let settings_section = ini
        .section(Some(SETTINGS))
        .ok_or_else(|| Error::Config(format!("missing [{SETTINGS}] section")))?;

    let settings = parse_settings(settings_section)?;
    let ban_list = settings_section
        .get("banned_titles")
        .map(BanList::from_comma_list)
        .unwrap_or_default();
    let spotify = ini.section(Some(SPOTIFY)).map(parse_spotify).transpose()?;
    let directory = build_directory(&station_entries(ini)?)?;

    Ok(RadioConfig {
        settings,
        spotify,
        directory,
        ban_list,
    })
}

fn parse_settings(props: &Properties) -> Result<BotSettings, Error> {
    let default_volume: u8 = parse_required(props, "default_volume")?;
    if default_volume > 100 {
        return Err(Error::Config(format!(
            "default_volume must be within 0..=100, got {default_volume}"
        )));
    }

    let allowed_role_ids = required(props, "allowed_role_ids")?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_id(s, "allowed_role_ids"))
        .collect::<Result<Vec<_>, _>>()?;

    let auto_fix_hours: u64 = parse_optional(props, "auto_fix_interval_hours")?
        .unwrap_or(DEFAULT_AUTO_FIX_HOURS);
    let auto_fix_interval = match auto_fix_hours {
        0 => None,
        hours => Some(Duration::from_secs(hours.checked_mul(3600).ok_or_else(|| {
            Error::Config(format!("auto_fix_interval_hours is too large: {hours}"))
        })?)),
    };

    Ok(BotSettings {
        token: required(props, "token")?.to_string(),
        channel_id: parse_id(required(props, "channel_id")?, "channel_id")?,
        default_voice_channel_id: parse_id(
            required(props, "default_voice_channel_id")?,
            "default_voice_channel_id",
        )?,
        default_stream_url: required(props, "default_stream_url")?.to_string(),
        default_volume,
        allowed_role_ids,
        client_id: props.get("client_id").map(str::to_string),
        presence_interval: parse_optional(props, "presence_interval_secs")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_PRESENCE_INTERVAL),
        probe_timeout: parse_optional(props, "probe_timeout_secs")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_PROBE_TIMEOUT),
        restart_delay: parse_optional(props, "restart_delay_ms")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_RESTART_DELAY),
        auto_fix_interval,
    })
}

fn parse_spotify(props: &Properties) -> Result<SpotifySettings, Error> {
    Ok(SpotifySettings {
        client_id: required(props, "client_id")?.to_string(),
        client_secret: required(props, "client_secret")?.to_string(),
        update_channel_id: props
            .get("update_channel_id")
            .map(|v| parse_id(v, "update_channel_id"))
            .transpose()?,
        default_cover_url: props.get("default_cover_url").map(str::to_string),
    })
}

/// `stationN_name` / `stationN_url` values from every `[radio_stations*]`
/// section, keyed by (section, N) so iteration follows file order.
fn station_entries(
    ini: &Ini,
) -> Result<BTreeMap<(usize, usize), (Option<String>, Option<String>)>, Error> {
    let mut entries = BTreeMap::new();
    let sections = ini
        .iter()
        .filter_map(|(name, props)| name.map(|n| (n, props)))
        .filter(|(name, _)| name.starts_with(STATIONS))
        .enumerate();

    for (section_pos, (_, props)) in sections {
        for (key, value) in props.iter() {
            let Some(caps) = STATION_KEY.captures(key) else {
                continue;
            };
            let idx = parse_station_index(&caps[1])?;
            let slot: &mut (Option<String>, Option<String>) =
                entries.entry((section_pos, idx)).or_default();
            match &caps[2] {
                "name" => slot.0 = Some(value.trim().to_string()),
                _ => slot.1 = Some(value.trim().to_string()),
            }
        }
    }
    Ok(entries)
}

fn build_directory(
    entries: &BTreeMap<(usize, usize), (Option<String>, Option<String>)>,
) -> Result<StationDirectory, Error> {
    let mut pairs = Vec::with_capacity(entries.len());
    for ((_, idx), (name, url)) in entries {
        match (name, url) {
            (Some(name), Some(url)) if !name.is_empty() && !url.is_empty() => {
                pairs.push((name.clone(), url.clone()));
            }
            (Some(_), _) => {
                return Err(Error::Config(format!("station{idx}_url is missing or empty")));
            }
            _ => {
                return Err(Error::Config(format!("station{idx}_name is missing or empty")));
            }
        }
    }
    Ok(StationDirectory::from_pairs(pairs))
}

fn parse_station_index(raw: &str) -> Result<usize, Error> {
    raw.parse()
        .map_err(|_| Error::Config(format!("station index '{raw}' is out of range")))
}

fn required<'a>(props: &'a Properties, key: &str) -> Result<&'a str, Error> {
    props
        .get(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("missing required setting '{key}'")))
}

fn parse_required<T: std::str::FromStr>(props: &Properties, key: &str) -> Result<T, Error> {
    let raw = required(props, key)?;
    raw.parse()
        .map_err(|_| Error::Config(format!("setting '{key}' has invalid value '{raw}'")))
}

fn parse_optional<T: std::str::FromStr>(props: &Properties, key: &str) -> Result<Option<T>, Error> {
    match props.get(key).map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("setting '{key}' has invalid value '{raw}'"))),
        None => Ok(None),
    }
}

fn parse_id<M>(raw: &str, key: &str) -> Result<Id<M>, Error> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .and_then(Id::new_checked)
        .ok_or_else(|| Error::Config(format!("'{key}' contains an invalid id '{raw}'")))
}
