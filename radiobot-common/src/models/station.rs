//! Station identity: the configured name → stream URL table and the
//! title ban list. Both are rebuilt on every config reload and never
//! mutated in place afterwards.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Name reported for a URL that is not in the directory (custom `play <url>`).
pub const UNKNOWN_STATION: &str = "Unknown Station";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    pub url: String,
}

impl Station {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    pub fn unknown(url: impl Into<String>) -> Self {
        Self::new(UNKNOWN_STATION, url)
    }

    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_STATION
    }
}

/// Ordered station table. Index-based selection (`play 2`) follows the
/// configured order, so this is a Vec and not a map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationDirectory {
    stations: Vec<Station>,
}

impl StationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory from `(name, url)` pairs in configured order.
    ///
    /// A repeated name overwrites the URL of the earlier entry and keeps the
    /// earlier position (last write wins).
    pub fn from_pairs<I, N, U>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, U)>,
        N: Into<String>,
        U: Into<String>,
    {
        let mut dir = Self::new();
        for (name, url) in pairs {
            dir.insert(name, url);
        }
        dir
    }

    fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) {
        let name = name.into();
        let url = url.into();
        match self.stations.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.url = url,
            None => self.stations.push(Station { name, url }),
        }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// 1-based lookup, as typed by users.
    pub fn resolve_by_index(&self, index: usize) -> Result<&Station, Error> {
        if index == 0 || index > self.stations.len() {
            return Err(Error::NotFound(format!(
                "station #{index} (valid range is 1..={})",
                self.stations.len()
            )));
        }
        Ok(&self.stations[index - 1])
    }

    /// First station streaming from `url`, or the "Unknown Station" sentinel.
    pub fn resolve_by_url(&self, url: &str) -> Station {
        self.stations
            .iter()
            .find(|s| s.url == url)
            .cloned()
            .unwrap_or_else(|| Station::unknown(url))
    }

    /// 1-based position of `url`, if configured.
    pub fn index_of_url(&self, url: &str) -> Option<usize> {
        self.stations.iter().position(|s| s.url == url).map(|i| i + 1)
    }
}

/// Case-insensitive substring ban list for track titles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BanList {
    entries: Vec<String>,
}

impl BanList {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|e| e.as_ref().trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { entries }
    }

    /// Parses the `banned_titles` comma list.
    pub fn from_comma_list(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn is_banned(&self, title: &str) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let lowered = title.to_lowercase();
        self.entries.iter().any(|e| lowered.contains(e.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three() -> StationDirectory {
        StationDirectory::from_pairs([
            ("Alpha", "http://a.example/stream"),
            ("Bravo", "http://b.example/stream"),
            ("Charlie", "http://c.example/stream"),
        ])
    }

    #[test]
    fn test_resolve_by_index_bounds() {
        let dir = three();
        assert!(matches!(dir.resolve_by_index(0), Err(Error::NotFound(_))));
        assert!(matches!(dir.resolve_by_index(4), Err(Error::NotFound(_))));
        assert_eq!(dir.resolve_by_index(1).unwrap().name, "Alpha");
        assert_eq!(dir.resolve_by_index(2).unwrap().name, "Bravo");
        assert_eq!(dir.resolve_by_index(3).unwrap().name, "Charlie");
    }

    #[test]
    fn test_duplicate_name_overwrites_in_place() {
        let dir = StationDirectory::from_pairs([
            ("Alpha", "http://a.example/old"),
            ("Bravo", "http://b.example/stream"),
            ("Alpha", "http://a.example/new"),
        ]);
        assert_eq!(dir.len(), 2);
        let first = dir.resolve_by_index(1).unwrap();
        assert_eq!(first.name, "Alpha");
        assert_eq!(first.url, "http://a.example/new");
    }

    #[test]
    fn test_resolve_by_url_falls_back_to_unknown() {
        let dir = three();
        assert_eq!(dir.resolve_by_url("http://b.example/stream").name, "Bravo");
        let unknown = dir.resolve_by_url("http://nowhere.example/");
        assert!(unknown.is_unknown());
        assert_eq!(unknown.url, "http://nowhere.example/");
        assert_eq!(dir.index_of_url("http://c.example/stream"), Some(3));
    }

    #[test]
    fn test_ban_list_is_case_insensitive_substring() {
        let bans = BanList::from_comma_list(" Advert , jingle,,");
        assert_eq!(bans.len(), 2);
        assert!(bans.is_banned("ADVERTISEMENT break"));
        assert!(bans.is_banned("Station Jingle 3"));
        assert!(!bans.is_banned("Daft Punk - One More Time"));
        assert!(!BanList::default().is_banned("anything"));
    }
}
