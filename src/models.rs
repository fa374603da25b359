use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel facet value meaning "no constraint on this facet".
pub const WILDCARD: &str = "all";

/// One entry of the remote station directory, kept exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub stationuuid: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url_resolved: String,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub codec: String,
    /// kbps, 0 when unknown.
    #[serde(default, deserialize_with = "null_as_default")]
    pub bitrate: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub votes: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clickcount: u64,
}

impl Station {
    pub fn stream_address(&self) -> &str {
        &self.url_resolved
    }

    pub fn tag_list(&self) -> impl Iterator<Item = &str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    #[cfg(test)]
    pub(crate) fn fixture(name: &str, url: &str) -> Self {
        Self {
            stationuuid: format!("uuid-{name}"),
            name: name.to_string(),
            url_resolved: url.to_string(),
            favicon: None,
            tags: String::new(),
            country: String::new(),
            language: String::new(),
            codec: String::new(),
            bitrate: 0,
            votes: 0,
            clickcount: 0,
        }
    }
}

/// Directory records sometimes carry `null` where a value is expected.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `{name, population}` record served by the facet endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FacetCount {
    pub name: String,
    #[serde(rename = "stationcount", default, deserialize_with = "null_as_default")]
    pub population: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RadioBrowserServer {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetKind {
    Country,
    Language,
    Tag,
}

impl FacetKind {
    pub const ALL: [FacetKind; 3] = [FacetKind::Country, FacetKind::Language, FacetKind::Tag];

    /// Path segment of the vocabulary endpoint for this facet.
    pub fn endpoint(self) -> &'static str {
        match self {
            FacetKind::Country => "countries",
            FacetKind::Language => "languages",
            FacetKind::Tag => "tags",
        }
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FacetKind::Country => "country",
            FacetKind::Language => "language",
            FacetKind::Tag => "tag",
        })
    }
}

impl FromStr for FacetKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "country" | "countries" => Ok(FacetKind::Country),
            "language" | "languages" => Ok(FacetKind::Language),
            "tag" | "tags" | "genre" => Ok(FacetKind::Tag),
            other => Err(anyhow::anyhow!("Unknown facet: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    Name,
    #[default]
    Votes,
    ClickCount,
}

impl SortKey {
    /// Value of the directory's `order` parameter.
    pub fn as_param(self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Votes => "votes",
            SortKey::ClickCount => "clickcount",
        }
    }
}

impl FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "votes" => Ok(SortKey::Votes),
            "clicks" | "clickcount" | "plays" => Ok(SortKey::ClickCount),
            other => Err(anyhow::anyhow!("Unknown sort key: {other}")),
        }
    }
}

/// The user's current intent. `None` on a facet is the wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub country: Option<String>,
    pub language: Option<String>,
    pub tag: Option<String>,
    pub term: String,
    pub sort: SortKey,
}

impl FilterSelection {
    pub fn with_country(country: Option<String>) -> Self {
        Self {
            country: country.and_then(|c| facet_value(&c)),
            ..Self::default()
        }
    }

    pub fn facet(&self, kind: FacetKind) -> Option<&str> {
        match kind {
            FacetKind::Country => self.country.as_deref(),
            FacetKind::Language => self.language.as_deref(),
            FacetKind::Tag => self.tag.as_deref(),
        }
    }

    /// Sets one facet from a raw value; the sentinel and blank clear it.
    /// Returns whether the selection changed.
    pub fn set_facet(&mut self, kind: FacetKind, value: &str) -> bool {
        let value = facet_value(value);
        let slot = match kind {
            FacetKind::Country => &mut self.country,
            FacetKind::Language => &mut self.language,
            FacetKind::Tag => &mut self.tag,
        };
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }
}

fn facet_value(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case(WILDCARD) {
        None
    } else {
        Some(raw.to_string())
    }
}
