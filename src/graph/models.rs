use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// Stable key of a node in the knowledge graph.
pub type NodeId = u64;

/// Kind of node. Unknown kinds are kept verbatim so nothing in the input is lost.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    Person,
    MusicalGroup,
    Song,
    Album,
    RecordLabel,
    Other(String),
}

impl NodeType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Person => "Person",
            Self::MusicalGroup => "MusicalGroup",
            Self::Song => "Song",
            Self::Album => "Album",
            Self::RecordLabel => "RecordLabel",
            Self::Other(s) => s,
        }
    }

    /// Songs and albums.
    pub fn is_work(&self) -> bool {
        matches!(self, Self::Song | Self::Album)
    }

    /// People and musical groups.
    pub fn is_artist(&self) -> bool {
        matches!(self, Self::Person | Self::MusicalGroup)
    }
}

impl From<String> for NodeType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Person" => Self::Person,
            "MusicalGroup" => Self::MusicalGroup,
            "Song" => Self::Song,
            "Album" => Self::Album,
            "RecordLabel" => Self::RecordLabel,
            _ => Self::Other(s),
        }
    }
}

impl From<NodeType> for String {
    fn from(t: NodeType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship type between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EdgeType {
    // Creative credits: artist -> work
    PerformerOf,
    ComposerOf,
    ProducerOf,
    LyricistOf,
    // Influence: later work -> earlier work
    DirectlySamples,
    InterpolatesFrom,
    CoverOf,
    LyricalReferenceTo,
    InStyleOf,
    // Industry and membership
    RecordedBy,
    DistributedBy,
    MemberOf,
    Other(String),
}

impl EdgeType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::PerformerOf => "PerformerOf",
            Self::ComposerOf => "ComposerOf",
            Self::ProducerOf => "ProducerOf",
            Self::LyricistOf => "LyricistOf",
            Self::DirectlySamples => "DirectlySamples",
            Self::InterpolatesFrom => "InterpolatesFrom",
            Self::CoverOf => "CoverOf",
            Self::LyricalReferenceTo => "LyricalReferenceTo",
            Self::InStyleOf => "InStyleOf",
            Self::RecordedBy => "RecordedBy",
            Self::DistributedBy => "DistributedBy",
            Self::MemberOf => "MemberOf",
            Self::Other(s) => s,
        }
    }

    /// Artist credited on a work.
    pub fn is_creative(&self) -> bool {
        matches!(
            self,
            Self::PerformerOf | Self::ComposerOf | Self::ProducerOf | Self::LyricistOf
        )
    }

    /// One work drawing on another.
    pub fn is_influence(&self) -> bool {
        matches!(
            self,
            Self::DirectlySamples
                | Self::InterpolatesFrom
                | Self::CoverOf
                | Self::LyricalReferenceTo
                | Self::InStyleOf
        )
    }

    /// Display label of the creative role, if this is a credit edge.
    pub fn role(&self) -> Option<&'static str> {
        match self {
            Self::PerformerOf => Some("Performer"),
            Self::ComposerOf => Some("Composer"),
            Self::ProducerOf => Some("Producer"),
            Self::LyricistOf => Some("Lyricist"),
            _ => None,
        }
    }
}

impl From<String> for EdgeType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PerformerOf" => Self::PerformerOf,
            "ComposerOf" => Self::ComposerOf,
            "ProducerOf" => Self::ProducerOf,
            "LyricistOf" => Self::LyricistOf,
            "DirectlySamples" => Self::DirectlySamples,
            "InterpolatesFrom" => Self::InterpolatesFrom,
            "CoverOf" => Self::CoverOf,
            "LyricalReferenceTo" => Self::LyricalReferenceTo,
            "InStyleOf" => Self::InStyleOf,
            "RecordedBy" => Self::RecordedBy,
            "DistributedBy" => Self::DistributedBy,
            "MemberOf" => Self::MemberOf,
            _ => Self::Other(s),
        }
    }
}

impl From<EdgeType> for String {
    fn from(t: EdgeType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: NodeId,
    #[serde(rename = "Node Type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "loose_bool")]
    pub notable: bool,
    /// Every other attribute of the node, untouched.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Entity {
    /// Display name, or `"Unknown"` when the node has none.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }

    /// Release year of a work, if it has a parseable release date.
    pub fn year(&self) -> Option<i32> {
        self.release_date.as_deref().and_then(parse_year)
    }

    /// Trimmed genre, `None` when missing or blank.
    pub fn genre(&self) -> Option<&str> {
        self.genre.as_deref().map(str::trim).filter(|g| !g.is_empty())
    }
}

/// A directed, typed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(rename = "Edge Type")]
    pub edge_type: EdgeType,
    #[serde(default, alias = "date", deserialize_with = "loose_year")]
    pub year: Option<i32>,
}

/// Parse a year out of a release date.
///
/// Accepts a bare year of up to four digits (`"2017"`), an ISO date
/// (`"2017-05-01"`), or anything starting with four digits (`"20170501"`).
pub fn parse_year(raw: &str) -> Option<i32> {
    let s = raw.trim();
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    if digits.len() <= 4 {
        if let Ok(year) = s.parse::<i32>() {
            return Some(year);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.year());
    }
    let prefix = s.get(..4)?;
    if prefix.chars().all(|c| c.is_ascii_digit()) {
        prefix.parse().ok()
    } else {
        None
    }
}

/// Accept strings, numbers, or null for text fields.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accept booleans or null; null means false.
fn loose_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

fn loose_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_string(deserializer)?.as_deref().and_then(parse_year))
}
