use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The six canonical genre families, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Family {
    Pop,
    Rock,
    Metal,
    Folk,
    Electronic,
    Punk,
}

impl Family {
    pub const ALL: [Family; 6] = [
        Family::Pop,
        Family::Rock,
        Family::Metal,
        Family::Folk,
        Family::Electronic,
        Family::Punk,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Pop => "Pop",
            Self::Rock => "Rock",
            Self::Metal => "Metal",
            Self::Folk => "Folk",
            Self::Electronic => "Electronic",
            Self::Punk => "Punk",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Pop => "#f97316",
            Self::Rock => "#3b82f6",
            Self::Metal => "#64748b",
            Self::Folk => "#22c55e",
            Self::Electronic => "#06b6d4",
            Self::Punk => "#e11d48",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Family assigned to genres that are missing or not in the table.
pub const FALLBACK_FAMILY: Family = Family::Rock;

/// Colour used for anything without a family.
pub const NEUTRAL_COLOR: &str = "#94a3b8";

/// Config file genre mapping (deserialized from TOML).
#[derive(Debug, Deserialize, Clone)]
pub struct CustomGenreConfig {
    pub name: String,
    pub family: String,
}

/// Subgenre → family lookup: built-in table merged with config overrides.
#[derive(Debug, Clone)]
pub struct GenreMap {
    by_genre: HashMap<String, Family>,
}

fn builtin_genres() -> Vec<(&'static str, Family)> {
    vec![
        ("Dream Pop", Family::Pop),
        ("Synthpop", Family::Pop),
        ("Indie Pop", Family::Pop),
        ("Indie Rock", Family::Rock),
        ("Alternative Rock", Family::Rock),
        ("Post-Apocalyptic Folk", Family::Folk),
        ("Desert Rock", Family::Rock),
        ("Jazz Surf Rock", Family::Rock),
        ("Doom Metal", Family::Metal),
        ("Speed Metal", Family::Metal),
        ("Symphonic Metal", Family::Metal),
        ("Darkwave", Family::Electronic),
        ("Synthwave", Family::Electronic),
        ("Space Rock", Family::Rock),
        ("Americana", Family::Folk),
        ("Indie Folk", Family::Folk),
        ("Emo/Pop Punk", Family::Punk),
    ]
}

impl Default for GenreMap {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl GenreMap {
    pub fn new(custom: &[CustomGenreConfig]) -> Self {
        let mut by_genre: HashMap<String, Family> = builtin_genres()
            .into_iter()
            .map(|(name, family)| (name.to_string(), family))
            .collect();

        for entry in custom {
            match Family::from_name(&entry.family) {
                Some(family) => {
                    by_genre.insert(entry.name.trim().to_string(), family);
                }
                None => log::warn!(
                    "Ignoring genre mapping {:?}: unknown family {:?}",
                    entry.name,
                    entry.family
                ),
            }
        }

        Self { by_genre }
    }

    /// Family of a raw genre string. Missing or unknown genres fall back to Rock.
    pub fn family(&self, genre: Option<&str>) -> Family {
        genre
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .and_then(|g| self.by_genre.get(g).copied())
            .unwrap_or(FALLBACK_FAMILY)
    }
}

/// Blend a `#rrggbb` colour with white. `amount` 0 keeps the colour, 1 gives white.
/// Malformed input is returned unchanged.
pub fn lighten(hex: &str, amount: f64) -> String {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return hex.to_string();
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    let (Some(r), Some(g), Some(b)) = (channel(0), channel(2), channel(4)) else {
        return hex.to_string();
    };
    let blend = |c: u8| {
        let c = f64::from(c);
        (c + (255.0 - c) * amount.clamp(0.0, 1.0)) as u8
    };
    format!("#{:02x}{:02x}{:02x}", blend(r), blend(g), blend(b))
}
