use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::error::ParseSortError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(CountryId);

/// Placeholder shown when a country lists no capital.
pub const MISSING_CAPITAL: &str = "\u{2014}";
/// Name used when the remote record carries none.
pub const UNKNOWN_COUNTRY_NAME: &str = "Unknown";

/// One nation in the directory, already normalized from its remote record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: CountryId,
    pub name: String,
    pub capital: String,
    pub population: u64,
    pub flag_url: String,
    pub flag_alt: String,
}

impl Country {
    pub fn has_capital(&self) -> bool {
        self.capital != MISSING_CAPITAL
    }
}

/// Immutable snapshot of a fetched dataset. Filtering and sorting always
/// produce new sequences instead of touching this one.
pub type CountrySet = Arc<[Country]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    Population,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// How the visible list is ordered. There is no unsorted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    pub fn with_key(self, key: SortKey) -> Self {
        Self { key, ..self }
    }

    pub fn with_direction(self, direction: SortDirection) -> Self {
        Self { direction, ..self }
    }
}

impl FromStr for SortKey {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "name" => Ok(Self::Name),
            "population" => Ok(Self::Population),
            other => Err(ParseSortError::UnknownKey(other.to_string())),
        }
    }
}

impl FromStr for SortDirection {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "asc" => Ok(Self::Ascending),
            "desc" => Ok(Self::Descending),
            other => Err(ParseSortError::UnknownDirection(other.to_string())),
        }
    }
}
