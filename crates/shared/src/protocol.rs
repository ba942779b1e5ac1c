//! Contract between the directory core and whatever renders it.

use serde::{Deserialize, Serialize};

use crate::domain::{Country, CountrySet, SortDirection, SortKey, SortSpec};

/// Derived view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultView {
    pub countries: CountrySet,
    /// Size of the unfiltered dataset committed so far.
    pub total: usize,
    pub loading: bool,
    pub error: Option<String>,
}

impl ResultView {
    /// Visible rows for "N of total" accounting; 0 while a fetch is pending.
    pub fn result_count(&self) -> usize {
        if self.loading {
            0
        } else {
            self.countries.len()
        }
    }

    pub fn status(&self) -> ViewStatus<'_> {
        match (&self.error, self.loading) {
            (Some(message), _) => ViewStatus::Failed(message),
            (None, true) => ViewStatus::Loading,
            (None, false) => ViewStatus::Ready(&self.countries),
        }
    }
}

impl Default for ResultView {
    fn default() -> Self {
        Self {
            countries: CountrySet::from(Vec::new()),
            total: 0,
            loading: false,
            error: None,
        }
    }
}

/// What a renderer should show, in precedence order: error, spinner, grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus<'a> {
    Failed(&'a str),
    Loading,
    Ready(&'a [Country]),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DashboardIntent {
    QueryChanged { text: String },
    SortChanged { sort: SortSpec },
    SortKeyChanged { key: SortKey },
    SortDirectionChanged { direction: SortDirection },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DashboardEvent {
    LoadStarted { generation: u64 },
    Loaded { generation: u64, total: usize },
    LoadFailed { generation: u64, message: String },
    LoadCancelled { generation: u64 },
}

impl DashboardEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::LoadStarted { generation }
            | Self::Loaded { generation, .. }
            | Self::LoadFailed { generation, .. }
            | Self::LoadCancelled { generation } => *generation,
        }
    }

    /// True for every event that ends a lifecycle.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::LoadStarted { .. })
    }
}
