//! The country directory state machine.
//!
//! One fetch lifecycle runs per [`CountriesDashboard::mount`]. Each lifecycle
//! gets a generation number and its own cancellation token; a completion that
//! does not match the current generation is dropped, so a slow response from a
//! superseded fetch can never overwrite newer state.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use shared::{
    domain::{Country, CountrySet, SortDirection, SortKey, SortSpec},
    protocol::{DashboardEvent, DashboardIntent, ResultView},
};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    debounce::Debounced,
    error::FetchError,
    sort::{filter_by_name, sort_countries},
    transport::{CountrySource, RestCountriesClient},
};

const FALLBACK_ERROR_MESSAGE: &str = "Something went wrong";
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    /// Nothing in flight: never mounted, unmounted, or the fetch was cancelled.
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

struct FetchState {
    generation: u64,
    /// Bumped whenever `countries` is replaced.
    revision: u64,
    phase: LoadPhase,
    countries: CountrySet,
    error: Option<String>,
}

impl Default for FetchState {
    fn default() -> Self {
        Self {
            generation: 0,
            revision: 0,
            phase: LoadPhase::Idle,
            countries: CountrySet::from(Vec::new()),
            error: None,
        }
    }
}

impl FetchState {
    fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.phase = LoadPhase::Loading;
        self.error = None;
        self.replace_countries(Vec::new());
        self.generation
    }

    fn replace_countries(&mut self, countries: Vec<Country>) {
        self.countries = countries.into();
        self.revision += 1;
    }

    fn apply(&mut self, outcome: Result<Vec<Country>, FetchError>) -> DashboardEvent {
        let generation = self.generation;
        match outcome {
            Ok(countries) => {
                let total = countries.len();
                self.replace_countries(countries);
                self.phase = LoadPhase::Ready;
                info!("countries: committed total={total} generation={generation}");
                DashboardEvent::Loaded { generation, total }
            }
            Err(err) if err.is_cancelled() => {
                self.phase = LoadPhase::Idle;
                debug!("countries: fetch cancelled generation={generation}");
                DashboardEvent::LoadCancelled { generation }
            }
            Err(err) => {
                let message = err.to_string();
                let message = if message.trim().is_empty() {
                    FALLBACK_ERROR_MESSAGE.to_string()
                } else {
                    message
                };
                warn!("countries: fetch failed generation={generation} error={message}");
                self.phase = LoadPhase::Failed;
                self.error = Some(message.clone());
                DashboardEvent::LoadFailed {
                    generation,
                    message,
                }
            }
        }
    }
}

struct ActiveFetch {
    generation: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct MemoizedView {
    revision: u64,
    query: String,
    sort: SortSpec,
    countries: CountrySet,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Composes the data source, the debounced search query and the sort order
/// into a single [`ResultView`].
///
/// Intent methods take `&mut self`: the owner (usually the UI event loop) is
/// the only writer. Fetches run on the ambient tokio runtime.
///
/// # Panics
///
/// [`mount`](Self::mount), [`on_query_change`](Self::on_query_change),
/// [`set_search_delay`](Self::set_search_delay) and [`dispatch`](Self::dispatch)
/// may spawn tasks and panic when called outside a tokio runtime.
pub struct CountriesDashboard {
    source: Arc<dyn CountrySource>,
    state: Arc<Mutex<FetchState>>,
    events: broadcast::Sender<DashboardEvent>,
    active: Option<ActiveFetch>,
    query_text: String,
    query: Debounced<String>,
    sort: SortSpec,
    memo: Mutex<Option<MemoizedView>>,
}

impl CountriesDashboard {
    pub fn new(source: Arc<dyn CountrySource>, search_delay: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            source,
            state: Arc::new(Mutex::new(FetchState::default())),
            events,
            active: None,
            query_text: String::new(),
            query: Debounced::new(String::new(), search_delay),
            sort: SortSpec::default(),
            memo: Mutex::new(None),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let client = RestCountriesClient::from_settings(settings)?;
        Ok(Self::new(Arc::new(client), settings.search_debounce()))
    }

    /// Starts a new fetch lifecycle, superseding any fetch still in flight.
    ///
    /// Visible countries are cleared and the error reset right away. Returns
    /// the generation of the new lifecycle.
    pub fn mount(&mut self) -> u64 {
        if let Some(previous) = self.active.take() {
            debug!(
                "countries: superseding fetch generation={}",
                previous.generation
            );
            previous.cancel.cancel();
        }

        let generation = lock(&self.state).begin();
        let cancel = CancellationToken::new();
        info!("countries: fetch started generation={generation}");
        let _ = self.events.send(DashboardEvent::LoadStarted { generation });

        let task = tokio::spawn(run_fetch(
            Arc::clone(&self.source),
            Arc::clone(&self.state),
            self.events.clone(),
            cancel.clone(),
            generation,
        ));

        self.active = Some(ActiveFetch {
            generation,
            cancel,
            task,
        });
        generation
    }

    /// Ends the current lifecycle: the fetch is cancelled, its result will
    /// never be committed, and the dataset is discarded.
    pub fn unmount(&mut self) {
        self.query.cancel();
        let Some(active) = self.active.take() else {
            return;
        };
        active.cancel.cancel();
        active.task.abort();

        let mut state = lock(&self.state);
        let was_loading = state.phase == LoadPhase::Loading;
        state.generation += 1;
        state.phase = LoadPhase::Idle;
        state.error = None;
        state.replace_countries(Vec::new());
        drop(state);

        if was_loading {
            let _ = self.events.send(DashboardEvent::LoadCancelled {
                generation: active.generation,
            });
        }
        debug!("countries: unmounted generation={}", active.generation);
    }

    pub fn on_query_change(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.query_text.clone_from(&text);
        self.query.set(text);
    }

    pub fn on_sort_change(&mut self, sort: SortSpec) {
        self.sort = sort;
    }

    pub fn on_sort_key_change(&mut self, key: SortKey) {
        self.sort = self.sort.with_key(key);
    }

    pub fn on_sort_direction_change(&mut self, direction: SortDirection) {
        self.sort = self.sort.with_direction(direction);
    }

    pub fn dispatch(&mut self, intent: DashboardIntent) {
        match intent {
            DashboardIntent::QueryChanged { text } => self.on_query_change(text),
            DashboardIntent::SortChanged { sort } => self.on_sort_change(sort),
            DashboardIntent::SortKeyChanged { key } => self.on_sort_key_change(key),
            DashboardIntent::SortDirectionChanged { direction } => {
                self.on_sort_direction_change(direction)
            }
        }
    }

    pub fn set_search_delay(&mut self, delay: Duration) {
        self.query.set_delay(delay);
    }

    /// Raw, undebounced search text as last typed.
    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    /// The search text that currently drives filtering.
    pub fn debounced_query(&self) -> String {
        self.query.get()
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn phase(&self) -> LoadPhase {
        lock(&self.state).phase
    }

    pub fn generation(&self) -> u64 {
        lock(&self.state).generation
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_query(&self) -> watch::Receiver<String> {
        self.query.subscribe()
    }

    /// Current derived view.
    ///
    /// Filtering and sorting re-run only when the committed dataset, the
    /// debounced query or the sort order changed since the last call. This
    /// never starts a fetch.
    pub fn view(&self) -> ResultView {
        let (revision, committed, loading, error) = {
            let state = lock(&self.state);
            (
                state.revision,
                Arc::clone(&state.countries),
                state.phase == LoadPhase::Loading,
                state.error.clone(),
            )
        };
        let query = self.query.get();

        ResultView {
            total: committed.len(),
            countries: self.derive(revision, &committed, query),
            loading,
            error,
        }
    }

    fn derive(&self, revision: u64, committed: &CountrySet, query: String) -> CountrySet {
        let mut memo = lock(&self.memo);
        if let Some(cached) = memo.as_ref() {
            if cached.revision == revision && cached.sort == self.sort && cached.query == query {
                return Arc::clone(&cached.countries);
            }
        }

        let filtered = filter_by_name(committed, &query);
        let countries: CountrySet = sort_countries(&filtered, self.sort).into();
        debug!(
            "countries: view recomputed visible={} total={} sort={:?}",
            countries.len(),
            committed.len(),
            self.sort
        );

        *memo = Some(MemoizedView {
            revision,
            query,
            sort: self.sort,
            countries: Arc::clone(&countries),
        });
        countries
    }
}

impl Drop for CountriesDashboard {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            active.task.abort();
        }
    }
}

async fn run_fetch(
    source: Arc<dyn CountrySource>,
    state: Arc<Mutex<FetchState>>,
    events: broadcast::Sender<DashboardEvent>,
    cancel: CancellationToken,
    generation: u64,
) {
    let outcome = source.fetch_countries(&cancel).await;

    let event = {
        let mut state = lock(&state);
        if state.generation != generation {
            debug!(
                "countries: dropping stale result generation={generation} current={}",
                state.generation
            );
            return;
        }
        state.apply(outcome)
    };
    let _ = events.send(event);
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
