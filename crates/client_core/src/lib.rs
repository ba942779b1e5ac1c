//! Client-side core of the country directory: fetches the remote dataset,
//! normalizes it, and derives the filtered and sorted view that a UI renders.

pub mod config;
pub mod dashboard;
pub mod debounce;
pub mod error;
pub mod sort;
pub mod transport;
pub mod types;

pub use config::{load_settings, Settings};
pub use dashboard::{CountriesDashboard, LoadPhase};
pub use debounce::Debounced;
pub use error::FetchError;
pub use sort::{filter_by_name, sort_countries};
pub use transport::{CountrySource, RestCountriesClient};
pub use tokio_util::sync::CancellationToken;
