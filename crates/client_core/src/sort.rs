//! Ordering and name filtering over country sequences.
//!
//! Both operations borrow their input and return a fresh `Vec`, so the
//! committed dataset is never reordered in place.

use std::cmp::{Ordering, Reverse};

use shared::domain::{Country, SortDirection, SortKey, SortSpec};

/// Folds a name to a diacritic-free, lowercase key.
pub fn fold_key(s: &str) -> String {
    deunicode::deunicode(s).to_lowercase()
}

/// Locale-aware name ordering: "Åland" sorts with the A's and case is ignored.
/// Names that fold to the same key fall back to a plain comparison so the
/// order stays total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    name_key(a).cmp(&name_key(b))
}

/// Folded key first, raw name as the tie-break.
pub fn name_key(name: &str) -> (String, String) {
    (fold_key(name), name.to_owned())
}

/// Returns `items` ordered by `spec`. Ties keep their input order in both
/// directions.
pub fn sort_countries(items: &[Country], spec: SortSpec) -> Vec<Country> {
    let mut sorted = items.to_vec();
    // Both sorts are stable and `Reverse` keeps equal keys equal, so tied
    // elements stay in input order for descending sorts too.
    match (spec.key, spec.direction) {
        (SortKey::Name, SortDirection::Ascending) => {
            sorted.sort_by_cached_key(|c| name_key(&c.name));
        }
        (SortKey::Name, SortDirection::Descending) => {
            sorted.sort_by_cached_key(|c| Reverse(name_key(&c.name)));
        }
        (SortKey::Population, SortDirection::Ascending) => {
            sorted.sort_by_key(|c| c.population);
        }
        (SortKey::Population, SortDirection::Descending) => {
            sorted.sort_by_key(|c| Reverse(c.population));
        }
    }
    sorted
}

/// Case-insensitive substring match on `name`. A blank query keeps everything.
pub fn filter_by_name(items: &[Country], query: &str) -> Vec<Country> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items.to_vec();
    }

    items
        .iter()
        .filter(|country| country.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "tests/sort_tests.rs"]
mod tests;
