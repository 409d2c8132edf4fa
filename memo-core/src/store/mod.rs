//! Vector and graph store contracts, plus in-memory reference
//! implementations of each.
//!
//! Concrete production backends (a real vector database, a real graph
//! database) are external collaborators — only the trait shapes here and
//! the in-memory reference implementations matter to this crate.

pub mod graph;
pub mod vector;

use crate::scalar::Properties;

/// An equality-conjunction filter over a metadata/property bag: every key
/// present in the filter must be present and equal in the candidate for it
/// to match. An empty filter matches everything.
pub type Filter = Properties;

pub(crate) fn matches_filter(metadata: &Properties, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(key, value)| metadata.get(key) == Some(value))
}
