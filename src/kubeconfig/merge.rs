// kubeconfig/merge.rs
//
// Merging follows kubectl: the first definition of a value wins and values
// are never blended together.
// https://kubernetes.io/docs/concepts/configuration/organize-cluster-access-kubeconfig/#merging-kubeconfig-files
use std::collections::HashSet;

use super::{Config, Named, Preferences, Remaining};

/// Merges two configs into a new one, preferring values from `first`.
///
/// Named entries are never merged field-by-field: the first entry with a
/// given name is kept whole and every later entry with that name is dropped.
/// Entries without a name are dropped.
pub fn merge_config(first: &Config, other: &Config) -> Config {
    Config {
        api_version: first_some(&first.api_version, &other.api_version),
        kind: first_some(&first.kind, &other.kind),
        current_context: first_some(&first.current_context, &other.current_context),
        preferences: merge_preferences(first.preferences.as_ref(), other.preferences.as_ref()),
        clusters: merge_named(&first.clusters, &other.clusters),
        contexts: merge_named(&first.contexts, &other.contexts),
        auth_infos: merge_named(&first.auth_infos, &other.auth_infos),
        extensions: merge_named(&first.extensions, &other.extensions),
        remaining: merge_remaining(&first.remaining, &other.remaining),
    }
}

/// Folds configs left-to-right in the order given.
///
/// The order must be the declaration order of the files. Folding in any
/// other order gives a different result, and `merge(a, merge(b, c))` is not
/// guaranteed to equal the fold of `[a, b, c]`.
pub fn merge_all<'a, I>(configs: I) -> Config
where
    I: IntoIterator<Item = &'a Config>,
{
    configs
        .into_iter()
        .fold(Config::default(), |merged, config| merge_config(&merged, config))
}

fn first_some<T: Clone>(first: &Option<T>, other: &Option<T>) -> Option<T> {
    first.as_ref().or(other.as_ref()).cloned()
}

fn merge_preferences(first: Option<&Preferences>, other: Option<&Preferences>) -> Option<Preferences> {
    match (first, other) {
        (first, None) => first.cloned(),
        (None, other) => other.cloned(),
        (Some(first), Some(other)) => Some(Preferences {
            colors: first_some(&first.colors, &other.colors),
            extensions: merge_named(&first.extensions, &other.extensions),
            remaining: merge_remaining(&first.remaining, &other.remaining),
        }),
    }
}

fn merge_named<T: Named + Clone>(first: &[T], other: &[T]) -> Vec<T> {
    let mut merged = Vec::with_capacity(first.len());
    let mut seen: HashSet<&str> = HashSet::new();

    for item in first {
        if let Some(key) = item.key() {
            merged.push(item.clone());
            seen.insert(key);
        }
    }

    for item in other {
        if let Some(key) = item.key() {
            if seen.insert(key) {
                merged.push(item.clone());
            }
        }
    }

    merged
}

// Shallow: a named list hidden inside an unknown field is replaced as a
// whole, never merged entry-by-entry.
fn merge_remaining(first: &Remaining, other: &Remaining) -> Remaining {
    let mut merged = other.clone();
    for (key, value) in first {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
