//! Dedup passes applied after the predicate filter.

use std::collections::HashSet;

use tvguide_types::{Recording, Timer};

use super::SearchResult;

/// Drop results already covered by a timer on the same channel.
pub fn remove_timed(results: &mut Vec<SearchResult>, timers: &[Timer]) {
    results.retain(|r| {
        !timers
            .iter()
            .any(|t| t.channel_number == r.channel_number && t.covers(&r.tag))
    });
}

/// Drop results whose title, plot outline and plot match a recording.
pub fn remove_recorded(results: &mut Vec<SearchResult>, recordings: &[Recording]) {
    results.retain(|r| !recordings.iter().any(|rec| rec.matches(&r.tag)));
}

/// Keep only the first of each group of results with identical title, plot
/// and plot outline.
pub fn remove_repeats(results: &mut Vec<SearchResult>) {
    let mut seen = HashSet::new();
    results.retain(|r| {
        seen.insert((
            r.tag.title.clone(),
            r.tag.plot.clone(),
            r.tag.plot_outline.clone(),
        ))
    });
}
