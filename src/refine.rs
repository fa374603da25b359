use crate::models::Station;

/// Narrows `results` to stations whose name contains `term` as typed,
/// ignoring case. An empty term keeps everything.
pub fn refine(results: &[Station], term: &str) -> Vec<Station> {
    if term.is_empty() {
        return results.to_vec();
    }
    let needle = term.to_lowercase();
    results
        .iter()
        .filter(|s| s.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
