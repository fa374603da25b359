use crate::models::Station;

const STREAM_SCHEMES: [&str; 2] = ["http://", "https://"];

/// True when the station carries a usable stream address.
pub fn is_playable(station: &Station) -> bool {
    let addr = station.stream_address().trim();
    if addr.is_empty() {
        return false;
    }
    STREAM_SCHEMES.iter().any(|scheme| {
        addr.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Drops malformed entries, keeping directory order.
pub fn retain_playable(mut stations: Vec<Station>) -> Vec<Station> {
    stations.retain(is_playable);
    stations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_schemes() {
        assert!(is_playable(&Station::fixture("a", "https://example.com/stream")));
        assert!(is_playable(&Station::fixture("a", "http://example.com/stream")));
        assert!(is_playable(&Station::fixture("a", "  HTTP://example.com/stream ")));
    }

    #[test]
    fn rejects_blank_and_foreign_schemes() {
        assert!(!is_playable(&Station::fixture("a", "")));
        assert!(!is_playable(&Station::fixture("a", "   ")));
        assert!(!is_playable(&Station::fixture("a", "file:///etc/passwd")));
        assert!(!is_playable(&Station::fixture("a", "rtsp://example.com")));
        assert!(!is_playable(&Station::fixture("a", "http:/")));
    }

    #[test]
    fn filtering_is_idempotent() {
        let raw = vec![
            Station::fixture("a", "http://a"),
            Station::fixture("b", ""),
            Station::fixture("c", "mms://c"),
            Station::fixture("d", "https://d"),
        ];
        let once = retain_playable(raw);
        let names: Vec<_> = once.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "d"]);
        assert_eq!(retain_playable(once.clone()), once);
    }
}
