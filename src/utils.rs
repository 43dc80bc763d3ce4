use axum::http::HeaderMap;
use ulid::Ulid;

pub fn now_millis() -> u64 {
    chrono::Local::now().timestamp_millis() as u64
}

/// Smallest Ulid minted at `now - span`, usable as an inclusive lower bound
/// on an event table's range key to select a trailing time window.
pub fn window_floor(now: u64, span: u64) -> Ulid {
    Ulid::from_parts(now.saturating_sub(span), 0)
}

/// First hop of x-forwarded-for, the client as seen by the edge.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers.get("x-forwarded-for")?.to_str().ok()?;
    let first = forwarded.split(',').next()?.trim();
    (!first.is_empty()).then(|| first.to_string())
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)?
        .to_str()
        .ok()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_floor_orders_before_events_in_window() {
        let now = 1_700_000_000_000;
        let floor = window_floor(now, 1000);
        let event_in_window = Ulid::from_parts(now - 500, 42);
        let event_before_window = Ulid::from_parts(now - 5000, u128::MAX);
        assert!(event_in_window >= floor);
        assert!(event_before_window < floor);
    }

    #[test]
    fn window_floor_saturates_at_epoch() {
        assert_eq!(window_floor(1000, 5000), Ulid::from_parts(0, 0));
    }

    #[test]
    fn client_ip_takes_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers), Some("203.0.113.7".to_string()));

        headers.insert("x-forwarded-for", "".parse().unwrap());
        assert_eq!(client_ip(&headers), None);

        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
