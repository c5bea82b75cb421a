//! Proxy list rotation for outbound scraping traffic.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyRotation {
    RoundRobin,
    Random,
}

/// Hands out proxies from a configured list according to the rotation
/// strategy. An empty list means direct connections.
#[derive(Debug)]
pub struct ProxySelector {
    proxies: Vec<String>,
    rotation: ProxyRotation,
    cursor: AtomicUsize,
}

impl ProxySelector {
    #[must_use]
    pub fn new(proxies: Vec<String>, rotation: ProxyRotation) -> Self {
        Self {
            proxies,
            rotation,
            cursor: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// The next proxy to use, or `None` when no proxies are configured.
    #[must_use]
    pub fn next_proxy(&self) -> Option<&str> {
        if self.proxies.is_empty() {
            return None;
        }
        let idx = match self.rotation {
            ProxyRotation::RoundRobin => {
                self.cursor.fetch_add(1, Ordering::Relaxed) % self.proxies.len()
            }
            ProxyRotation::Random => rand::rng().random_range(0..self.proxies.len()),
        };
        Some(&self.proxies[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_yields_none() {
        let selector = ProxySelector::new(Vec::new(), ProxyRotation::RoundRobin);
        assert!(selector.next_proxy().is_none());
    }

    #[test]
    fn round_robin_cycles_in_order() {
        let selector = ProxySelector::new(
            vec!["a".into(), "b".into(), "c".into()],
            ProxyRotation::RoundRobin,
        );
        assert_eq!(selector.next_proxy(), Some("a"));
        assert_eq!(selector.next_proxy(), Some("b"));
        assert_eq!(selector.next_proxy(), Some("c"));
        assert_eq!(selector.next_proxy(), Some("a"));
    }

    #[test]
    fn random_always_returns_a_configured_proxy() {
        let selector =
            ProxySelector::new(vec!["a".into(), "b".into()], ProxyRotation::Random);
        for _ in 0..20 {
            let proxy = selector.next_proxy().unwrap();
            assert!(proxy == "a" || proxy == "b");
        }
    }
}
