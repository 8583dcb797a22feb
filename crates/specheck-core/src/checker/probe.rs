use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Answers whether a domain responds over HTTPS. The registry hands this to
/// the HTTP-source checker, so tests can swap in a canned implementation.
pub trait HttpsProber: Send + Sync {
    fn supports_https(&self, domain: &str) -> bool;
}

struct CacheEntry {
    supported: bool,
    stored_at: Instant,
}

/// Prober backed by a real HEAD request, with a per-domain cache so repeated
/// URLs (and repeated files in one run) cost one probe each. Entries are
/// written once and only expire by TTL.
pub struct HttpProbe {
    client: reqwest::blocking::Client,
    cache: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl HttpProbe {
    pub fn new() -> HttpProbe {
        HttpProbe::with_ttl(Duration::from_secs(3600))
    }

    pub fn with_ttl(ttl: Duration) -> HttpProbe {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        HttpProbe {
            client,
            cache: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn cached(&self, domain: &str) -> Option<bool> {
        let cache = self.cache.lock().ok()?;
        let entry = cache.get(domain)?;

        if entry.stored_at.elapsed() > self.ttl {
            return None;
        }

        Some(entry.supported)
    }

    fn store(&self, domain: &str, supported: bool) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(
                domain.to_string(),
                CacheEntry {
                    supported,
                    stored_at: Instant::now(),
                },
            );
        }
    }
}

impl Default for HttpProbe {
    fn default() -> HttpProbe {
        HttpProbe::new()
    }
}

impl HttpsProber for HttpProbe {
    fn supports_https(&self, domain: &str) -> bool {
        if let Some(supported) = self.cached(domain) {
            return supported;
        }

        let supported = self
            .client
            .head(format!("https://{domain}"))
            .send()
            .is_ok();

        self.store(domain, supported);
        supported
    }
}
