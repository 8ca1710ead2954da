//! In-memory collaborators shared by the unit tests.

use crate::resource::Fetch;
use crate::{Error, Result};
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// Serves canned bodies by absolute URL; anything else is a 404.
#[derive(Default)]
pub struct MemoryFetcher {
    bodies: HashMap<String, Vec<u8>>,
    delays: HashMap<String, Duration>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: &[u8]) -> Self {
        self.bodies.insert(url.to_string(), body.to_vec());
        self
    }

    pub fn with_delay(mut self, url: &str, body: &[u8], delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self.with(url, body)
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetch for MemoryFetcher {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Vec<u8>>> {
        async move {
            let key = url.to_string();
            self.requests.lock().unwrap().push(key.clone());
            if let Some(delay) = self.delays.get(&key) {
                tokio::time::sleep(*delay).await;
            }
            self.bodies
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::FetchError(format!("{} returned status 404 Not Found", key)))
        }
        .boxed()
    }
}
