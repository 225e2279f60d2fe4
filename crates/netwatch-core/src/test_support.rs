//! In-memory collaborators shared by the unit tests in this crate.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use netwatch_types::error::{GeoError, StoreError};

use crate::geo::GeoLocator;
use crate::store::{DocumentStore, SearchHit, SearchQuery};

type Key = (String, String);

/// Document store keeping everything in memory and counting writes.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<Key, BTreeMap<String, serde_json::Value>>>,
    next_id: AtomicUsize,
    pub index_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub fail_search: AtomicBool,
    pub fail_index: AtomicBool,
    /// Ids whose existence check fails.
    fail_exists: Mutex<HashSet<String>>,
    search_delay: Mutex<Duration>,
    searches_in_flight: AtomicUsize,
    pub max_concurrent_searches: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document without counting it as a write.
    pub fn insert(&self, collection: &str, category: &str, id: &str, doc: serde_json::Value) {
        self.docs
            .lock()
            .unwrap()
            .entry((collection.to_string(), category.to_string()))
            .or_default()
            .insert(id.to_string(), doc);
    }

    pub fn documents(
        &self,
        collection: &str,
        category: &str,
    ) -> BTreeMap<String, serde_json::Value> {
        self.docs
            .lock()
            .unwrap()
            .get(&(collection.to_string(), category.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn writes(&self) -> usize {
        self.index_calls.load(Ordering::SeqCst) + self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_search(&self, fail: bool) {
        self.fail_search.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_index(&self, fail: bool) {
        self.fail_index.store(fail, Ordering::SeqCst);
    }

    pub fn fail_exists_for(&self, id: &str) {
        self.fail_exists.lock().unwrap().insert(id.to_string());
    }

    /// Make every search take `delay` before answering.
    pub fn set_search_delay(&self, delay: Duration) {
        *self.search_delay.lock().unwrap() = delay;
    }
}

impl DocumentStore for MemoryStore {
    async fn index(
        &self,
        collection: &str,
        category: &str,
        id: Option<&str>,
        document: &serde_json::Value,
    ) -> Result<(), StoreError> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_index.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("connection refused".to_string()));
        }
        let id = match id {
            Some(id) => id.to_string(),
            None => format!("auto-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
        };
        self.insert(collection, category, &id, document.clone());
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        category: &str,
        query: &SearchQuery,
    ) -> Result<Vec<SearchHit>, StoreError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.search_delay.lock().unwrap();
        if !delay.is_zero() {
            let running = self.searches_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_concurrent_searches.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.searches_in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("connection refused".to_string()));
        }
        let hits = self
            .documents(collection, category)
            .into_iter()
            .filter(|(_, doc)| match query {
                SearchQuery::MatchAll => true,
                SearchQuery::Term { field, value } => {
                    doc.get(field).and_then(|v| v.as_str()) == Some(value.as_str())
                }
            })
            .map(|(id, source)| SearchHit { id, source })
            .collect();
        Ok(hits)
    }

    async fn delete(&self, collection: &str, category: &str, id: &str) -> Result<bool, StoreError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let removed = self
            .docs
            .lock()
            .unwrap()
            .get_mut(&(collection.to_string(), category.to_string()))
            .and_then(|docs| docs.remove(id));
        Ok(removed.is_some())
    }

    async fn exists(&self, collection: &str, category: &str, id: &str) -> Result<bool, StoreError> {
        if self.fail_exists.lock().unwrap().contains(id) {
            return Err(StoreError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self.documents(collection, category).contains_key(id))
    }
}

/// Geolocator answering from a fixed table and counting lookups.
#[derive(Default)]
pub struct TableLocator {
    pub countries: HashMap<String, String>,
    pub lookups: AtomicUsize,
    pub fail: bool,
}

impl TableLocator {
    pub fn with(ip: &str, country: &str) -> Self {
        let mut countries = HashMap::new();
        countries.insert(ip.to_string(), country.to_string());
        Self {
            countries,
            ..Self::default()
        }
    }
}

impl GeoLocator for TableLocator {
    async fn country_code(&self, ip: &str) -> Result<Option<String>, GeoError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GeoError::Lookup("geo service unavailable".to_string()));
        }
        Ok(self.countries.get(ip).cloned())
    }
}

impl GeoLocator for std::sync::Arc<TableLocator> {
    async fn country_code(&self, ip: &str) -> Result<Option<String>, GeoError> {
        self.as_ref().country_code(ip).await
    }
}
