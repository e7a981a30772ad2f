//! Integration tests for model caches, persistence and the cache registry.

#[path = "../support/models.rs"]
mod models;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use jsonapi_rust::{
    BlobStore, CacheEvent, CacheOptions, CacheRegistry, FileBlobStore, InMemoryBlobStore,
    LoadOutcome, ModelCache, PersistError, StoreError, ToOne,
};
use models::{article, author, Article, Author};
use pretty_assertions::assert_eq;

fn recorder<M: jsonapi_rust::Model>(
    cache: &ModelCache<M>,
) -> (Arc<Mutex<Vec<String>>>, jsonapi_rust::Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = cache.subscribe(move |event| {
        let id = event.data().map(|m| m.id()).unwrap_or_default();
        sink.lock().unwrap().push(format!("{}:{}", event.kind(), id));
    });
    (seen, subscription)
}

#[test]
fn mutations_emit_events_in_order() {
    let cache = ModelCache::<Author>::in_memory();
    let (seen, _sub) = recorder(&cache);

    assert!(cache.add(author("1", "Ann", 30)));
    assert!(!cache.add(author("1", "Ann B.", 31)));
    assert!(cache.remove("1").is_some());
    assert!(cache.remove("1").is_none());

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["added:1", "updated:1", "deleted:1"]
    );
    assert!(cache.is_empty());
}

#[test]
fn deleted_event_carries_prior_state() {
    let cache = ModelCache::<Author>::in_memory();
    cache.add(author("7", "Grace", 85));

    let name = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&name);
    let _sub = cache.subscribe(move |event| {
        if let CacheEvent::Deleted(model) = event {
            *sink.lock().unwrap() = Some(model.read().name.clone());
        }
    });

    cache.remove("7");
    assert_eq!(name.lock().unwrap().as_deref(), Some("Grace"));
    assert!(cache.last_event().is_deleted());
}

#[test]
fn dropped_subscription_stops_events() {
    let cache = ModelCache::<Author>::in_memory();
    let (seen, sub) = recorder(&cache);
    cache.add(author("1", "Ann", 30));
    drop(sub);
    cache.add(author("2", "Bob", 40));
    assert_eq!(*seen.lock().unwrap(), vec!["added:1"]);
}

#[test]
fn concurrent_mutations_emit_one_event_each() {
    let cache = ModelCache::<Author>::in_memory();
    cache.add(author("shared", "Sam", 20));

    let added = Arc::new(AtomicUsize::new(0));
    let deleted = Arc::new(AtomicUsize::new(0));
    let (added_sink, deleted_sink) = (Arc::clone(&added), Arc::clone(&deleted));
    let _sub = cache.subscribe(move |event| match event {
        CacheEvent::Added(_) => {
            added_sink.fetch_add(1, Ordering::SeqCst);
        }
        CacheEvent::Deleted(_) => {
            // widen the window between queueing and erasing
            thread::sleep(Duration::from_millis(5));
            deleted_sink.fetch_add(1, Ordering::SeqCst);
        }
        _ => {}
    });

    let removers = 4;
    let barrier = Barrier::new(removers);
    let removed = AtomicUsize::new(0);
    thread::scope(|scope| {
        for writer in 0..8 {
            let cache = &cache;
            scope.spawn(move || {
                for n in 0..25 {
                    cache.add(author(&format!("{writer}-{n}"), "Writer", n));
                }
            });
        }
        for _ in 0..removers {
            scope.spawn(|| {
                barrier.wait();
                if cache.remove("shared").is_some() {
                    removed.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    });

    assert_eq!(removed.load(Ordering::SeqCst), 1);
    assert_eq!(deleted.load(Ordering::SeqCst), 1);
    assert_eq!(added.load(Ordering::SeqCst), 200);
    assert_eq!(cache.len(), 200);
    assert!(!cache.contains("shared"));
}

#[test]
fn save_clear_load_round_trip() {
    let store = Arc::new(InMemoryBlobStore::new());
    let cache = ModelCache::<Article>::new(store.clone());

    let mut first = article("1", "Persisted");
    first.word_count = Some(10);
    first.tags = vec!["a".into()];
    first.author = ToOne::new(author("42", "John", 80));
    cache.add(first);
    cache.add(article("2", "Second"));

    cache.save().unwrap();
    assert!(store.get("articles").unwrap().is_some());

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.load().unwrap(), LoadOutcome::Loaded(2));

    let restored = cache.get("1").unwrap();
    let restored = restored.read();
    assert_eq!(restored.title, "Persisted");
    assert_eq!(restored.word_count, Some(10));
    assert_eq!(restored.tags, vec!["a".to_string()]);
    assert!(!restored.is_blank);

    let author = restored.author.get().cloned().unwrap();
    assert_eq!(author.id(), "42");
    assert!(author.is_blank());
    assert!(author.read().name.is_empty());
}

#[test]
fn cache_id_separates_blobs() {
    let store = Arc::new(InMemoryBlobStore::new());
    let drafts = ModelCache::<Article>::with_options(
        store.clone(),
        CacheOptions::default().with_cache_id("-drafts"),
    );
    assert_eq!(drafts.cache_name(), "articles-drafts");

    drafts.add(article("1", "Draft"));
    drafts.save().unwrap();

    let published = ModelCache::<Article>::new(store.clone());
    assert_eq!(published.load().unwrap(), LoadOutcome::Missing);
    assert!(published.is_empty());
}

#[test]
fn corrupt_blob_keeps_contents() {
    let store = Arc::new(InMemoryBlobStore::new());
    store.set("authors", b"not a snapshot".to_vec()).unwrap();

    let cache = ModelCache::<Author>::new(store);
    cache.add(author("1", "Ann", 30));

    let err = cache.load().unwrap_err();
    assert!(matches!(err, PersistError::Decode { .. }));
    assert!(err.is_recoverable());
    assert_eq!(err.cache(), "authors");
    assert_eq!(cache.len(), 1);
}

#[test]
fn background_save_uses_snapshot() {
    let store = Arc::new(InMemoryBlobStore::new());
    let cache = ModelCache::<Author>::new(store.clone());
    cache.add(author("1", "Ann", 30));

    let pending = cache.save_async();
    cache.add(author("2", "Bob", 40));
    assert_eq!(pending.cache(), "authors");
    pending.wait().unwrap();

    let fresh = ModelCache::<Author>::new(store);
    assert_eq!(fresh.load().unwrap(), LoadOutcome::Loaded(1));
    assert_eq!(fresh.get("1").unwrap().read().name, "Ann");
}

/// Blocks every `set` until the test releases it.
struct GatedStore {
    inner: InMemoryBlobStore,
    gate: Mutex<Receiver<()>>,
}

impl GatedStore {
    fn new() -> (Self, Sender<()>) {
        let (tx, rx) = channel();
        let store = Self {
            inner: InMemoryBlobStore::new(),
            gate: Mutex::new(rx),
        };
        (store, tx)
    }
}

impl BlobStore for GatedStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let _ = self.gate.lock().unwrap().recv();
        self.inner.set(key, bytes)
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.remove(key)
    }
}

#[test]
fn slow_store_times_out() {
    let (store, release) = GatedStore::new();
    let store = Arc::new(store);
    let cache = ModelCache::<Author>::with_options(
        store.clone(),
        CacheOptions::default().with_save_timeout(Duration::from_millis(20)),
    );
    cache.add(author("1", "Ann", 30));

    let err = cache.save_async().wait().unwrap_err();
    assert_eq!(
        err,
        PersistError::Timeout {
            cache: "authors".into(),
            millis: 20,
        }
    );
    assert!(!err.is_recoverable());

    release.send(()).unwrap();
    let pending = cache.save_async();
    release.send(()).unwrap();
    pending.wait_timeout(Duration::from_secs(5)).unwrap();
}

#[test]
fn file_store_survives_new_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache").join("blobs.json");

    let cache = ModelCache::<Author>::new(Arc::new(FileBlobStore::new(&path)));
    cache.add_many(vec![author("1", "Ann", 30), author("2", "Bob", 40)]);
    cache.save().unwrap();

    let reopened = ModelCache::<Author>::new(Arc::new(FileBlobStore::new(&path)));
    assert_eq!(reopened.load().unwrap(), LoadOutcome::Loaded(2));
    assert_eq!(reopened.get("2").unwrap().read().age, 40);
}

#[test]
fn registry_persists_each_type() {
    let store = Arc::new(InMemoryBlobStore::new());
    let registry = CacheRegistry::new(store.clone());
    registry.register::<Author>();
    registry.register::<Article>();

    registry.add(author("1", "Ann", 30));
    registry.add_many(vec![article("1", "One"), article("2", "Two")]);
    registry.save().unwrap();

    let restored = CacheRegistry::new(store);
    restored.register::<Author>();
    restored.register::<Article>();
    restored.load().unwrap();
    assert_eq!(restored.get_all::<Article>().len(), 2);
    assert_eq!(restored.get::<Author>("1").unwrap().read().name, "Ann");
}

#[test]
fn registry_shares_cache_handles() {
    let registry = CacheRegistry::default();
    let authors = registry.register::<Author>();
    let (seen, _sub) = recorder(&authors);

    registry.add(author("3", "Cy", 50));
    assert_eq!(*seen.lock().unwrap(), vec!["added:3"]);
    assert!(registry.cache::<Author>().contains("3"));
}

#[test]
#[should_panic(expected = "not registered")]
fn unregistered_type_is_fatal() {
    let registry = CacheRegistry::default();
    registry.register::<Author>();
    registry.get_all::<Article>();
}
