use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info, warn};

use crate::catalog::MovieId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FavoriteChange {
    pub id: MovieId,
    pub is_favorite: bool,
}

pub type FavoriteListener = Arc<dyn Fn(&FavoriteChange) + Send + Sync>;

#[derive(Clone)]
pub struct FavoritesLedger {
    inner: Arc<LedgerInner>,
}

struct LedgerInner {
    ids: Mutex<HashSet<MovieId>>,
    listeners: Mutex<Listeners>,
    path: Option<PathBuf>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, FavoriteListener>,
}

#[must_use = "dropping the subscription unregisters the listener"]
pub struct Subscription {
    id: u64,
    ledger: Weak<LedgerInner>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.ledger.upgrade() {
            lock(&inner.listeners).entries.remove(&self.id);
            debug!("Favorites listener {} unsubscribed", self.id);
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FavoritesLedger {
    pub fn in_memory() -> Self {
        Self::with_ids(HashSet::new(), None)
    }

    // A missing file starts an empty set.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let ids = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<MovieId>>(&raw) {
                Ok(list) => list.into_iter().collect(),
                Err(e) => {
                    warn!(
                        "Ignoring unreadable favorites file {}: {}",
                        path.display(),
                        e
                    );
                    HashSet::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read favorites from {}", path.display()))
            }
        };
        info!("Loaded {} favorites from {}", ids.len(), path.display());
        Ok(Self::with_ids(ids, Some(path)))
    }

    fn with_ids(ids: HashSet<MovieId>, path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(LedgerInner {
                ids: Mutex::new(ids),
                listeners: Mutex::new(Listeners::default()),
                path,
            }),
        }
    }

    pub fn is_favorite(&self, id: MovieId) -> bool {
        lock(&self.inner.ids).contains(&id)
    }

    pub fn all(&self) -> HashSet<MovieId> {
        lock(&self.inner.ids).clone()
    }

    pub fn toggle(&self, id: MovieId) {
        let (is_favorite, snapshot) = {
            let mut ids = lock(&self.inner.ids);
            let is_favorite = if ids.remove(&id) {
                false
            } else {
                ids.insert(id);
                true
            };
            let mut snapshot: Vec<MovieId> = ids.iter().copied().collect();
            snapshot.sort_unstable();
            (is_favorite, snapshot)
        };
        debug!("Favorite {} -> {}", id, is_favorite);

        if let Some(path) = &self.inner.path {
            if let Err(e) = persist(path, &snapshot) {
                warn!("Failed to persist favorites: {:?}", e);
            }
        }

        // Listeners run outside both locks so they can read the ledger back.
        let listeners: Vec<FavoriteListener> =
            lock(&self.inner.listeners).entries.values().cloned().collect();
        let change = FavoriteChange { id, is_favorite };
        for listener in listeners {
            listener(&change);
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&FavoriteChange) + Send + Sync + 'static) -> Subscription {
        let mut listeners = lock(&self.inner.listeners);
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.insert(id, Arc::new(listener));
        Subscription {
            id,
            ledger: Arc::downgrade(&self.inner),
        }
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        drop(subscription);
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.listeners).entries.len()
    }
}

fn persist(path: &Path, ids: &[MovieId]) -> Result<()> {
    let body = serde_json::to_string(ids).context("Failed to encode favorites")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
