use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalog::{preferred_trailer, CastEntry, ItemDetail, MovieId, VideoRef};
use crate::error::ApiError;
use crate::favorites::{FavoritesLedger, Subscription};
use crate::retry::{retry_with_backoff, Backoff};
use crate::tmdb::MovieApi;

#[derive(Debug, Clone, Copy, Default)]
pub struct DetailConfig {
    pub credits_backoff: Backoff,
}

#[derive(Debug, Clone)]
pub struct DetailState {
    pub id: MovieId,
    pub detail: Option<ItemDetail>,
    pub videos: Vec<VideoRef>,
    pub cast: Option<Vec<CastEntry>>,
    pub is_loading: bool,
    pub last_error: Option<ApiError>,
    pub is_favorite: bool,
}

impl DetailState {
    fn new(id: MovieId, is_favorite: bool) -> Self {
        Self {
            id,
            detail: None,
            videos: Vec::new(),
            cast: None,
            is_loading: false,
            last_error: None,
            is_favorite,
        }
    }

    pub fn preferred_trailer(&self) -> Option<&VideoRef> {
        preferred_trailer(&self.videos)
    }

    pub fn trailer_url(&self) -> Option<String> {
        self.preferred_trailer().and_then(VideoRef::watch_url)
    }
}

struct Shared {
    id: MovieId,
    api: Arc<dyn MovieApi>,
    favorites: FavoritesLedger,
    config: DetailConfig,
    state: watch::Sender<DetailState>,
}

impl Shared {
    fn refresh_favorite(&self) {
        let is_favorite = self.favorites.is_favorite(self.id);
        self.state.send_if_modified(|s| {
            let changed = s.is_favorite != is_favorite;
            s.is_favorite = is_favorite;
            changed
        });
    }
}

pub struct DetailController {
    shared: Arc<Shared>,
    credits: Mutex<Option<JoinHandle<()>>>,
    _favorites: Subscription,
}

impl DetailController {
    pub fn new(
        id: MovieId,
        api: Arc<dyn MovieApi>,
        favorites: FavoritesLedger,
        config: DetailConfig,
    ) -> Self {
        let (state, _) = watch::channel(DetailState::new(id, favorites.is_favorite(id)));
        let shared = Arc::new(Shared {
            id,
            api,
            favorites: favorites.clone(),
            config,
            state,
        });
        let weak: Weak<Shared> = Arc::downgrade(&shared);
        let subscription = favorites.subscribe(move |change| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if change.id == shared.id {
                shared.refresh_favorite();
            }
        });
        Self {
            shared,
            credits: Mutex::new(None),
            _favorites: subscription,
        }
    }

    pub fn id(&self) -> MovieId {
        self.shared.id
    }

    pub fn snapshot(&self) -> DetailState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.shared.state.subscribe()
    }

    pub fn preferred_trailer(&self) -> Option<VideoRef> {
        self.shared.state.borrow().preferred_trailer().cloned()
    }

    pub fn trailer_url(&self) -> Option<String> {
        self.shared.state.borrow().trailer_url()
    }

    // Cast credits never touch is_loading or last_error.
    pub async fn load(&self) {
        let started = self.shared.state.send_if_modified(|s| {
            if s.is_loading {
                return false;
            }
            s.is_loading = true;
            s.last_error = None;
            true
        });
        if !started {
            debug!("Detail {} already loading; skipping", self.shared.id);
            return;
        }

        self.spawn_credits();

        let id = self.shared.id;
        let api = &self.shared.api;
        let result = tokio::try_join!(api.fetch_detail(id), api.fetch_videos(id));

        self.shared.state.send_modify(|s| {
            s.is_loading = false;
            match result {
                Ok((detail, videos)) => {
                    info!("Loaded detail {} ({} videos)", id, videos.len());
                    s.detail = Some(detail);
                    s.videos = videos;
                }
                Err(e) => {
                    warn!("Detail {} failed: {}", id, e);
                    s.last_error = Some(e);
                }
            }
        });
    }

    pub fn toggle_favorite(&self) {
        self.shared.favorites.toggle(self.shared.id);
        self.shared.refresh_favorite();
    }

    fn spawn_credits(&self) {
        let mut slot = self.credits.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("Credits for {} still retrying", self.shared.id);
            return;
        }
        if self.shared.state.borrow().cast.is_some() {
            return;
        }

        let id = self.shared.id;
        let api = self.shared.api.clone();
        let policy = self.shared.config.credits_backoff;
        let weak = Arc::downgrade(&self.shared);
        *slot = Some(tokio::spawn(async move {
            let label = format!("credits {id}");
            match retry_with_backoff(&label, policy, || api.fetch_credits(id)).await {
                Some(cast) => {
                    if let Some(shared) = weak.upgrade() {
                        shared.state.send_modify(|s| s.cast = Some(cast));
                    }
                }
                None => warn!(
                    "Giving up on credits for {} after {} attempts",
                    id,
                    policy.total_attempts()
                ),
            }
        }));
    }
}

impl Drop for DetailController {
    fn drop(&mut self) {
        let slot = self.credits.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}
