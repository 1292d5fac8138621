use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogItem, CatalogPage, MovieId};
use crate::error::ApiError;
use crate::favorites::{FavoritesLedger, Subscription};
use crate::tmdb::{ApiResult, MovieApi};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Browsing,
    Searching(String),
}

#[derive(Debug, Clone, Copy)]
pub struct ListConfig {
    pub debounce: Duration,
    pub prefetch_window: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(400),
            prefetch_window: 5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListState {
    pub items: Vec<CatalogItem>,
    pub mode: Mode,
    pub search_text: String,
    pub current_page: u32,
    pub total_pages: u32,
    pub last_error: Option<ApiError>,
    // Some(None): fetched, no runtime on record.
    pub runtimes: HashMap<MovieId, Option<u32>>,
    pub favorite_ids: HashSet<MovieId>,
    generation: u64,
    list_version: u64,
    items_generation: Option<u64>,
    initial_in_flight: Option<u64>,
    more_in_flight: Option<u64>,
    input_ticket: u64,
    runtime_pending: HashSet<MovieId>,
}

impl ListState {
    pub fn is_loading_initial(&self) -> bool {
        self.initial_in_flight == Some(self.generation)
    }

    pub fn is_loading_more(&self) -> bool {
        self.more_in_flight == Some(self.generation)
    }

    pub fn runtime(&self, id: MovieId) -> Option<u32> {
        self.runtimes.get(&id).copied().flatten()
    }

    pub fn is_favorite(&self, id: MovieId) -> bool {
        self.favorite_ids.contains(&id)
    }

    pub fn favorite_items(&self) -> Vec<CatalogItem> {
        self.items
            .iter()
            .filter(|item| self.favorite_ids.contains(&item.id))
            .cloned()
            .collect()
    }

    fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }
}

struct Shared {
    api: Arc<dyn MovieApi>,
    favorites: FavoritesLedger,
    config: ListConfig,
    state: watch::Sender<ListState>,
}

pub struct ListController {
    shared: Arc<Shared>,
    debounce: Mutex<Option<JoinHandle<()>>>,
    _favorites: Subscription,
}

impl ListController {
    pub fn new(api: Arc<dyn MovieApi>, favorites: FavoritesLedger, config: ListConfig) -> Self {
        let initial = ListState {
            favorite_ids: favorites.all(),
            ..ListState::default()
        };
        let (state, _) = watch::channel(initial);
        let shared = Arc::new(Shared {
            api,
            favorites: favorites.clone(),
            config,
            state,
        });
        let weak: Weak<Shared> = Arc::downgrade(&shared);
        let subscription = favorites.subscribe(move |_| {
            if let Some(shared) = weak.upgrade() {
                shared.refresh_favorites();
            }
        });
        Self {
            shared,
            debounce: Mutex::new(None),
            _favorites: subscription,
        }
    }

    pub fn snapshot(&self) -> ListState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.shared.state.subscribe()
    }

    pub fn runtime(&self, id: MovieId) -> Option<u32> {
        self.shared.state.borrow().runtime(id)
    }

    pub fn favorite_items(&self) -> Vec<CatalogItem> {
        self.shared.state.borrow().favorite_items()
    }

    pub fn set_search_text(&self, text: impl Into<String>) {
        let text = text.into();
        let mut ticket = 0;
        self.shared.state.send_modify(|s| {
            s.search_text = text.clone();
            s.input_ticket += 1;
            ticket = s.input_ticket;
        });

        let weak = Arc::downgrade(&self.shared);
        let delay = self.shared.config.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let latest = shared.state.borrow().input_ticket;
            if latest != ticket {
                return;
            }
            shared.apply_search_text(&text).await;
        });
        // Older timers see a newer ticket and exit on their own.
        let mut slot = self.debounce.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(handle);
    }

    pub async fn load_first_page(&self) {
        self.shared.load_first_page().await;
    }

    pub async fn retry(&self) {
        self.shared.load_first_page().await;
    }

    pub async fn load_more_if_needed(&self, visible: MovieId) {
        self.shared.load_more_if_needed(visible).await;
    }

    pub async fn load_runtime_if_needed(&self, id: MovieId) {
        self.shared.load_runtime_if_needed(id).await;
    }

    pub fn toggle_favorite(&self, id: MovieId) {
        self.shared.favorites.toggle(id);
        self.shared.refresh_favorites();
    }
}

impl Drop for ListController {
    fn drop(&mut self) {
        let slot = self.debounce.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

impl Shared {
    fn refresh_favorites(&self) {
        let ids = self.favorites.all();
        self.state.send_modify(|s| s.favorite_ids = ids);
    }

    async fn fetch_page(&self, mode: &Mode, page: u32) -> ApiResult<CatalogPage> {
        match mode {
            Mode::Browsing => self.api.fetch_popular(page).await,
            Mode::Searching(query) => self.api.search(query, page).await,
        }
    }

    async fn apply_search_text(&self, text: &str) {
        let query = text.trim();
        let mode = if query.is_empty() {
            Mode::Browsing
        } else {
            Mode::Searching(query.to_string())
        };
        info!("List mode -> {:?}", mode);
        self.state.send_modify(|s| {
            s.generation += 1;
            s.mode = mode;
        });
        self.load_first_page().await;
    }

    async fn load_first_page(&self) {
        let mut ticket = None;
        self.state.send_if_modified(|s| {
            if s.initial_in_flight == Some(s.generation) {
                return false;
            }
            s.initial_in_flight = Some(s.generation);
            s.last_error = None;
            ticket = Some((s.generation, s.mode.clone()));
            true
        });
        let Some((generation, mode)) = ticket else {
            debug!("First page already loading; skipping");
            return;
        };

        let result = self.fetch_page(&mode, 1).await;

        self.state.send_modify(|s| {
            if s.initial_in_flight == Some(generation) {
                s.initial_in_flight = None;
            }
            if s.generation != generation {
                debug!("Discarding first page for superseded {:?}", mode);
                return;
            }
            match result {
                Ok(page) => {
                    debug!(
                        "Loaded page {}/{} ({} items) for {:?}",
                        page.page,
                        page.total_pages,
                        page.results.len(),
                        mode
                    );
                    s.items = page.results;
                    s.current_page = page.page;
                    s.total_pages = page.total_pages;
                    s.items_generation = Some(generation);
                    s.list_version += 1;
                }
                Err(e) => {
                    warn!("First page failed for {:?}: {}", mode, e);
                    s.last_error = Some(e);
                }
            }
        });
    }

    async fn load_more_if_needed(&self, visible: MovieId) {
        let window = self.config.prefetch_window;
        let mut ticket = None;
        self.state.send_if_modified(|s| {
            if s.is_loading_initial() || s.is_loading_more() {
                return false;
            }
            // Items still belong to an earlier query whose reload failed.
            if s.items_generation != Some(s.generation) || !s.has_more() {
                return false;
            }
            if !s.items.iter().rev().take(window).any(|item| item.id == visible) {
                return false;
            }
            s.more_in_flight = Some(s.generation);
            ticket = Some((s.generation, s.list_version, s.mode.clone(), s.current_page + 1));
            true
        });
        let Some((generation, version, mode, next)) = ticket else {
            return;
        };

        debug!("Loading page {} for {:?}", next, mode);
        let result = self.fetch_page(&mode, next).await;

        self.state.send_modify(|s| {
            if s.more_in_flight == Some(generation) {
                s.more_in_flight = None;
            }
            if s.generation != generation || s.list_version != version {
                debug!("Discarding page {} for superseded list", next);
                return;
            }
            match result {
                Ok(page) => {
                    s.last_error = None;
                    s.items.extend(page.results);
                    s.current_page = page.page;
                    s.total_pages = page.total_pages;
                }
                Err(e) => {
                    warn!("Loading page {} failed: {}", next, e);
                    s.last_error = Some(e);
                }
            }
        });
    }

    async fn load_runtime_if_needed(&self, id: MovieId) {
        let claimed = self.state.send_if_modified(|s| {
            if s.runtimes.contains_key(&id) || s.runtime_pending.contains(&id) {
                return false;
            }
            s.runtime_pending.insert(id);
            true
        });
        if !claimed {
            return;
        }

        let result = self.api.fetch_detail(id).await;

        self.state.send_modify(|s| {
            s.runtime_pending.remove(&id);
            match result {
                Ok(detail) => {
                    s.runtimes.insert(id, detail.runtime);
                }
                Err(e) => debug!("Runtime backfill for {} failed: {}", id, e),
            }
        });
    }
}
