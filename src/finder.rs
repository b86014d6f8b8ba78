//! The interactive session: wires the gateway, query debouncer, search
//! orchestrator, favorites and detail selection together and applies the
//! UI-level policies (e.g. picking a category clears the typed query).

use crate::config::{FinderConfig, SearchConfig};
use crate::debounce::Debouncer;
use crate::error::{FinderError, GatewayError};
use crate::favorites::{FavoritesStore, FileStorage};
use crate::gateway::{MealDbClient, RecipeSource};
use crate::model::{Category, Recipe, RecipeRef};
use crate::resolver::resolve_detail;
use crate::search::{RunOutcome, SearchInput, SearchOrchestrator, SearchState};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Orders settled query text against direct filter changes. Aborting the
/// debounce task can't stop a callback that is already running, so settled
/// text only reaches the search if nothing newer happened since it was typed.
#[derive(Debug, Clone, Default)]
struct QueryGate {
    generation: Arc<Mutex<u64>>,
}

impl QueryGate {
    /// Invalidate any settled text still on its way. The returned guard keeps
    /// late callbacks out until it is dropped.
    fn advance(&self) -> MutexGuard<'_, u64> {
        let mut generation = self.lock();
        *generation += 1;
        generation
    }

    /// Run `apply` only if `ticket` is still the latest generation
    fn apply<R>(&self, ticket: u64, apply: impl FnOnce() -> R) -> Option<R> {
        let generation = self.lock();
        (*generation == ticket).then(apply)
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct RecipeFinder {
    source: Arc<dyn RecipeSource>,
    search: SearchOrchestrator,
    query: String,
    query_debouncer: Debouncer,
    query_gate: QueryGate,
    debounce: Duration,
    categories: Vec<Category>,
    favorites: FavoritesStore,
    detail: Option<Recipe>,
}

impl RecipeFinder {
    pub fn new(
        source: Arc<dyn RecipeSource>,
        favorites: FavoritesStore,
        settings: SearchConfig,
    ) -> Self {
        let debounce = settings.debounce();
        Self {
            search: SearchOrchestrator::new(Arc::clone(&source), settings),
            source,
            query: String::new(),
            query_debouncer: Debouncer::new(),
            query_gate: QueryGate::default(),
            debounce,
            categories: Vec::new(),
            favorites,
            detail: None,
        }
    }

    /// Build a session against TheMealDB with file-backed favorites
    pub fn from_config(config: &FinderConfig) -> Result<Self, FinderError> {
        let client = MealDbClient::new(&config.api)?;
        let storage = FileStorage::new(&config.storage.dir);
        let favorites = FavoritesStore::new(storage, config.storage.favorites_key.clone());
        Ok(Self::new(Arc::new(client), favorites, config.search.clone()))
    }

    /// Load favorites and categories, then kick off the default listing
    pub async fn start(&mut self) -> Option<JoinHandle<RunOutcome>> {
        if !self.favorites.is_loaded() {
            self.favorites.load().await;
        }

        match self.source.list_categories().await {
            Ok(categories) => {
                info!("Loaded {} categories", categories.len());
                self.categories = categories;
            }
            Err(e) => error!("Failed to load categories: {}", e),
        }

        self.search.refresh()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// The query as typed, which may not have reached the search yet
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn state(&self) -> SearchState {
        self.search.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.search.subscribe()
    }

    pub fn search(&self) -> &SearchOrchestrator {
        &self.search
    }

    /// Record typed text; the search sees it once typing pauses
    pub fn set_query(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text == self.query {
            return;
        }
        self.query = text.clone();

        let ticket = *self.query_gate.advance();
        let gate = self.query_gate.clone();
        let search = self.search.clone();
        self.query_debouncer.start(text, self.debounce, move |query| {
            if gate.apply(ticket, || search.set_query(query)).is_none() {
                debug!("Dropping settled query superseded by a newer change");
            }
        });
    }

    pub fn clear_query(&mut self) -> Option<JoinHandle<RunOutcome>> {
        self.query_debouncer.cancel();
        self.query.clear();
        let _gate = self.query_gate.advance();
        self.search.set_query(String::new())
    }

    /// Pick a category (or none). Clears the typed query as well, in the same run.
    pub fn select_category(&mut self, category: Option<String>) -> Option<JoinHandle<RunOutcome>> {
        self.query_debouncer.cancel();
        self.query.clear();
        let _gate = self.query_gate.advance();
        self.search.update(SearchInput::new(String::new(), category))
    }

    /// Drop the category filter only; the typed query stays and keeps settling
    pub fn clear_category(&self) -> Option<JoinHandle<RunOutcome>> {
        self.search.set_category(None)
    }

    pub fn clear_filters(&mut self) -> Option<JoinHandle<RunOutcome>> {
        self.select_category(None)
    }

    /// Re-run the current filters, e.g. after a failed search
    pub fn retry(&self) -> Option<JoinHandle<RunOutcome>> {
        self.search.refresh()
    }

    /// Show a recipe in detail, fetching the full record if needed.
    /// Returns `None` (and leaves the current detail alone) if it can't be resolved.
    pub async fn open(&mut self, recipe: impl Into<RecipeRef>) -> Option<&Recipe> {
        let resolved = resolve_detail(self.source.as_ref(), recipe.into()).await;
        self.show(resolved, "open recipe")
    }

    /// Deep-link entry point
    pub async fn open_by_id(&mut self, id: &str) -> Option<&Recipe> {
        let resolved = self.source.lookup_by_id(id).await;
        self.show(resolved, "open recipe by id")
    }

    /// Show a random recipe
    pub async fn surprise(&mut self) -> Option<&Recipe> {
        let resolved = self.source.random_recipe().await;
        self.show(resolved, "get random recipe")
    }

    fn show(
        &mut self,
        resolved: Result<Option<Recipe>, GatewayError>,
        action: &str,
    ) -> Option<&Recipe> {
        match resolved {
            Ok(Some(recipe)) => {
                self.detail = Some(recipe);
                self.detail.as_ref()
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to {}: {}", action, e);
                None
            }
        }
    }

    pub fn detail(&self) -> Option<&Recipe> {
        self.detail.as_ref()
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    /// Find a recipe the user can currently see: the detail view, the
    /// search results or the favorites list
    pub fn visible_recipe(&self, id: &str) -> Option<Recipe> {
        if let Some(detail) = self.detail.as_ref().filter(|r| r.id == id) {
            return Some(detail.clone());
        }
        self.search
            .state()
            .results
            .into_iter()
            .find(|r| r.id == id)
            .or_else(|| self.favorites.get(id).cloned())
    }

    /// Returns whether the recipe is now a favorite
    pub async fn toggle_favorite(&mut self, recipe: &Recipe) -> bool {
        self.favorites.toggle(recipe.clone()).await
    }

    pub async fn remove_favorite(&mut self, id: &str) -> bool {
        self.favorites.remove(id).await
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.contains(id)
    }

    pub fn favorites(&self) -> &[Recipe] {
        self.favorites.list()
    }

    /// Drop any pending query and discard in-flight searches
    pub fn shutdown(&mut self) {
        self.query_debouncer.cancel();
        let _gate = self.query_gate.advance();
        self.search.dispose();
    }
}

impl Drop for RecipeFinder {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::{MemoryStorage, Storage};
    use crate::gateway::fake::{numbered, recipe, FakeSource};
    use tokio::time::sleep;

    const KEY: &str = "favorites";

    fn finder(source: FakeSource) -> (RecipeFinder, Arc<FakeSource>, MemoryStorage) {
        let source = Arc::new(source);
        let storage = MemoryStorage::new();
        let favorites = FavoritesStore::new(storage.clone(), KEY);
        let finder = RecipeFinder::new(source.clone(), favorites, SearchConfig::default());
        (finder, source, storage)
    }

    async fn settled(finder: &RecipeFinder, query: &str) -> SearchState {
        let mut updates = finder.subscribe();
        let state = updates
            .wait_for(|s| !s.is_loading && s.query == query)
            .await
            .unwrap()
            .clone();
        state
    }

    fn seafood_source() -> FakeSource {
        let mut source = FakeSource::default()
            .with_search("a", Duration::ZERO, numbered("a", 20))
            .with_search("soup", Duration::from_millis(20), vec![recipe("s1", "Pea Soup")])
            .with_category(
                "Seafood",
                vec![recipe("1", "Salmon Soup"), recipe("2", "Tuna Steak")],
            );
        source.categories = vec![Category {
            id: "3".to_string(),
            name: "Seafood".to_string(),
            thumbnail_url: None,
            description: None,
        }];
        source
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_loads_categories_and_default_listing() {
        let (mut finder, _, _) = finder(seafood_source());

        finder.start().await.unwrap().await.unwrap();

        assert_eq!(finder.categories().len(), 1);
        assert_eq!(finder.state().results.len(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_burst_sends_one_search() {
        let (mut finder, source, _) = finder(seafood_source());
        finder.start().await.unwrap().await.unwrap();

        for partial in ["s", "so", "sou", "soup"] {
            finder.set_query(partial);
            sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(finder.query(), "soup");

        let state = settled(&finder, "soup").await;
        assert_eq!(state.results[0].id, "s1");
        assert_eq!(
            *source.search_log.lock().unwrap(),
            vec!["a".to_string(), "soup".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_category_then_query_filters_locally() {
        let (mut finder, source, _) = finder(seafood_source());
        finder.start().await.unwrap().await.unwrap();

        finder.set_query("pie");
        finder
            .select_category(Some("Seafood".to_string()))
            .unwrap()
            .await
            .unwrap();
        assert_eq!(finder.query(), "");
        assert_eq!(finder.state().results.len(), 2);

        finder.set_query("soup");
        let state = settled(&finder, "soup").await;
        let ids: Vec<&str> = state.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
        assert_eq!(state.selected_category.as_deref(), Some("Seafood"));

        // neither "pie" nor "soup" went to the remote search
        assert_eq!(*source.search_log.lock().unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_summary_and_unknown_id() {
        let (mut finder, _, _) = finder(seafood_source());

        let salmon = recipe("1", "Salmon Soup");
        let opened = finder.open(salmon.summary()).await.cloned();
        assert_eq!(opened, Some(salmon.clone()));

        assert!(finder.open_by_id("missing").await.is_none());
        assert_eq!(finder.detail(), Some(&salmon));

        finder.close_detail();
        assert!(finder.detail().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_surprise_opens_random_recipe() {
        let mut source = seafood_source();
        source.random = Some(recipe("r", "Random Roast"));
        let (mut finder, _, _) = finder(source);

        let name = finder.surprise().await.map(|r| r.name.clone());
        assert_eq!(name.as_deref(), Some("Random Roast"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_favorites_persist_after_start() {
        let (mut finder, _, storage) = finder(seafood_source());
        finder.start().await.unwrap().await.unwrap();

        let dish = finder.visible_recipe("a1").unwrap();
        assert!(finder.toggle_favorite(&dish).await);
        assert!(finder.is_favorite("a1"));
        assert!(storage.get(KEY).await.unwrap().unwrap().contains("a1"));

        assert!(finder.remove_favorite("a1").await);
        assert!(finder.favorites().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drops_pending_query() {
        let (mut finder, source, _) = finder(seafood_source());
        finder.start().await.unwrap().await.unwrap();

        finder.set_query("soup");
        finder.shutdown();
        sleep(Duration::from_secs(1)).await;

        assert_eq!(finder.state().query, "");
        assert_eq!(*source.search_log.lock().unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_category_keeps_typed_query() {
        let (mut finder, source, _) = finder(seafood_source());
        finder.start().await.unwrap().await.unwrap();

        finder
            .select_category(Some("Seafood".to_string()))
            .unwrap()
            .await
            .unwrap();
        finder.set_query("soup");
        let filtered = settled(&finder, "soup").await;
        assert_eq!(filtered.results.len(), 1);
        assert_eq!(filtered.results[0].id, "1");

        finder.clear_category().unwrap().await.unwrap();

        assert_eq!(finder.query(), "soup");
        let state = finder.state();
        assert_eq!(state.selected_category, None);
        assert_eq!(state.query, "soup");
        assert_eq!(state.results[0].id, "s1");
        assert_eq!(
            *source.search_log.lock().unwrap(),
            vec!["a".to_string(), "soup".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_source_recovers() {
        let (mut finder, source, _) = finder(seafood_source());
        source.fail_searches_for("a");

        finder.start().await.unwrap().await.unwrap();
        let failed = finder.state();
        assert!(failed.error.is_some());
        assert!(failed.results.is_empty());

        source.recover_searches();
        assert_eq!(finder.retry().unwrap().await.unwrap(), RunOutcome::Committed);

        let state = finder.state();
        assert_eq!(state.error, None);
        assert_eq!(state.results.len(), 12);
        assert_eq!(source.search_log.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_query_loses_to_later_category_pick() {
        let (mut finder, source, _) = finder(seafood_source());
        finder.start().await.unwrap().await.unwrap();

        finder.set_query("soup");
        let ticket = *finder.query_gate.lock();
        finder
            .select_category(Some("Seafood".to_string()))
            .unwrap()
            .await
            .unwrap();

        // a debounce callback for "soup" that was already running when the
        // category was picked
        let search = finder.search.clone();
        assert!(finder
            .query_gate
            .apply(ticket, || search.set_query("soup"))
            .is_none());

        sleep(Duration::from_secs(1)).await;
        let state = finder.state();
        assert_eq!(state.query, "");
        assert_eq!(state.selected_category.as_deref(), Some("Seafood"));
        assert_eq!(finder.query(), "");
        assert_eq!(*source.search_log.lock().unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn test_query_gate_only_applies_current_ticket() {
        let gate = QueryGate::default();
        let first = *gate.advance();
        assert_eq!(gate.apply(first, || 1), Some(1));

        let second = *gate.advance();
        assert_eq!(gate.apply(first, || 1), None);
        assert_eq!(gate.apply(second, || 2), Some(2));
    }
}
