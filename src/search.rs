//! Search orchestration: turns the (query, category) filter pair into remote
//! calls and publishes one coherent [`SearchState`].
//!
//! Every input change starts a new run tagged with a generation number. The
//! number lives inside the published state, so the "is this run still
//! current" check and the commit happen under the same lock. A run that lost
//! the race completes in the background and its result is dropped.

use crate::config::SearchConfig;
use crate::error::GatewayError;
use crate::gateway::RecipeSource;
use crate::model::Recipe;
use futures::future::join_all;
use log::{debug, error, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Message shown when a search run fails
pub const SEARCH_FAILED_MESSAGE: &str = "Failed to load recipes. Please try again.";

const EMPTY_FILTERED_HINT: &str = "Try adjusting your search or category filter";
const EMPTY_UNFILTERED_HINT: &str = "Start searching to discover delicious recipes";

/// The two independent filter dimensions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchInput {
    pub query: String,
    pub category: Option<String>,
}

impl SearchInput {
    pub fn new(query: impl Into<String>, category: Option<String>) -> Self {
        Self {
            query: query.into(),
            category,
        }
    }

    pub fn is_filtered(&self) -> bool {
        !self.query.is_empty() || self.category.is_some()
    }
}

/// Snapshot of the search as seen by consumers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    pub selected_category: Option<String>,
    pub results: Vec<Recipe>,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Run that produced (or is producing) this state
    pub generation: u64,
}

/// What a consumer should render for a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchView<'a> {
    Failed(&'a str),
    Loading,
    Empty { filtered: bool },
    Results(&'a [Recipe]),
}

impl SearchView<'_> {
    /// Empty-state hint, chosen by whether a filter is active
    pub fn empty_hint(filtered: bool) -> &'static str {
        if filtered {
            EMPTY_FILTERED_HINT
        } else {
            EMPTY_UNFILTERED_HINT
        }
    }
}

impl SearchState {
    pub fn input(&self) -> SearchInput {
        SearchInput {
            query: self.query.clone(),
            category: self.selected_category.clone(),
        }
    }

    pub fn view(&self) -> SearchView<'_> {
        if let Some(message) = &self.error {
            SearchView::Failed(message)
        } else if self.is_loading {
            SearchView::Loading
        } else if self.results.is_empty() {
            SearchView::Empty {
                filtered: self.input().is_filtered(),
            }
        } else {
            SearchView::Results(&self.results)
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run was still current and its result is now the published state
    Committed,
    /// A newer run (or disposal) superseded it; its result was dropped
    Stale,
}

struct Inner {
    source: Arc<dyn RecipeSource>,
    settings: SearchConfig,
    disposed: AtomicBool,
    state: watch::Sender<SearchState>,
}

/// Decides which remote calls to issue for the current filters and reconciles
/// their results. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SearchOrchestrator {
    inner: Arc<Inner>,
}

impl SearchOrchestrator {
    pub fn new(source: Arc<dyn RecipeSource>, settings: SearchConfig) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            inner: Arc::new(Inner {
                source,
                settings,
                disposed: AtomicBool::new(false),
                state,
            }),
        }
    }

    pub fn state(&self) -> SearchState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.state.subscribe()
    }

    pub fn input(&self) -> SearchInput {
        self.inner.state.borrow().input()
    }

    /// Replace the debounced query, keeping the category
    pub fn set_query(&self, query: impl Into<String>) -> Option<JoinHandle<RunOutcome>> {
        let query = query.into();
        self.start(move |current| {
            (current.query != query).then(|| SearchInput {
                query,
                category: current.category.clone(),
            })
        })
    }

    /// Replace the category, keeping the query
    pub fn set_category(&self, category: Option<String>) -> Option<JoinHandle<RunOutcome>> {
        self.start(move |current| {
            (current.category != category).then(|| SearchInput {
                query: current.query.clone(),
                category,
            })
        })
    }

    /// Replace both filters at once
    pub fn update(&self, input: SearchInput) -> Option<JoinHandle<RunOutcome>> {
        self.start(move |current| (*current != input).then_some(input))
    }

    /// Re-run the current filters as a fresh generation. This is the retry
    /// affordance after a failed run, and the initial load.
    pub fn refresh(&self) -> Option<JoinHandle<RunOutcome>> {
        self.start(|current| Some(current.clone()))
    }

    /// Tear down: in-flight runs are discarded and further input is ignored
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.state.send_modify(|state| {
            state.generation += 1;
            state.is_loading = false;
        });
        debug!("Search orchestrator disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    fn start(
        &self,
        next: impl FnOnce(&SearchInput) -> Option<SearchInput>,
    ) -> Option<JoinHandle<RunOutcome>> {
        let (generation, input) = self.begin(next)?;
        let this = self.clone();
        Some(tokio::spawn(async move {
            let outcome = this.execute(&input).await;
            this.commit(generation, outcome)
        }))
    }

    /// Allocate a generation and mark the state as loading. Previous results
    /// stay in place until the run commits.
    fn begin(
        &self,
        next: impl FnOnce(&SearchInput) -> Option<SearchInput>,
    ) -> Option<(u64, SearchInput)> {
        if self.is_disposed() {
            debug!("Ignoring search input after disposal");
            return None;
        }

        let mut started = None;
        self.inner.state.send_if_modified(|state| {
            let Some(input) = next(&state.input()) else {
                return false;
            };
            state.generation += 1;
            state.query = input.query.clone();
            state.selected_category = input.category.clone();
            state.is_loading = true;
            state.error = None;
            started = Some((state.generation, input));
            true
        });

        if let Some((generation, input)) = &started {
            debug!(
                "Search run {} started (query: {:?}, category: {:?})",
                generation, input.query, input.category
            );
        }
        started
    }

    async fn execute(&self, input: &SearchInput) -> Result<Vec<Recipe>, GatewayError> {
        let source = self.inner.source.as_ref();
        let settings = &self.inner.settings;

        match input.category.as_deref() {
            Some(category) => {
                let summaries = source.filter_by_category(category).await?;
                let ids: Vec<&str> = summaries
                    .iter()
                    .take(settings.category_fanout_limit)
                    .map(|s| s.id.as_str())
                    .collect();

                let lookups = join_all(ids.iter().map(|id| source.lookup_by_id(id))).await;

                let recipes = ids
                    .iter()
                    .zip(lookups)
                    .filter_map(|(id, lookup)| match lookup {
                        Ok(Some(recipe)) => Some(recipe),
                        Ok(None) => {
                            debug!("Recipe {} vanished between filter and lookup", id);
                            None
                        }
                        Err(e) => {
                            warn!("Dropping recipe {} from {} listing: {}", id, category, e);
                            None
                        }
                    })
                    .collect();

                Ok(filter_by_name(recipes, &input.query))
            }
            None if !input.query.is_empty() => source.search_by_name(&input.query).await,
            None => {
                let mut recipes = source.search_by_name(&settings.browse_query).await?;
                recipes.truncate(settings.browse_limit);
                Ok(recipes)
            }
        }
    }

    fn commit(&self, generation: u64, outcome: Result<Vec<Recipe>, GatewayError>) -> RunOutcome {
        let failure = outcome.as_ref().err().map(ToString::to_string);

        let committed = self.inner.state.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            match outcome {
                Ok(results) => {
                    state.results = results;
                    state.error = None;
                }
                Err(_) => {
                    state.results.clear();
                    state.error = Some(SEARCH_FAILED_MESSAGE.to_string());
                }
            }
            state.is_loading = false;
            true
        });

        if !committed {
            debug!("Discarding stale search run {}", generation);
            return RunOutcome::Stale;
        }
        if let Some(e) = failure {
            error!("Search run {} failed: {}", generation, e);
        }
        RunOutcome::Committed
    }
}

/// Case-insensitive name filter applied locally on top of a category listing
fn filter_by_name(recipes: Vec<Recipe>, query: &str) -> Vec<Recipe> {
    if query.is_empty() {
        return recipes;
    }
    let needle = query.to_lowercase();
    recipes
        .into_iter()
        .filter(|r| r.name.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::{numbered, recipe, FakeSource};
    use std::time::Duration;

    fn orchestrator(source: FakeSource) -> (SearchOrchestrator, Arc<FakeSource>) {
        let source = Arc::new(source);
        let orchestrator = SearchOrchestrator::new(source.clone(), SearchConfig::default());
        (orchestrator, source)
    }

    fn ids(state: &SearchState) -> Vec<&str> {
        state.results.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_trigger_wins_over_slower_earlier_one() {
        let (search, _) = orchestrator(
            FakeSource::default()
                .with_search("slow", Duration::from_millis(500), vec![recipe("1", "Slow")])
                .with_search("fast", Duration::from_millis(50), vec![recipe("2", "Fast")]),
        );

        let first = search.set_query("slow").unwrap();
        let second = search.set_query("fast").unwrap();

        assert_eq!(second.await.unwrap(), RunOutcome::Committed);
        assert_eq!(ids(&search.state()), vec!["2"]);

        assert_eq!(first.await.unwrap(), RunOutcome::Stale);
        let state = search.state();
        assert_eq!(ids(&state), vec!["2"]);
        assert_eq!(state.query, "fast");
        assert!(!state.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_category_and_query_compose_locally() {
        let (search, source) = orchestrator(FakeSource::default().with_category(
            "Seafood",
            vec![recipe("1", "Salmon Soup"), recipe("2", "Tuna Steak")],
        ));

        let run = search
            .update(SearchInput::new("SOUP", Some("Seafood".to_string())))
            .unwrap();
        assert_eq!(run.await.unwrap(), RunOutcome::Committed);

        assert_eq!(ids(&search.state()), vec!["1"]);
        assert!(source.search_log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_category_listing_is_capped_before_lookup() {
        let (search, source) =
            orchestrator(FakeSource::default().with_category("Beef", numbered("b", 20)));

        search.set_category(Some("Beef".to_string())).unwrap().await.unwrap();

        assert_eq!(search.state().results.len(), 12);
        assert_eq!(source.lookup_count(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_failed_lookup_is_dropped_silently() {
        let mut fake = FakeSource::default().with_category("Beef", numbered("b", 12));
        fake.failing_lookups.push("b3".to_string());
        let (search, _) = orchestrator(fake);

        search.set_category(Some("Beef".to_string())).unwrap().await.unwrap();

        let state = search.state();
        assert_eq!(state.results.len(), 11);
        assert!(!ids(&state).contains(&"b3"));
        assert_eq!(state.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_listing_is_first_twelve_of_browse_query() {
        let all = numbered("a", 25);
        let (search, source) = orchestrator(FakeSource::default().with_search(
            "a",
            Duration::ZERO,
            all.clone(),
        ));

        search.refresh().unwrap().await.unwrap();

        assert_eq!(search.state().results, all[..12].to_vec());
        assert_eq!(*source.search_log.lock().unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_plain_query_results_are_verbatim() {
        let hits = numbered("p", 15);
        let (search, _) = orchestrator(FakeSource::default().with_search(
            "pie",
            Duration::ZERO,
            hits.clone(),
        ));

        search.set_query("pie").unwrap().await.unwrap();
        assert_eq!(search.state().results, hits);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_clears_results_and_sets_message() {
        let fake = FakeSource::default().with_search(
            "pie",
            Duration::ZERO,
            vec![recipe("1", "Pie")],
        );
        fake.fail_searches_for("boom");
        let (search, _) = orchestrator(fake);

        search.set_query("pie").unwrap().await.unwrap();
        search.set_query("boom").unwrap().await.unwrap();

        let state = search.state();
        assert!(state.results.is_empty());
        assert_eq!(state.error.as_deref(), Some(SEARCH_FAILED_MESSAGE));
        assert!(!state.is_loading);
        assert_eq!(state.view(), SearchView::Failed(SEARCH_FAILED_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_previous_results_stay_visible_while_loading() {
        let (search, _) = orchestrator(
            FakeSource::default()
                .with_search("pie", Duration::ZERO, vec![recipe("1", "Pie")])
                .with_search("stew", Duration::from_millis(200), vec![recipe("2", "Stew")]),
        );

        search.set_query("pie").unwrap().await.unwrap();
        let pending = search.set_query("stew").unwrap();

        let state = search.state();
        assert!(state.is_loading);
        assert_eq!(ids(&state), vec!["1"]);
        assert_eq!(state.view(), SearchView::Loading);

        pending.await.unwrap();
        assert_eq!(ids(&search.state()), vec!["2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_input_does_not_trigger() {
        let (search, _) = orchestrator(FakeSource::default());

        search.set_query("pie").unwrap().await.unwrap();
        assert!(search.set_query("pie").is_none());
        assert!(search.set_category(None).is_none());
        assert!(search.update(SearchInput::new("pie", None)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_discards_in_flight_run() {
        let (search, _) = orchestrator(FakeSource::default().with_search(
            "slow",
            Duration::from_millis(500),
            vec![recipe("1", "Slow")],
        ));

        let run = search.set_query("slow").unwrap();
        search.dispose();

        assert_eq!(run.await.unwrap(), RunOutcome::Stale);
        assert!(search.state().results.is_empty());
        assert!(!search.state().is_loading);
        assert!(search.set_query("other").is_none());
        assert!(search.refresh().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_committed_state() {
        let (search, _) = orchestrator(FakeSource::default().with_search(
            "pie",
            Duration::from_millis(30),
            vec![recipe("1", "Pie")],
        ));
        let mut updates = search.subscribe();

        search.set_query("pie");
        let state = updates
            .wait_for(|s| !s.is_loading && s.query == "pie")
            .await
            .unwrap()
            .clone();

        assert_eq!(ids(&state), vec!["1"]);
    }

    #[test]
    fn test_empty_view_tracks_active_filters() {
        let state = SearchState::default();
        assert_eq!(state.view(), SearchView::Empty { filtered: false });
        assert_eq!(
            SearchView::empty_hint(false),
            "Start searching to discover delicious recipes"
        );

        let filtered = SearchState {
            selected_category: Some("Dessert".to_string()),
            ..SearchState::default()
        };
        assert_eq!(filtered.view(), SearchView::Empty { filtered: true });
    }

    #[test]
    fn test_filter_by_name_is_case_insensitive() {
        let recipes = vec![recipe("1", "Salmon Soup"), recipe("2", "Tuna Steak")];
        let kept = filter_by_name(recipes.clone(), "sOuP");
        assert_eq!(kept, vec![recipes[0].clone()]);
        assert_eq!(filter_by_name(recipes.clone(), ""), recipes);
    }
}
