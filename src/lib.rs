pub mod config;
pub mod debounce;
pub mod error;
pub mod favorites;
pub mod finder;
pub mod gateway;
pub mod model;
pub mod resolver;
pub mod search;

pub use config::FinderConfig;
pub use debounce::{CancelHandle, DebouncedValue, Debouncer};
pub use error::{FinderError, GatewayError, StorageError};
pub use favorites::{FavoritesStore, FileStorage, MemoryStorage, Storage};
pub use finder::RecipeFinder;
pub use gateway::{MealDbClient, RecipeSource};
pub use model::{Category, Ingredient, Recipe, RecipeRef, RecipeSummary};
pub use resolver::resolve_detail;
pub use search::{RunOutcome, SearchInput, SearchOrchestrator, SearchState, SearchView};

/// Search TheMealDB by name using configuration from `config.toml` and the
/// environment
///
/// # Example
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), recipe_finder::FinderError> {
/// let recipes = recipe_finder::search_recipes("curry").await?;
/// for recipe in recipes {
///     println!("{} ({})", recipe.name, recipe.area);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search_recipes(text: &str) -> Result<Vec<Recipe>, FinderError> {
    let config = FinderConfig::load()?;
    let client = MealDbClient::new(&config.api)?;
    Ok(client.search_by_name(text).await?)
}
