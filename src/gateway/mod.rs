mod mealdb;

pub use mealdb::{MealDbClient, DEFAULT_BASE_URL};

use crate::error::GatewayError;
use crate::model::{Category, Recipe, RecipeSummary};
use async_trait::async_trait;

/// Read-only query interface of the remote recipe source.
///
/// Every call is one independent round trip. Implementations do not retry;
/// an empty match is an empty `Vec`, never an error.
#[async_trait]
pub trait RecipeSource: Send + Sync {
    async fn search_by_name(&self, text: &str) -> Result<Vec<Recipe>, GatewayError>;

    async fn list_by_first_letter(&self, letter: char) -> Result<Vec<Recipe>, GatewayError>;

    async fn lookup_by_id(&self, id: &str) -> Result<Option<Recipe>, GatewayError>;

    async fn random_recipe(&self) -> Result<Option<Recipe>, GatewayError>;

    async fn list_categories(&self) -> Result<Vec<Category>, GatewayError>;

    async fn filter_by_category(&self, name: &str) -> Result<Vec<RecipeSummary>, GatewayError>;

    async fn filter_by_area(&self, name: &str) -> Result<Vec<RecipeSummary>, GatewayError>;
}
