use crate::config::ApiConfig;
use crate::error::{FinderError, GatewayError};
use crate::gateway::RecipeSource;
use crate::model::{
    CategoriesEnvelope, Category, MealRecord, MealSummaryRecord, MealsEnvelope, Recipe,
    RecipeSummary,
};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.themealdb.com/api/json/v1/1";

/// HTTP client for TheMealDB's public JSON API
pub struct MealDbClient {
    client: Client,
    base_url: String,
}

impl MealDbClient {
    /// Create a client from configuration
    pub fn new(config: &ApiConfig) -> Result<Self, FinderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| FinderError::Client(e.to_string()))?;

        Ok(MealDbClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        MealDbClient {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let response = self.client.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn meals(&self, path: &str, query: &[(&str, &str)]) -> Result<Vec<Recipe>, GatewayError> {
        let envelope: MealsEnvelope<MealRecord> = self.get(path, query).await?;
        Ok(envelope
            .meals
            .unwrap_or_default()
            .into_iter()
            .map(Recipe::from)
            .collect())
    }

    async fn summaries(
        &self,
        query: &[(&str, &str)],
    ) -> Result<Vec<RecipeSummary>, GatewayError> {
        let envelope: MealsEnvelope<MealSummaryRecord> = self.get("/filter.php", query).await?;
        Ok(envelope
            .meals
            .unwrap_or_default()
            .into_iter()
            .map(RecipeSummary::from)
            .collect())
    }
}

#[async_trait]
impl RecipeSource for MealDbClient {
    async fn search_by_name(&self, text: &str) -> Result<Vec<Recipe>, GatewayError> {
        self.meals("/search.php", &[("s", text)]).await
    }

    async fn list_by_first_letter(&self, letter: char) -> Result<Vec<Recipe>, GatewayError> {
        let letter = letter.to_string();
        self.meals("/search.php", &[("f", letter.as_str())]).await
    }

    async fn lookup_by_id(&self, id: &str) -> Result<Option<Recipe>, GatewayError> {
        Ok(self.meals("/lookup.php", &[("i", id)]).await?.into_iter().next())
    }

    async fn random_recipe(&self) -> Result<Option<Recipe>, GatewayError> {
        Ok(self.meals("/random.php", &[]).await?.into_iter().next())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, GatewayError> {
        let envelope: CategoriesEnvelope = self.get("/categories.php", &[]).await?;
        Ok(envelope
            .categories
            .unwrap_or_default()
            .into_iter()
            .map(Category::from)
            .collect())
    }

    async fn filter_by_category(&self, name: &str) -> Result<Vec<RecipeSummary>, GatewayError> {
        self.summaries(&[("c", name)]).await
    }

    async fn filter_by_area(&self, name: &str) -> Result<Vec<RecipeSummary>, GatewayError> {
        self.summaries(&[("a", name)]).await
    }
}
