use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Highest ingredient slot TheMealDB exposes (`strIngredient1` .. `strIngredient20`)
const MAX_INGREDIENT_SLOTS: usize = 20;

/// Minimal recipe shape returned by category and area filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: String,
    pub name: String,
    pub thumbnail_url: String,
}

/// A single ingredient line; position in `Recipe::ingredients` is meaningful
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub measure: String,
}

/// Full recipe record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub category: String,
    pub area: String,
    /// Free text, one step per line
    pub instructions: String,
    pub thumbnail_url: String,
    pub ingredients: Vec<Ingredient>,
    /// Comma-separated tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl Recipe {
    /// Instruction steps, one per non-blank line
    pub fn steps(&self) -> Vec<&str> {
        self.instructions
            .split(|c: char| c == '\r' || c == '\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }

    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .as_deref()
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn summary(&self) -> RecipeSummary {
        RecipeSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
        }
    }
}

/// Recipe category reference data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Either a summary from a filter query or an already complete record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeRef {
    Summary(RecipeSummary),
    Full(Recipe),
}

impl RecipeRef {
    pub fn id(&self) -> &str {
        match self {
            RecipeRef::Summary(summary) => &summary.id,
            RecipeRef::Full(recipe) => &recipe.id,
        }
    }
}

impl From<RecipeSummary> for RecipeRef {
    fn from(summary: RecipeSummary) -> Self {
        RecipeRef::Summary(summary)
    }
}

impl From<Recipe> for RecipeRef {
    fn from(recipe: Recipe) -> Self {
        RecipeRef::Full(recipe)
    }
}

// Wire records as returned by TheMealDB.

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct MealsEnvelope<T> {
    #[serde(default)]
    pub meals: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoriesEnvelope {
    #[serde(default)]
    pub categories: Option<Vec<CategoryRecord>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MealRecord {
    #[serde(rename = "idMeal")]
    id: String,
    #[serde(rename = "strMeal")]
    name: String,
    #[serde(rename = "strCategory", default)]
    category: Option<String>,
    #[serde(rename = "strArea", default)]
    area: Option<String>,
    #[serde(rename = "strInstructions", default)]
    instructions: Option<String>,
    #[serde(rename = "strMealThumb", default)]
    thumbnail: Option<String>,
    #[serde(rename = "strTags", default)]
    tags: Option<String>,
    #[serde(rename = "strYoutube", default)]
    youtube: Option<String>,
    #[serde(rename = "strSource", default)]
    source: Option<String>,
    /// `strIngredientN` / `strMeasureN` and anything else the API adds
    #[serde(flatten)]
    rest: HashMap<String, Value>,
}

impl MealRecord {
    fn slot(&self, prefix: &str, index: usize) -> Option<&str> {
        self.rest
            .get(&format!("{prefix}{index}"))
            .and_then(Value::as_str)
            .map(str::trim)
    }

    fn ingredients(&self) -> Vec<Ingredient> {
        (1..=MAX_INGREDIENT_SLOTS)
            .filter_map(|i| {
                let name = self.slot("strIngredient", i).filter(|n| !n.is_empty())?;
                Some(Ingredient {
                    name: name.to_string(),
                    measure: self.slot("strMeasure", i).unwrap_or_default().to_string(),
                })
            })
            .collect()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<MealRecord> for Recipe {
    fn from(record: MealRecord) -> Self {
        let ingredients = record.ingredients();
        Recipe {
            id: record.id,
            name: record.name,
            category: record.category.unwrap_or_default(),
            area: record.area.unwrap_or_default(),
            instructions: record.instructions.unwrap_or_default(),
            thumbnail_url: record.thumbnail.unwrap_or_default(),
            ingredients,
            tags: non_blank(record.tags),
            video_url: non_blank(record.youtube),
            source_url: non_blank(record.source),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MealSummaryRecord {
    #[serde(rename = "idMeal")]
    id: String,
    #[serde(rename = "strMeal")]
    name: String,
    #[serde(rename = "strMealThumb", default)]
    thumbnail: Option<String>,
}

impl From<MealSummaryRecord> for RecipeSummary {
    fn from(record: MealSummaryRecord) -> Self {
        RecipeSummary {
            id: record.id,
            name: record.name,
            thumbnail_url: record.thumbnail.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryRecord {
    #[serde(rename = "idCategory")]
    id: String,
    #[serde(rename = "strCategory")]
    name: String,
    #[serde(rename = "strCategoryThumb", default)]
    thumbnail: Option<String>,
    #[serde(rename = "strCategoryDescription", default)]
    description: Option<String>,
}

impl From<CategoryRecord> for Category {
    fn from(record: CategoryRecord) -> Self {
        Category {
            id: record.id,
            name: record.name,
            thumbnail_url: non_blank(record.thumbnail),
            description: non_blank(record.description),
        }
    }
}
