use crate::error::GatewayError;
use crate::gateway::RecipeSource;
use crate::model::{Recipe, RecipeRef};
use log::debug;

/// Produce the full record needed for a detail view.
///
/// A full record is returned as-is without touching the network. A summary
/// is looked up by id; `Ok(None)` means the source no longer knows the id and
/// the detail view should simply not open.
pub async fn resolve_detail(
    source: &dyn RecipeSource,
    recipe: RecipeRef,
) -> Result<Option<Recipe>, GatewayError> {
    match recipe {
        RecipeRef::Full(recipe) => Ok(Some(recipe)),
        RecipeRef::Summary(summary) => {
            let resolved = source.lookup_by_id(&summary.id).await?;
            if resolved.is_none() {
                debug!("No recipe found for id {}", summary.id);
            }
            Ok(resolved)
        }
    }
}
