use crate::error::ApiError;
use crate::infra::{RecipeStore, RepoError, UniqueKey};
use crate::models::{Recipe, RecipeId, RecipeList, RecipeSummary, UserId};

fn existing_recipe<S: RecipeStore + ?Sized>(store: &S, id: RecipeId) -> Result<Recipe, ApiError> {
    store
        .recipe(id)?
        .ok_or_else(|| ApiError::NotFound(format!("recipe {}", id)))
}

pub fn add<S: RecipeStore + ?Sized>(
    store: &S,
    list: RecipeList,
    user_id: UserId,
    recipe_id: RecipeId,
) -> Result<RecipeSummary, ApiError> {
    let recipe = existing_recipe(store, recipe_id)?;
    match store.add_to_list(list, user_id, recipe_id) {
        Ok(()) => Ok(RecipeSummary::from(&recipe)),
        Err(RepoError::Duplicate(UniqueKey::ListEntry(_))) => Err(ApiError::BadRequest(format!(
            "recipe is already in the {}",
            list.label()
        ))),
        Err(e) => Err(e.into()),
    }
}

pub fn remove<S: RecipeStore + ?Sized>(
    store: &S,
    list: RecipeList,
    user_id: UserId,
    recipe_id: RecipeId,
) -> Result<(), ApiError> {
    existing_recipe(store, recipe_id)?;
    if store.remove_from_list(list, user_id, recipe_id)? {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "recipe is not in the {}",
            list.label()
        )))
    }
}
