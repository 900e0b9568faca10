use crate::error::ApiError;
use crate::infra::RecipeStore;
use crate::models::{
    AuthorView, IngredientAmountView, NewRecipe, Recipe, RecipeId, RecipeIngredient, RecipeList,
    RecipeView, TagId, User,
};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecipe {
    pub name: String,
    #[serde(default)]
    pub text: String,
    pub cooking_time: u32,
    #[serde(default)]
    pub tags: Vec<TagId>,
    pub ingredients: Vec<RecipeIngredient>,
}

pub fn view<S: RecipeStore + ?Sized>(
    store: &S,
    id: RecipeId,
    viewer: Option<&User>,
) -> Result<RecipeView, ApiError> {
    let recipe = store
        .recipe(id)?
        .ok_or_else(|| ApiError::NotFound(format!("recipe {}", id)))?;
    let author = store
        .user(recipe.author_id)?
        .ok_or_else(|| ApiError::NotFound(format!("author {}", recipe.author_id)))?;

    let (is_subscribed, is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer) => (
            store.is_subscribed(viewer.id, author.id)?,
            store.is_in_list(RecipeList::Favorites, viewer.id, id)?,
            store.is_in_list(RecipeList::ShoppingCart, viewer.id, id)?,
        ),
        None => (false, false, false),
    };

    let mut tags = Vec::with_capacity(recipe.tags.len());
    for tag_id in &recipe.tags {
        if let Some(tag) = store.tag(*tag_id)? {
            tags.push(tag);
        }
    }
    let mut ingredients = Vec::with_capacity(recipe.ingredients.len());
    for line in &recipe.ingredients {
        if let Some(ingredient) = store.ingredient(line.id)? {
            ingredients.push(IngredientAmountView {
                id: ingredient.id,
                name: ingredient.name,
                measurement_unit: ingredient.measurement_unit,
                amount: line.amount,
            });
        }
    }

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author: AuthorView::new(&author, is_subscribed),
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

fn validate<S: RecipeStore + ?Sized>(store: &S, payload: &CreateRecipe) -> Result<(), ApiError> {
    let bad = |msg: &str| Err(ApiError::BadRequest(msg.to_string()));
    if payload.name.trim().is_empty() {
        return bad("recipe name must not be empty");
    }
    if payload.cooking_time < 1 {
        return bad("cooking time must be at least one minute");
    }
    if payload.ingredients.is_empty() {
        return bad("a recipe needs at least one ingredient");
    }
    let mut seen = HashSet::new();
    for line in &payload.ingredients {
        if !seen.insert(line.id) {
            return bad("ingredients must be unique");
        }
        if line.amount < 1 {
            return bad("ingredient amount must be greater than zero");
        }
        if store.ingredient(line.id)?.is_none() {
            return Err(ApiError::BadRequest(format!(
                "ingredient {} does not exist",
                line.id
            )));
        }
    }
    let mut seen = HashSet::new();
    for tag_id in &payload.tags {
        if !seen.insert(*tag_id) {
            return bad("tags must be unique");
        }
        if store.tag(*tag_id)?.is_none() {
            return Err(ApiError::BadRequest(format!("tag {} does not exist", tag_id)));
        }
    }
    Ok(())
}

pub fn create<S: RecipeStore + ?Sized>(
    store: &S,
    author: &User,
    payload: CreateRecipe,
) -> Result<RecipeView, ApiError> {
    validate(store, &payload)?;
    let recipe = store.insert_recipe(NewRecipe {
        author_id: author.id,
        name: payload.name.trim().to_string(),
        text: payload.text,
        cooking_time: payload.cooking_time,
        tags: payload.tags,
        ingredients: payload.ingredients,
    })?;
    info!(recipe_id = recipe.id, author_id = author.id, "recipe created");
    view(store, recipe.id, Some(author))
}

pub fn list<S: RecipeStore + ?Sized>(
    store: &S,
    viewer: Option<&User>,
) -> Result<Vec<RecipeView>, ApiError> {
    store
        .recipes()?
        .iter()
        .map(|recipe| view(store, recipe.id, viewer))
        .collect()
}

/// Loads a recipe the user may change: its author or an admin.
fn editable<S: RecipeStore + ?Sized>(store: &S, user: &User, id: RecipeId) -> Result<Recipe, ApiError> {
    let recipe = store
        .recipe(id)?
        .ok_or_else(|| ApiError::NotFound(format!("recipe {}", id)))?;
    if recipe.author_id != user.id && !user.is_admin {
        return Err(ApiError::Forbidden);
    }
    Ok(recipe)
}

/// Replaces name, text, cooking time, tags and ingredients. Author and
/// short link stay as they are.
pub fn update<S: RecipeStore + ?Sized>(
    store: &S,
    user: &User,
    id: RecipeId,
    payload: CreateRecipe,
) -> Result<RecipeView, ApiError> {
    let recipe = editable(store, user, id)?;
    validate(store, &payload)?;
    let recipe = Recipe {
        name: payload.name.trim().to_string(),
        text: payload.text,
        cooking_time: payload.cooking_time,
        tags: payload.tags,
        ingredients: payload.ingredients,
        ..recipe
    };
    if !store.update_recipe(&recipe)? {
        return Err(ApiError::NotFound(format!("recipe {}", id)));
    }
    info!(recipe_id = id, user_id = user.id, "recipe updated");
    view(store, id, Some(user))
}

pub fn delete<S: RecipeStore + ?Sized>(
    store: &S,
    user: &User,
    id: RecipeId,
) -> Result<(), ApiError> {
    editable(store, user, id)?;
    store.delete_recipe(id)?;
    info!(recipe_id = id, user_id = user.id, "recipe deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::MemoryRep;
    use crate::models::{Ingredient, Tag};

    fn user(id: i64, is_admin: bool) -> User {
        User {
            id,
            email: format!("u{}@example.com", id),
            username: format!("user{}", id),
            first_name: "First".into(),
            last_name: "Last".into(),
            is_admin,
        }
    }

    fn setup() -> MemoryRep {
        let rep = MemoryRep::new();
        rep.insert_user(user(1, false), None);
        rep.insert_user(user(2, false), None);
        rep.insert_user(user(3, true), None);
        rep.insert_ingredient(Ingredient {
            id: 1,
            name: "rice".into(),
            measurement_unit: "g".into(),
        });
        rep.insert_tag(Tag {
            id: 1,
            name: "Lunch".into(),
            slug: "lunch".into(),
        });
        rep
    }

    fn payload() -> CreateRecipe {
        CreateRecipe {
            name: " Risotto ".into(),
            text: "Stir.".into(),
            cooking_time: 40,
            tags: vec![1],
            ingredients: vec![RecipeIngredient { id: 1, amount: 300 }],
        }
    }

    #[test]
    fn test_create_and_view() {
        let rep = setup();
        let created = create(&rep, &user(1, false), payload()).unwrap();
        assert_eq!(created.name, "Risotto");
        assert_eq!(created.tags[0].slug, "lunch");
        assert_eq!(created.ingredients[0].name, "rice");
        assert_eq!(created.ingredients[0].amount, 300);
        assert_eq!(created.author.username, "user1");
        assert!(!created.is_favorited);
    }

    #[test]
    fn test_view_flags_follow_viewer() {
        let rep = setup();
        let created = create(&rep, &user(1, false), payload()).unwrap();
        rep.add_to_list(RecipeList::ShoppingCart, 2, created.id).unwrap();
        rep.subscribe(2, 1).unwrap();

        let seen = view(&rep, created.id, Some(&user(2, false))).unwrap();
        assert!(seen.is_in_shopping_cart);
        assert!(!seen.is_favorited);
        assert!(seen.author.is_subscribed);

        let anonymous = view(&rep, created.id, None).unwrap();
        assert!(!anonymous.is_in_shopping_cart);
        assert!(!anonymous.author.is_subscribed);
    }

    #[test]
    fn test_create_rejects_bad_payloads() {
        let rep = setup();
        let author = user(1, false);
        let cases = [
            CreateRecipe { ingredients: vec![], ..payload() },
            CreateRecipe {
                ingredients: vec![RecipeIngredient { id: 1, amount: 0 }],
                ..payload()
            },
            CreateRecipe {
                ingredients: vec![
                    RecipeIngredient { id: 1, amount: 1 },
                    RecipeIngredient { id: 1, amount: 2 },
                ],
                ..payload()
            },
            CreateRecipe {
                ingredients: vec![RecipeIngredient { id: 9, amount: 1 }],
                ..payload()
            },
            CreateRecipe { tags: vec![5], ..payload() },
            CreateRecipe { cooking_time: 0, ..payload() },
            CreateRecipe { name: "  ".into(), ..payload() },
        ];
        for case in cases {
            assert!(matches!(
                create(&rep, &author, case),
                Err(ApiError::BadRequest(_))
            ));
        }
        assert_eq!(rep.count_recipes_by(1).unwrap(), 0);
    }

    #[test]
    fn test_delete_permissions() {
        let rep = setup();
        let id = create(&rep, &user(1, false), payload()).unwrap().id;
        assert!(matches!(
            delete(&rep, &user(2, false), id),
            Err(ApiError::Forbidden)
        ));
        delete(&rep, &user(3, true), id).unwrap();
        assert!(matches!(
            delete(&rep, &user(1, false), id),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_replaces_contents() {
        let rep = setup();
        rep.insert_ingredient(Ingredient {
            id: 2,
            name: "peas".into(),
            measurement_unit: "g".into(),
        });
        let id = create(&rep, &user(1, false), payload()).unwrap().id;
        let changed = CreateRecipe {
            name: "Pea risotto".into(),
            text: "Stir longer.".into(),
            cooking_time: 50,
            tags: vec![],
            ingredients: vec![RecipeIngredient { id: 2, amount: 120 }],
        };

        let updated = update(&rep, &user(1, false), id, changed).unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(updated.name, "Pea risotto");
        assert_eq!(updated.cooking_time, 50);
        assert!(updated.tags.is_empty());
        assert_eq!(updated.ingredients.len(), 1);
        assert_eq!(updated.ingredients[0].name, "peas");

        let stored = rep.recipe(id).unwrap().unwrap();
        assert_eq!(stored.author_id, 1);
        assert_eq!(stored.text, "Stir longer.");
    }

    #[test]
    fn test_update_checks_owner_existence_and_payload() {
        let rep = setup();
        let id = create(&rep, &user(1, false), payload()).unwrap().id;
        assert!(matches!(
            update(&rep, &user(2, false), id, payload()),
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            update(&rep, &user(1, false), 404, payload()),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            update(&rep, &user(1, false), id, CreateRecipe { ingredients: vec![], ..payload() }),
            Err(ApiError::BadRequest(_))
        ));
        assert!(update(&rep, &user(3, true), id, payload()).is_ok());
        assert_eq!(rep.recipe(id).unwrap().unwrap().ingredients.len(), 1);
    }

    #[test]
    fn test_list_is_newest_first() {
        let rep = setup();
        let first = create(&rep, &user(1, false), payload()).unwrap().id;
        let second = create(&rep, &user(2, false), payload()).unwrap().id;
        rep.add_to_list(RecipeList::Favorites, 2, first).unwrap();

        let listed = list(&rep, Some(&user(2, false))).unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second, first]);
        assert!(listed[1].is_favorited);
        assert!(list(&rep, None).unwrap().iter().all(|r| !r.is_favorited));
    }
}
