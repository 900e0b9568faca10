use super::repo::{RecipeStore, RepoError, ShortLinkStore, UniqueKey};
use crate::models::{
    CartIngredient, Ingredient, IngredientId, NewRecipe, Recipe, RecipeId, RecipeIngredient,
    RecipeList, ShortLink, Tag, TagId, User, UserId,
};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    tokens: HashMap<String, UserId>,
    ingredients: BTreeMap<IngredientId, Ingredient>,
    tags: BTreeMap<TagId, Tag>,
    recipes: BTreeMap<RecipeId, Recipe>,
    last_recipe_id: RecipeId,
    links_by_recipe: HashMap<RecipeId, String>,
    links_by_code: HashMap<String, RecipeId>,
    lists: BTreeSet<(RecipeList, UserId, RecipeId)>,
    subscriptions: BTreeSet<(UserId, UserId)>,
}

/// Process-local repository with the same uniqueness rules as the Mongo
/// indexes. Used for tests and for running without a database.
#[derive(Default)]
pub struct MemoryRep {
    tables: Mutex<Tables>,
}

#[derive(Deserialize)]
struct Fixture {
    #[serde(default)]
    users: Vec<FixtureUser>,
    #[serde(default)]
    ingredients: Vec<Ingredient>,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    recipes: Vec<FixtureRecipe>,
}

#[derive(Deserialize)]
struct FixtureUser {
    #[serde(flatten)]
    user: User,
    token: Option<String>,
}

#[derive(Deserialize)]
struct FixtureRecipe {
    id: RecipeId,
    author_id: UserId,
    name: String,
    #[serde(default)]
    text: String,
    cooking_time: u32,
    #[serde(default)]
    tags: Vec<TagId>,
    ingredients: Vec<RecipeIngredient>,
}

impl MemoryRep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(path: &Path) -> Result<Self, RepoError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RepoError::Fixture(format!("{}: {}", path.display(), e)))?;
        let rep = Self::from_fixture_str(&raw)?;
        info!(path = %path.display(), "loaded fixture");
        Ok(rep)
    }

    pub fn from_fixture_str(raw: &str) -> Result<Self, RepoError> {
        let fixture: Fixture = rocket::serde::json::from_str(raw)
            .map_err(|e| RepoError::Fixture(e.to_string()))?;
        let rep = Self::new();
        for FixtureUser { user, token } in fixture.users {
            rep.insert_user(user, token.as_deref());
        }
        for ingredient in fixture.ingredients {
            rep.insert_ingredient(ingredient);
        }
        for tag in fixture.tags {
            rep.insert_tag(tag);
        }
        for r in fixture.recipes {
            let mut tables = rep.lock();
            tables.last_recipe_id = tables.last_recipe_id.max(r.id);
            tables.recipes.insert(
                r.id,
                Recipe {
                    id: r.id,
                    author_id: r.author_id,
                    name: r.name,
                    text: r.text,
                    cooking_time: r.cooking_time,
                    tags: r.tags,
                    ingredients: r.ingredients,
                },
            );
        }
        Ok(rep)
    }

    pub fn insert_user(&self, user: User, token: Option<&str>) {
        let mut tables = self.lock();
        if let Some(token) = token {
            tables.tokens.insert(token.to_string(), user.id);
        }
        tables.users.insert(user.id, user);
    }

    pub fn insert_ingredient(&self, ingredient: Ingredient) {
        self.lock().ingredients.insert(ingredient.id, ingredient);
    }

    pub fn insert_tag(&self, tag: Tag) {
        self.lock().tags.insert(tag.id, tag);
    }

    /// Stores a recipe under a fixed id, bypassing validation.
    pub fn seed_recipe(
        &self,
        id: RecipeId,
        author_id: UserId,
        name: &str,
        ingredients: &[(IngredientId, u32)],
    ) {
        let mut tables = self.lock();
        tables.last_recipe_id = tables.last_recipe_id.max(id);
        tables.recipes.insert(
            id,
            Recipe {
                id,
                author_id,
                name: name.to_string(),
                text: String::new(),
                cooking_time: 10,
                tags: Vec::new(),
                ingredients: ingredients
                    .iter()
                    .map(|&(id, amount)| RecipeIngredient { id, amount })
                    .collect(),
            },
        );
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ShortLinkStore for MemoryRep {
    fn recipe_exists(&self, id: RecipeId) -> Result<bool, RepoError> {
        Ok(self.lock().recipes.contains_key(&id))
    }

    fn short_link_for_recipe(&self, recipe_id: RecipeId) -> Result<Option<ShortLink>, RepoError> {
        Ok(self
            .lock()
            .links_by_recipe
            .get(&recipe_id)
            .map(|code| ShortLink {
                recipe_id,
                code: code.clone(),
            }))
    }

    fn short_link_by_code(&self, code: &str) -> Result<Option<ShortLink>, RepoError> {
        Ok(self
            .lock()
            .links_by_code
            .get(code)
            .map(|&recipe_id| ShortLink {
                recipe_id,
                code: code.to_string(),
            }))
    }

    fn insert_short_link(&self, link: &ShortLink) -> Result<(), RepoError> {
        let mut tables = self.lock();
        if tables.links_by_recipe.contains_key(&link.recipe_id) {
            return Err(RepoError::Duplicate(UniqueKey::ShortLinkRecipe));
        }
        if tables.links_by_code.contains_key(&link.code) {
            return Err(RepoError::Duplicate(UniqueKey::ShortLinkCode));
        }
        tables
            .links_by_recipe
            .insert(link.recipe_id, link.code.clone());
        tables
            .links_by_code
            .insert(link.code.clone(), link.recipe_id);
        Ok(())
    }

    fn count_short_links(&self) -> Result<u64, RepoError> {
        Ok(self.lock().links_by_code.len() as u64)
    }
}

impl RecipeStore for MemoryRep {
    fn user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    fn user_by_token(&self, token: &str) -> Result<Option<User>, RepoError> {
        let tables = self.lock();
        Ok(tables
            .tokens
            .get(token)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    fn users(&self) -> Result<Vec<User>, RepoError> {
        let mut users: Vec<User> = self.lock().users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    fn ingredient(&self, id: IngredientId) -> Result<Option<Ingredient>, RepoError> {
        Ok(self.lock().ingredients.get(&id).cloned())
    }

    fn ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, RepoError> {
        let prefix = name_prefix.map(str::to_lowercase);
        let mut found: Vec<Ingredient> = self
            .lock()
            .ingredients
            .values()
            .filter(|i| match &prefix {
                Some(p) => i.name.to_lowercase().starts_with(p.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    fn tag(&self, id: TagId) -> Result<Option<Tag>, RepoError> {
        Ok(self.lock().tags.get(&id).cloned())
    }

    fn tags(&self) -> Result<Vec<Tag>, RepoError> {
        Ok(self.lock().tags.values().cloned().collect())
    }

    fn recipe(&self, id: RecipeId) -> Result<Option<Recipe>, RepoError> {
        Ok(self.lock().recipes.get(&id).cloned())
    }

    fn recipes(&self) -> Result<Vec<Recipe>, RepoError> {
        Ok(self.lock().recipes.values().rev().cloned().collect())
    }

    fn insert_recipe(&self, recipe: NewRecipe) -> Result<Recipe, RepoError> {
        let mut tables = self.lock();
        tables.last_recipe_id += 1;
        let recipe = recipe.with_id(tables.last_recipe_id);
        tables.recipes.insert(recipe.id, recipe.clone());
        Ok(recipe)
    }

    fn update_recipe(&self, recipe: &Recipe) -> Result<bool, RepoError> {
        match self.lock().recipes.get_mut(&recipe.id) {
            Some(stored) => {
                *stored = recipe.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_recipe(&self, id: RecipeId) -> Result<bool, RepoError> {
        let mut tables = self.lock();
        if tables.recipes.remove(&id).is_none() {
            return Ok(false);
        }
        if let Some(code) = tables.links_by_recipe.remove(&id) {
            tables.links_by_code.remove(&code);
        }
        tables.lists.retain(|&(_, _, recipe_id)| recipe_id != id);
        Ok(true)
    }

    fn count_recipes_by(&self, author_id: UserId) -> Result<u64, RepoError> {
        Ok(self
            .lock()
            .recipes
            .values()
            .filter(|r| r.author_id == author_id)
            .count() as u64)
    }

    fn add_to_list(
        &self,
        list: RecipeList,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> Result<(), RepoError> {
        if self.lock().lists.insert((list, user_id, recipe_id)) {
            Ok(())
        } else {
            Err(RepoError::Duplicate(UniqueKey::ListEntry(list)))
        }
    }

    fn remove_from_list(
        &self,
        list: RecipeList,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> Result<bool, RepoError> {
        Ok(self.lock().lists.remove(&(list, user_id, recipe_id)))
    }

    fn is_in_list(
        &self,
        list: RecipeList,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> Result<bool, RepoError> {
        Ok(self.lock().lists.contains(&(list, user_id, recipe_id)))
    }

    fn cart_ingredients(&self, user_id: UserId) -> Result<Vec<CartIngredient>, RepoError> {
        let tables = self.lock();
        let rows = tables
            .lists
            .iter()
            .filter(|&&(list, user, _)| list == RecipeList::ShoppingCart && user == user_id)
            .filter_map(|(_, _, recipe_id)| tables.recipes.get(recipe_id))
            .flat_map(|recipe| recipe.ingredients.iter())
            .filter_map(|line| {
                tables.ingredients.get(&line.id).map(|ingredient| CartIngredient {
                    name: ingredient.name.clone(),
                    measurement_unit: ingredient.measurement_unit.clone(),
                    amount: line.amount,
                })
            })
            .collect();
        Ok(rows)
    }

    fn subscribe(&self, user_id: UserId, author_id: UserId) -> Result<(), RepoError> {
        if self.lock().subscriptions.insert((user_id, author_id)) {
            Ok(())
        } else {
            Err(RepoError::Duplicate(UniqueKey::Subscription))
        }
    }

    fn unsubscribe(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        Ok(self.lock().subscriptions.remove(&(user_id, author_id)))
    }

    fn is_subscribed(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        Ok(self.lock().subscriptions.contains(&(user_id, author_id)))
    }

    fn subscriptions(&self, user_id: UserId) -> Result<Vec<User>, RepoError> {
        let tables = self.lock();
        let mut authors: Vec<User> = tables
            .subscriptions
            .iter()
            .filter(|&&(user, _)| user == user_id)
            .filter_map(|(_, author)| tables.users.get(author))
            .cloned()
            .collect();
        authors.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(authors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "users": [
            {"id": 1, "email": "anna@example.com", "username": "anna",
             "first_name": "Anna", "last_name": "K", "token": "secret"}
        ],
        "ingredients": [
            {"id": 1, "name": "flour", "measurement_unit": "g"},
            {"id": 2, "name": "Eggs", "measurement_unit": "pcs"}
        ],
        "tags": [{"id": 1, "name": "Breakfast", "slug": "breakfast"}],
        "recipes": [
            {"id": 7, "author_id": 1, "name": "Pancakes", "cooking_time": 20,
             "tags": [1], "ingredients": [{"id": 1, "amount": 200}]}
        ]
    }"#;

    #[test]
    fn test_fixture_loads_everything() {
        let rep = MemoryRep::from_fixture_str(FIXTURE).unwrap();
        assert_eq!(rep.user_by_token("secret").unwrap().unwrap().username, "anna");
        assert!(rep.user_by_token("other").unwrap().is_none());
        assert_eq!(rep.tags().unwrap().len(), 1);
        assert_eq!(rep.recipe(7).unwrap().unwrap().name, "Pancakes");
    }

    #[test]
    fn test_fixture_rejects_garbage() {
        assert!(matches!(
            MemoryRep::from_fixture_str("{\"users\": 3}"),
            Err(RepoError::Fixture(_))
        ));
    }

    #[test]
    fn test_new_recipe_ids_follow_seeded_ones() {
        let rep = MemoryRep::from_fixture_str(FIXTURE).unwrap();
        let recipe = rep
            .insert_recipe(NewRecipe {
                author_id: 1,
                name: "Bread".into(),
                text: String::new(),
                cooking_time: 60,
                tags: vec![],
                ingredients: vec![RecipeIngredient { id: 1, amount: 500 }],
            })
            .unwrap();
        assert_eq!(recipe.id, 8);
    }

    #[test]
    fn test_ingredient_prefix_search_is_case_insensitive() {
        let rep = MemoryRep::from_fixture_str(FIXTURE).unwrap();
        let names: Vec<_> = rep
            .ingredients(Some("e"))
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Eggs"]);
        assert_eq!(rep.ingredients(None).unwrap().len(), 2);
    }

    #[test]
    fn test_short_link_uniqueness() {
        let rep = MemoryRep::from_fixture_str(FIXTURE).unwrap();
        rep.insert_short_link(&ShortLink { recipe_id: 7, code: "abc".into() })
            .unwrap();
        let err = rep
            .insert_short_link(&ShortLink { recipe_id: 7, code: "xyz".into() })
            .unwrap_err();
        assert!(err.is_duplicate(&UniqueKey::ShortLinkRecipe));
        let err = rep
            .insert_short_link(&ShortLink { recipe_id: 8, code: "abc".into() })
            .unwrap_err();
        assert!(err.is_duplicate(&UniqueKey::ShortLinkCode));
    }

    #[test]
    fn test_delete_recipe_cascades() {
        let rep = MemoryRep::from_fixture_str(FIXTURE).unwrap();
        rep.insert_short_link(&ShortLink { recipe_id: 7, code: "abc".into() })
            .unwrap();
        rep.add_to_list(RecipeList::ShoppingCart, 1, 7).unwrap();
        rep.add_to_list(RecipeList::Favorites, 1, 7).unwrap();

        assert!(rep.delete_recipe(7).unwrap());
        assert!(rep.short_link_by_code("abc").unwrap().is_none());
        assert!(!rep.is_in_list(RecipeList::ShoppingCart, 1, 7).unwrap());
        assert!(!rep.is_in_list(RecipeList::Favorites, 1, 7).unwrap());
        assert!(!rep.delete_recipe(7).unwrap());
    }

    #[test]
    fn test_list_entries_are_unique_per_list() {
        let rep = MemoryRep::from_fixture_str(FIXTURE).unwrap();
        rep.add_to_list(RecipeList::ShoppingCart, 1, 7).unwrap();
        rep.add_to_list(RecipeList::Favorites, 1, 7).unwrap();
        let err = rep.add_to_list(RecipeList::ShoppingCart, 1, 7).unwrap_err();
        assert!(err.is_duplicate(&UniqueKey::ListEntry(RecipeList::ShoppingCart)));
    }

    fn named(id: UserId, username: &str) -> User {
        User {
            id,
            email: format!("{}@example.com", username),
            username: username.into(),
            first_name: username.into(),
            last_name: "K".into(),
            is_admin: false,
        }
    }

    #[test]
    fn test_subscriptions_sorted_by_username() {
        let rep = MemoryRep::new();
        rep.insert_user(named(1, "reader"), None);
        rep.insert_user(named(2, "zoe"), None);
        rep.insert_user(named(3, "boris"), None);
        rep.subscribe(1, 2).unwrap();
        rep.subscribe(1, 3).unwrap();

        let names: Vec<_> = rep
            .subscriptions(1)
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["boris", "zoe"]);
        let all: Vec<_> = rep.users().unwrap().into_iter().map(|u| u.id).collect();
        assert_eq!(all, vec![3, 1, 2]);
    }

    #[test]
    fn test_recipes_newest_first_and_update_replaces() {
        let rep = MemoryRep::from_fixture_str(FIXTURE).unwrap();
        rep.seed_recipe(9, 1, "Toast", &[(1, 50)]);
        let ids: Vec<_> = rep.recipes().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![9, 7]);

        let mut recipe = rep.recipe(7).unwrap().unwrap();
        recipe.name = "Crepes".into();
        recipe.ingredients = vec![RecipeIngredient { id: 2, amount: 3 }];
        assert!(rep.update_recipe(&recipe).unwrap());
        assert_eq!(rep.recipe(7).unwrap().unwrap(), recipe);

        recipe.id = 100;
        assert!(!rep.update_recipe(&recipe).unwrap());
        assert!(rep.recipe(100).unwrap().is_none());
    }
}
