use crate::models::{
    CartIngredient, Ingredient, IngredientId, NewRecipe, Recipe, RecipeId, RecipeList, ShortLink,
    Tag, TagId, User, UserId,
};
use mongodb::error::Error as mongoError;
use std::fmt;
use thiserror::Error;

/// The unique constraint a rejected write ran into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueKey {
    ShortLinkCode,
    ShortLinkRecipe,
    ListEntry(RecipeList),
    Subscription,
    Other(String),
}

impl fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueKey::ShortLinkCode => write!(f, "short link code"),
            UniqueKey::ShortLinkRecipe => write!(f, "short link recipe"),
            UniqueKey::ListEntry(list) => write!(f, "{} entry", list.label()),
            UniqueKey::Subscription => write!(f, "subscription"),
            UniqueKey::Other(index) => write!(f, "index {}", index),
        }
    }
}

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("error querying value")]
    QueryError(#[from] mongoError),
    #[error("malformed document: {0}")]
    Decode(#[from] mongodb::bson::de::Error),
    #[error("duplicate key on {0}")]
    Duplicate(UniqueKey),
    #[error("missing counter {0}")]
    MissingCounter(String),
    #[error("invalid fixture: {0}")]
    Fixture(String),
}

impl RepoError {
    #[cfg(test)]
    pub fn is_duplicate(&self, key: &UniqueKey) -> bool {
        matches!(self, RepoError::Duplicate(k) if k == key)
    }
}

/// Storage for recipe short links.
///
/// `insert_short_link` must reject a second row with the same `code` or the
/// same `recipe_id` with [`RepoError::Duplicate`], atomically with the write.
pub trait ShortLinkStore: Send + Sync {
    fn recipe_exists(&self, id: RecipeId) -> Result<bool, RepoError>;
    fn short_link_for_recipe(&self, recipe_id: RecipeId) -> Result<Option<ShortLink>, RepoError>;
    fn short_link_by_code(&self, code: &str) -> Result<Option<ShortLink>, RepoError>;
    fn insert_short_link(&self, link: &ShortLink) -> Result<(), RepoError>;
    fn count_short_links(&self) -> Result<u64, RepoError>;
}

/// Everything else the backend persists: users, the catalog, recipes, the
/// per-user recipe lists and subscriptions.
pub trait RecipeStore: Send + Sync {
    fn user(&self, id: UserId) -> Result<Option<User>, RepoError>;
    fn user_by_token(&self, token: &str) -> Result<Option<User>, RepoError>;
    /// Sorted by username.
    fn users(&self) -> Result<Vec<User>, RepoError>;

    fn ingredient(&self, id: IngredientId) -> Result<Option<Ingredient>, RepoError>;
    /// Sorted by name; `name_prefix` matches case-insensitively.
    fn ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, RepoError>;
    fn tag(&self, id: TagId) -> Result<Option<Tag>, RepoError>;
    fn tags(&self) -> Result<Vec<Tag>, RepoError>;

    fn recipe(&self, id: RecipeId) -> Result<Option<Recipe>, RepoError>;
    /// Newest first.
    fn recipes(&self) -> Result<Vec<Recipe>, RepoError>;
    fn insert_recipe(&self, recipe: NewRecipe) -> Result<Recipe, RepoError>;
    /// Replaces the stored recipe with the same id; `false` if there is none.
    fn update_recipe(&self, recipe: &Recipe) -> Result<bool, RepoError>;
    /// Removes the recipe together with its short link and list entries.
    fn delete_recipe(&self, id: RecipeId) -> Result<bool, RepoError>;
    fn count_recipes_by(&self, author_id: UserId) -> Result<u64, RepoError>;

    fn add_to_list(&self, list: RecipeList, user_id: UserId, recipe_id: RecipeId)
        -> Result<(), RepoError>;
    fn remove_from_list(
        &self,
        list: RecipeList,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> Result<bool, RepoError>;
    fn is_in_list(&self, list: RecipeList, user_id: UserId, recipe_id: RecipeId)
        -> Result<bool, RepoError>;
    /// Joined rows: cart entries -> recipes -> recipe ingredients -> ingredients.
    fn cart_ingredients(&self, user_id: UserId) -> Result<Vec<CartIngredient>, RepoError>;

    fn subscribe(&self, user_id: UserId, author_id: UserId) -> Result<(), RepoError>;
    fn unsubscribe(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError>;
    fn is_subscribed(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError>;
    /// Authors the user follows, sorted by username.
    fn subscriptions(&self, user_id: UserId) -> Result<Vec<User>, RepoError>;
}

pub trait Repository: RecipeStore + ShortLinkStore {}

impl<T: RecipeStore + ShortLinkStore> Repository for T {}
