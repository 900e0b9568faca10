use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type RecipeId = i64;
pub type IngredientId = i64;
pub type TagId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RecipeIngredient {
    pub id: IngredientId,
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub id: RecipeId,
    pub author_id: UserId,
    pub name: String,
    pub text: String,
    pub cooking_time: u32,
    pub tags: Vec<TagId>,
    pub ingredients: Vec<RecipeIngredient>,
}

/// A recipe that passed validation but has no id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub author_id: UserId,
    pub name: String,
    pub text: String,
    pub cooking_time: u32,
    pub tags: Vec<TagId>,
    pub ingredients: Vec<RecipeIngredient>,
}

impl NewRecipe {
    pub fn with_id(self, id: RecipeId) -> Recipe {
        Recipe {
            id,
            author_id: self.author_id,
            name: self.name,
            text: self.text,
            cooking_time: self.cooking_time,
            tags: self.tags,
            ingredients: self.ingredients,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ShortLink {
    pub recipe_id: RecipeId,
    pub code: String,
}

/// One ingredient requirement of one recipe in a user's cart, before grouping.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CartIngredient {
    pub name: String,
    pub measurement_unit: String,
    pub amount: u32,
}

/// Per-user recipe collections sharing the same `(user, recipe)` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecipeList {
    ShoppingCart,
    Favorites,
}

impl RecipeList {
    pub fn label(self) -> &'static str {
        match self {
            RecipeList::ShoppingCart => "shopping cart",
            RecipeList::Favorites => "favorites",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: RecipeId,
    pub name: String,
    pub cooking_time: u32,
}

impl From<&Recipe> for RecipeSummary {
    fn from(recipe: &Recipe) -> Self {
        RecipeSummary {
            id: recipe.id,
            name: recipe.name.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorView {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl AuthorView {
    pub fn new(user: &User, is_subscribed: bool) -> Self {
        AuthorView {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_subscribed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: AuthorView,
    pub recipes_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientAmountView {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeView {
    pub id: RecipeId,
    pub tags: Vec<Tag>,
    pub author: AuthorView,
    pub ingredients: Vec<IngredientAmountView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub text: String,
    pub cooking_time: u32,
}
