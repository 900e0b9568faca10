use crate::models::{Ingredient, Recipe, RecipeIngredient, ShortLink, Tag, User};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct UserDoc {
    #[serde(rename = "_id")]
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Auth token issued outside this service.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenDoc {
    #[serde(rename = "_id")]
    pub key: String,
    pub user_id: i64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IngredientDoc {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TagDoc {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RecipeIngredientDoc {
    pub ingredient_id: i64,
    pub amount: u32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RecipeDoc {
    #[serde(rename = "_id")]
    pub id: i64,
    pub author_id: i64,
    pub name: String,
    #[serde(default)]
    pub text: String,
    pub cooking_time: u32,
    #[serde(default)]
    pub tags: Vec<i64>,
    pub ingredients: Vec<RecipeIngredientDoc>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ShortLinkDoc {
    pub recipe_id: i64,
    pub code: String,
}

/// Row of `shopping_cart` or `favorites`.
#[derive(Debug, Deserialize, Serialize)]
pub struct ListEntryDoc {
    pub user_id: i64,
    pub recipe_id: i64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SubscriptionDoc {
    pub user_id: i64,
    pub author_id: i64,
}

impl From<UserDoc> for User {
    fn from(d: UserDoc) -> Self {
        User {
            id: d.id,
            email: d.email,
            username: d.username,
            first_name: d.first_name,
            last_name: d.last_name,
            is_admin: d.is_admin,
        }
    }
}

impl From<IngredientDoc> for Ingredient {
    fn from(d: IngredientDoc) -> Self {
        Ingredient {
            id: d.id,
            name: d.name,
            measurement_unit: d.measurement_unit,
        }
    }
}

impl From<TagDoc> for Tag {
    fn from(d: TagDoc) -> Self {
        Tag {
            id: d.id,
            name: d.name,
            slug: d.slug,
        }
    }
}

impl From<RecipeDoc> for Recipe {
    fn from(d: RecipeDoc) -> Self {
        Recipe {
            id: d.id,
            author_id: d.author_id,
            name: d.name,
            text: d.text,
            cooking_time: d.cooking_time,
            tags: d.tags,
            ingredients: d
                .ingredients
                .into_iter()
                .map(|i| RecipeIngredient {
                    id: i.ingredient_id,
                    amount: i.amount,
                })
                .collect(),
        }
    }
}

impl From<&Recipe> for RecipeDoc {
    fn from(r: &Recipe) -> Self {
        RecipeDoc {
            id: r.id,
            author_id: r.author_id,
            name: r.name.clone(),
            text: r.text.clone(),
            cooking_time: r.cooking_time,
            tags: r.tags.clone(),
            ingredients: r
                .ingredients
                .iter()
                .map(|i| RecipeIngredientDoc {
                    ingredient_id: i.id,
                    amount: i.amount,
                })
                .collect(),
        }
    }
}

impl From<ShortLinkDoc> for ShortLink {
    fn from(d: ShortLinkDoc) -> Self {
        ShortLink {
            recipe_id: d.recipe_id,
            code: d.code,
        }
    }
}

impl From<&ShortLink> for ShortLinkDoc {
    fn from(l: &ShortLink) -> Self {
        ShortLinkDoc {
            recipe_id: l.recipe_id,
            code: l.code.clone(),
        }
    }
}
