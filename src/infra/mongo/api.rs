use super::types::{
    IngredientDoc, ListEntryDoc, RecipeDoc, ShortLinkDoc, SubscriptionDoc, TagDoc, TokenDoc,
    UserDoc,
};
use crate::infra::repo::{RecipeStore, RepoError, ShortLinkStore, UniqueKey};
use crate::models::{
    CartIngredient, Ingredient, IngredientId, NewRecipe, Recipe, RecipeId, RecipeList, ShortLink,
    Tag, TagId, User, UserId,
};
use mongodb::{
    bson::{doc, Document},
    error::{Error as mongoError, ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    sync::{Client, Collection},
    IndexModel,
};
use serde::Serialize;
use tracing::{debug, info};

const DUPLICATE_KEY: i32 = 11000;

const SHORT_LINK_CODE_INDEX: &str = "short_link_code";
const SHORT_LINK_RECIPE_INDEX: &str = "short_link_recipe";
const SHOPPING_CART_INDEX: &str = "shopping_cart_entry";
const FAVORITE_INDEX: &str = "favorite_entry";
const SUBSCRIPTION_INDEX: &str = "subscription_entry";

pub struct MongoRep {
    pub users: Collection<UserDoc>,
    pub tokens: Collection<TokenDoc>,
    pub ingredients: Collection<IngredientDoc>,
    pub tags: Collection<TagDoc>,
    pub recipes: Collection<RecipeDoc>,
    pub short_links: Collection<ShortLinkDoc>,
    pub shopping_cart: Collection<ListEntryDoc>,
    pub favorites: Collection<ListEntryDoc>,
    pub subscriptions: Collection<SubscriptionDoc>,
    counters: Collection<Document>,
}

impl MongoRep {
    pub fn init(uri: &str, database: &str) -> Result<Self, RepoError> {
        let client = Client::with_uri_str(uri)?;
        let database = client.database(database);
        let rep = MongoRep {
            users: database.collection("users"),
            tokens: database.collection("tokens"),
            ingredients: database.collection("ingredients"),
            tags: database.collection("tags"),
            recipes: database.collection("recipes"),
            short_links: database.collection("short_links"),
            shopping_cart: database.collection("shopping_cart"),
            favorites: database.collection("favorites"),
            subscriptions: database.collection("subscriptions"),
            counters: database.collection("counters"),
        };
        rep.ensure_indexes()?;
        info!(database = %database.name(), "connected to mongo");
        Ok(rep)
    }

    /// Every uniqueness rule of the service lives in these indexes.
    fn ensure_indexes(&self) -> Result<(), RepoError> {
        self.short_links
            .create_index(unique_index(doc! {"code": 1}, SHORT_LINK_CODE_INDEX), None)?;
        self.short_links
            .create_index(unique_index(doc! {"recipe_id": 1}, SHORT_LINK_RECIPE_INDEX), None)?;
        self.shopping_cart.create_index(
            unique_index(doc! {"user_id": 1, "recipe_id": 1}, SHOPPING_CART_INDEX),
            None,
        )?;
        self.favorites.create_index(
            unique_index(doc! {"user_id": 1, "recipe_id": 1}, FAVORITE_INDEX),
            None,
        )?;
        self.subscriptions.create_index(
            unique_index(doc! {"user_id": 1, "author_id": 1}, SUBSCRIPTION_INDEX),
            None,
        )?;
        self.ingredients.create_index(
            unique_index(doc! {"name": 1, "measurement_unit": 1}, "ingredient_name_unit"),
            None,
        )?;
        self.tags
            .create_index(unique_index(doc! {"slug": 1}, "tag_slug"), None)?;
        self.recipes.create_index(
            IndexModel::builder().keys(doc! {"author_id": 1}).build(),
            None,
        )?;
        debug!("indexes in place");
        Ok(())
    }

    fn list(&self, list: RecipeList) -> &Collection<ListEntryDoc> {
        match list {
            RecipeList::ShoppingCart => &self.shopping_cart,
            RecipeList::Favorites => &self.favorites,
        }
    }

    fn next_id(&self, name: &str) -> Result<i64, RepoError> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let counter = self
            .counters
            .find_one_and_update(doc! {"_id": name}, doc! {"$inc": {"seq": 1i64}}, options)?
            .ok_or_else(|| RepoError::MissingCounter(name.to_string()))?;
        counter
            .get_i64("seq")
            .map_err(|_| RepoError::MissingCounter(name.to_string()))
    }
}

fn unique_index(keys: Document, name: &str) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(true)
                .name(name.to_string())
                .build(),
        )
        .build()
}

fn duplicate_key_message(err: &mongoError) -> Option<&str> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY => {
            Some(e.message.as_str())
        }
        _ => None,
    }
}

/// Maps a server "E11000 ... index: <name> dup key" message to the rule it broke.
fn unique_key(message: &str) -> UniqueKey {
    let known = [
        (SHORT_LINK_CODE_INDEX, UniqueKey::ShortLinkCode),
        (SHORT_LINK_RECIPE_INDEX, UniqueKey::ShortLinkRecipe),
        (SHOPPING_CART_INDEX, UniqueKey::ListEntry(RecipeList::ShoppingCart)),
        (FAVORITE_INDEX, UniqueKey::ListEntry(RecipeList::Favorites)),
        (SUBSCRIPTION_INDEX, UniqueKey::Subscription),
    ];
    known
        .into_iter()
        .find(|(index, _)| message.contains(index))
        .map(|(_, key)| key)
        .unwrap_or_else(|| UniqueKey::Other(message.to_string()))
}

fn insert<T: Serialize>(collection: &Collection<T>, value: &T) -> Result<(), RepoError> {
    match collection.insert_one(value, None) {
        Ok(_) => Ok(()),
        Err(e) => match duplicate_key_message(&e) {
            Some(message) => Err(RepoError::Duplicate(unique_key(message))),
            None => Err(RepoError::from(e)),
        },
    }
}

/// Escapes a user supplied prefix for use inside a `$regex`.
fn regex_prefix(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + 1);
    out.push('^');
    for c in prefix.chars() {
        if "\\.^$|?*+()[]{}".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl ShortLinkStore for MongoRep {
    fn recipe_exists(&self, id: RecipeId) -> Result<bool, RepoError> {
        Ok(self.recipes.count_documents(doc! {"_id": id}, None)? > 0)
    }

    fn short_link_for_recipe(&self, recipe_id: RecipeId) -> Result<Option<ShortLink>, RepoError> {
        Ok(self
            .short_links
            .find_one(doc! {"recipe_id": recipe_id}, None)?
            .map(ShortLink::from))
    }

    fn short_link_by_code(&self, code: &str) -> Result<Option<ShortLink>, RepoError> {
        Ok(self
            .short_links
            .find_one(doc! {"code": code}, None)?
            .map(ShortLink::from))
    }

    fn insert_short_link(&self, link: &ShortLink) -> Result<(), RepoError> {
        insert(&self.short_links, &ShortLinkDoc::from(link))
    }

    fn count_short_links(&self) -> Result<u64, RepoError> {
        Ok(self.short_links.count_documents(doc! {}, None)?)
    }
}

impl RecipeStore for MongoRep {
    fn user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        Ok(self.users.find_one(doc! {"_id": id}, None)?.map(User::from))
    }

    fn user_by_token(&self, token: &str) -> Result<Option<User>, RepoError> {
        match self.tokens.find_one(doc! {"_id": token}, None)? {
            Some(token) => self.user(token.user_id),
            None => Ok(None),
        }
    }

    fn users(&self) -> Result<Vec<User>, RepoError> {
        let options = FindOptions::builder().sort(doc! {"username": 1}).build();
        let cursor = self.users.find(None, options)?;
        let docs = cursor.collect::<Result<Vec<UserDoc>, mongoError>>()?;
        Ok(docs.into_iter().map(User::from).collect())
    }

    fn ingredient(&self, id: IngredientId) -> Result<Option<Ingredient>, RepoError> {
        Ok(self
            .ingredients
            .find_one(doc! {"_id": id}, None)?
            .map(Ingredient::from))
    }

    fn ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, RepoError> {
        let filter = name_prefix
            .map(|p| doc! {"name": {"$regex": regex_prefix(p), "$options": "i"}});
        let options = FindOptions::builder().sort(doc! {"name": 1}).build();
        let cursor = self.ingredients.find(filter, options)?;
        let docs = cursor.collect::<Result<Vec<IngredientDoc>, mongoError>>()?;
        Ok(docs.into_iter().map(Ingredient::from).collect())
    }

    fn tag(&self, id: TagId) -> Result<Option<Tag>, RepoError> {
        Ok(self.tags.find_one(doc! {"_id": id}, None)?.map(Tag::from))
    }

    fn tags(&self) -> Result<Vec<Tag>, RepoError> {
        let options = FindOptions::builder().sort(doc! {"_id": 1}).build();
        let cursor = self.tags.find(None, options)?;
        let docs = cursor.collect::<Result<Vec<TagDoc>, mongoError>>()?;
        Ok(docs.into_iter().map(Tag::from).collect())
    }

    fn recipe(&self, id: RecipeId) -> Result<Option<Recipe>, RepoError> {
        Ok(self
            .recipes
            .find_one(doc! {"_id": id}, None)?
            .map(Recipe::from))
    }

    fn recipes(&self) -> Result<Vec<Recipe>, RepoError> {
        let options = FindOptions::builder().sort(doc! {"_id": -1}).build();
        let cursor = self.recipes.find(None, options)?;
        let docs = cursor.collect::<Result<Vec<RecipeDoc>, mongoError>>()?;
        Ok(docs.into_iter().map(Recipe::from).collect())
    }

    fn insert_recipe(&self, recipe: NewRecipe) -> Result<Recipe, RepoError> {
        let recipe = recipe.with_id(self.next_id("recipes")?);
        insert(&self.recipes, &RecipeDoc::from(&recipe))?;
        Ok(recipe)
    }

    fn update_recipe(&self, recipe: &Recipe) -> Result<bool, RepoError> {
        let result = self
            .recipes
            .replace_one(doc! {"_id": recipe.id}, RecipeDoc::from(recipe), None)?;
        Ok(result.matched_count > 0)
    }

    fn delete_recipe(&self, id: RecipeId) -> Result<bool, RepoError> {
        if self.recipes.delete_one(doc! {"_id": id}, None)?.deleted_count == 0 {
            return Ok(false);
        }
        let dependants = doc! {"recipe_id": id};
        self.short_links.delete_many(dependants.clone(), None)?;
        self.shopping_cart.delete_many(dependants.clone(), None)?;
        self.favorites.delete_many(dependants, None)?;
        Ok(true)
    }

    fn count_recipes_by(&self, author_id: UserId) -> Result<u64, RepoError> {
        Ok(self
            .recipes
            .count_documents(doc! {"author_id": author_id}, None)?)
    }

    fn add_to_list(
        &self,
        list: RecipeList,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> Result<(), RepoError> {
        insert(self.list(list), &ListEntryDoc { user_id, recipe_id })
    }

    fn remove_from_list(
        &self,
        list: RecipeList,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> Result<bool, RepoError> {
        let result = self
            .list(list)
            .delete_one(doc! {"user_id": user_id, "recipe_id": recipe_id}, None)?;
        Ok(result.deleted_count > 0)
    }

    fn is_in_list(
        &self,
        list: RecipeList,
        user_id: UserId,
        recipe_id: RecipeId,
    ) -> Result<bool, RepoError> {
        let count = self
            .list(list)
            .count_documents(doc! {"user_id": user_id, "recipe_id": recipe_id}, None)?;
        Ok(count > 0)
    }

    fn cart_ingredients(&self, user_id: UserId) -> Result<Vec<CartIngredient>, RepoError> {
        let pipeline = vec![
            doc! {"$match": {"user_id": user_id}},
            doc! {"$lookup": {
                "from": "recipes",
                "localField": "recipe_id",
                "foreignField": "_id",
                "as": "recipe",
            }},
            doc! {"$unwind": "$recipe"},
            doc! {"$unwind": "$recipe.ingredients"},
            doc! {"$lookup": {
                "from": "ingredients",
                "localField": "recipe.ingredients.ingredient_id",
                "foreignField": "_id",
                "as": "ingredient",
            }},
            doc! {"$unwind": "$ingredient"},
            doc! {"$project": {
                "_id": 0,
                "name": "$ingredient.name",
                "measurement_unit": "$ingredient.measurement_unit",
                "amount": "$recipe.ingredients.amount",
            }},
        ];
        let cursor = self.shopping_cart.aggregate(pipeline, None)?;
        let mut rows = Vec::new();
        for document in cursor {
            rows.push(mongodb::bson::from_document::<CartIngredient>(document?)?);
        }
        Ok(rows)
    }

    fn subscribe(&self, user_id: UserId, author_id: UserId) -> Result<(), RepoError> {
        insert(&self.subscriptions, &SubscriptionDoc { user_id, author_id })
    }

    fn unsubscribe(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        let result = self
            .subscriptions
            .delete_one(doc! {"user_id": user_id, "author_id": author_id}, None)?;
        Ok(result.deleted_count > 0)
    }

    fn is_subscribed(&self, user_id: UserId, author_id: UserId) -> Result<bool, RepoError> {
        let count = self
            .subscriptions
            .count_documents(doc! {"user_id": user_id, "author_id": author_id}, None)?;
        Ok(count > 0)
    }

    fn subscriptions(&self, user_id: UserId) -> Result<Vec<User>, RepoError> {
        let cursor = self.subscriptions.find(doc! {"user_id": user_id}, None)?;
        let authors = cursor
            .map(|s| s.map(|s| s.author_id))
            .collect::<Result<Vec<i64>, mongoError>>()?;
        let options = FindOptions::builder().sort(doc! {"username": 1}).build();
        let cursor = self.users.find(doc! {"_id": {"$in": authors}}, options)?;
        let docs = cursor.collect::<Result<Vec<UserDoc>, mongoError>>()?;
        Ok(docs.into_iter().map(User::from).collect())
    }
}
