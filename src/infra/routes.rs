use super::auth::{CurrentUser, Viewer};
use crate::domain::recipes::{self, CreateRecipe};
use crate::domain::shopping_list::{self, FILE_NAME};
use crate::domain::{lists, short_url, subscriptions, users, ShortCodeAllocator};
use crate::error::ApiError;
use crate::models::{
    AuthorView, Ingredient, IngredientId, RecipeId, RecipeList, RecipeSummary, RecipeView,
    SubscriptionView, Tag, TagId, UserId,
};
use crate::state::AppState;
use rocket::http::{Header, Status};
use rocket::response::{status, Redirect};
use rocket::serde::json::{json, Json, Value};
use rocket::{Catcher, Request, Route, State};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ShortLinkResponse {
    #[serde(rename = "short-link")]
    pub short_link: String,
}

#[derive(Responder)]
#[response(content_type = "plain")]
pub struct ShoppingListFile {
    body: String,
    disposition: Header<'static>,
}

#[get("/recipes")]
pub fn get_recipes(
    state: &State<AppState>,
    viewer: Viewer,
) -> Result<Json<Vec<RecipeView>>, ApiError> {
    recipes::list(state.repo(), viewer.user()).map(Json)
}

#[get("/recipes/<id>")]
pub fn get_recipe(
    state: &State<AppState>,
    id: RecipeId,
    viewer: Viewer,
) -> Result<Json<RecipeView>, ApiError> {
    recipes::view(state.repo(), id, viewer.user()).map(Json)
}

#[post("/recipes", data = "<payload>")]
pub fn create_recipe(
    state: &State<AppState>,
    user: CurrentUser,
    payload: Json<CreateRecipe>,
) -> Result<status::Created<Json<RecipeView>>, ApiError> {
    let view = recipes::create(state.repo(), &user.0, payload.into_inner())?;
    Ok(status::Created::new(format!("/api/recipes/{}", view.id)).body(Json(view)))
}

#[patch("/recipes/<id>", data = "<payload>")]
pub fn update_recipe(
    state: &State<AppState>,
    user: CurrentUser,
    id: RecipeId,
    payload: Json<CreateRecipe>,
) -> Result<Json<RecipeView>, ApiError> {
    recipes::update(state.repo(), &user.0, id, payload.into_inner()).map(Json)
}

#[delete("/recipes/<id>")]
pub fn delete_recipe(
    state: &State<AppState>,
    user: CurrentUser,
    id: RecipeId,
) -> Result<Status, ApiError> {
    recipes::delete(state.repo(), &user.0, id)?;
    Ok(Status::NoContent)
}

#[get("/recipes/<id>/get-link")]
pub fn get_link(state: &State<AppState>, id: RecipeId) -> Result<Json<ShortLinkResponse>, ApiError> {
    let link = ShortCodeAllocator::new(state.repo()).get_or_create(id, &mut rand::thread_rng())?;
    Ok(Json(ShortLinkResponse {
        short_link: short_url(&state.public_url, &link.code),
    }))
}

#[get("/s/<code>")]
pub fn follow_short_link(state: &State<AppState>, code: &str) -> Result<Redirect, ApiError> {
    let recipe_id = ShortCodeAllocator::new(state.repo()).resolve(code)?;
    let base = state.public_url.trim_end_matches('/');
    Ok(Redirect::to(format!("{}/recipes/{}", base, recipe_id)))
}

fn add_to(
    state: &AppState,
    list: RecipeList,
    user: &CurrentUser,
    id: RecipeId,
) -> Result<status::Created<Json<RecipeSummary>>, ApiError> {
    let summary = lists::add(state.repo(), list, user.0.id, id)?;
    Ok(status::Created::new(format!("/api/recipes/{}", id)).body(Json(summary)))
}

fn remove_from(
    state: &AppState,
    list: RecipeList,
    user: &CurrentUser,
    id: RecipeId,
) -> Result<Status, ApiError> {
    lists::remove(state.repo(), list, user.0.id, id)?;
    Ok(Status::NoContent)
}

#[post("/recipes/<id>/shopping_cart")]
pub fn add_to_cart(
    state: &State<AppState>,
    user: CurrentUser,
    id: RecipeId,
) -> Result<status::Created<Json<RecipeSummary>>, ApiError> {
    add_to(state, RecipeList::ShoppingCart, &user, id)
}

#[delete("/recipes/<id>/shopping_cart")]
pub fn remove_from_cart(
    state: &State<AppState>,
    user: CurrentUser,
    id: RecipeId,
) -> Result<Status, ApiError> {
    remove_from(state, RecipeList::ShoppingCart, &user, id)
}

#[post("/recipes/<id>/favorite")]
pub fn add_favorite(
    state: &State<AppState>,
    user: CurrentUser,
    id: RecipeId,
) -> Result<status::Created<Json<RecipeSummary>>, ApiError> {
    add_to(state, RecipeList::Favorites, &user, id)
}

#[delete("/recipes/<id>/favorite")]
pub fn remove_favorite(
    state: &State<AppState>,
    user: CurrentUser,
    id: RecipeId,
) -> Result<Status, ApiError> {
    remove_from(state, RecipeList::Favorites, &user, id)
}

#[get("/recipes/download_shopping_cart")]
pub fn download_shopping_cart(
    state: &State<AppState>,
    user: CurrentUser,
) -> Result<ShoppingListFile, ApiError> {
    let lines = shopping_list::build_shopping_list(state.repo(), user.0.id)?;
    Ok(ShoppingListFile {
        body: shopping_list::render(&lines),
        disposition: Header::new(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", FILE_NAME),
        ),
    })
}

#[get("/ingredients?<name>")]
pub fn get_ingredients(
    state: &State<AppState>,
    name: Option<&str>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    let prefix = name.filter(|n| !n.is_empty());
    Ok(Json(state.repo().ingredients(prefix)?))
}

#[get("/ingredients/<id>")]
pub fn get_ingredient(
    state: &State<AppState>,
    id: IngredientId,
) -> Result<Json<Ingredient>, ApiError> {
    match state.repo().ingredient(id)? {
        Some(ingredient) => Ok(Json(ingredient)),
        None => Err(ApiError::NotFound(format!("ingredient {}", id))),
    }
}

#[get("/tags")]
pub fn get_tags(state: &State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.repo().tags()?))
}

#[get("/tags/<id>")]
pub fn get_tag(state: &State<AppState>, id: TagId) -> Result<Json<Tag>, ApiError> {
    match state.repo().tag(id)? {
        Some(tag) => Ok(Json(tag)),
        None => Err(ApiError::NotFound(format!("tag {}", id))),
    }
}

#[get("/users")]
pub fn get_users(
    state: &State<AppState>,
    viewer: Viewer,
) -> Result<Json<Vec<AuthorView>>, ApiError> {
    users::list(state.repo(), viewer.user()).map(Json)
}

#[get("/users/me")]
pub fn get_me(state: &State<AppState>, user: CurrentUser) -> Result<Json<AuthorView>, ApiError> {
    users::profile(state.repo(), user.0.id, Some(&user.0)).map(Json)
}

#[get("/users/<id>")]
pub fn get_user(
    state: &State<AppState>,
    viewer: Viewer,
    id: UserId,
) -> Result<Json<AuthorView>, ApiError> {
    users::profile(state.repo(), id, viewer.user()).map(Json)
}

#[post("/users/<id>/subscribe")]
pub fn subscribe(
    state: &State<AppState>,
    user: CurrentUser,
    id: UserId,
) -> Result<status::Created<Json<SubscriptionView>>, ApiError> {
    let view = subscriptions::subscribe(state.repo(), &user.0, id)?;
    Ok(status::Created::new(format!("/api/users/{}", id)).body(Json(view)))
}

#[delete("/users/<id>/subscribe")]
pub fn unsubscribe(
    state: &State<AppState>,
    user: CurrentUser,
    id: UserId,
) -> Result<Status, ApiError> {
    subscriptions::unsubscribe(state.repo(), &user.0, id)?;
    Ok(Status::NoContent)
}

#[get("/users/subscriptions")]
pub fn get_subscriptions(
    state: &State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<SubscriptionView>>, ApiError> {
    subscriptions::subscriptions(state.repo(), &user.0).map(Json)
}

#[catch(401)]
fn unauthorized() -> Json<Value> {
    Json(json!({ "detail": ApiError::Unauthenticated.to_string() }))
}

#[catch(404)]
fn not_found(request: &Request) -> Json<Value> {
    Json(json!({ "detail": format!("{} not found", request.uri().path()) }))
}

#[catch(422)]
fn unprocessable() -> Json<Value> {
    Json(json!({ "detail": "malformed request body" }))
}

#[catch(500)]
fn internal_error() -> Json<Value> {
    Json(json!({ "detail": "internal server error" }))
}

pub fn api_routes() -> Vec<Route> {
    routes![
        get_recipes,
        get_recipe,
        create_recipe,
        update_recipe,
        delete_recipe,
        get_link,
        add_to_cart,
        remove_from_cart,
        add_favorite,
        remove_favorite,
        download_shopping_cart,
        get_ingredients,
        get_ingredient,
        get_tags,
        get_tag,
        get_users,
        get_me,
        get_user,
        subscribe,
        unsubscribe,
        get_subscriptions,
    ]
}

pub fn short_link_routes() -> Vec<Route> {
    routes![follow_short_link]
}

pub fn json_catchers() -> Vec<Catcher> {
    catchers![unauthorized, not_found, unprocessable, internal_error]
}
