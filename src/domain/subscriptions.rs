use crate::error::ApiError;
use crate::infra::{RecipeStore, RepoError, UniqueKey};
use crate::models::{AuthorView, SubscriptionView, User, UserId};

fn summary<S: RecipeStore + ?Sized>(store: &S, author: &User) -> Result<SubscriptionView, ApiError> {
    Ok(SubscriptionView {
        author: AuthorView::new(author, true),
        recipes_count: store.count_recipes_by(author.id)?,
    })
}

pub fn subscribe<S: RecipeStore + ?Sized>(
    store: &S,
    user: &User,
    author_id: UserId,
) -> Result<SubscriptionView, ApiError> {
    let author = store
        .user(author_id)?
        .ok_or_else(|| ApiError::NotFound(format!("user {}", author_id)))?;
    if author.id == user.id {
        return Err(ApiError::BadRequest("you cannot subscribe to yourself".into()));
    }
    match store.subscribe(user.id, author.id) {
        Ok(()) => summary(store, &author),
        Err(RepoError::Duplicate(UniqueKey::Subscription)) => Err(ApiError::BadRequest(
            "you are already subscribed to this author".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

pub fn unsubscribe<S: RecipeStore + ?Sized>(
    store: &S,
    user: &User,
    author_id: UserId,
) -> Result<(), ApiError> {
    if store.user(author_id)?.is_none() {
        return Err(ApiError::NotFound(format!("user {}", author_id)));
    }
    if store.unsubscribe(user.id, author_id)? {
        Ok(())
    } else {
        Err(ApiError::BadRequest(
            "you are not subscribed to this author".into(),
        ))
    }
}

pub fn subscriptions<S: RecipeStore + ?Sized>(
    store: &S,
    user: &User,
) -> Result<Vec<SubscriptionView>, ApiError> {
    store
        .subscriptions(user.id)?
        .iter()
        .map(|author| summary(store, author))
        .collect()
}
