use crate::error::ApiError;
use crate::infra::RecipeStore;
use crate::models::{AuthorView, User, UserId};

fn profile_of<S: RecipeStore + ?Sized>(
    store: &S,
    user: &User,
    viewer: Option<&User>,
) -> Result<AuthorView, ApiError> {
    let is_subscribed = match viewer {
        Some(viewer) => store.is_subscribed(viewer.id, user.id)?,
        None => false,
    };
    Ok(AuthorView::new(user, is_subscribed))
}

pub fn profile<S: RecipeStore + ?Sized>(
    store: &S,
    id: UserId,
    viewer: Option<&User>,
) -> Result<AuthorView, ApiError> {
    let user = store
        .user(id)?
        .ok_or_else(|| ApiError::NotFound(format!("user {}", id)))?;
    profile_of(store, &user, viewer)
}

/// Every user, sorted by username.
pub fn list<S: RecipeStore + ?Sized>(
    store: &S,
    viewer: Option<&User>,
) -> Result<Vec<AuthorView>, ApiError> {
    store
        .users()?
        .iter()
        .map(|user| profile_of(store, user, viewer))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::MemoryRep;

    fn user(id: i64, username: &str) -> User {
        User {
            id,
            email: format!("{}@example.com", username),
            username: username.into(),
            first_name: "F".into(),
            last_name: "L".into(),
            is_admin: false,
        }
    }

    #[test]
    fn test_profile_reports_subscription_for_viewer() {
        let rep = MemoryRep::new();
        rep.insert_user(user(1, "vera"), None);
        rep.insert_user(user(2, "anton"), None);
        rep.subscribe(1, 2).unwrap();

        assert!(profile(&rep, 2, Some(&user(1, "vera"))).unwrap().is_subscribed);
        assert!(!profile(&rep, 2, None).unwrap().is_subscribed);
        assert!(matches!(profile(&rep, 9, None), Err(ApiError::NotFound(_))));

        let names: Vec<_> = list(&rep, None).unwrap().into_iter().map(|u| u.username).collect();
        assert_eq!(names, vec!["anton", "vera"]);
    }
}
