use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    models::{Membership, NewUser, User},
    store::Store,
};

const MAX_NAME_LEN: usize = 150;
const RESERVED_USERNAME: &str = "me";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub email: String,
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserView {
    pub fn new(user: &User, is_subscribed: bool) -> Self {
        Self {
            email: user.email.clone(),
            id: user.user_id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_subscribed,
        }
    }
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        let (local, domain) = self
            .email
            .split_once('@')
            .ok_or_else(|| Error::validation("email", "enter a valid email address"))?;
        if local.is_empty()
            || !domain.contains('.')
            || domain.contains('@')
            || self.email.len() > 254
        {
            return Err(Error::validation("email", "enter a valid email address"));
        }

        if self.username.is_empty() || self.username.chars().count() > MAX_NAME_LEN {
            return Err(Error::validation(
                "username",
                "username must be between 1 and 150 characters",
            ));
        }
        if !self
            .username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
        {
            return Err(Error::validation(
                "username",
                "username may only contain letters, digits and @/./+/-/_",
            ));
        }
        if self.username.eq_ignore_ascii_case(RESERVED_USERNAME) {
            return Err(Error::validation("username", "the username \"me\" is not allowed"));
        }

        for (field, value) in [("first_name", &self.first_name), ("last_name", &self.last_name)] {
            if value.trim().is_empty() || value.chars().count() > MAX_NAME_LEN {
                return Err(Error::validation(
                    field,
                    "must be between 1 and 150 characters",
                ));
            }
        }

        Ok(())
    }
}

/// Creates a user and issues their first API token.
#[tracing::instrument(skip(store), err)]
pub async fn register(store: &dyn Store, new_user: NewUser) -> Result<(User, String)> {
    new_user.validate()?;

    let user = store.create_user(new_user).await?;
    let token = store.issue_token(user.user_id).await?;

    tracing::info!(user_id = %user.user_id, "registered user");

    Ok((user, token))
}

pub(crate) async fn is_subscribed(
    store: &dyn Store,
    viewer: Option<&User>,
    author_user_id: Uuid,
) -> Result<bool> {
    match viewer {
        Some(viewer) => {
            store
                .has_membership(Membership::Follow, viewer.user_id, author_user_id)
                .await
        }
        None => Ok(false),
    }
}

pub async fn profile(store: &dyn Store, user: &User, viewer: Option<&User>) -> Result<UserView> {
    let subscribed = is_subscribed(store, viewer, user.user_id).await?;

    Ok(UserView::new(user, subscribed))
}

pub async fn get(store: &dyn Store, user_id: Uuid, viewer: Option<&User>) -> Result<UserView> {
    let user = store
        .get_user(user_id)
        .await?
        .ok_or_else(|| Error::not_found("user"))?;

    profile(store, &user, viewer).await
}

pub async fn list(store: &dyn Store, viewer: Option<&User>) -> Result<Vec<UserView>> {
    let users = store.list_users().await?;

    let mut views = Vec::with_capacity(users.len());
    for user in &users {
        views.push(profile(store, user, viewer).await?);
    }

    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            is_staff: false,
        }
    }

    #[test]
    fn me_is_a_reserved_username() {
        let err = new_user("Me").validate().unwrap_err();
        assert_eq!(err.field(), Some("username"));
    }

    #[test]
    fn rejects_bad_email_and_username_characters() {
        let mut user = new_user("chef");
        user.email = "chef.example.com".to_string();
        assert_eq!(user.validate().unwrap_err().field(), Some("email"));

        let user = new_user("chef with spaces");
        assert_eq!(user.validate().unwrap_err().field(), Some("username"));
    }

    #[tokio::test]
    async fn register_issues_a_token_that_resolves_to_the_user() {
        let store = MemoryStore::new();

        let (user, token) = register(&store, new_user("chef")).await.unwrap();

        let found = store.user_by_token(&token).await.unwrap().unwrap();
        assert_eq!(found, user);
        assert!(store.user_by_token("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let store = MemoryStore::new();
        register(&store, new_user("chef")).await.unwrap();

        let mut again = new_user("chef");
        again.email = "other@example.com".to_string();
        let err = register(&store, again).await.unwrap_err();

        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn is_subscribed_is_false_for_anonymous_viewers() {
        let store = MemoryStore::new();
        let (author, _) = register(&store, new_user("author")).await.unwrap();
        let (fan, _) = register(&store, new_user("fan")).await.unwrap();
        store
            .add_membership(Membership::Follow, fan.user_id, author.user_id)
            .await
            .unwrap();

        let view = get(&store, author.user_id, None).await.unwrap();
        assert!(!view.is_subscribed);

        let view = get(&store, author.user_id, Some(&fan)).await.unwrap();
        assert!(view.is_subscribed);
    }
}
