//! Favorites, shopping cart and follows: toggled `(owner, target)` pairs.

use serde::Serialize;
use uuid::Uuid;

use crate::{
    actor::Actor,
    error::{Error, Result},
    models::{Membership, RecipeFilter, User},
    recipe::{self, RecipeCard},
    store::Store,
    users::UserView,
};

/// A followed author with a preview of their newest recipes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorView {
    #[serde(flatten)]
    pub user: UserView,
    pub recipes: Vec<RecipeCard>,
    pub recipes_count: i64,
}

async fn author_view(
    store: &dyn Store,
    author: &User,
    recipes_limit: Option<usize>,
) -> Result<AuthorView> {
    let recipes = store
        .list_recipes(&RecipeFilter {
            author: Some(author.user_id),
            limit: recipes_limit,
            ..RecipeFilter::default()
        })
        .await?;
    let recipes_count = store.count_recipes_by_author(author.user_id).await?;

    Ok(AuthorView {
        user: UserView::new(author, true),
        recipes: recipes.iter().map(RecipeCard::from).collect(),
        recipes_count,
    })
}

async fn remove(store: &dyn Store, kind: Membership, owner: Uuid, target: Uuid) -> Result<()> {
    if store.remove_membership(kind, owner, target).await? {
        tracing::debug!(%kind, %owner, %target, "removed");
        Ok(())
    } else {
        Err(Error::not_found(kind.label()))
    }
}

async fn add_recipe(
    store: &dyn Store,
    kind: Membership,
    actor: &Actor,
    recipe_id: Uuid,
) -> Result<RecipeCard> {
    let recipe = recipe::fetch(store, recipe_id).await?;
    store.add_membership(kind, actor.user_id(), recipe_id).await?;

    tracing::debug!(%kind, owner = %actor.user_id(), %recipe_id, "added");

    Ok(RecipeCard::from(&recipe))
}

#[tracing::instrument(skip(store, actor), fields(user = %actor.user_id()), err)]
pub async fn add_favorite(store: &dyn Store, actor: &Actor, recipe_id: Uuid) -> Result<RecipeCard> {
    add_recipe(store, Membership::Favorite, actor, recipe_id).await
}

#[tracing::instrument(skip(store, actor), fields(user = %actor.user_id()), err)]
pub async fn remove_favorite(store: &dyn Store, actor: &Actor, recipe_id: Uuid) -> Result<()> {
    remove(store, Membership::Favorite, actor.user_id(), recipe_id).await
}

#[tracing::instrument(skip(store, actor), fields(user = %actor.user_id()), err)]
pub async fn add_to_cart(store: &dyn Store, actor: &Actor, recipe_id: Uuid) -> Result<RecipeCard> {
    add_recipe(store, Membership::ShoppingCart, actor, recipe_id).await
}

#[tracing::instrument(skip(store, actor), fields(user = %actor.user_id()), err)]
pub async fn remove_from_cart(store: &dyn Store, actor: &Actor, recipe_id: Uuid) -> Result<()> {
    remove(store, Membership::ShoppingCart, actor.user_id(), recipe_id).await
}

/// Following yourself is rejected rather than stored.
#[tracing::instrument(skip(store, actor), fields(user = %actor.user_id()), err)]
pub async fn follow(
    store: &dyn Store,
    actor: &Actor,
    author_user_id: Uuid,
    recipes_limit: Option<usize>,
) -> Result<AuthorView> {
    if author_user_id == actor.user_id() {
        return Err(Error::validation("author", "you cannot subscribe to yourself"));
    }

    let author = store
        .get_user(author_user_id)
        .await?
        .ok_or_else(|| Error::not_found("author"))?;
    store
        .add_membership(Membership::Follow, actor.user_id(), author_user_id)
        .await?;

    author_view(store, &author, recipes_limit).await
}

#[tracing::instrument(skip(store, actor), fields(user = %actor.user_id()), err)]
pub async fn unfollow(store: &dyn Store, actor: &Actor, author_user_id: Uuid) -> Result<()> {
    remove(store, Membership::Follow, actor.user_id(), author_user_id).await
}

/// Authors the actor follows, oldest subscription first.
pub async fn subscriptions(
    store: &dyn Store,
    actor: &Actor,
    recipes_limit: Option<usize>,
) -> Result<Vec<AuthorView>> {
    let author_ids = store
        .membership_targets(Membership::Follow, actor.user_id())
        .await?;

    let mut authors = Vec::with_capacity(author_ids.len());
    for author_id in author_ids {
        // A follow outliving its author is skipped rather than failing the list.
        let Some(author) = store.get_user(author_id).await? else {
            continue;
        };
        authors.push(author_view(store, &author, recipes_limit).await?);
    }

    Ok(authors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Kitchen;

    #[tokio::test]
    async fn favorite_is_a_toggle_not_a_counter() {
        let kitchen = Kitchen::new().await;
        let recipe = kitchen.recipe(&[(kitchen.flour.ingredient_id, 1)]).await;
        let bob = kitchen.stranger();

        let card = add_favorite(&kitchen.store, &bob, recipe.id).await.unwrap();
        assert_eq!(card.id, recipe.id);
        assert_eq!(card.name, recipe.name);

        let err = add_favorite(&kitchen.store, &bob, recipe.id).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        remove_favorite(&kitchen.store, &bob, recipe.id).await.unwrap();
        add_favorite(&kitchen.store, &bob, recipe.id).await.unwrap();

        let view = recipe::read(&kitchen.store, recipe.id, Some(bob.user())).await.unwrap();
        assert!(view.is_favorited);
        assert!(!view.is_in_shopping_cart);
    }

    #[tokio::test]
    async fn removing_a_missing_pair_is_not_found() {
        let kitchen = Kitchen::new().await;
        let recipe = kitchen.recipe(&[(kitchen.flour.ingredient_id, 1)]).await;

        let err = remove_from_cart(&kitchen.store, &kitchen.stranger(), recipe.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = unfollow(&kitchen.store, &kitchen.stranger(), kitchen.alice.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn adding_an_unknown_recipe_is_not_found() {
        let kitchen = Kitchen::new().await;

        let err = add_to_cart(&kitchen.store, &kitchen.author(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn cannot_follow_yourself() {
        let kitchen = Kitchen::new().await;

        let err = follow(&kitchen.store, &kitchen.author(), kitchen.alice.user_id, None)
            .await
            .unwrap_err();

        assert_eq!(err.field(), Some("author"));
    }

    #[tokio::test]
    async fn follow_returns_a_limited_preview_and_full_count() {
        let kitchen = Kitchen::new().await;
        kitchen.recipe(&[(kitchen.flour.ingredient_id, 1)]).await;
        let newest = kitchen.recipe(&[(kitchen.sugar.ingredient_id, 1)]).await;

        let author = follow(&kitchen.store, &kitchen.stranger(), kitchen.alice.user_id, Some(1))
            .await
            .unwrap();

        assert!(author.user.is_subscribed);
        assert_eq!(author.recipes_count, 2);
        assert_eq!(author.recipes.len(), 1);
        assert_eq!(author.recipes[0].id, newest.id);

        let err = follow(&kitchen.store, &kitchen.stranger(), kitchen.alice.user_id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn subscriptions_list_followed_authors() {
        let kitchen = Kitchen::new().await;
        let bob = kitchen.stranger();
        follow(&kitchen.store, &bob, kitchen.alice.user_id, None).await.unwrap();
        follow(&kitchen.store, &bob, kitchen.boss.user_id, None).await.unwrap();

        let authors = subscriptions(&kitchen.store, &bob, None).await.unwrap();
        let ids: Vec<Uuid> = authors.iter().map(|a| a.user.id).collect();
        assert_eq!(ids, vec![kitchen.alice.user_id, kitchen.boss.user_id]);

        unfollow(&kitchen.store, &bob, kitchen.alice.user_id).await.unwrap();
        let authors = subscriptions(&kitchen.store, &bob, None).await.unwrap();
        assert_eq!(authors.len(), 1);
    }
}
