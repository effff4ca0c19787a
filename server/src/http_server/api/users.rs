use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use pantry::{
    membership::{self, AuthorView},
    users::{self, UserView},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    http_server::{
        current_user::{CurrentUser, MaybeUser},
        ResponseResult,
    },
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecipesLimit {
    recipes_limit: Option<usize>,
}

pub(crate) async fn list_users(
    State(state): State<AppState>,
    viewer: MaybeUser,
) -> ResponseResult<Json<Vec<UserView>>> {
    Ok(Json(users::list(state.store.as_ref(), viewer.user()).await?))
}

pub(crate) async fn me(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> ResponseResult<Json<UserView>> {
    let view = users::profile(state.store.as_ref(), actor.user(), Some(actor.user())).await?;

    Ok(Json(view))
}

pub(crate) async fn get_user(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(user_id): Path<Uuid>,
) -> ResponseResult<Json<UserView>> {
    Ok(Json(
        users::get(state.store.as_ref(), user_id, viewer.user()).await?,
    ))
}

pub(crate) async fn subscriptions(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Query(limit): Query<RecipesLimit>,
) -> ResponseResult<Json<Vec<AuthorView>>> {
    let authors =
        membership::subscriptions(state.store.as_ref(), &actor, limit.recipes_limit).await?;

    Ok(Json(authors))
}

pub(crate) async fn subscribe(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(author_id): Path<Uuid>,
    Query(limit): Query<RecipesLimit>,
) -> ResponseResult<(StatusCode, Json<AuthorView>)> {
    let author =
        membership::follow(state.store.as_ref(), &actor, author_id, limit.recipes_limit).await?;

    Ok((StatusCode::CREATED, Json(author)))
}

pub(crate) async fn unsubscribe(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(author_id): Path<Uuid>,
) -> ResponseResult<StatusCode> {
    membership::unfollow(state.store.as_ref(), &actor, author_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::http_server::test_helpers::TestApp;

    #[tokio::test]
    async fn me_requires_a_token() {
        let app = TestApp::new().await;

        let (status, _) = app.get("/api/users/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app.get("/api/users/me", Some("not-a-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (alice, token) = app.user("alice").await;
        let (status, body) = app.get("/api/users/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], alice.user_id.to_string());
        assert_eq!(body["is_subscribed"], false);
    }

    #[tokio::test]
    async fn subscribe_round_trip() {
        let app = TestApp::new().await;
        let (alice, _) = app.user("alice").await;
        let (_, bob_token) = app.user("bob").await;
        let path = format!("/api/users/{}/subscribe", alice.user_id);

        let (status, body) = app.post(&path, Some(&bob_token), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["username"], "alice");
        assert_eq!(body["is_subscribed"], true);
        assert_eq!(body["recipes_count"], 0);

        let (status, _) = app.post(&path, Some(&bob_token), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, body) = app
            .get(&format!("/api/users/{}", alice.user_id), Some(&bob_token))
            .await;
        assert_eq!(body["is_subscribed"], true);

        let (_, body) = app.get("/api/users/subscriptions", Some(&bob_token)).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, _) = app.delete(&path, Some(&bob_token)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app.delete(&path, Some(&bob_token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn subscribing_to_yourself_is_a_bad_request() {
        let app = TestApp::new().await;
        let (alice, token) = app.user("alice").await;

        let (status, body) = app
            .post(&format!("/api/users/{}/subscribe", alice.user_id), Some(&token), None)
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "author");
    }
}
