use axum::{
    extract::{Path, RawQuery, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use pantry::{
    membership,
    recipe::{self, RecipeCard, RecipeDraft, RecipeQuery, RecipeView},
    shopping_list,
};
use uuid::Uuid;

use crate::{
    http_server::{
        current_user::{CurrentUser, MaybeUser},
        errors::WithStatus,
        json_body::JsonBody,
        ResponseResult,
    },
    AppState,
};

fn flag(value: &str) -> bool {
    matches!(value, "1" | "true" | "True")
}

/// `tags` may repeat, so this is parsed by hand instead of through `Query`.
fn parse_recipe_query(raw: Option<&str>) -> ResponseResult<RecipeQuery> {
    let mut query = RecipeQuery::default();

    for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            "author" => {
                query.author = Some(value.parse().with_status(StatusCode::BAD_REQUEST)?);
            }
            "tags" => query.tags.push(value.into_owned()),
            "is_favorited" => query.is_favorited = flag(&value),
            "is_in_shopping_cart" => query.is_in_shopping_cart = flag(&value),
            _ => {}
        }
    }

    Ok(query)
}

pub(crate) async fn list_recipes(
    State(state): State<AppState>,
    viewer: MaybeUser,
    RawQuery(raw): RawQuery,
) -> ResponseResult<Json<Vec<RecipeView>>> {
    let query = parse_recipe_query(raw.as_deref())?;
    let recipes = recipe::list(state.store.as_ref(), &query, viewer.user()).await?;

    Ok(Json(recipes))
}

pub(crate) async fn create_recipe(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    JsonBody(draft): JsonBody<RecipeDraft>,
) -> ResponseResult<(StatusCode, Json<RecipeView>)> {
    let view = recipe::create(state.store.as_ref(), &actor, draft).await?;

    Ok((StatusCode::CREATED, Json(view)))
}

pub(crate) async fn get_recipe(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(recipe_id): Path<Uuid>,
) -> ResponseResult<Json<RecipeView>> {
    Ok(Json(
        recipe::read(state.store.as_ref(), recipe_id, viewer.user()).await?,
    ))
}

pub(crate) async fn update_recipe(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(recipe_id): Path<Uuid>,
    JsonBody(draft): JsonBody<RecipeDraft>,
) -> ResponseResult<Json<RecipeView>> {
    Ok(Json(
        recipe::update(state.store.as_ref(), &actor, recipe_id, draft).await?,
    ))
}

pub(crate) async fn delete_recipe(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(recipe_id): Path<Uuid>,
) -> ResponseResult<StatusCode> {
    recipe::delete(state.store.as_ref(), &actor, recipe_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn recipe_image(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> ResponseResult {
    let image = recipe::image(state.store.as_ref(), recipe_id).await?;

    Ok(([(header::CONTENT_TYPE, image.content_type)], image.data).into_response())
}

pub(crate) async fn favorite(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(recipe_id): Path<Uuid>,
) -> ResponseResult<(StatusCode, Json<RecipeCard>)> {
    let card = membership::add_favorite(state.store.as_ref(), &actor, recipe_id).await?;

    Ok((StatusCode::CREATED, Json(card)))
}

pub(crate) async fn unfavorite(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(recipe_id): Path<Uuid>,
) -> ResponseResult<StatusCode> {
    membership::remove_favorite(state.store.as_ref(), &actor, recipe_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn add_to_cart(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(recipe_id): Path<Uuid>,
) -> ResponseResult<(StatusCode, Json<RecipeCard>)> {
    let card = membership::add_to_cart(state.store.as_ref(), &actor, recipe_id).await?;

    Ok((StatusCode::CREATED, Json(card)))
}

pub(crate) async fn remove_from_cart(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(recipe_id): Path<Uuid>,
) -> ResponseResult<StatusCode> {
    membership::remove_from_cart(state.store.as_ref(), &actor, recipe_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn download_shopping_cart(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> ResponseResult {
    let list = shopping_list::compile(state.store.as_ref(), &actor).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", shopping_list::FILENAME),
            ),
        ],
        list.render(),
    )
        .into_response())
}
