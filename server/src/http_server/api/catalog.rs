use axum::{
    extract::{Path, Query, State},
    Json,
};
use pantry::{
    catalog,
    models::{Ingredient, Tag},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{http_server::ResponseResult, AppState};

pub(crate) async fn list_tags(State(state): State<AppState>) -> ResponseResult<Json<Vec<Tag>>> {
    Ok(Json(catalog::tags(state.store.as_ref()).await?))
}

pub(crate) async fn get_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<Uuid>,
) -> ResponseResult<Json<Tag>> {
    Ok(Json(catalog::tag(state.store.as_ref(), tag_id).await?))
}

#[derive(Debug, Deserialize)]
pub(crate) struct IngredientSearch {
    name: Option<String>,
}

pub(crate) async fn list_ingredients(
    State(state): State<AppState>,
    Query(search): Query<IngredientSearch>,
) -> ResponseResult<Json<Vec<Ingredient>>> {
    let ingredients = catalog::ingredients(state.store.as_ref(), search.name.as_deref()).await?;

    Ok(Json(ingredients))
}

pub(crate) async fn get_ingredient(
    State(state): State<AppState>,
    Path(ingredient_id): Path<Uuid>,
) -> ResponseResult<Json<Ingredient>> {
    Ok(Json(
        catalog::ingredient(state.store.as_ref(), ingredient_id).await?,
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use pantry::models::NewIngredient;

    use crate::http_server::test_helpers::TestApp;

    #[tokio::test]
    async fn ingredients_can_be_searched_by_prefix() {
        let app = TestApp::new().await;
        for name in ["flour", "fennel", "sugar"] {
            pantry::catalog::create_ingredient(
                app.store.as_ref(),
                NewIngredient {
                    name: name.to_string(),
                    measurement_unit: "g".to_string(),
                },
            )
            .await
            .unwrap();
        }

        let (status, body) = app.get("/api/ingredients?name=F", None).await;

        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["fennel", "flour"]);
    }

    #[tokio::test]
    async fn unknown_tag_is_404() {
        let app = TestApp::new().await;

        let (status, body) = app
            .get(&format!("/api/tags/{}", uuid::Uuid::new_v4()), None)
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "tag not found");
    }
}
