use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

use super::api::{catalog, recipes, users};

pub(crate) fn make_router() -> Router<AppState> {
    Router::new().nest("/api", api_router())
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(catalog::list_tags))
        .route("/tags/{id}", get(catalog::get_tag))
        .route("/ingredients", get(catalog::list_ingredients))
        .route("/ingredients/{id}", get(catalog::get_ingredient))
        .route("/users", get(users::list_users))
        .route("/users/me", get(users::me))
        .route("/users/subscriptions", get(users::subscriptions))
        .route("/users/{id}", get(users::get_user))
        .route(
            "/users/{id}/subscribe",
            post(users::subscribe).delete(users::unsubscribe),
        )
        .route(
            "/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/recipes/download_shopping_cart",
            get(recipes::download_shopping_cart),
        )
        .route(
            "/recipes/{id}",
            get(recipes::get_recipe)
                .patch(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route("/recipes/{id}/image", get(recipes::recipe_image))
        .route(
            "/recipes/{id}/favorite",
            post(recipes::favorite).delete(recipes::unfavorite),
        )
        .route(
            "/recipes/{id}/shopping_cart",
            post(recipes::add_to_cart).delete(recipes::remove_from_cart),
        )
}
