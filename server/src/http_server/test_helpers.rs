use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use pantry::{
    catalog,
    models::{NewIngredient, NewTag, NewUser, User},
    users, MemoryStore,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{AppConfig, AppState};

pub(crate) const PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

/// The router over a fresh in-memory store.
pub(crate) struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

/// Catalog rows seeded by [`TestApp::kitchen`].
pub(crate) struct Kitchen {
    pub flour: Uuid,
    pub sugar: Uuid,
    pub breakfast: Uuid,
}

impl Kitchen {
    pub fn payload(&self, lines: &[(Uuid, i32)]) -> Value {
        let ingredients: Vec<Value> = lines
            .iter()
            .map(|(id, amount)| json!({ "id": id, "amount": amount }))
            .collect();

        json!({
            "name": "Pancakes",
            "text": "Mix and fry.",
            "cooking_time": 20,
            "image": PNG_DATA_URI,
            "ingredients": ingredients,
            "tags": [self.breakfast],
        })
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), AppConfig { port: 0 });
        let router = crate::http_server::routes::make_router().with_state(state);

        Self { router, store }
    }

    /// Registers a user and returns their token.
    pub async fn user(&self, username: &str) -> (User, String) {
        users::register(
            self.store.as_ref(),
            NewUser {
                email: format!("{username}@example.com"),
                username: username.to_string(),
                first_name: username.to_string(),
                last_name: "Cook".to_string(),
                is_staff: false,
            },
        )
        .await
        .unwrap()
    }

    pub async fn kitchen(&self) -> Kitchen {
        let store = self.store.as_ref();
        let ingredient = |name: &str| NewIngredient {
            name: name.to_string(),
            measurement_unit: "g".to_string(),
        };

        Kitchen {
            flour: catalog::create_ingredient(store, ingredient("flour"))
                .await
                .unwrap()
                .ingredient_id,
            sugar: catalog::create_ingredient(store, ingredient("sugar"))
                .await
                .unwrap()
                .ingredient_id,
            breakfast: catalog::create_tag(
                store,
                NewTag {
                    name: "Breakfast".to_string(),
                    color: "#E26C2D".to_string(),
                    slug: "breakfast".to_string(),
                },
            )
            .await
            .unwrap()
            .tag_id,
        }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, token, body).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.json("GET", uri, token, None).await
    }

    pub async fn get_raw(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = self.request("GET", uri, None, None).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, bytes.to_vec())
    }

    pub async fn post(
        &self,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.json("POST", uri, token, body).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.json("PATCH", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.json("DELETE", uri, token, None).await
    }
}
