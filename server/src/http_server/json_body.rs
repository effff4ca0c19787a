use axum::{
    extract::{FromRequest, Request},
    Json,
};
use color_eyre::eyre::eyre;
use serde::de::DeserializeOwned;

use super::errors::ServerError;

/// Like [`Json`], but a body that does not fit `T` is answered as a
/// validation error naming the offending field.
#[derive(Debug)]
pub(crate) struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<serde_json::Value>::from_request(req, state)
            .await
            .map_err(|rejection| ServerError(eyre!(rejection.body_text()), rejection.status()))?;

        serde_path_to_error::deserialize(value)
            .map(JsonBody)
            .map_err(|err| {
                let field = offending_field(&err);
                pantry::Error::validation(field, err.into_inner().to_string()).into()
            })
    }
}

/// Dotted path of the value that failed to decode. serde reports a missing
/// field against its parent, so the name is lifted out of the message.
fn offending_field(err: &serde_path_to_error::Error<serde_json::Error>) -> String {
    let path = err.path().to_string();
    let message = err.inner().to_string();
    let missing = message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next());

    match (path.as_str(), missing) {
        (".", Some(name)) => name.to_string(),
        (".", None) => "body".to_string(),
        (_, Some(name)) => format!("{path}.{name}"),
        (_, None) => path,
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Line {
        id: u32,
        amount: i32,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Draft {
        cooking_time: i32,
        ingredients: Vec<Line>,
    }

    fn field_for(value: serde_json::Value) -> String {
        let err = serde_path_to_error::deserialize::<_, Draft>(value).unwrap_err();
        offending_field(&err)
    }

    #[test]
    fn names_missing_top_level_fields() {
        assert_eq!(field_for(json!({ "cooking_time": 5 })), "ingredients");
    }

    #[test]
    fn names_missing_nested_fields() {
        let value = json!({ "cooking_time": 5, "ingredients": [{ "id": 1 }] });

        assert_eq!(field_for(value), "ingredients[0].amount");
    }

    #[test]
    fn names_mistyped_fields() {
        let value = json!({ "cooking_time": -1.5, "ingredients": [] });

        assert_eq!(field_for(value), "cooking_time");
    }

    #[test]
    fn a_non_object_body_is_blamed_on_the_body() {
        assert_eq!(field_for(json!("pancakes")), "body");
    }
}
