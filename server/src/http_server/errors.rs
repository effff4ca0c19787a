use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use color_eyre::eyre;
use serde::Serialize;

/// Error returned by every handler: the report plus the status to answer with.
#[derive(Debug)]
pub(crate) struct ServerError(pub(crate) eyre::Report, pub(crate) StatusCode);

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

fn status_for(err: &pantry::Error) -> StatusCode {
    match err {
        pantry::Error::Validation { .. } => StatusCode::BAD_REQUEST,
        pantry::Error::NotFound(_) => StatusCode::NOT_FOUND,
        pantry::Error::Conflict(_) => StatusCode::CONFLICT,
        pantry::Error::PermissionDenied => StatusCode::FORBIDDEN,
        pantry::Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<pantry::Error> for ServerError {
    fn from(err: pantry::Error) -> Self {
        let status = status_for(&err);
        ServerError(eyre::Report::new(err), status)
    }
}

impl From<eyre::Report> for ServerError {
    fn from(err: eyre::Report) -> Self {
        ServerError(err, StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let ServerError(report, status) = self;

        let body = if status.is_server_error() {
            tracing::error!(error = ?report, "ServerError");
            ErrorBody {
                detail: "internal server error".to_string(),
                field: None,
            }
        } else {
            tracing::debug!(error = %report, status = status.as_u16(), "request rejected");
            ErrorBody {
                field: report
                    .downcast_ref::<pantry::Error>()
                    .and_then(pantry::Error::field)
                    .map(str::to_owned),
                detail: report.to_string(),
            }
        };

        (status, Json(body)).into_response()
    }
}

pub(crate) trait WithStatus<T> {
    fn with_status(self, status: StatusCode) -> Result<T, ServerError>;
}

impl<T, E> WithStatus<T> for Result<T, E>
where
    E: Into<eyre::Report>,
{
    fn with_status(self, status: StatusCode) -> Result<T, ServerError> {
        self.map_err(|err| ServerError(err.into(), status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (pantry::Error::validation("cooking_time", "too short"), StatusCode::BAD_REQUEST),
            (pantry::Error::not_found("recipe"), StatusCode::NOT_FOUND),
            (pantry::Error::conflict("favorite"), StatusCode::CONFLICT),
            (pantry::Error::PermissionDenied, StatusCode::FORBIDDEN),
        ];

        for (err, status) in cases {
            assert_eq!(ServerError::from(err).1, status);
        }
    }

    #[test]
    fn with_status_overrides_the_default() {
        let parsed: Result<uuid::Uuid, _> = "nope".parse::<uuid::Uuid>();

        let err = parsed.with_status(StatusCode::BAD_REQUEST).unwrap_err();

        assert_eq!(err.1, StatusCode::BAD_REQUEST);
    }
}
