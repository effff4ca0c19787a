use std::borrow::Cow;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad input. `field` names the offending part of the request, e.g.
    /// `ingredients[2].amount`.
    #[error("{field}: {message}")]
    Validation {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("{0} not found")]
    NotFound(Cow<'static, str>),

    /// The row already exists. Kept apart from `Validation` so callers can tell
    /// "already in this state" from "bad input".
    #[error("{0} already exists")]
    Conflict(Cow<'static, str>),

    #[error("you do not have permission to perform this action")]
    PermissionDenied,

    #[error("storage failure")]
    Storage(#[source] BoxError),
}

impl Error {
    pub fn validation(
        field: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(what: impl Into<Cow<'static, str>>) -> Self {
        Self::Conflict(what.into())
    }

    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(source))
    }

    /// The field named by a validation failure, if this is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_names_the_field() {
        let err = Error::validation("ingredients[1].id", "duplicate ingredient");

        assert_eq!(err.to_string(), "ingredients[1].id: duplicate ingredient");
        assert_eq!(err.field(), Some("ingredients[1].id"));
    }

    #[test]
    fn non_validation_errors_have_no_field() {
        assert_eq!(Error::not_found("recipe").field(), None);
        assert_eq!(Error::conflict("favorite").to_string(), "favorite already exists");
    }
}
