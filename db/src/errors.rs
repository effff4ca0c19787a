use pantry::Error;

/// Which row a foreign key points at, by the default `<table>_<column>_fkey`
/// constraint names.
fn referenced(constraint: Option<&str>) -> &'static str {
    let Some(constraint) = constraint else {
        return "row";
    };

    if constraint.contains("ingredient_id") {
        "ingredient"
    } else if constraint.contains("tag_id") {
        "tag"
    } else if constraint.contains("recipe_id") {
        "recipe"
    } else if constraint.contains("author_user_id") {
        "author"
    } else if constraint.contains("user_id") {
        "user"
    } else {
        "row"
    }
}

/// Maps constraint violations onto domain errors. Anything else is a storage
/// failure.
pub(crate) fn classify(err: sqlx::Error, what: &'static str) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return Error::conflict(what);
        }
        if db_err.is_foreign_key_violation() {
            return Error::not_found(referenced(db_err.constraint()));
        }
        if db_err.is_check_violation() {
            return Error::validation(what, db_err.message().to_string());
        }
    }

    Error::storage(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_keys_name_the_missing_row() {
        assert_eq!(referenced(Some("recipe_ingredients_ingredient_id_fkey")), "ingredient");
        assert_eq!(referenced(Some("follows_author_user_id_fkey")), "author");
        assert_eq!(referenced(Some("favorites_user_id_fkey")), "user");
        assert_eq!(referenced(None), "row");
    }

    #[test]
    fn other_errors_are_storage_failures() {
        let err = classify(sqlx::Error::RowNotFound, "recipe");

        assert!(matches!(err, Error::Storage(_)));
    }
}
