use pantry::{
    models::{Ingredient, NewIngredient, NewTag, Tag},
    Error, Result,
};
use uuid::Uuid;

use crate::{errors::classify, store::PgStore};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct IngredientRow {
    pub ingredient_id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

impl From<IngredientRow> for Ingredient {
    fn from(row: IngredientRow) -> Self {
        Self {
            ingredient_id: row.ingredient_id,
            name: row.name,
            measurement_unit: row.measurement_unit,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TagRow {
    pub tag_id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Self {
            tag_id: row.tag_id,
            name: row.name,
            color: row.color,
            slug: row.slug,
        }
    }
}

/// Escapes `LIKE` wildcards so a search prefix matches literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl PgStore {
    pub(crate) async fn insert_ingredient(&self, ingredient: NewIngredient) -> Result<Ingredient> {
        let row = sqlx::query_as::<_, IngredientRow>(
            r"
            INSERT INTO ingredients (name, measurement_unit)
            VALUES ($1, $2)
            RETURNING ingredient_id, name, measurement_unit
            ",
        )
        .bind(ingredient.name)
        .bind(ingredient.measurement_unit)
        .fetch_one(self.pool())
        .await
        .map_err(|e| classify(e, "ingredient with this name and unit"))?;

        Ok(row.into())
    }

    pub(crate) async fn ingredient_by_id(&self, ingredient_id: Uuid) -> Result<Option<Ingredient>> {
        let row = sqlx::query_as::<_, IngredientRow>(
            r"
            SELECT ingredient_id, name, measurement_unit
            FROM ingredients
            WHERE ingredient_id = $1
            ",
        )
        .bind(ingredient_id)
        .fetch_optional(self.pool())
        .await
        .map_err(Error::storage)?;

        Ok(row.map(Ingredient::from))
    }

    pub(crate) async fn search_ingredients(
        &self,
        name_prefix: Option<&str>,
    ) -> Result<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, IngredientRow>(
            r"
            SELECT ingredient_id, name, measurement_unit
            FROM ingredients
            WHERE $1::text IS NULL OR LOWER(name) LIKE $1
            ORDER BY name, measurement_unit
            ",
        )
        .bind(name_prefix.map(like_prefix))
        .fetch_all(self.pool())
        .await
        .map_err(Error::storage)?;

        Ok(rows.into_iter().map(Ingredient::from).collect())
    }

    pub(crate) async fn insert_tag(&self, tag: NewTag) -> Result<Tag> {
        let row = sqlx::query_as::<_, TagRow>(
            r"
            INSERT INTO tags (name, color, slug)
            VALUES ($1, $2, $3)
            RETURNING tag_id, name, color, slug
            ",
        )
        .bind(tag.name)
        .bind(tag.color)
        .bind(tag.slug)
        .fetch_one(self.pool())
        .await
        .map_err(|e| classify(e, "tag with this name, color or slug"))?;

        Ok(row.into())
    }

    pub(crate) async fn tag_by_id(&self, tag_id: Uuid) -> Result<Option<Tag>> {
        let row = sqlx::query_as::<_, TagRow>(
            "SELECT tag_id, name, color, slug FROM tags WHERE tag_id = $1",
        )
        .bind(tag_id)
        .fetch_optional(self.pool())
        .await
        .map_err(Error::storage)?;

        Ok(row.map(Tag::from))
    }

    pub(crate) async fn all_tags(&self) -> Result<Vec<Tag>> {
        let rows =
            sqlx::query_as::<_, TagRow>("SELECT tag_id, name, color, slug FROM tags ORDER BY name")
                .fetch_all(self.pool())
                .await
                .map_err(Error::storage)?;

        Ok(rows.into_iter().map(Tag::from).collect())
    }
}
