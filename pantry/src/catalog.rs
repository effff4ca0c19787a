use uuid::Uuid;

use crate::{
    error::{Error, Result},
    models::{Ingredient, NewIngredient, NewTag, Tag},
    store::Store,
};

const MAX_LEN: usize = 200;

fn require_text(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "may not be blank"));
    }
    if value.chars().count() > MAX_LEN {
        return Err(Error::validation(field, "must be at most 200 characters"));
    }
    Ok(())
}

impl NewIngredient {
    pub fn validate(&self) -> Result<()> {
        require_text("name", &self.name)?;
        require_text("measurement_unit", &self.measurement_unit)
    }
}

impl NewTag {
    pub fn validate(&self) -> Result<()> {
        require_text("name", &self.name)?;
        require_text("slug", &self.slug)?;

        let hex = self.color.strip_prefix('#').unwrap_or_default();
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::validation("color", "expected a #RRGGBB color"));
        }

        if !self
            .slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::validation(
                "slug",
                "slug may only contain letters, digits, hyphens and underscores",
            ));
        }

        Ok(())
    }
}

#[tracing::instrument(skip(store), err)]
pub async fn create_ingredient(store: &dyn Store, ingredient: NewIngredient) -> Result<Ingredient> {
    ingredient.validate()?;
    store.create_ingredient(ingredient).await
}

#[tracing::instrument(skip(store), err)]
pub async fn create_tag(store: &dyn Store, tag: NewTag) -> Result<Tag> {
    tag.validate()?;
    store.create_tag(tag).await
}

pub async fn ingredient(store: &dyn Store, ingredient_id: Uuid) -> Result<Ingredient> {
    store
        .get_ingredient(ingredient_id)
        .await?
        .ok_or_else(|| Error::not_found("ingredient"))
}

pub async fn ingredients(store: &dyn Store, name_prefix: Option<&str>) -> Result<Vec<Ingredient>> {
    let prefix = name_prefix.map(str::trim).filter(|p| !p.is_empty());
    store.list_ingredients(prefix).await
}

pub async fn tag(store: &dyn Store, tag_id: Uuid) -> Result<Tag> {
    store
        .get_tag(tag_id)
        .await?
        .ok_or_else(|| Error::not_found("tag"))
}

pub async fn tags(store: &dyn Store) -> Result<Vec<Tag>> {
    store.list_tags().await
}
