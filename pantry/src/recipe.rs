//! The recipe aggregate: a recipe row plus its ingredient lines and tags.
//!
//! Clients write recipes as a [`RecipeDraft`] and read them as a
//! [`RecipeView`]; both are built around the one canonical [`Recipe`] the store
//! hands back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    actor::Actor,
    error::{Error, Result},
    models::{
        Image, LineInput, Membership, NewRecipe, Recipe, RecipeChanges, RecipeFilter, Tag, User,
    },
    store::Store,
    users::{self, UserView},
};

const MAX_NAME_LEN: usize = 200;

/// Where the HTTP layer serves a recipe's picture.
pub fn image_path(recipe_id: Uuid) -> String {
    format!("/api/recipes/{recipe_id}/image")
}

/// Write shape of a recipe, as submitted on create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    /// `data:<mime>;base64,<payload>`. Required on create, optional on update.
    #[serde(default)]
    pub image: Option<String>,
    pub ingredients: Vec<LineInput>,
    pub tags: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageRule {
    Required,
    Optional,
}

/// A draft that passed validation, image decoded.
#[derive(Debug)]
struct ValidDraft {
    name: String,
    text: String,
    cooking_time: i32,
    image: Option<Image>,
    lines: Vec<LineInput>,
    tag_ids: Vec<Uuid>,
}

impl RecipeDraft {
    /// Checks everything that can be checked without the store. The first
    /// offending field in input order is reported; nothing is deduplicated.
    pub fn validate(&self) -> Result<()> {
        self.check(ImageRule::Optional).map(|_| ())
    }

    fn check(&self, image_rule: ImageRule) -> Result<ValidDraft> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::validation("name", "may not be blank"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(Error::validation("name", "must be at most 200 characters"));
        }

        if self.cooking_time < 1 {
            return Err(Error::validation(
                "cooking_time",
                "cooking time must be at least 1 minute",
            ));
        }

        if self.ingredients.is_empty() {
            return Err(Error::validation(
                "ingredients",
                "a recipe needs at least one ingredient",
            ));
        }
        for (i, line) in self.ingredients.iter().enumerate() {
            if line.amount < 1 {
                return Err(Error::validation(
                    format!("ingredients[{i}].amount"),
                    "amount must be at least 1",
                ));
            }
            if self.ingredients[..i]
                .iter()
                .any(|seen| seen.ingredient_id == line.ingredient_id)
            {
                return Err(Error::validation(
                    format!("ingredients[{i}].id"),
                    "ingredient is listed more than once",
                ));
            }
        }

        if self.tags.is_empty() {
            return Err(Error::validation("tags", "a recipe needs at least one tag"));
        }
        for (i, tag_id) in self.tags.iter().enumerate() {
            if self.tags[..i].contains(tag_id) {
                return Err(Error::validation(
                    format!("tags[{i}]"),
                    "tag is listed more than once",
                ));
            }
        }

        let image = match (&self.image, image_rule) {
            (Some(uri), _) => Some(Image::from_data_uri(uri)?),
            (None, ImageRule::Required) => {
                return Err(Error::validation("image", "an image is required"))
            }
            (None, ImageRule::Optional) => None,
        };

        Ok(ValidDraft {
            name: name.to_string(),
            text: self.text.clone(),
            cooking_time: self.cooking_time,
            image,
            lines: self.ingredients.clone(),
            tag_ids: self.tags.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientLineView {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Read shape of a recipe, relative to whoever is looking at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeView {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<IngredientLineView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub created_at: DateTime<Utc>,
}

/// Viewer-relative flags of a recipe. All false for anonymous viewers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerFlags {
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeView {
    pub fn from_recipe(recipe: Recipe, author: UserView, flags: ViewerFlags) -> Self {
        Self {
            id: recipe.recipe_id,
            image: image_path(recipe.recipe_id),
            tags: recipe.tags,
            author,
            ingredients: recipe
                .ingredients
                .into_iter()
                .map(|line| IngredientLineView {
                    id: line.ingredient.ingredient_id,
                    name: line.ingredient.name,
                    measurement_unit: line.ingredient.measurement_unit,
                    amount: line.amount,
                })
                .collect(),
            is_favorited: flags.is_favorited,
            is_in_shopping_cart: flags.is_in_shopping_cart,
            name: recipe.name,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
            created_at: recipe.created_at,
        }
    }
}

/// Short form used in favorites, cart and subscription responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeCard {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&Recipe> for RecipeCard {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.recipe_id,
            name: recipe.name.clone(),
            image: image_path(recipe.recipe_id),
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Client-facing list filters. Membership filters only apply to signed-in
/// viewers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    pub author: Option<Uuid>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

async fn flags_for(
    store: &dyn Store,
    recipe_id: Uuid,
    viewer: Option<&User>,
) -> Result<ViewerFlags> {
    let Some(viewer) = viewer else {
        return Ok(ViewerFlags::default());
    };

    Ok(ViewerFlags {
        is_favorited: store
            .has_membership(Membership::Favorite, viewer.user_id, recipe_id)
            .await?,
        is_in_shopping_cart: store
            .has_membership(Membership::ShoppingCart, viewer.user_id, recipe_id)
            .await?,
    })
}

async fn to_view(store: &dyn Store, recipe: Recipe, viewer: Option<&User>) -> Result<RecipeView> {
    let author = store
        .get_user(recipe.author_user_id)
        .await?
        .ok_or_else(|| Error::not_found("author"))?;
    let author = users::profile(store, &author, viewer).await?;
    let flags = flags_for(store, recipe.recipe_id, viewer).await?;

    Ok(RecipeView::from_recipe(recipe, author, flags))
}

pub(crate) async fn fetch(store: &dyn Store, recipe_id: Uuid) -> Result<Recipe> {
    store
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(|| Error::not_found("recipe"))
}

/// Every referenced ingredient and tag has to exist in the catalog.
async fn resolve(store: &dyn Store, lines: &[LineInput], tag_ids: &[Uuid]) -> Result<()> {
    for line in lines {
        if store.get_ingredient(line.ingredient_id).await?.is_none() {
            return Err(Error::not_found(format!("ingredient {}", line.ingredient_id)));
        }
    }
    for tag_id in tag_ids {
        if store.get_tag(*tag_id).await?.is_none() {
            return Err(Error::not_found(format!("tag {tag_id}")));
        }
    }
    Ok(())
}

#[tracing::instrument(skip(store, actor, draft), fields(author = %actor.user_id()), err)]
pub async fn create(store: &dyn Store, actor: &Actor, draft: RecipeDraft) -> Result<RecipeView> {
    let draft = draft.check(ImageRule::Required)?;
    resolve(store, &draft.lines, &draft.tag_ids).await?;

    let Some(image) = draft.image else {
        return Err(Error::validation("image", "an image is required"));
    };
    let recipe_id = store
        .insert_recipe(NewRecipe {
            author_user_id: actor.user_id(),
            name: draft.name,
            text: draft.text,
            cooking_time: draft.cooking_time,
            image,
            lines: draft.lines,
            tag_ids: draft.tag_ids,
        })
        .await?;

    tracing::info!(%recipe_id, "created recipe");

    read(store, recipe_id, Some(actor.user())).await
}

/// Replaces name, text, cooking time, lines and tags. The image is only
/// replaced when the draft carries one; the author never changes.
#[tracing::instrument(skip(store, actor, draft), fields(actor = %actor.user_id()), err)]
pub async fn update(
    store: &dyn Store,
    actor: &Actor,
    recipe_id: Uuid,
    draft: RecipeDraft,
) -> Result<RecipeView> {
    let recipe = fetch(store, recipe_id).await?;
    if !actor.can_modify(&recipe) {
        return Err(Error::PermissionDenied);
    }

    let draft = draft.check(ImageRule::Optional)?;
    resolve(store, &draft.lines, &draft.tag_ids).await?;

    store
        .replace_recipe(
            recipe_id,
            RecipeChanges {
                name: draft.name,
                text: draft.text,
                cooking_time: draft.cooking_time,
                image: draft.image,
                lines: draft.lines,
                tag_ids: draft.tag_ids,
            },
        )
        .await?;

    read(store, recipe_id, Some(actor.user())).await
}

pub async fn read(store: &dyn Store, recipe_id: Uuid, viewer: Option<&User>) -> Result<RecipeView> {
    let recipe = fetch(store, recipe_id).await?;
    to_view(store, recipe, viewer).await
}

pub async fn list(
    store: &dyn Store,
    query: &RecipeQuery,
    viewer: Option<&User>,
) -> Result<Vec<RecipeView>> {
    let viewer_id = viewer.map(|v| v.user_id);
    let filter = RecipeFilter {
        author: query.author,
        tags: query.tags.clone(),
        favorited_by: viewer_id.filter(|_| query.is_favorited),
        in_cart_of: viewer_id.filter(|_| query.is_in_shopping_cart),
        limit: None,
    };

    let recipes = store.list_recipes(&filter).await?;

    let mut views = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        views.push(to_view(store, recipe, viewer).await?);
    }

    Ok(views)
}

pub async fn image(store: &dyn Store, recipe_id: Uuid) -> Result<Image> {
    store
        .get_recipe_image(recipe_id)
        .await?
        .ok_or_else(|| Error::not_found("recipe"))
}

#[tracing::instrument(skip(store, actor), fields(actor = %actor.user_id()), err)]
pub async fn delete(store: &dyn Store, actor: &Actor, recipe_id: Uuid) -> Result<()> {
    let recipe = fetch(store, recipe_id).await?;
    if !actor.can_modify(&recipe) {
        return Err(Error::PermissionDenied);
    }

    if !store.delete_recipe(recipe_id).await? {
        return Err(Error::not_found("recipe"));
    }

    tracing::info!(%recipe_id, "deleted recipe");

    Ok(())
}
