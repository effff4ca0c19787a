use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub is_staff: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(rename = "id")]
    pub ingredient_id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "id")]
    pub tag_id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// Decoded recipe picture.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    pub content_type: String,
    pub data: Vec<u8>,
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// One `(ingredient, amount)` pairing attached to a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeLine {
    pub ingredient: Ingredient,
    pub amount: i32,
}

/// A line as submitted by a client, before the ingredient is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    #[serde(rename = "id")]
    pub ingredient_id: Uuid,
    pub amount: i32,
}

/// Canonical in-memory recipe: the row plus its lines (input order) and tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub recipe_id: Uuid,
    pub author_user_id: Uuid,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ingredients: Vec<RecipeLine>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub author_user_id: Uuid,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Image,
    pub lines: Vec<LineInput>,
    pub tag_ids: Vec<Uuid>,
}

/// Full replacement of a recipe's editable state. `image: None` keeps the
/// stored picture.
#[derive(Debug, Clone)]
pub struct RecipeChanges {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Option<Image>,
    pub lines: Vec<LineInput>,
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Uuid>,
    /// Tag slugs, matched any-of.
    pub tags: Vec<String>,
    pub favorited_by: Option<Uuid>,
    pub in_cart_of: Option<Uuid>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Membership {
    /// user -> recipe
    Favorite,
    /// user -> recipe
    ShoppingCart,
    /// user -> author
    Follow,
}

impl Membership {
    pub fn label(self) -> &'static str {
        match self {
            Membership::Favorite => "favorite",
            Membership::ShoppingCart => "shopping cart entry",
            Membership::Follow => "subscription",
        }
    }
}

impl fmt::Display for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}
