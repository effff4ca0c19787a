use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::Result,
    models::{
        Image, Ingredient, Membership, NewIngredient, NewRecipe, NewTag, NewUser, Recipe,
        RecipeChanges, RecipeFilter, ShoppingListItem, Tag, User,
    },
};

/// Persistence contract the domain operations run against.
///
/// Implementations enforce every uniqueness rule themselves (surfacing
/// [`crate::Error::Conflict`]) and run each multi-row write as one unit, so a
/// reader never observes a recipe without its lines.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn issue_token(&self, user_id: Uuid) -> Result<String>;
    async fn user_by_token(&self, token: &str) -> Result<Option<User>>;

    async fn create_ingredient(&self, ingredient: NewIngredient) -> Result<Ingredient>;
    async fn get_ingredient(&self, ingredient_id: Uuid) -> Result<Option<Ingredient>>;
    /// Ordered by name. `name_prefix` matches case-insensitively.
    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>>;

    async fn create_tag(&self, tag: NewTag) -> Result<Tag>;
    async fn get_tag(&self, tag_id: Uuid) -> Result<Option<Tag>>;
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    /// Inserts the recipe with all of its lines and tags, or nothing.
    async fn insert_recipe(&self, recipe: NewRecipe) -> Result<Uuid>;
    /// Replaces lines and tags wholesale (delete then insert) in one unit.
    async fn replace_recipe(&self, recipe_id: Uuid, changes: RecipeChanges) -> Result<()>;
    async fn get_recipe(&self, recipe_id: Uuid) -> Result<Option<Recipe>>;
    async fn get_recipe_image(&self, recipe_id: Uuid) -> Result<Option<Image>>;
    /// Newest first.
    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>>;
    async fn count_recipes_by_author(&self, author_user_id: Uuid) -> Result<i64>;
    /// Removes the recipe together with its lines, tags, favorites and cart
    /// rows. Returns `false` if there was nothing to delete.
    async fn delete_recipe(&self, recipe_id: Uuid) -> Result<bool>;

    /// Fails with `Conflict` if the pair exists.
    async fn add_membership(&self, kind: Membership, owner: Uuid, target: Uuid) -> Result<()>;
    /// Returns `false` if the pair did not exist.
    async fn remove_membership(&self, kind: Membership, owner: Uuid, target: Uuid)
        -> Result<bool>;
    async fn has_membership(&self, kind: Membership, owner: Uuid, target: Uuid) -> Result<bool>;
    /// Targets of `owner`'s pairs, oldest pair first.
    async fn membership_targets(&self, kind: Membership, owner: Uuid) -> Result<Vec<Uuid>>;

    /// Lines of every recipe in the user's cart grouped by
    /// `(ingredient name, measurement unit)` with amounts summed.
    async fn shopping_list(&self, user_id: Uuid) -> Result<Vec<ShoppingListItem>>;
}
