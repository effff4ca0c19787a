use async_trait::async_trait;
use pantry::{
    models::{
        Image, Ingredient, Membership, NewIngredient, NewRecipe, NewTag, NewUser, Recipe,
        RecipeChanges, RecipeFilter, ShoppingListItem, Tag, User,
    },
    Result, Store,
};
use sqlx::PgPool;
use uuid::Uuid;

/// [`Store`] backed by Postgres. Multi-row writes run in one transaction and
/// uniqueness is left to the schema's constraints.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.insert_user(user).await
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        self.user_by_id(user_id).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.all_users().await
    }

    async fn issue_token(&self, user_id: Uuid) -> Result<String> {
        self.insert_token(user_id).await
    }

    async fn user_by_token(&self, token: &str) -> Result<Option<User>> {
        self.token_owner(token).await
    }

    async fn create_ingredient(&self, ingredient: NewIngredient) -> Result<Ingredient> {
        self.insert_ingredient(ingredient).await
    }

    async fn get_ingredient(&self, ingredient_id: Uuid) -> Result<Option<Ingredient>> {
        self.ingredient_by_id(ingredient_id).await
    }

    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>> {
        self.search_ingredients(name_prefix).await
    }

    async fn create_tag(&self, tag: NewTag) -> Result<Tag> {
        self.insert_tag(tag).await
    }

    async fn get_tag(&self, tag_id: Uuid) -> Result<Option<Tag>> {
        self.tag_by_id(tag_id).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.all_tags().await
    }

    async fn insert_recipe(&self, recipe: NewRecipe) -> Result<Uuid> {
        self.insert_recipe_row(recipe).await
    }

    async fn replace_recipe(&self, recipe_id: Uuid, changes: RecipeChanges) -> Result<()> {
        self.replace_recipe_rows(recipe_id, changes).await
    }

    async fn get_recipe(&self, recipe_id: Uuid) -> Result<Option<Recipe>> {
        self.recipe_by_id(recipe_id).await
    }

    async fn get_recipe_image(&self, recipe_id: Uuid) -> Result<Option<Image>> {
        self.recipe_image(recipe_id).await
    }

    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
        self.filter_recipes(filter).await
    }

    async fn count_recipes_by_author(&self, author_user_id: Uuid) -> Result<i64> {
        self.recipes_by_author_count(author_user_id).await
    }

    async fn delete_recipe(&self, recipe_id: Uuid) -> Result<bool> {
        self.delete_recipe_rows(recipe_id).await
    }

    async fn add_membership(&self, kind: Membership, owner: Uuid, target: Uuid) -> Result<()> {
        self.insert_pair(kind, owner, target).await
    }

    async fn remove_membership(
        &self,
        kind: Membership,
        owner: Uuid,
        target: Uuid,
    ) -> Result<bool> {
        self.delete_pair(kind, owner, target).await
    }

    async fn has_membership(&self, kind: Membership, owner: Uuid, target: Uuid) -> Result<bool> {
        self.pair_exists(kind, owner, target).await
    }

    async fn membership_targets(&self, kind: Membership, owner: Uuid) -> Result<Vec<Uuid>> {
        self.pair_targets(kind, owner).await
    }

    async fn shopping_list(&self, user_id: Uuid) -> Result<Vec<ShoppingListItem>> {
        self.cart_totals(user_id).await
    }
}
