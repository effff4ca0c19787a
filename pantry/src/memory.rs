use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    models::{
        Image, Ingredient, LineInput, Membership, NewIngredient, NewRecipe, NewTag, NewUser,
        Recipe, RecipeChanges, RecipeFilter, RecipeLine, ShoppingListItem, Tag, User,
    },
    store::Store,
};

/// A [`Store`] that keeps every table in process memory.
///
/// One write lock guards the whole state, so every multi-row write is
/// all-or-nothing and invisible to readers until it is done. Used by the tests
/// and by `serve --in-memory`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    users: Vec<User>,
    tokens: HashMap<String, Uuid>,
    ingredients: Vec<Ingredient>,
    tags: Vec<Tag>,
    recipes: Vec<RecipeRow>,
    lines: Vec<LineRow>,
    recipe_tags: Vec<(Uuid, Uuid)>,
    memberships: HashMap<Membership, Vec<(Uuid, Uuid)>>,
}

#[derive(Debug, Clone)]
struct RecipeRow {
    recipe_id: Uuid,
    author_user_id: Uuid,
    name: String,
    text: String,
    cooking_time: i32,
    image: Image,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct LineRow {
    recipe_id: Uuid,
    ingredient_id: Uuid,
    amount: i32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl State {
    fn user(&self, user_id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.user_id == user_id)
    }

    fn ingredient(&self, ingredient_id: Uuid) -> Option<&Ingredient> {
        self.ingredients
            .iter()
            .find(|i| i.ingredient_id == ingredient_id)
    }

    fn tag(&self, tag_id: Uuid) -> Option<&Tag> {
        self.tags.iter().find(|t| t.tag_id == tag_id)
    }

    fn recipe_row(&self, recipe_id: Uuid) -> Option<&RecipeRow> {
        self.recipes.iter().find(|r| r.recipe_id == recipe_id)
    }

    fn pairs(&self, kind: Membership) -> &[(Uuid, Uuid)] {
        self.memberships.get(&kind).map_or(&[][..], Vec::as_slice)
    }

    fn has_pair(&self, kind: Membership, owner: Uuid, target: Uuid) -> bool {
        self.pairs(kind).contains(&(owner, target))
    }

    /// Mirrors the foreign keys and unique constraints of the relational
    /// schema for a recipe's lines and tags.
    fn check_composition(&self, lines: &[LineInput], tag_ids: &[Uuid]) -> Result<()> {
        for (i, line) in lines.iter().enumerate() {
            if self.ingredient(line.ingredient_id).is_none() {
                return Err(Error::not_found("ingredient"));
            }
            if lines[..i]
                .iter()
                .any(|l| l.ingredient_id == line.ingredient_id)
            {
                return Err(Error::conflict("recipe ingredient"));
            }
        }
        for (i, tag_id) in tag_ids.iter().enumerate() {
            if self.tag(*tag_id).is_none() {
                return Err(Error::not_found("tag"));
            }
            if tag_ids[..i].contains(tag_id) {
                return Err(Error::conflict("recipe tag"));
            }
        }
        Ok(())
    }

    fn write_composition(&mut self, recipe_id: Uuid, lines: &[LineInput], tag_ids: &[Uuid]) {
        self.lines.extend(lines.iter().map(|line| LineRow {
            recipe_id,
            ingredient_id: line.ingredient_id,
            amount: line.amount,
        }));
        self.recipe_tags
            .extend(tag_ids.iter().map(|tag_id| (recipe_id, *tag_id)));
    }

    fn compose(&self, row: &RecipeRow) -> Recipe {
        let ingredients = self
            .lines
            .iter()
            .filter(|line| line.recipe_id == row.recipe_id)
            .filter_map(|line| {
                self.ingredient(line.ingredient_id).map(|ingredient| RecipeLine {
                    ingredient: ingredient.clone(),
                    amount: line.amount,
                })
            })
            .collect();

        let mut tags: Vec<Tag> = self
            .recipe_tags
            .iter()
            .filter(|(recipe_id, _)| *recipe_id == row.recipe_id)
            .filter_map(|(_, tag_id)| self.tag(*tag_id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Recipe {
            recipe_id: row.recipe_id,
            author_user_id: row.author_user_id,
            name: row.name.clone(),
            text: row.text.clone(),
            cooking_time: row.cooking_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
            ingredients,
            tags,
        }
    }

    fn matches(&self, row: &RecipeRow, filter: &RecipeFilter) -> bool {
        if filter.author.is_some_and(|author| author != row.author_user_id) {
            return false;
        }
        if !filter.tags.is_empty() {
            let tagged = self
                .recipe_tags
                .iter()
                .filter(|(recipe_id, _)| *recipe_id == row.recipe_id)
                .filter_map(|(_, tag_id)| self.tag(*tag_id))
                .any(|tag| filter.tags.contains(&tag.slug));
            if !tagged {
                return false;
            }
        }
        if let Some(user_id) = filter.favorited_by {
            if !self.has_pair(Membership::Favorite, user_id, row.recipe_id) {
                return false;
            }
        }
        if let Some(user_id) = filter.in_cart_of {
            if !self.has_pair(Membership::ShoppingCart, user_id, row.recipe_id) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;

        if state.users.iter().any(|u| u.email == user.email) {
            return Err(Error::conflict("user with this email"));
        }
        if state.users.iter().any(|u| u.username == user.username) {
            return Err(Error::conflict("user with this username"));
        }

        let user = User {
            user_id: Uuid::new_v4(),
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_staff: user.is_staff,
            created_at: Utc::now(),
        };
        state.users.push(user.clone());

        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.user(user_id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.state.read().await.users.clone())
    }

    async fn issue_token(&self, user_id: Uuid) -> Result<String> {
        let mut state = self.state.write().await;
        if state.user(user_id).is_none() {
            return Err(Error::not_found("user"));
        }

        let token = Uuid::new_v4().simple().to_string();
        state.tokens.insert(token.clone(), user_id);

        Ok(token)
    }

    async fn user_by_token(&self, token: &str) -> Result<Option<User>> {
        let state = self.state.read().await;

        Ok(state
            .tokens
            .get(token)
            .and_then(|user_id| state.user(*user_id))
            .cloned())
    }

    async fn create_ingredient(&self, ingredient: NewIngredient) -> Result<Ingredient> {
        let mut state = self.state.write().await;

        if state.ingredients.iter().any(|i| {
            i.name == ingredient.name && i.measurement_unit == ingredient.measurement_unit
        }) {
            return Err(Error::conflict("ingredient with this name and unit"));
        }

        let ingredient = Ingredient {
            ingredient_id: Uuid::new_v4(),
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        };
        state.ingredients.push(ingredient.clone());

        Ok(ingredient)
    }

    async fn get_ingredient(&self, ingredient_id: Uuid) -> Result<Option<Ingredient>> {
        Ok(self.state.read().await.ingredient(ingredient_id).cloned())
    }

    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>> {
        let prefix = name_prefix.map(str::to_lowercase);
        let state = self.state.read().await;

        let mut ingredients: Vec<Ingredient> = state
            .ingredients
            .iter()
            .filter(|i| {
                prefix
                    .as_deref()
                    .map_or(true, |p| i.name.to_lowercase().starts_with(p))
            })
            .cloned()
            .collect();
        ingredients.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(ingredients)
    }

    async fn create_tag(&self, tag: NewTag) -> Result<Tag> {
        let mut state = self.state.write().await;

        if state
            .tags
            .iter()
            .any(|t| t.name == tag.name || t.color == tag.color || t.slug == tag.slug)
        {
            return Err(Error::conflict("tag with this name, color or slug"));
        }

        let tag = Tag {
            tag_id: Uuid::new_v4(),
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        };
        state.tags.push(tag.clone());

        Ok(tag)
    }

    async fn get_tag(&self, tag_id: Uuid) -> Result<Option<Tag>> {
        Ok(self.state.read().await.tag(tag_id).cloned())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut tags = self.state.read().await.tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(tags)
    }

    async fn insert_recipe(&self, recipe: NewRecipe) -> Result<Uuid> {
        let mut state = self.state.write().await;

        if state.user(recipe.author_user_id).is_none() {
            return Err(Error::not_found("user"));
        }
        state.check_composition(&recipe.lines, &recipe.tag_ids)?;

        let now = Utc::now();
        let recipe_id = Uuid::new_v4();
        state.recipes.push(RecipeRow {
            recipe_id,
            author_user_id: recipe.author_user_id,
            name: recipe.name,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
            image: recipe.image,
            created_at: now,
            updated_at: now,
        });
        state.write_composition(recipe_id, &recipe.lines, &recipe.tag_ids);

        Ok(recipe_id)
    }

    async fn replace_recipe(&self, recipe_id: Uuid, changes: RecipeChanges) -> Result<()> {
        let mut state = self.state.write().await;

        if state.recipe_row(recipe_id).is_none() {
            return Err(Error::not_found("recipe"));
        }
        state.check_composition(&changes.lines, &changes.tag_ids)?;

        if let Some(row) = state.recipes.iter_mut().find(|r| r.recipe_id == recipe_id) {
            row.name = changes.name;
            row.text = changes.text;
            row.cooking_time = changes.cooking_time;
            row.updated_at = Utc::now();
            if let Some(image) = changes.image {
                row.image = image;
            }
        }
        state.lines.retain(|line| line.recipe_id != recipe_id);
        state.recipe_tags.retain(|(id, _)| *id != recipe_id);
        state.write_composition(recipe_id, &changes.lines, &changes.tag_ids);

        Ok(())
    }

    async fn get_recipe(&self, recipe_id: Uuid) -> Result<Option<Recipe>> {
        let state = self.state.read().await;

        Ok(state.recipe_row(recipe_id).map(|row| state.compose(row)))
    }

    async fn get_recipe_image(&self, recipe_id: Uuid) -> Result<Option<Image>> {
        let state = self.state.read().await;

        Ok(state.recipe_row(recipe_id).map(|row| row.image.clone()))
    }

    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
        let state = self.state.read().await;

        let recipes = state
            .recipes
            .iter()
            .rev()
            .filter(|row| state.matches(row, filter))
            .take(filter.limit.unwrap_or(usize::MAX))
            .map(|row| state.compose(row))
            .collect();

        Ok(recipes)
    }

    async fn count_recipes_by_author(&self, author_user_id: Uuid) -> Result<i64> {
        let state = self.state.read().await;
        let count = state
            .recipes
            .iter()
            .filter(|r| r.author_user_id == author_user_id)
            .count();

        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn delete_recipe(&self, recipe_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;

        let before = state.recipes.len();
        state.recipes.retain(|r| r.recipe_id != recipe_id);
        if state.recipes.len() == before {
            return Ok(false);
        }

        state.lines.retain(|line| line.recipe_id != recipe_id);
        state.recipe_tags.retain(|(id, _)| *id != recipe_id);
        for kind in [Membership::Favorite, Membership::ShoppingCart] {
            if let Some(pairs) = state.memberships.get_mut(&kind) {
                pairs.retain(|(_, target)| *target != recipe_id);
            }
        }

        Ok(true)
    }

    async fn add_membership(&self, kind: Membership, owner: Uuid, target: Uuid) -> Result<()> {
        let mut state = self.state.write().await;

        if state.user(owner).is_none() {
            return Err(Error::not_found("user"));
        }
        let target_exists = match kind {
            Membership::Favorite | Membership::ShoppingCart => {
                state.recipe_row(target).is_some()
            }
            Membership::Follow => state.user(target).is_some(),
        };
        if !target_exists {
            return Err(Error::not_found(match kind {
                Membership::Follow => "author",
                _ => "recipe",
            }));
        }
        if state.has_pair(kind, owner, target) {
            return Err(Error::conflict(kind.label()));
        }

        state
            .memberships
            .entry(kind)
            .or_default()
            .push((owner, target));

        Ok(())
    }

    async fn remove_membership(
        &self,
        kind: Membership,
        owner: Uuid,
        target: Uuid,
    ) -> Result<bool> {
        let mut state = self.state.write().await;

        let Some(pairs) = state.memberships.get_mut(&kind) else {
            return Ok(false);
        };
        let before = pairs.len();
        pairs.retain(|pair| *pair != (owner, target));

        Ok(pairs.len() != before)
    }

    async fn has_membership(&self, kind: Membership, owner: Uuid, target: Uuid) -> Result<bool> {
        Ok(self.state.read().await.has_pair(kind, owner, target))
    }

    async fn membership_targets(&self, kind: Membership, owner: Uuid) -> Result<Vec<Uuid>> {
        let state = self.state.read().await;

        Ok(state
            .pairs(kind)
            .iter()
            .filter(|(o, _)| *o == owner)
            .map(|(_, target)| *target)
            .collect())
    }

    async fn shopping_list(&self, user_id: Uuid) -> Result<Vec<ShoppingListItem>> {
        let state = self.state.read().await;

        let mut items: Vec<ShoppingListItem> = Vec::new();
        let mut index: HashMap<(String, String), usize> = HashMap::new();

        let cart = state
            .pairs(Membership::ShoppingCart)
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, recipe_id)| *recipe_id);

        for recipe_id in cart {
            for line in state.lines.iter().filter(|l| l.recipe_id == recipe_id) {
                let Some(ingredient) = state.ingredient(line.ingredient_id) else {
                    continue;
                };
                let key = (ingredient.name.clone(), ingredient.measurement_unit.clone());
                match index.get(&key) {
                    Some(&i) => items[i].total_amount += i64::from(line.amount),
                    None => {
                        index.insert(key, items.len());
                        items.push(ShoppingListItem {
                            name: ingredient.name.clone(),
                            measurement_unit: ingredient.measurement_unit.clone(),
                            total_amount: i64::from(line.amount),
                        });
                    }
                }
            }
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> Image {
        Image {
            content_type: "image/png".to_string(),
            data: vec![0x89, b'P', b'N', b'G'],
        }
    }

    async fn seed(store: &MemoryStore) -> (User, Ingredient, Tag) {
        let user = store
            .create_user(NewUser {
                email: "cook@example.com".to_string(),
                username: "cook".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Cook".to_string(),
                is_staff: false,
            })
            .await
            .unwrap();
        let flour = store
            .create_ingredient(NewIngredient {
                name: "flour".to_string(),
                measurement_unit: "g".to_string(),
            })
            .await
            .unwrap();
        let tag = store
            .create_tag(NewTag {
                name: "Breakfast".to_string(),
                color: "#E26C2D".to_string(),
                slug: "breakfast".to_string(),
            })
            .await
            .unwrap();

        (user, flour, tag)
    }

    #[tokio::test]
    async fn duplicate_ingredient_name_and_unit_conflicts() {
        let store = MemoryStore::new();
        seed(&store).await;

        let err = store
            .create_ingredient(NewIngredient {
                name: "flour".to_string(),
                measurement_unit: "g".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        store
            .create_ingredient(NewIngredient {
                name: "flour".to_string(),
                measurement_unit: "kg".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn insert_with_unknown_tag_writes_nothing() {
        let store = MemoryStore::new();
        let (user, flour, _) = seed(&store).await;

        let err = store
            .insert_recipe(NewRecipe {
                author_user_id: user.user_id,
                name: "Bread".to_string(),
                text: "Bake it".to_string(),
                cooking_time: 60,
                image: png(),
                lines: vec![LineInput {
                    ingredient_id: flour.ingredient_id,
                    amount: 500,
                }],
                tag_ids: vec![Uuid::new_v4()],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert!(store
            .list_recipes(&RecipeFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn delete_cascades_to_dependent_rows() {
        let store = MemoryStore::new();
        let (user, flour, tag) = seed(&store).await;

        let recipe_id = store
            .insert_recipe(NewRecipe {
                author_user_id: user.user_id,
                name: "Bread".to_string(),
                text: "Bake it".to_string(),
                cooking_time: 60,
                image: png(),
                lines: vec![LineInput {
                    ingredient_id: flour.ingredient_id,
                    amount: 500,
                }],
                tag_ids: vec![tag.tag_id],
            })
            .await
            .unwrap();
        store
            .add_membership(Membership::Favorite, user.user_id, recipe_id)
            .await
            .unwrap();
        store
            .add_membership(Membership::ShoppingCart, user.user_id, recipe_id)
            .await
            .unwrap();

        assert!(store.delete_recipe(recipe_id).await.unwrap());

        let state = store.state.read().await;
        assert!(state.lines.is_empty());
        assert!(state.recipe_tags.is_empty());
        assert!(state.pairs(Membership::Favorite).is_empty());
        assert!(state.pairs(Membership::ShoppingCart).is_empty());
        drop(state);

        assert!(!store.delete_recipe(recipe_id).await.unwrap());
    }
}
