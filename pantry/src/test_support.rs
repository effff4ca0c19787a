use uuid::Uuid;

use crate::{
    actor::Actor,
    catalog,
    memory::MemoryStore,
    models::{Ingredient, LineInput, NewIngredient, NewTag, NewUser, Tag, User},
    recipe::{self, RecipeDraft, RecipeView},
    users,
};

pub(crate) const PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

/// A seeded in-memory store: three users (one staff), a few ingredients and
/// two tags.
pub(crate) struct Kitchen {
    pub store: MemoryStore,
    pub alice: User,
    pub bob: User,
    pub boss: User,
    pub flour: Ingredient,
    pub sugar: Ingredient,
    pub butter: Ingredient,
    pub breakfast: Tag,
    pub dessert: Tag,
}

async fn user(store: &MemoryStore, username: &str, is_staff: bool) -> User {
    let (user, _token) = users::register(
        store,
        NewUser {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: username.to_string(),
            last_name: "Cook".to_string(),
            is_staff,
        },
    )
    .await
    .unwrap();
    user
}

async fn ingredient(store: &MemoryStore, name: &str, unit: &str) -> Ingredient {
    catalog::create_ingredient(
        store,
        NewIngredient {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        },
    )
    .await
    .unwrap()
}

async fn tag(store: &MemoryStore, name: &str, color: &str) -> Tag {
    catalog::create_tag(
        store,
        NewTag {
            name: name.to_string(),
            color: color.to_string(),
            slug: name.to_lowercase(),
        },
    )
    .await
    .unwrap()
}

impl Kitchen {
    pub async fn new() -> Self {
        let store = MemoryStore::new();

        Self {
            alice: user(&store, "alice", false).await,
            bob: user(&store, "bob", false).await,
            boss: user(&store, "boss", true).await,
            flour: ingredient(&store, "flour", "g").await,
            sugar: ingredient(&store, "sugar", "g").await,
            butter: ingredient(&store, "butter", "g").await,
            breakfast: tag(&store, "Breakfast", "#E26C2D").await,
            dessert: tag(&store, "Dessert", "#8775D2").await,
            store,
        }
    }

    pub fn author(&self) -> Actor {
        Actor::new(self.alice.clone())
    }

    pub fn stranger(&self) -> Actor {
        Actor::new(self.bob.clone())
    }

    pub fn staff(&self) -> Actor {
        Actor::new(self.boss.clone())
    }

    pub fn draft(&self, lines: &[(Uuid, i32)], tags: &[Uuid]) -> RecipeDraft {
        RecipeDraft {
            name: "Pancakes".to_string(),
            text: "Mix and fry.".to_string(),
            cooking_time: 20,
            image: Some(PNG_DATA_URI.to_string()),
            ingredients: lines
                .iter()
                .map(|&(ingredient_id, amount)| LineInput {
                    ingredient_id,
                    amount,
                })
                .collect(),
            tags: tags.to_vec(),
        }
    }

    /// Creates a breakfast recipe authored by alice.
    pub async fn recipe(&self, lines: &[(Uuid, i32)]) -> RecipeView {
        recipe::create(&self.store, &self.author(), self.draft(lines, &[self.breakfast.tag_id]))
            .await
            .unwrap()
    }

    pub async fn recipe_by(&self, author: &User, lines: &[(Uuid, i32)]) -> RecipeView {
        recipe::create(
            &self.store,
            &Actor::new(author.clone()),
            self.draft(lines, &[self.dessert.tag_id]),
        )
        .await
        .unwrap()
    }
}
