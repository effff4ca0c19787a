use uuid::Uuid;

use crate::models::{Recipe, User};

/// The authenticated user an operation runs on behalf of.
///
/// Permission checks go through this value instead of any ambient setting:
/// authors may change their own recipes, staff may change any recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    user: User,
}

impl Actor {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn user_id(&self) -> Uuid {
        self.user.user_id
    }

    pub fn is_author(&self, recipe: &Recipe) -> bool {
        recipe.author_user_id == self.user.user_id
    }

    pub fn can_modify(&self, recipe: &Recipe) -> bool {
        self.is_author(recipe) || self.user.is_staff
    }
}

impl From<User> for Actor {
    fn from(user: User) -> Self {
        Self::new(user)
    }
}
