use std::fmt::Write as _;

use crate::{actor::Actor, error::Result, models::ShoppingListItem, store::Store};

pub const FILENAME: &str = "shopping_list.txt";
const HEADER: &str = "Shopping list";

/// Ingredients of every recipe in a user's cart, grouped by
/// `(name, measurement unit)` with amounts summed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    pub items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Plain-text attachment body: a header line, then `name (unit) - total`.
    pub fn render(&self) -> String {
        let mut out = String::from(HEADER);
        out.push('\n');
        for item in &self.items {
            let _ = writeln!(
                out,
                "{} ({}) - {}",
                item.name, item.measurement_unit, item.total_amount
            );
        }
        out
    }
}

#[tracing::instrument(skip(store, actor), fields(user = %actor.user_id()), err)]
pub async fn compile(store: &dyn Store, actor: &Actor) -> Result<ShoppingList> {
    let items = store.shopping_list(actor.user_id()).await?;

    tracing::debug!(groups = items.len(), "compiled shopping list");

    Ok(ShoppingList { items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{membership, test_support::Kitchen};

    #[tokio::test]
    async fn sums_same_ingredient_across_recipes() {
        let kitchen = Kitchen::new().await;
        let a = kitchen.recipe(&[(kitchen.flour.ingredient_id, 200)]).await;
        let b = kitchen
            .recipe(&[
                (kitchen.flour.ingredient_id, 300),
                (kitchen.sugar.ingredient_id, 50),
            ])
            .await;
        let shopper = kitchen.stranger();
        for recipe_id in [a.id, b.id] {
            membership::add_to_cart(&kitchen.store, &shopper, recipe_id)
                .await
                .unwrap();
        }

        let list = compile(&kitchen.store, &shopper).await.unwrap();

        assert_eq!(
            list.items,
            vec![
                ShoppingListItem {
                    name: "flour".to_string(),
                    measurement_unit: "g".to_string(),
                    total_amount: 500,
                },
                ShoppingListItem {
                    name: "sugar".to_string(),
                    measurement_unit: "g".to_string(),
                    total_amount: 50,
                },
            ]
        );
        assert_eq!(list.render(), "Shopping list\nflour (g) - 500\nsugar (g) - 50\n");
    }

    #[tokio::test]
    async fn empty_cart_renders_only_the_header() {
        let kitchen = Kitchen::new().await;
        kitchen.recipe(&[(kitchen.flour.ingredient_id, 200)]).await;

        let list = compile(&kitchen.store, &kitchen.author()).await.unwrap();

        assert!(list.is_empty());
        assert_eq!(list.render(), "Shopping list\n");
    }

    #[tokio::test]
    async fn different_units_stay_separate_groups() {
        let kitchen = Kitchen::new().await;
        let flour_kg = crate::catalog::create_ingredient(
            &kitchen.store,
            crate::models::NewIngredient {
                name: "flour".to_string(),
                measurement_unit: "kg".to_string(),
            },
        )
        .await
        .unwrap();
        let a = kitchen.recipe(&[(kitchen.flour.ingredient_id, 200)]).await;
        let b = kitchen.recipe(&[(flour_kg.ingredient_id, 1)]).await;
        for recipe_id in [a.id, b.id] {
            membership::add_to_cart(&kitchen.store, &kitchen.author(), recipe_id)
                .await
                .unwrap();
        }

        let list = compile(&kitchen.store, &kitchen.author()).await.unwrap();

        assert_eq!(list.items.len(), 2);
        assert!(list.items.iter().all(|item| item.name == "flour"));
    }
}
