use pantry::{models::Membership, Error, Result};
use uuid::Uuid;

use crate::{errors::classify, store::PgStore};

struct PairTable {
    table: &'static str,
    owner: &'static str,
    target: &'static str,
}

fn pair_table(kind: Membership) -> PairTable {
    match kind {
        Membership::Favorite => PairTable {
            table: "favorites",
            owner: "user_id",
            target: "recipe_id",
        },
        Membership::ShoppingCart => PairTable {
            table: "shopping_cart_items",
            owner: "user_id",
            target: "recipe_id",
        },
        Membership::Follow => PairTable {
            table: "follows",
            owner: "user_id",
            target: "author_user_id",
        },
    }
}

impl PgStore {
    /// The primary key on `(owner, target)` turns concurrent duplicate adds
    /// into a `Conflict`.
    pub(crate) async fn insert_pair(
        &self,
        kind: Membership,
        owner: Uuid,
        target: Uuid,
    ) -> Result<()> {
        let PairTable {
            table,
            owner: owner_col,
            target: target_col,
        } = pair_table(kind);
        let sql = format!("INSERT INTO {table} ({owner_col}, {target_col}) VALUES ($1, $2)");

        sqlx::query(&sql)
            .bind(owner)
            .bind(target)
            .execute(self.pool())
            .await
            .map_err(|e| classify(e, kind.label()))?;

        Ok(())
    }

    pub(crate) async fn delete_pair(
        &self,
        kind: Membership,
        owner: Uuid,
        target: Uuid,
    ) -> Result<bool> {
        let PairTable {
            table,
            owner: owner_col,
            target: target_col,
        } = pair_table(kind);
        let sql = format!("DELETE FROM {table} WHERE {owner_col} = $1 AND {target_col} = $2");

        let deleted = sqlx::query(&sql)
            .bind(owner)
            .bind(target)
            .execute(self.pool())
            .await
            .map_err(Error::storage)?
            .rows_affected();

        Ok(deleted > 0)
    }

    pub(crate) async fn pair_exists(
        &self,
        kind: Membership,
        owner: Uuid,
        target: Uuid,
    ) -> Result<bool> {
        let PairTable {
            table,
            owner: owner_col,
            target: target_col,
        } = pair_table(kind);
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {table} WHERE {owner_col} = $1 AND {target_col} = $2)"
        );

        sqlx::query_scalar(&sql)
            .bind(owner)
            .bind(target)
            .fetch_one(self.pool())
            .await
            .map_err(Error::storage)
    }

    pub(crate) async fn pair_targets(&self, kind: Membership, owner: Uuid) -> Result<Vec<Uuid>> {
        let PairTable {
            table,
            owner: owner_col,
            target: target_col,
        } = pair_table(kind);
        let sql = format!(
            "SELECT {target_col} FROM {table} WHERE {owner_col} = $1 \
             ORDER BY created_at, {target_col}"
        );

        sqlx::query_scalar(&sql)
            .bind(owner)
            .fetch_all(self.pool())
            .await
            .map_err(Error::storage)
    }
}
