use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pantry::{
    models::{
        Image, Ingredient, LineInput, NewRecipe, Recipe, RecipeChanges, RecipeFilter, RecipeLine,
        ShoppingListItem, Tag,
    },
    Error, Result,
};
use sqlx::{PgConnection, Postgres, Transaction};
use uuid::Uuid;

use crate::{errors::classify, store::PgStore};

#[derive(Debug, sqlx::FromRow)]
struct RecipeRow {
    recipe_id: Uuid,
    author_user_id: Uuid,
    name: String,
    text: String,
    cooking_time: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    recipe_id: Uuid,
    ingredient_id: Uuid,
    name: String,
    measurement_unit: String,
    amount: i32,
}

#[derive(Debug, sqlx::FromRow)]
struct RecipeTagRow {
    recipe_id: Uuid,
    tag_id: Uuid,
    name: String,
    color: String,
    slug: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ShoppingRow {
    name: String,
    measurement_unit: String,
    total_amount: i64,
}

/// Writes lines (keeping input order in `position`) and tags for a recipe
/// whose previous composition, if any, has already been removed.
async fn write_composition(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    lines: &[LineInput],
    tag_ids: &[Uuid],
) -> Result<()> {
    let ingredient_ids: Vec<Uuid> = lines.iter().map(|l| l.ingredient_id).collect();
    let amounts: Vec<i32> = lines.iter().map(|l| l.amount).collect();

    sqlx::query(
        r"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount, position)
        SELECT $1, line.ingredient_id, line.amount, (line.ord - 1)::int
        FROM UNNEST($2::uuid[], $3::int[]) WITH ORDINALITY AS line(ingredient_id, amount, ord)
        ",
    )
    .bind(recipe_id)
    .bind(&ingredient_ids)
    .bind(&amounts)
    .execute(&mut *conn)
    .await
    .map_err(|e| classify(e, "recipe ingredient"))?;

    sqlx::query(
        r"
        INSERT INTO recipe_tags (recipe_id, tag_id)
        SELECT $1, UNNEST($2::uuid[])
        ",
    )
    .bind(recipe_id)
    .bind(tag_ids)
    .execute(&mut *conn)
    .await
    .map_err(|e| classify(e, "recipe tag"))?;

    Ok(())
}

/// Attaches lines and tags to recipe rows with one query each.
async fn compose(conn: &mut PgConnection, rows: Vec<RecipeRow>) -> Result<Vec<Recipe>> {
    let recipe_ids: Vec<Uuid> = rows.iter().map(|r| r.recipe_id).collect();

    let lines = sqlx::query_as::<_, LineRow>(
        r"
        SELECT ri.recipe_id, i.ingredient_id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        JOIN ingredients i ON i.ingredient_id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.recipe_id, ri.position
        ",
    )
    .bind(&recipe_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(Error::storage)?;

    let tags = sqlx::query_as::<_, RecipeTagRow>(
        r"
        SELECT rt.recipe_id, t.tag_id, t.name, t.color, t.slug
        FROM recipe_tags rt
        JOIN tags t ON t.tag_id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.name
        ",
    )
    .bind(&recipe_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(Error::storage)?;

    let mut lines_by_recipe: HashMap<Uuid, Vec<RecipeLine>> = HashMap::new();
    for line in lines {
        lines_by_recipe
            .entry(line.recipe_id)
            .or_default()
            .push(RecipeLine {
                ingredient: Ingredient {
                    ingredient_id: line.ingredient_id,
                    name: line.name,
                    measurement_unit: line.measurement_unit,
                },
                amount: line.amount,
            });
    }

    let mut tags_by_recipe: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for tag in tags {
        tags_by_recipe.entry(tag.recipe_id).or_default().push(Tag {
            tag_id: tag.tag_id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        });
    }

    Ok(rows
        .into_iter()
        .map(|row| Recipe {
            ingredients: lines_by_recipe.remove(&row.recipe_id).unwrap_or_default(),
            tags: tags_by_recipe.remove(&row.recipe_id).unwrap_or_default(),
            recipe_id: row.recipe_id,
            author_user_id: row.author_user_id,
            name: row.name,
            text: row.text,
            cooking_time: row.cooking_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .collect())
}

/// Loads one recipe with its composition. Callers pass a snapshot so the row,
/// lines and tags all come from the same committed state.
pub(crate) async fn fetch_recipe(
    conn: &mut PgConnection,
    recipe_id: Uuid,
) -> Result<Option<Recipe>> {
    let row = sqlx::query_as::<_, RecipeRow>(
        r"
        SELECT recipe_id, author_user_id, name, text, cooking_time, created_at, updated_at
        FROM recipes
        WHERE recipe_id = $1
        ",
    )
    .bind(recipe_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(Error::storage)?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(compose(conn, vec![row]).await?.pop())
}

impl PgStore {
    /// A read-only transaction whose statements all see one snapshot.
    pub(crate) async fn read_snapshot(&self) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self.pool().begin().await.map_err(Error::storage)?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(Error::storage)?;

        Ok(tx)
    }

    #[tracing::instrument(skip(self, recipe), fields(author = %recipe.author_user_id), err)]
    pub(crate) async fn insert_recipe_row(&self, recipe: NewRecipe) -> Result<Uuid> {
        let mut tx = self.pool().begin().await.map_err(Error::storage)?;

        let recipe_id: Uuid = sqlx::query_scalar(
            r"
            INSERT INTO recipes
                (author_user_id, name, text, cooking_time, image_content_type, image_data)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING recipe_id
            ",
        )
        .bind(recipe.author_user_id)
        .bind(&recipe.name)
        .bind(&recipe.text)
        .bind(recipe.cooking_time)
        .bind(&recipe.image.content_type)
        .bind(&recipe.image.data)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, "recipe"))?;

        write_composition(&mut tx, recipe_id, &recipe.lines, &recipe.tag_ids).await?;

        tx.commit().await.map_err(Error::storage)?;

        Ok(recipe_id)
    }

    #[tracing::instrument(skip(self, changes), err)]
    pub(crate) async fn replace_recipe_rows(
        &self,
        recipe_id: Uuid,
        changes: RecipeChanges,
    ) -> Result<()> {
        let mut tx = self.pool().begin().await.map_err(Error::storage)?;

        let (content_type, data) = match changes.image {
            Some(Image { content_type, data }) => (Some(content_type), Some(data)),
            None => (None, None),
        };
        let updated = sqlx::query(
            r"
            UPDATE recipes
            SET name = $2,
                text = $3,
                cooking_time = $4,
                image_content_type = COALESCE($5, image_content_type),
                image_data = COALESCE($6, image_data),
                updated_at = NOW()
            WHERE recipe_id = $1
            ",
        )
        .bind(recipe_id)
        .bind(&changes.name)
        .bind(&changes.text)
        .bind(changes.cooking_time)
        .bind(content_type)
        .bind(data)
        .execute(&mut *tx)
        .await
        .map_err(|e| classify(e, "recipe"))?;

        if updated.rows_affected() == 0 {
            return Err(Error::not_found("recipe"));
        }

        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::storage)?;
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::storage)?;

        write_composition(&mut tx, recipe_id, &changes.lines, &changes.tag_ids).await?;

        tx.commit().await.map_err(Error::storage)?;

        Ok(())
    }

    pub(crate) async fn recipe_by_id(&self, recipe_id: Uuid) -> Result<Option<Recipe>> {
        let mut tx = self.read_snapshot().await?;
        let recipe = fetch_recipe(&mut tx, recipe_id).await?;
        tx.commit().await.map_err(Error::storage)?;

        Ok(recipe)
    }

    pub(crate) async fn recipe_image(&self, recipe_id: Uuid) -> Result<Option<Image>> {
        let row: Option<(String, Vec<u8>)> = sqlx::query_as(
            "SELECT image_content_type, image_data FROM recipes WHERE recipe_id = $1",
        )
        .bind(recipe_id)
        .fetch_optional(self.pool())
        .await
        .map_err(Error::storage)?;

        Ok(row.map(|(content_type, data)| Image { content_type, data }))
    }

    pub(crate) async fn filter_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
        let limit = filter
            .limit
            .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));

        let mut tx = self.read_snapshot().await?;

        let rows = sqlx::query_as::<_, RecipeRow>(
            r"
            SELECT r.recipe_id, r.author_user_id, r.name, r.text, r.cooking_time,
                   r.created_at, r.updated_at
            FROM recipes r
            WHERE ($1::uuid IS NULL OR r.author_user_id = $1)
              AND (
                CARDINALITY($2::text[]) = 0
                OR EXISTS (
                  SELECT 1
                  FROM recipe_tags rt
                  JOIN tags t ON t.tag_id = rt.tag_id
                  WHERE rt.recipe_id = r.recipe_id AND t.slug = ANY($2)
                )
              )
              AND ($3::uuid IS NULL OR EXISTS (
                SELECT 1 FROM favorites f WHERE f.recipe_id = r.recipe_id AND f.user_id = $3
              ))
              AND ($4::uuid IS NULL OR EXISTS (
                SELECT 1
                FROM shopping_cart_items c
                WHERE c.recipe_id = r.recipe_id AND c.user_id = $4
              ))
            ORDER BY r.created_at DESC, r.recipe_id DESC
            LIMIT $5
            ",
        )
        .bind(filter.author)
        .bind(&filter.tags)
        .bind(filter.favorited_by)
        .bind(filter.in_cart_of)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await
        .map_err(Error::storage)?;

        let recipes = compose(&mut tx, rows).await?;
        tx.commit().await.map_err(Error::storage)?;

        Ok(recipes)
    }

    pub(crate) async fn recipes_by_author_count(&self, author_user_id: Uuid) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE author_user_id = $1")
            .bind(author_user_id)
            .fetch_one(self.pool())
            .await
            .map_err(Error::storage)
    }

    /// Removes every row that depends on the recipe before the recipe itself,
    /// in one transaction.
    #[tracing::instrument(skip(self), err)]
    pub(crate) async fn delete_recipe_rows(&self, recipe_id: Uuid) -> Result<bool> {
        let mut tx = self.pool().begin().await.map_err(Error::storage)?;

        for statement in [
            "DELETE FROM favorites WHERE recipe_id = $1",
            "DELETE FROM shopping_cart_items WHERE recipe_id = $1",
            "DELETE FROM recipe_ingredients WHERE recipe_id = $1",
            "DELETE FROM recipe_tags WHERE recipe_id = $1",
        ] {
            sqlx::query(statement)
                .bind(recipe_id)
                .execute(&mut *tx)
                .await
                .map_err(Error::storage)?;
        }

        let deleted = sqlx::query("DELETE FROM recipes WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::storage)?
            .rows_affected();

        tx.commit().await.map_err(Error::storage)?;

        Ok(deleted > 0)
    }

    /// Groups in SQL; group order is whatever `GROUP BY` yields.
    pub(crate) async fn cart_totals(&self, user_id: Uuid) -> Result<Vec<ShoppingListItem>> {
        let rows = sqlx::query_as::<_, ShoppingRow>(
            r"
            SELECT i.name, i.measurement_unit, SUM(ri.amount)::bigint AS total_amount
            FROM shopping_cart_items c
            JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
            JOIN ingredients i ON i.ingredient_id = ri.ingredient_id
            WHERE c.user_id = $1
            GROUP BY i.name, i.measurement_unit
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(Error::storage)?;

        Ok(rows
            .into_iter()
            .map(|row| ShoppingListItem {
                name: row.name,
                measurement_unit: row.measurement_unit,
                total_amount: row.total_amount,
            })
            .collect())
    }
}
