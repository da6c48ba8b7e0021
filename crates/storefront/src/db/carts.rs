//! `PostgreSQL` implementation of the cart store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use heartwood_core::cart::{CabinetOptions, CartLineItem, CartScope, CartSession};
use heartwood_core::{CartSessionId, CustomerId, LineItemId, ProductTypeId};

use crate::services::carts::{CartStore, CartStoreError, NewLineItem};

impl From<sqlx::Error> for CartStoreError {
    fn from(error: sqlx::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

/// Cart store backed by the `cart_sessions` / `cart_line_items` tables.
#[derive(Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lines_for(&self, session: CartSessionId) -> Result<Vec<CartLineItem>, CartStoreError> {
        let rows = sqlx::query_as::<_, LineRow>(
            "SELECT id, product_type_id, finish, color, hardware, quantity, unit_price
             FROM cart_line_items
             WHERE cart_session_id = $1
             ORDER BY id",
        )
        .bind(session)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LineRow::into_line).collect()
    }

    async fn hydrate(&self, row: SessionRow) -> Result<CartSession, CartStoreError> {
        let lines = self.lines_for(row.id).await?;
        row.into_session(lines)
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn sessions_for_customer(
        &self,
        customer: CustomerId,
    ) -> Result<Vec<CartSession>, CartStoreError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "SELECT id, customer_id, anonymous_token, created_at
             FROM cart_sessions
             WHERE customer_id = $1
             ORDER BY created_at, id",
        )
        .bind(customer)
        .fetch_all(&self.pool)
        .await?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            sessions.push(self.hydrate(row).await?);
        }
        Ok(sessions)
    }

    async fn find_session(
        &self,
        scope: &CartScope,
    ) -> Result<Option<CartSession>, CartStoreError> {
        let row = match scope {
            CartScope::Customer(customer) => {
                sqlx::query_as::<_, SessionRow>(
                    "SELECT id, customer_id, anonymous_token, created_at
                     FROM cart_sessions
                     WHERE customer_id = $1
                     ORDER BY created_at, id
                     LIMIT 1",
                )
                .bind(*customer)
                .fetch_optional(&self.pool)
                .await?
            }
            CartScope::Anonymous(token) => {
                sqlx::query_as::<_, SessionRow>(
                    "SELECT id, customer_id, anonymous_token, created_at
                     FROM cart_sessions
                     WHERE anonymous_token = $1
                     LIMIT 1",
                )
                .bind(*token)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn create_session(&self, scope: CartScope) -> Result<CartSession, CartStoreError> {
        let (customer_id, anonymous_token) = match &scope {
            CartScope::Customer(customer) => (Some(*customer), None),
            CartScope::Anonymous(token) => (None, Some(*token)),
        };

        let row = sqlx::query_as::<_, SessionRow>(
            "INSERT INTO cart_sessions (customer_id, anonymous_token)
             VALUES ($1, $2)
             RETURNING id, customer_id, anonymous_token, created_at",
        )
        .bind(customer_id)
        .bind(anonymous_token)
        .fetch_one(&self.pool)
        .await?;

        row.into_session(Vec::new())
    }

    async fn add_line(
        &self,
        session: CartSessionId,
        line: NewLineItem,
    ) -> Result<CartLineItem, CartStoreError> {
        let quantity = quantity_to_db(line.quantity)?;
        let row = sqlx::query_as::<_, LineRow>(
            "INSERT INTO cart_line_items
                 (cart_session_id, product_type_id, finish, color, hardware, quantity, unit_price)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, product_type_id, finish, color, hardware, quantity, unit_price",
        )
        .bind(session)
        .bind(line.product_type)
        .bind(&line.options.finish)
        .bind(&line.options.color)
        .bind(&line.options.hardware)
        .bind(quantity)
        .bind(line.unit_price)
        .fetch_one(&self.pool)
        .await?;

        row.into_line()
    }

    async fn update_line_quantity(
        &self,
        line: LineItemId,
        quantity: u32,
    ) -> Result<(), CartStoreError> {
        let quantity = quantity_to_db(quantity)?;
        let result = sqlx::query("UPDATE cart_line_items SET quantity = $1 WHERE id = $2")
            .bind(quantity)
            .bind(line)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CartStoreError::LineNotFound(line));
        }
        Ok(())
    }

    async fn remove_line(&self, line: LineItemId) -> Result<(), CartStoreError> {
        let result = sqlx::query("DELETE FROM cart_line_items WHERE id = $1")
            .bind(line)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CartStoreError::LineNotFound(line));
        }
        Ok(())
    }

    async fn claim_session(
        &self,
        session: CartSessionId,
        customer: CustomerId,
    ) -> Result<(), CartStoreError> {
        let result = sqlx::query(
            "UPDATE cart_sessions SET customer_id = $1, anonymous_token = NULL WHERE id = $2",
        )
        .bind(customer)
        .bind(session)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CartStoreError::SessionNotFound(session));
        }
        Ok(())
    }

    async fn merge_sessions(
        &self,
        canonical: CartSessionId,
        lines: Option<Vec<CartLineItem>>,
        extras: Vec<CartSessionId>,
    ) -> Result<(), CartStoreError> {
        // One transaction; an early return rolls everything back.
        let mut tx = self.pool.begin().await?;

        if let Some(lines) = lines {
            sqlx::query("DELETE FROM cart_line_items WHERE cart_session_id = $1")
                .bind(canonical)
                .execute(&mut *tx)
                .await?;

            for line in lines {
                let quantity = quantity_to_db(line.quantity)?;
                sqlx::query(
                    "INSERT INTO cart_line_items
                         (cart_session_id, product_type_id, finish, color, hardware, quantity, unit_price)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)",
                )
                .bind(canonical)
                .bind(line.product_type)
                .bind(&line.options.finish)
                .bind(&line.options.color)
                .bind(&line.options.hardware)
                .bind(quantity)
                .bind(line.unit_price)
                .execute(&mut *tx)
                .await?;
            }
        }

        for extra in extras {
            // Lines cascade via the foreign key
            let result = sqlx::query("DELETE FROM cart_sessions WHERE id = $1")
                .bind(extra)
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(CartStoreError::SessionNotFound(extra));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

fn quantity_to_db(quantity: u32) -> Result<i32, CartStoreError> {
    i32::try_from(quantity)
        .map_err(|_| CartStoreError::Storage(format!("quantity out of range: {quantity}")))
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: CartSessionId,
    customer_id: Option<CustomerId>,
    anonymous_token: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self, lines: Vec<CartLineItem>) -> Result<CartSession, CartStoreError> {
        let scope = match (self.customer_id, self.anonymous_token) {
            (Some(customer), _) => CartScope::Customer(customer),
            (None, Some(token)) => CartScope::Anonymous(token),
            (None, None) => {
                return Err(CartStoreError::Storage(format!(
                    "cart session {} has no scope",
                    self.id
                )));
            }
        };

        Ok(CartSession {
            id: self.id,
            scope,
            created_at: self.created_at,
            lines,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LineRow {
    id: LineItemId,
    product_type_id: ProductTypeId,
    finish: String,
    color: String,
    hardware: String,
    quantity: i32,
    unit_price: Decimal,
}

impl LineRow {
    fn into_line(self) -> Result<CartLineItem, CartStoreError> {
        let quantity = u32::try_from(self.quantity).map_err(|_| {
            CartStoreError::Storage(format!("line {} has negative quantity", self.id))
        })?;

        Ok(CartLineItem {
            id: self.id,
            product_type: self.product_type_id,
            options: CabinetOptions {
                finish: self.finish,
                color: self.color,
                hardware: self.hardware,
            },
            quantity,
            unit_price: self.unit_price,
        })
    }
}
