//! Cart repository for admin impersonation edits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use heartwood_core::{CartSessionId, CustomerId, LineItemId, ProductTypeId};

use super::RepositoryError;

/// A customer's cart as the admin portal sees it.
#[derive(Debug, Serialize)]
pub struct AdminCartView {
    pub session_id: CartSessionId,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<AdminCartLine>,
}

/// One editable line in an impersonated customer's cart.
#[derive(Debug, Serialize)]
pub struct AdminCartLine {
    pub id: LineItemId,
    pub product_type_id: ProductTypeId,
    pub finish: String,
    pub color: String,
    pub hardware: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: CartSessionId,
    customer_id: CustomerId,
    created_at: DateTime<Utc>,
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

impl TryFrom<LineRow> for AdminCartLine {
    type Error = RepositoryError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("line {} has negative quantity", row.id))
        })?;

        Ok(Self {
            id: row.id,
            product_type_id: row.product_type_id,
            finish: row.finish,
            color: row.color,
            hardware: row.hardware,
            quantity,
            unit_price: row.unit_price,
        })
    }
}

/// Repository for cart edits made on behalf of an impersonated customer.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the customer's cart, oldest session first.
    ///
    /// Consolidation keeps authenticated customers at one session, so the
    /// oldest session is the canonical one. Returns `Ok(None)` when the
    /// customer has no cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on database failure or corrupt rows.
    pub async fn cart_for_customer(
        &self,
        customer: CustomerId,
    ) -> Result<Option<AdminCartView>, RepositoryError> {
        let session = sqlx::query_as::<_, SessionRow>(
            "SELECT id, customer_id, created_at
             FROM cart_sessions
             WHERE customer_id = $1
             ORDER BY created_at, id
             LIMIT 1",
        )
        .bind(customer)
        .fetch_optional(self.pool)
        .await?;

        let Some(session) = session else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, LineRow>(
            "SELECT id, product_type_id, finish, color, hardware, quantity, unit_price
             FROM cart_line_items
             WHERE cart_session_id = $1
             ORDER BY id",
        )
        .bind(session.id)
        .fetch_all(self.pool)
        .await?;

        let lines = rows
            .into_iter()
            .map(AdminCartLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(AdminCartView {
            session_id: session.id,
            customer_id: session.customer_id,
            created_at: session.created_at,
            lines,
        }))
    }

    /// Update a line's quantity, scoped to the customer's own sessions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist or
    /// belongs to a different customer.
    pub async fn update_line_quantity(
        &self,
        customer: CustomerId,
        line: LineItemId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let quantity = i32::try_from(quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("quantity out of range: {quantity}"))
        })?;

        let result = sqlx::query(
            "UPDATE cart_line_items SET quantity = $1
             WHERE id = $2
               AND cart_session_id IN
                   (SELECT id FROM cart_sessions WHERE customer_id = $3)",
        )
        .bind(quantity)
        .bind(line)
        .bind(customer)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove a line, scoped to the customer's own sessions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist or
    /// belongs to a different customer.
    pub async fn remove_line(
        &self,
        customer: CustomerId,
        line: LineItemId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM cart_line_items
             WHERE id = $1
               AND cart_session_id IN
                   (SELECT id FROM cart_sessions WHERE customer_id = $2)",
        )
        .bind(line)
        .bind(customer)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
