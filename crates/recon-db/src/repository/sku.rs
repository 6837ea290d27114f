//! # SKU Repository
//!
//! Catalog access plus the [`PriceLookup`] seam the ledger uses when an
//! action carries no usable price.
//!
//! ## Where the Catalog Shows Up
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Reports:     line_items LEFT JOIN skus → sku_code, item_name          │
//! │  Pricing:     explicit → record → PriceLookup (skus) → placeholder     │
//! │  Integrity:   line_items.sku_id and stock_movements.sku_id reference   │
//! │               skus(id)                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use recon_core::{Money, Sku};

const SKU_COLUMNS: &str = "id, tenant_id, code, name, unit_price_cents, created_at, updated_at";

// =============================================================================
// Price Lookup Seam
// =============================================================================

/// Source of a SKU's catalog price.
///
/// Runs on the operation's own connection so the lookup sees the same
/// snapshot as the rest of the transaction.
#[async_trait]
pub trait PriceLookup: Send + Sync {
    /// Returns the SKU's price, or `None` when the SKU has no known price.
    async fn unit_price(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        sku_id: &str,
    ) -> DbResult<Option<Money>>;
}

/// [`PriceLookup`] backed by the `skus` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteSkuPrices;

#[async_trait]
impl PriceLookup for SqliteSkuPrices {
    async fn unit_price(
        &self,
        conn: &mut SqliteConnection,
        tenant_id: &str,
        sku_id: &str,
    ) -> DbResult<Option<Money>> {
        let cents: Option<i64> = sqlx::query_scalar(
            "SELECT unit_price_cents FROM skus WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(sku_id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(cents.map(Money::from_cents).and_then(Money::positive))
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog operations.
#[derive(Debug, Clone)]
pub struct SkuRepository {
    pool: SqlitePool,
}

impl SkuRepository {
    /// Creates a new SkuRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SkuRepository { pool }
    }

    /// Adds a SKU to the tenant's catalog.
    pub async fn create(
        &self,
        tenant_id: &str,
        code: &str,
        name: &str,
        unit_price: Money,
    ) -> DbResult<Sku> {
        let now = Utc::now();
        let sku = Sku {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            code: code.to_string(),
            name: name.to_string(),
            unit_price_cents: unit_price.cents(),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %sku.id, code = %sku.code, "Inserting SKU");

        sqlx::query(
            r#"
            INSERT INTO skus (
                id, tenant_id, code, name, unit_price_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&sku.id)
        .bind(&sku.tenant_id)
        .bind(&sku.code)
        .bind(&sku.name)
        .bind(sku.unit_price_cents)
        .bind(sku.created_at)
        .bind(sku.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(sku)
    }

    /// Gets a SKU by ID.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Sku>> {
        let sku = sqlx::query_as::<_, Sku>(&format!(
            "SELECT {} FROM skus WHERE id = ?1 AND tenant_id = ?2",
            SKU_COLUMNS
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sku)
    }

    /// Gets a SKU by its catalog code.
    pub async fn get_by_code(&self, tenant_id: &str, code: &str) -> DbResult<Option<Sku>> {
        let sku = sqlx::query_as::<_, Sku>(&format!(
            "SELECT {} FROM skus WHERE code = ?1 AND tenant_id = ?2",
            SKU_COLUMNS
        ))
        .bind(code)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sku)
    }

    /// Updates the catalog price.
    ///
    /// ## Returns
    /// `false` when no such SKU exists.
    pub async fn update_price(&self, tenant_id: &str, id: &str, price: Money) -> DbResult<bool> {
        debug!(id = %id, price = %price, "Updating SKU price");

        let result = sqlx::query(
            "UPDATE skus SET unit_price_cents = ?1, updated_at = ?2 WHERE id = ?3 AND tenant_id = ?4",
        )
        .bind(price.cents())
        .bind(Utc::now())
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_create_and_fetch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.skus();

        let sku = repo
            .create("t-1", "SKU-001", "Hex Bolt M8", Money::from_cents(45))
            .await
            .unwrap();

        let by_id = repo.get_by_id("t-1", &sku.id).await.unwrap().unwrap();
        assert_eq!(by_id.code, "SKU-001");
        assert_eq!(by_id.unit_price().cents(), 45);

        let by_code = repo.get_by_code("t-1", "SKU-001").await.unwrap();
        assert_eq!(by_code.map(|s| s.id), Some(sku.id.clone()));

        // Other tenants don't see it
        assert!(repo.get_by_id("t-2", &sku.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.skus();

        repo.create("t-1", "SKU-001", "A", Money::zero()).await.unwrap();
        let err = repo
            .create("t-1", "SKU-001", "B", Money::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_price_lookup_ignores_non_positive_prices() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.skus();
        let free = repo.create("t-1", "SKU-0", "Free", Money::zero()).await.unwrap();
        let priced = repo
            .create("t-1", "SKU-1", "Priced", Money::from_cents(120))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let lookup = SqliteSkuPrices;
        assert_eq!(lookup.unit_price(&mut conn, "t-1", &free.id).await.unwrap(), None);
        assert_eq!(
            lookup.unit_price(&mut conn, "t-1", &priced.id).await.unwrap(),
            Some(Money::from_cents(120))
        );
        assert_eq!(lookup.unit_price(&mut conn, "t-1", "missing").await.unwrap(), None);
        drop(conn);

        assert!(repo
            .update_price("t-1", &free.id, Money::from_cents(5))
            .await
            .unwrap());
        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(
            lookup.unit_price(&mut conn, "t-1", &free.id).await.unwrap(),
            Some(Money::from_cents(5))
        );
    }
}
