//! Database service for entitlement-service.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions, Postgres};
use sqlx::Transaction;
use std::time::Duration as StdDuration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::MeteringError;
use crate::models::{
    Account, BillingPeriod, NewPaymentRecord, PaymentRecord, ResourceType, SubscriptionStatus,
    Tier, UsageEvent, DEFAULT_PERIOD_DAYS,
};
use crate::services::catalog;
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{EntitlementStore, RecordOutcome};

const ACCOUNT_COLUMNS: &str = "account_id, tier, status, processor_customer_ref, processor_subscription_ref, created_utc, updated_utc";
const PERIOD_COLUMNS: &str = "period_id, account_id, period_start, period_end, created_utc";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "entitlement-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(StdDuration::from_secs(30))
            .idle_timeout(StdDuration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Insert the Free-tier default row if the account is unseen, then
    /// return the locked row. Callers own the transaction.
    async fn lock_account_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
    ) -> Result<Account, AppError> {
        sqlx::query("INSERT INTO accounts (account_id) VALUES ($1) ON CONFLICT (account_id) DO NOTHING")
            .bind(account_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to ensure account: {}", e)))?;

        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1 FOR UPDATE"
        ))
        .bind(account_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to lock account: {}", e)))?;

        Ok(account)
    }

    /// The period containing `now`, opened lazily under the caller's
    /// account lock when missing or lapsed.
    async fn current_period_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<BillingPeriod, AppError> {
        let existing = sqlx::query_as::<_, BillingPeriod>(&format!(
            r#"
            SELECT {PERIOD_COLUMNS}
            FROM billing_periods
            WHERE account_id = $1 AND period_start <= $2 AND period_end > $2
            ORDER BY period_start DESC
            LIMIT 1
            "#
        ))
        .bind(account_id)
        .bind(now)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get current period: {}", e))
        })?;

        if let Some(period) = existing {
            return Ok(period);
        }

        let period = sqlx::query_as::<_, BillingPeriod>(&format!(
            r#"
            INSERT INTO billing_periods (period_id, account_id, period_start, period_end)
            VALUES ($1, $2, $3, $4)
            RETURNING {PERIOD_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(now)
        .bind(now + Duration::days(DEFAULT_PERIOD_DAYS))
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to open period: {}", e)))?;

        info!(account_id = %account_id, period_id = %period.period_id, "Opened default billing period");
        Ok(period)
    }

    async fn latest_period_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
    ) -> Result<Option<BillingPeriod>, AppError> {
        sqlx::query_as::<_, BillingPeriod>(&format!(
            r#"
            SELECT {PERIOD_COLUMNS}
            FROM billing_periods
            WHERE account_id = $1
            ORDER BY period_start DESC
            LIMIT 1
            "#
        ))
        .bind(account_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get latest period: {}", e))
        })
    }

    async fn usage_total_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
        resource: ResourceType,
        period_id: Uuid,
    ) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(quantity), 0)
            FROM usage_events
            WHERE account_id = $1 AND resource_type = $2 AND period_id = $3
            "#,
        )
        .bind(account_id)
        .bind(resource.as_str())
        .bind(period_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to aggregate usage: {}", e)))
    }

    fn begin_error(e: sqlx::Error) -> AppError {
        AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
    }

    fn commit_error(e: sqlx::Error) -> AppError {
        AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
    }
}

#[async_trait]
impl EntitlementStore for Database {
    /// Check database health.
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn fetch_account(&self, account_id: Uuid) -> Result<Option<Account>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_account"])
            .start_timer();

        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to fetch account: {}", e)))?;

        timer.observe_duration();
        Ok(account)
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn ensure_account(&self, account_id: Uuid) -> Result<Account, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["ensure_account"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(Self::begin_error)?;
        let account = self.lock_account_in_tx(&mut tx, account_id).await?;
        self.current_period_in_tx(&mut tx, account_id, Utc::now())
            .await?;
        tx.commit().await.map_err(Self::commit_error)?;

        timer.observe_duration();
        Ok(account)
    }

    #[instrument(skip(self))]
    async fn find_account_by_refs(
        &self,
        customer_ref: Option<&str>,
        subscription_ref: Option<&str>,
    ) -> Result<Option<Account>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_account_by_refs"])
            .start_timer();

        if let Some(sub) = subscription_ref {
            let account = sqlx::query_as::<_, Account>(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE processor_subscription_ref = $1"
            ))
            .bind(sub)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to find account: {}", e))
            })?;

            if account.is_some() {
                timer.observe_duration();
                return Ok(account);
            }
        }

        if let Some(cus) = customer_ref {
            let account = sqlx::query_as::<_, Account>(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE processor_customer_ref = $1"
            ))
            .bind(cus)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to find account: {}", e))
            })?;

            if account.is_some() {
                timer.observe_duration();
                return Ok(account);
            }
        }

        timer.observe_duration();
        Ok(None)
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn bind_processor_refs(
        &self,
        account_id: Uuid,
        customer_ref: Option<&str>,
        subscription_ref: Option<&str>,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["bind_processor_refs"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET processor_customer_ref = COALESCE($2, processor_customer_ref),
                processor_subscription_ref = COALESCE($3, processor_subscription_ref),
                updated_utc = now()
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .bind(customer_ref)
        .bind(subscription_ref)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to bind refs: {}", e)))?;

        timer.observe_duration();

        if result.rows_affected() == 0 {
            return Err(MeteringError::AccountNotFound(account_id).into());
        }
        Ok(())
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn update_tier_status(
        &self,
        account_id: Uuid,
        tier: Tier,
        status: SubscriptionStatus,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_tier_status"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET tier = $2, status = $3, updated_utc = now()
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .bind(tier.as_str())
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update tier/status: {}", e))
        })?;

        timer.observe_duration();

        if result.rows_affected() == 0 {
            return Err(MeteringError::AccountNotFound(account_id).into());
        }

        info!(
            account_id = %account_id,
            tier = tier.as_str(),
            status = status.as_str(),
            "Account tier/status updated"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn clear_subscription_ref(&self, account_id: Uuid) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["clear_subscription_ref"])
            .start_timer();

        let result = sqlx::query(
            "UPDATE accounts SET processor_subscription_ref = NULL, updated_utc = now() WHERE account_id = $1",
        )
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to clear subscription ref: {}", e))
        })?;

        timer.observe_duration();

        if result.rows_affected() == 0 {
            return Err(MeteringError::AccountNotFound(account_id).into());
        }
        Ok(())
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn current_period(&self, account_id: Uuid) -> Result<BillingPeriod, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["current_period"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(Self::begin_error)?;
        self.lock_account_in_tx(&mut tx, account_id).await?;
        let period = self
            .current_period_in_tx(&mut tx, account_id, Utc::now())
            .await?;
        tx.commit().await.map_err(Self::commit_error)?;

        timer.observe_duration();
        Ok(period)
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn open_period(
        &self,
        account_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BillingPeriod, AppError> {
        if end <= start {
            return Err(MeteringError::PeriodStateConflict {
                account_id,
                detail: "period end must be after period start".to_string(),
            }
            .into());
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["open_period"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(Self::begin_error)?;

        let exists = sqlx::query("SELECT account_id FROM accounts WHERE account_id = $1 FOR UPDATE")
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to lock account: {}", e)))?;
        if exists.is_none() {
            return Err(MeteringError::AccountNotFound(account_id).into());
        }

        if let Some(current) = self.latest_period_in_tx(&mut tx, account_id).await? {
            if start == current.period_start && end == current.period_end {
                tx.commit().await.map_err(Self::commit_error)?;
                timer.observe_duration();
                return Ok(current);
            }

            if start == current.period_start {
                let period = sqlx::query_as::<_, BillingPeriod>(&format!(
                    "UPDATE billing_periods SET period_end = $2 WHERE period_id = $1 RETURNING {PERIOD_COLUMNS}"
                ))
                .bind(current.period_id)
                .bind(end)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to amend period: {}", e))
                })?;

                tx.commit().await.map_err(Self::commit_error)?;
                timer.observe_duration();
                info!(account_id = %account_id, period_id = %period.period_id, "Billing period amended");
                return Ok(period);
            }

            if start < current.period_start {
                // The processor's window supersedes the current period, but
                // must not reach back into closed history.
                let overlaps_closed = sqlx::query_scalar::<_, bool>(
                    r#"
                    SELECT EXISTS(
                        SELECT 1 FROM billing_periods
                        WHERE account_id = $1 AND period_id != $2 AND period_end > $3
                    )
                    "#,
                )
                .bind(account_id)
                .bind(current.period_id)
                .bind(start)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to check period overlap: {}", e))
                })?;

                if overlaps_closed {
                    return Err(MeteringError::PeriodStateConflict {
                        account_id,
                        detail: format!("new period starting {} overlaps a closed period", start),
                    }
                    .into());
                }

                let period = sqlx::query_as::<_, BillingPeriod>(&format!(
                    "UPDATE billing_periods SET period_start = $2, period_end = $3 WHERE period_id = $1 RETURNING {PERIOD_COLUMNS}"
                ))
                .bind(current.period_id)
                .bind(start)
                .bind(end)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to replace period: {}", e))
                })?;

                tx.commit().await.map_err(Self::commit_error)?;
                timer.observe_duration();
                info!(account_id = %account_id, period_id = %period.period_id, "Billing period replaced");
                return Ok(period);
            }

            if current.period_end > start {
                sqlx::query("UPDATE billing_periods SET period_end = $2 WHERE period_id = $1")
                    .bind(current.period_id)
                    .bind(start)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        AppError::DatabaseError(anyhow::anyhow!("Failed to close period: {}", e))
                    })?;
            }
        }

        let period = sqlx::query_as::<_, BillingPeriod>(&format!(
            r#"
            INSERT INTO billing_periods (period_id, account_id, period_start, period_end)
            VALUES ($1, $2, $3, $4)
            RETURNING {PERIOD_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(start)
        .bind(end)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to open period: {}", e)))?;

        tx.commit().await.map_err(Self::commit_error)?;

        timer.observe_duration();
        info!(account_id = %account_id, period_id = %period.period_id, "Billing period opened");
        Ok(period)
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn list_periods(&self, account_id: Uuid) -> Result<Vec<BillingPeriod>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_periods"])
            .start_timer();

        let periods = sqlx::query_as::<_, BillingPeriod>(&format!(
            r#"
            SELECT {PERIOD_COLUMNS}
            FROM billing_periods
            WHERE account_id = $1
            ORDER BY period_start
            "#
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list periods: {}", e)))?;

        timer.observe_duration();
        Ok(periods)
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn usage_total(
        &self,
        account_id: Uuid,
        resource: ResourceType,
        period_id: Uuid,
    ) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["usage_total"])
            .start_timer();

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(quantity), 0)
            FROM usage_events
            WHERE account_id = $1 AND resource_type = $2 AND period_id = $3
            "#,
        )
        .bind(account_id)
        .bind(resource.as_str())
        .bind(period_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to aggregate usage: {}", e)))?;

        timer.observe_duration();
        Ok(total)
    }

    /// Check-and-record as one transaction: the account row lock serializes
    /// same-account writers, the sum re-validates the limit immediately
    /// before the insert.
    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn record_usage(
        &self,
        account_id: Uuid,
        resource: ResourceType,
        quantity: i32,
    ) -> Result<RecordOutcome, AppError> {
        if quantity <= 0 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "quantity must be positive"
            )));
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_usage"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(Self::begin_error)?;

        let account = self.lock_account_in_tx(&mut tx, account_id).await?;
        let tier = Tier::from_string(&account.tier);
        let limit = catalog::get_plan(tier).limits.for_resource(resource);

        let period = self
            .current_period_in_tx(&mut tx, account_id, Utc::now())
            .await?;
        let used = self
            .usage_total_in_tx(&mut tx, account_id, resource, period.period_id)
            .await?;

        if !limit.permits(used, quantity as i64) {
            tx.commit().await.map_err(Self::commit_error)?;
            timer.observe_duration();
            return Ok(RecordOutcome::LimitExceeded {
                used,
                limit: limit.raw(),
            });
        }

        let event = sqlx::query_as::<_, UsageEvent>(
            r#"
            INSERT INTO usage_events (event_id, account_id, resource_type, quantity, recorded_utc, period_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING event_id, account_id, resource_type, quantity, recorded_utc, period_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(resource.as_str())
        .bind(quantity)
        .bind(Utc::now())
        .bind(period.period_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to record usage: {}", e)))?;

        tx.commit().await.map_err(Self::commit_error)?;

        timer.observe_duration();
        Ok(RecordOutcome::Recorded(event))
    }

    #[instrument(skip(self))]
    async fn is_event_processed(&self, event_id: &str) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["is_event_processed"])
            .start_timer();

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM processed_billing_events WHERE event_id = $1)",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to check event ledger: {}", e))
        })?;

        timer.observe_duration();
        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn mark_event_processed(&self, event_id: &str) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_event_processed"])
            .start_timer();

        sqlx::query(
            "INSERT INTO processed_billing_events (event_id) VALUES ($1) ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark event processed: {}", e))
        })?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self, input), fields(account_id = %input.account_id))]
    async fn insert_payment(&self, input: &NewPaymentRecord) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_payment"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO payment_records (payment_id, account_id, processor_ref, amount_cents, currency, status, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (processor_ref) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.account_id)
        .bind(&input.processor_ref)
        .bind(input.amount_cents)
        .bind(&input.currency)
        .bind(input.status.as_str())
        .bind(&input.description)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert payment: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn list_payments(
        &self,
        account_id: Uuid,
        page_size: i32,
        page_token: Option<Uuid>,
    ) -> Result<Vec<PaymentRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_payments"])
            .start_timer();

        let limit = page_size.clamp(1, 100) as i64;

        let payments = if let Some(cursor) = page_token {
            sqlx::query_as::<_, PaymentRecord>(
                r#"
                SELECT payment_id, account_id, processor_ref, amount_cents, currency, status, description, created_utc
                FROM payment_records
                WHERE account_id = $1 AND payment_id > $2
                ORDER BY payment_id
                LIMIT $3
                "#,
            )
            .bind(account_id)
            .bind(cursor)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, PaymentRecord>(
                r#"
                SELECT payment_id, account_id, processor_ref, amount_cents, currency, status, description, created_utc
                FROM payment_records
                WHERE account_id = $1
                ORDER BY payment_id
                LIMIT $2
                "#,
            )
            .bind(account_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e)))?;

        timer.observe_duration();
        Ok(payments)
    }
}
