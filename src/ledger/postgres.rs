use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use crate::domain::{Account, AccountNumber, AccountStatus, IdentityNumber, IdentityType};

use super::traits::{AccountStore, DuplicateField, InsertOutcome, TierUpdate};

const ACCOUNT_COLUMNS: &str = "identity_number, identity_type, account_number, email, phone, \
                               status, kyc_tier, created_at, updated_at";

/// PostgreSQL account store. Uniqueness is enforced by the table's
/// primary key and unique indexes.
pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    pub async fn connect(
        database_url: &str,
        min_connections: u32,
        max_connections: u32,
    ) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(min_connections)
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn fetch_where(
        &self,
        column: &str,
        value: &str,
    ) -> anyhow::Result<Option<Account>> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE {} = $1",
            ACCOUNT_COLUMNS, column
        );
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| account_from_row(&r)).transpose()
    }

    /// Find which unique key an account collides on, in the same order the
    /// in-memory store checks them.
    async fn find_conflict(
        &self,
        account: &Account,
    ) -> anyhow::Result<Option<(DuplicateField, Account)>> {
        let probes = [
            (DuplicateField::Identity, "identity_number", account.identity_number.to_string()),
            (DuplicateField::Email, "email_key", account.email_key()),
            (DuplicateField::Phone, "phone", account.phone_key()),
            (
                DuplicateField::AccountNumber,
                "account_number",
                account.account_number.to_string(),
            ),
        ];

        for (field, column, value) in probes {
            if let Some(existing) = self.fetch_where(column, &value).await? {
                return Ok(Some((field, existing)));
            }
        }
        Ok(None)
    }
}

fn account_from_row(row: &PgRow) -> anyhow::Result<Account> {
    let identity_number: String = row.get("identity_number");
    let identity_type: String = row.get("identity_type");
    let account_number: String = row.get("account_number");
    let status: String = row.get("status");
    let kyc_tier: i16 = row.get("kyc_tier");
    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");

    Ok(Account {
        account_number: AccountNumber(account_number.trim().to_string()),
        identity_type: identity_type.parse::<IdentityType>()?,
        identity_number: IdentityNumber::parse(&identity_number)?,
        email: row.get("email"),
        phone: row.get("phone"),
        status: status.parse::<AccountStatus>().map_err(|e| anyhow!(e))?,
        kyc_tier: u8::try_from(kyc_tier).context("kyc_tier out of range")?,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn get(&self, identity: &IdentityNumber) -> anyhow::Result<Option<Account>> {
        self.fetch_where("identity_number", identity.as_str()).await
    }

    async fn find_by_email(&self, email_key: &str) -> anyhow::Result<Option<Account>> {
        self.fetch_where("email_key", email_key).await
    }

    async fn find_by_phone(&self, phone_key: &str) -> anyhow::Result<Option<Account>> {
        self.fetch_where("phone", phone_key).await
    }

    async fn find_by_account_number(
        &self,
        number: &AccountNumber,
    ) -> anyhow::Result<Option<Account>> {
        self.fetch_where("account_number", number.as_str()).await
    }

    async fn set(&self, account: &Account) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (identity_number, identity_type, account_number, email,
                                  email_key, phone, status, kyc_tier, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (identity_number)
            DO UPDATE SET
                identity_type = EXCLUDED.identity_type,
                account_number = EXCLUDED.account_number,
                email = EXCLUDED.email,
                email_key = EXCLUDED.email_key,
                phone = EXCLUDED.phone,
                status = EXCLUDED.status,
                kyc_tier = EXCLUDED.kyc_tier,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(account.identity_number.as_str())
        .bind(account.identity_type.as_str())
        .bind(account.account_number.as_str())
        .bind(&account.email)
        .bind(account.email_key())
        .bind(account.phone_key())
        .bind(account.status.as_str())
        .bind(account.kyc_tier as i16)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, identity: &IdentityNumber) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE identity_number = $1")
            .bind(identity.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn compare_and_insert(&self, account: &Account) -> anyhow::Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (identity_number, identity_type, account_number, email,
                                  email_key, phone, status, kyc_tier, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(account.identity_number.as_str())
        .bind(account.identity_type.as_str())
        .bind(account.account_number.as_str())
        .bind(&account.email)
        .bind(account.email_key())
        .bind(account.phone_key())
        .bind(account.status.as_str())
        .bind(account.kyc_tier as i16)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(InsertOutcome::Inserted);
        }

        match self.find_conflict(account).await? {
            Some((field, existing)) => Ok(InsertOutcome::Conflict {
                field,
                existing: Box::new(existing),
            }),
            // The conflicting row was deleted between the insert and the probe
            None => Err(anyhow!(
                "insert for {} conflicted but no conflicting row remains",
                account.identity_number.masked()
            )),
        }
    }

    async fn compare_and_set_tier(
        &self,
        identity: &IdentityNumber,
        expected: u8,
        tier: u8,
    ) -> anyhow::Result<TierUpdate> {
        let sql = format!(
            "UPDATE accounts SET kyc_tier = $3, updated_at = now() \
             WHERE identity_number = $1 AND kyc_tier = $2 RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(identity.as_str())
            .bind(expected as i16)
            .bind(tier as i16)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            return Ok(TierUpdate::Updated(account_from_row(&row)?));
        }

        Ok(match self.get(identity).await? {
            Some(current) => TierUpdate::Stale(current.kyc_tier),
            None => TierUpdate::Missing,
        })
    }

    async fn count(&self) -> anyhow::Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as usize)
    }
}
