//! Account directory: chart of accounts with running balances.
//!
//! Balances change only through [`apply_delta`] inside a posting transaction.
//! Each change is a compare-and-swap on the account's version, so two postings
//! touching the same account can never lose each other's update.
//!
//! Reads are snapshot reads: a balance returned here may not yet include a
//! posting that is still in flight.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use trestle_core::ledger::{AccountType, BalanceDelta, LedgerError, VersionedBalance};
use trestle_shared::ResilienceConfig;
use trestle_shared::types::AccountId;

use crate::entities::accounts;
use crate::resilience::{is_unique_violation, storage_error, with_retry, with_timeout};

use super::parse_decimal;

/// A general ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Chart of accounts number, unique.
    pub number: String,
    /// Display name.
    pub name: String,
    /// Account type, which fixes the sign convention.
    pub account_type: AccountType,
    /// Running balance in the account's normal direction.
    pub balance: Decimal,
    /// Number of balance changes applied.
    pub version: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last balance change.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<accounts::Model> for Account {
    type Error = LedgerError;

    fn try_from(model: accounts::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            balance: parse_decimal("accounts.balance", &model.balance)?,
            id: AccountId::from_uuid(model.id),
            number: model.number,
            name: model.name,
            account_type: model.account_type.into(),
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Input for opening an account.
///
/// The id is chosen by the caller so that a retried open is a no-op.
#[derive(Debug, Clone)]
pub struct OpenAccountInput {
    /// Account id.
    pub id: AccountId,
    /// Chart of accounts number.
    pub number: String,
    /// Display name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
}

/// Repository for the chart of accounts.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
    resilience: ResilienceConfig,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            resilience: ResilienceConfig::default(),
        }
    }

    /// Replaces the retry and timeout policy.
    #[must_use]
    pub fn with_resilience(mut self, resilience: ResilienceConfig) -> Self {
        self.resilience = resilience;
        self
    }

    /// Opens an account with a zero balance.
    ///
    /// Idempotent on the id: opening an existing id returns the stored account
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns `DUPLICATE_ACCOUNT_NUMBER` if another account uses the number.
    pub async fn open_account(&self, input: OpenAccountInput) -> Result<Account, LedgerError> {
        let account = with_timeout(
            &self.resilience,
            with_retry(&self.resilience, "open_account", || self.try_open(&input)),
        )
        .await?;

        info!(
            account_id = %account.id,
            number = %account.number,
            account_type = %account.account_type,
            "Account opened"
        );
        Ok(account)
    }

    async fn try_open(&self, input: &OpenAccountInput) -> Result<Account, LedgerError> {
        if let Some(existing) = find_account(&self.db, input.id).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let opening = VersionedBalance::opening();
        let model = accounts::ActiveModel {
            id: Set(input.id.into_inner()),
            number: Set(input.number.clone()),
            name: Set(input.name.clone()),
            account_type: Set(input.account_type.into()),
            balance: Set(opening.balance.to_string()),
            version: Set(opening.version),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match model.insert(&self.db).await {
            Ok(inserted) => Account::try_from(inserted),
            Err(e) if is_unique_violation(&e) => {
                // A concurrent open of the same id won the race.
                match find_account(&self.db, input.id).await? {
                    Some(existing) => Ok(existing),
                    None => Err(LedgerError::DuplicateAccountNumber(input.number.clone())),
                }
            }
            Err(e) => Err(storage_error(e)),
        }
    }

    /// Gets an account by id.
    ///
    /// # Errors
    ///
    /// Returns `ACCOUNT_NOT_FOUND` if the account does not exist.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        with_timeout(
            &self.resilience,
            with_retry(&self.resilience, "get_account", || async move {
                find_account(&self.db, id)
                    .await?
                    .ok_or(LedgerError::AccountNotFound(id))
            }),
        )
        .await
    }

    /// Lists all accounts ordered by number.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        with_timeout(
            &self.resilience,
            with_retry(&self.resilience, "list_accounts", || async {
                accounts::Entity::find()
                    .order_by_asc(accounts::Column::Number)
                    .all(&self.db)
                    .await
                    .map_err(storage_error)?
                    .into_iter()
                    .map(Account::try_from)
                    .collect::<Result<Vec<_>, LedgerError>>()
            }),
        )
        .await
    }
}

async fn find_account<C: ConnectionTrait>(
    conn: &C,
    id: AccountId,
) -> Result<Option<Account>, LedgerError> {
    accounts::Entity::find_by_id(id.into_inner())
        .one(conn)
        .await
        .map_err(storage_error)?
        .map(Account::try_from)
        .transpose()
}

/// Reads the given accounts. Unknown ids are absent from the map.
///
/// The rows are the posting's view of the accounts: every later balance write
/// is checked against the version read here.
pub(crate) async fn load_accounts<C: ConnectionTrait>(
    conn: &C,
    ids: &[AccountId],
) -> Result<HashMap<AccountId, accounts::Model>, LedgerError> {
    let rows = accounts::Entity::find()
        .filter(accounts::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
        .all(conn)
        .await
        .map_err(storage_error)?;

    Ok(rows
        .into_iter()
        .map(|row| (AccountId::from_uuid(row.id), row))
        .collect())
}

/// Applies one balance delta on top of `read`.
///
/// The write lands only if the account still carries the version in `read`.
///
/// # Errors
///
/// Returns `CONCURRENT_MODIFICATION` if the account changed after it was read.
pub(crate) async fn apply_delta<C: ConnectionTrait>(
    conn: &C,
    delta: &BalanceDelta,
    read: &accounts::Model,
) -> Result<VersionedBalance, LedgerError> {
    let current = VersionedBalance {
        version: read.version,
        balance: parse_decimal("accounts.balance", &read.balance)?,
    };
    let next = current.apply(delta.delta);

    let result = accounts::Entity::update_many()
        .set(accounts::ActiveModel {
            balance: Set(next.balance.to_string()),
            version: Set(next.version),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .filter(accounts::Column::Id.eq(read.id))
        .filter(accounts::Column::Version.eq(current.version))
        .exec(conn)
        .await
        .map_err(storage_error)?;

    if result.rows_affected == 0 {
        return Err(LedgerError::ConcurrentModification {
            account_id: delta.account_id,
        });
    }
    Ok(next)
}
