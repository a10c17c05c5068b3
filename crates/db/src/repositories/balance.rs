//! Balance read queries. Nothing here writes to the ledger.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, Statement, Value,
};
use serde::Serialize;
use std::collections::HashMap;
use tally_core::balances::{
    BalanceQueries, BalanceRow, BalanceSummary, CurrencyAmount, FriendBalance, GroupBalanceView,
    MonthlyAnalytics, ShareRow,
};
use tally_core::ledger::AccessPolicy;
use tally_shared::types::{GroupId, UserId};
use uuid::Uuid;

use super::group::{find_group, member_ids};
use crate::entities::{balances, group_balances, group_users, groups};
use crate::error::StoreError;

const MONTH_SHARES_SQL: &str = r"
SELECT e.paid_by AS payer, p.user_id AS participant, e.currency AS currency, p.amount AS amount
FROM expense_participants p
JOIN expenses e ON e.id = p.expense_id
WHERE e.deleted_at IS NULL
  AND e.expense_date >= $2 AND e.expense_date < $3
  AND (e.paid_by = $1 OR p.user_id = $1)
";

const MONTH_SETTLED_SQL: &str = r"
SELECT i.original_currency AS currency, i.original_amount AS amount
FROM settlement_items i
JOIN settlement_transactions t ON t.id = i.settlement_transaction_id
WHERE t.status = 'COMPLETED'
  AND t.completed_at >= $2 AND t.completed_at < $3
  AND (i.user_id = $1 OR i.friend_id = $1)
";

#[derive(Debug, FromQueryResult)]
struct ShareRecord {
    payer: Uuid,
    participant: Uuid,
    currency: String,
    amount: Decimal,
}

#[derive(Debug, FromQueryResult)]
struct AmountRecord {
    currency: String,
    amount: Decimal,
}

/// A group with the caller's per-currency totals in it.
#[derive(Debug, Clone, Serialize)]
pub struct GroupWithTotals {
    /// The group.
    pub group: groups::Model,
    /// Nonzero nets; positive means the caller owes.
    pub totals: Vec<CurrencyAmount>,
}

/// Balance read repository.
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    db: DatabaseConnection,
}

impl BalanceRepository {
    /// Creates a new balance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The user's global rows, one per (friend, currency).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn global_rows(&self, user_id: UserId) -> Result<Vec<BalanceRow>, StoreError> {
        let rows = balances::Entity::find()
            .filter(balances::Column::UserId.eq(user_id.0))
            .order_by_asc(balances::Column::FriendId)
            .order_by_asc(balances::Column::Currency)
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| BalanceRow::new(UserId::from_uuid(r.friend_id), r.currency, r.amount))
            .collect())
    }

    /// What the user owes and is owed, per currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn balance_summary(&self, user_id: UserId) -> Result<BalanceSummary, StoreError> {
        Ok(BalanceQueries::summarize(&self.global_rows(user_id).await?))
    }

    /// Every counterparty with the nonzero balances held against them.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn friends_with_balances(
        &self,
        user_id: UserId,
    ) -> Result<Vec<FriendBalance>, StoreError> {
        Ok(BalanceQueries::friends(&self.global_rows(user_id).await?))
    }

    /// The user's balances inside one group.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown group and `Unauthorized` for a
    /// non-member.
    pub async fn group_balances(
        &self,
        user_id: UserId,
        group_id: GroupId,
    ) -> Result<GroupBalanceView, StoreError> {
        find_group(&self.db, group_id).await?;
        let members = member_ids(&self.db, group_id).await?;
        AccessPolicy::ensure_members(user_id, [], &members)?;

        let rows = group_balances::Entity::find()
            .filter(group_balances::Column::GroupId.eq(group_id.0))
            .filter(group_balances::Column::UserId.eq(user_id.0))
            .all(&self.db)
            .await?;
        let rows: Vec<BalanceRow> = rows
            .into_iter()
            .map(|r| BalanceRow::new(UserId::from_uuid(r.friend_id), r.currency, r.amount))
            .collect();
        Ok(BalanceQueries::group_view(group_id, &rows))
    }

    /// Every group of the user with their per-currency totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn groups_with_balances(
        &self,
        user_id: UserId,
    ) -> Result<Vec<GroupWithTotals>, StoreError> {
        let memberships = group_users::Entity::find()
            .filter(group_users::Column::UserId.eq(user_id.0))
            .find_also_related(groups::Entity)
            .order_by_asc(group_users::Column::JoinedAt)
            .all(&self.db)
            .await?;

        let rows = group_balances::Entity::find()
            .filter(group_balances::Column::UserId.eq(user_id.0))
            .all(&self.db)
            .await?;
        let mut by_group: HashMap<Uuid, Vec<BalanceRow>> = HashMap::new();
        for r in rows {
            by_group.entry(r.group_id).or_default().push(BalanceRow::new(
                UserId::from_uuid(r.friend_id),
                r.currency,
                r.amount,
            ));
        }

        Ok(memberships
            .into_iter()
            .filter_map(|(_, group)| group)
            .map(|group| {
                let rows = by_group.remove(&group.id).unwrap_or_default();
                GroupWithTotals {
                    totals: BalanceQueries::totals_by_currency(&rows),
                    group,
                }
            })
            .collect())
    }

    /// Owed, lent, and settled totals for the calendar month containing `month`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn monthly_analytics(
        &self,
        user_id: UserId,
        month: NaiveDate,
    ) -> Result<MonthlyAnalytics, StoreError> {
        let (start, end) = BalanceQueries::month_bounds(month);
        let values = || -> [Value; 3] {
            [
                user_id.0.into(),
                start_of_day(start).into(),
                start_of_day(end).into(),
            ]
        };

        let shares: Vec<ShareRow> = ShareRecord::find_by_statement(
            Statement::from_sql_and_values(DbBackend::Postgres, MONTH_SHARES_SQL, values()),
        )
        .all(&self.db)
        .await?
        .into_iter()
        .map(|r| ShareRow {
            payer: UserId::from_uuid(r.payer),
            participant: UserId::from_uuid(r.participant),
            currency: r.currency,
            amount: r.amount,
        })
        .collect();

        let settled: Vec<CurrencyAmount> = AmountRecord::find_by_statement(
            Statement::from_sql_and_values(DbBackend::Postgres, MONTH_SETTLED_SQL, values()),
        )
        .all(&self.db)
        .await?
        .into_iter()
        .map(|r| CurrencyAmount::new(r.currency, r.amount))
        .collect();

        Ok(BalanceQueries::analytics(user_id, month, &shares, &settled))
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
