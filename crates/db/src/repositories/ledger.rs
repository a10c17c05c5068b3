//! Executes ledger mutation plans against the balance tables.
//!
//! Every write is a relative `amount = amount + delta` upsert keyed on the
//! unique pair constraints, so concurrent writers never overwrite each other.
//! Plans are consolidated and sorted by key before execution, which gives every
//! transaction the same row-lock order and keeps two opposing writers on the
//! same pair from deadlocking.

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, DbErr, Statement, Value};
use tally_core::ledger::{BalanceKey, MutationPlan, ReconcileTarget};
use tally_shared::types::UserId;
use tracing::{debug, warn};

const UPSERT_BALANCE_SQL: &str = r"
INSERT INTO balances (user_id, friend_id, currency, amount)
VALUES ($1, $2, $3, $4)
ON CONFLICT (user_id, friend_id, currency)
DO UPDATE SET amount = balances.amount + EXCLUDED.amount, updated_at = now()
";

const UPSERT_GROUP_BALANCE_SQL: &str = r"
INSERT INTO group_balances (group_id, user_id, friend_id, currency, amount)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (group_id, user_id, friend_id, currency)
DO UPDATE SET amount = group_balances.amount + EXCLUDED.amount, updated_at = now()
";

// Zeroes the group rows of a pair in both directions, only while the global
// row exists and is exactly zero.
const RECONCILE_SQL: &str = r"
UPDATE group_balances
SET amount = 0, updated_at = now()
WHERE currency = $3
  AND amount <> 0
  AND ((user_id = $1 AND friend_id = $2) OR (user_id = $2 AND friend_id = $1))
  AND EXISTS (
      SELECT 1 FROM balances b
      WHERE b.user_id = $1 AND b.friend_id = $2 AND b.currency = $3 AND b.amount = 0
  )
";

/// Writes mutation plans and runs the zero-balance reconciliation pass.
pub struct LedgerWriter;

impl LedgerWriter {
    /// Applies every mutation of `plan` on `conn`.
    ///
    /// Pass the open transaction that also writes the expense or settlement
    /// row; nothing here commits. Returns the number of rows touched.
    ///
    /// # Errors
    ///
    /// Returns the first database error; the caller's transaction must then
    /// be dropped so that nothing is applied.
    pub async fn apply<C: ConnectionTrait>(conn: &C, plan: &MutationPlan) -> Result<usize, DbErr> {
        let mutations = plan.consolidated();
        for mutation in &mutations {
            conn.execute(upsert_statement(&mutation.key, mutation.delta.into()))
                .await?;
        }
        debug!(rows = mutations.len(), "applied ledger plan");
        Ok(mutations.len())
    }

    /// Zeroes group rows for every counterparty whose global balance with
    /// `user_id` is exactly zero in `currency`.
    ///
    /// # Errors
    ///
    /// Returns an error if an update fails.
    pub async fn reconcile_zero_balances<C: ConnectionTrait>(
        conn: &C,
        user_id: UserId,
        counterparties: &[UserId],
        currency: &str,
    ) -> Result<u64, DbErr> {
        let mut changed = 0;
        for friend_id in counterparties {
            let result = conn
                .execute(Statement::from_sql_and_values(
                    DbBackend::Postgres,
                    RECONCILE_SQL,
                    [user_id.0.into(), friend_id.0.into(), currency.into()],
                ))
                .await?;
            changed += result.rows_affected();
        }
        Ok(changed)
    }

    /// Runs the reconciliation pass for every target the plan carries.
    ///
    /// # Errors
    ///
    /// Returns the first database error.
    pub async fn reconcile<C: ConnectionTrait>(conn: &C, plan: &MutationPlan) -> Result<u64, DbErr> {
        let mut changed = 0;
        for ReconcileTarget {
            user_id,
            counterparties,
            currency,
        } in plan.reconcile_targets()
        {
            changed += Self::reconcile_zero_balances(conn, *user_id, counterparties, currency).await?;
        }
        Ok(changed)
    }

    /// Reconciliation after commit. The ledger is already consistent at this
    /// point, so a failure is logged and swallowed.
    pub async fn reconcile_best_effort(db: &DatabaseConnection, plan: &MutationPlan) {
        match Self::reconcile(db, plan).await {
            Ok(0) => {}
            Ok(changed) => debug!(changed, "reconciled zero balances"),
            Err(e) => warn!(error = %e, "zero-balance reconciliation failed"),
        }
    }
}

fn upsert_statement(key: &BalanceKey, delta: Value) -> Statement {
    let user: Value = key.user_id.0.into();
    let friend: Value = key.friend_id.0.into();
    let currency: Value = key.currency.as_str().into();
    match key.group_id {
        None => Statement::from_sql_and_values(
            DbBackend::Postgres,
            UPSERT_BALANCE_SQL,
            [user, friend, currency, delta],
        ),
        Some(group_id) => Statement::from_sql_and_values(
            DbBackend::Postgres,
            UPSERT_GROUP_BALANCE_SQL,
            [group_id.0.into(), user, friend, currency, delta],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tally_shared::types::GroupId;
    use uuid::Uuid;

    #[test]
    fn test_global_key_targets_balances() {
        let key = BalanceKey::global(
            UserId::from_uuid(Uuid::from_u128(1)),
            UserId::from_uuid(Uuid::from_u128(2)),
            "USD",
        );
        let stmt = upsert_statement(&key, dec!(5).into());
        assert!(stmt.sql.contains("INSERT INTO balances"));
        assert_eq!(stmt.values.map(|v| v.0.len()), Some(4));
    }

    #[test]
    fn test_group_key_targets_group_balances() {
        let key = BalanceKey::group(
            GroupId::from_uuid(Uuid::from_u128(9)),
            UserId::from_uuid(Uuid::from_u128(1)),
            UserId::from_uuid(Uuid::from_u128(2)),
            "USD",
        );
        let stmt = upsert_statement(&key, dec!(-5).into());
        assert!(stmt.sql.contains("INSERT INTO group_balances"));
        assert_eq!(stmt.values.map(|v| v.0.len()), Some(5));
    }
}
