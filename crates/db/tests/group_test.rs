//! Integration tests for group membership rules.

#![allow(clippy::uninlined_format_args)]

mod common;

use common::{create_user, equal_expense, precision, setup};
use rust_decimal_macros::dec;
use tally_core::ledger::LedgerError;
use tally_db::{BalanceRepository, ExpenseRepository, GroupRepository, StoreError};
use tally_shared::types::GroupId;

#[tokio::test]
async fn test_member_with_balance_cannot_leave() {
    let Some(db) = setup().await else { return };
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let carol = create_user(&db, "carol").await;

    let groups = GroupRepository::new(db.clone());
    let group = groups
        .create(alice, "House", Some("shared bills".to_string()))
        .await
        .expect("group");
    let group_id = GroupId::from_uuid(group.id);
    groups.add_member(alice, group_id, bob).await.expect("add bob");
    groups.add_member(bob, group_id, carol).await.expect("add carol");
    // Adding twice is a no-op.
    groups.add_member(alice, group_id, carol).await.expect("re-add carol");
    assert_eq!(groups.member_ids(group_id).await.expect("members").len(), 3);

    let expenses = ExpenseRepository::new(db.clone(), precision());
    expenses
        .create_expense(
            alice,
            equal_expense(alice, dec!(20), "USD", &[alice, bob], Some(group_id)),
        )
        .await
        .expect("expense");

    let err = groups.remove_member(bob, group_id, bob).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Ledger(LedgerError::OutstandingBalance(_))
    ));

    // Carol has nothing outstanding and may leave.
    groups.remove_member(carol, group_id, carol).await.expect("carol leaves");

    // Only the creator removes others.
    let err = groups.remove_member(bob, group_id, alice).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Ledger(LedgerError::Unauthorized { .. })
    ));

    let view = BalanceRepository::new(db.clone())
        .group_balances(bob, group_id)
        .await
        .expect("group view");
    assert_eq!(view.totals.len(), 1);
    assert_eq!(view.totals[0].amount, dec!(10));
}

#[tokio::test]
async fn test_delete_group_requires_creator_and_zero_balances() {
    let Some(db) = setup().await else { return };
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;

    let groups = GroupRepository::new(db.clone());
    let group = groups.create(alice, "Trip", None).await.expect("group");
    let group_id = GroupId::from_uuid(group.id);
    groups.add_member(alice, group_id, bob).await.expect("add bob");

    let expenses = ExpenseRepository::new(db.clone(), precision());
    expenses
        .create_expense(
            alice,
            equal_expense(alice, dec!(40), "EUR", &[alice, bob], Some(group_id)),
        )
        .await
        .expect("expense");

    let err = groups.delete_group(bob, group_id).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Ledger(LedgerError::Unauthorized { .. })
    ));
    let err = groups.delete_group(alice, group_id).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Ledger(LedgerError::OutstandingBalance(_))
    ));

    expenses
        .mark_as_paid(bob, alice, dec!(20), "EUR", Some(group_id))
        .await
        .expect("paid back");
    groups.delete_group(alice, group_id).await.expect("delete");

    let err = groups.find(group_id).await.unwrap_err();
    assert!(matches!(err, StoreError::Ledger(LedgerError::NotFound { .. })));
}

#[tokio::test]
async fn test_outsider_cannot_add_members() {
    let Some(db) = setup().await else { return };
    let alice = create_user(&db, "alice").await;
    let mallory = create_user(&db, "mallory").await;

    let groups = GroupRepository::new(db.clone());
    let group = groups.create(alice, "Club", None).await.expect("group");
    let err = groups
        .add_member(mallory, GroupId::from_uuid(group.id), mallory)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Ledger(LedgerError::Unauthorized { .. })
    ));

    let listed = groups.list_for_user(alice).await.expect("list");
    assert!(listed.iter().any(|g| g.id == group.id));
}
