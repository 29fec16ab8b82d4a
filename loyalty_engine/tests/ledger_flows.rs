use lpg_common::Points;
use loyalty_engine::{
    db_types::OrderStatus,
    traits::{LedgerDatabase, LedgerError, LedgerQueries, UserManagement},
};

mod support;

use support::{new_test_db, order};

// The stored hash is irrelevant for ledger tests; password verification is covered elsewhere.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$dummy";

#[tokio::test]
async fn submitted_orders_are_pending_until_terminal() {
    let db = new_test_db().await;
    db.create_user("alice", DUMMY_HASH).await.unwrap();

    db.submit_order(order("79927398713"), "alice").await.unwrap();
    db.submit_order(order("4532015112830366"), "alice").await.unwrap();
    let pending = db.pending_orders().await.unwrap();
    assert_eq!(pending, vec![order("79927398713"), order("4532015112830366")], "oldest first");

    // Processing keeps the order pending, terminal states drop it.
    db.set_status(order("79927398713"), OrderStatus::Processing).await.unwrap();
    assert_eq!(db.pending_orders().await.unwrap().len(), 2);
    db.set_status(order("4532015112830366"), OrderStatus::Invalid).await.unwrap();
    assert_eq!(db.pending_orders().await.unwrap(), vec![order("79927398713")]);
    db.accrue(order("79927398713"), Points::from_points(500)).await.unwrap();
    assert!(db.pending_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn resubmission_is_classified_by_owner() {
    let db = new_test_db().await;
    db.create_user("alice", DUMMY_HASH).await.unwrap();
    db.create_user("bob", DUMMY_HASH).await.unwrap();

    db.submit_order(order("79927398713"), "alice").await.unwrap();
    let same_owner = db.submit_order(order("79927398713"), "alice").await;
    assert!(matches!(same_owner, Err(LedgerError::OrderIdNotUnique(_))));
    let other_owner = db.submit_order(order("79927398713"), "bob").await;
    assert!(matches!(other_owner, Err(LedgerError::OrderLoadedByAnotherUser(_))));

    // The rejected submissions must not have produced duplicate rows.
    let orders = db.order_list("alice").await.unwrap();
    assert_eq!(orders.len(), 1);
    assert!(db.order_list("bob").await.unwrap().is_empty());
    assert_eq!(db.pending_orders().await.unwrap().len(), 1);
}

#[tokio::test]
async fn submitting_for_an_unknown_user_fails() {
    let db = new_test_db().await;
    let result = db.submit_order(order("79927398713"), "nobody").await;
    assert!(matches!(result, Err(LedgerError::UserNotFound(_))));
}

#[tokio::test]
async fn accruals_update_balance_and_order_listing() {
    let db = new_test_db().await;
    db.create_user("alice", DUMMY_HASH).await.unwrap();
    db.submit_order(order("79927398713"), "alice").await.unwrap();
    db.accrue(order("79927398713"), Points::from_points(500)).await.unwrap();

    let balance = db.balance("alice").await.unwrap();
    assert_eq!(balance.current, Points::from_points(500));
    assert_eq!(balance.withdrawn, Points::default());

    let orders = db.order_list("alice").await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].number, order("79927398713"));
    assert_eq!(orders[0].status, OrderStatus::Processed);
    assert_eq!(orders[0].accrual, Points::from_points(500));
}

#[tokio::test]
async fn accrual_is_idempotent_per_order() {
    let db = new_test_db().await;
    db.create_user("alice", DUMMY_HASH).await.unwrap();
    db.submit_order(order("79927398713"), "alice").await.unwrap();

    db.accrue(order("79927398713"), Points::from_points(500)).await.unwrap();
    // A re-poll of the terminal order must not double-credit.
    db.accrue(order("79927398713"), Points::from_points(500)).await.unwrap();

    let balance = db.balance("alice").await.unwrap();
    assert_eq!(balance.current, Points::from_points(500));
    let orders = db.order_list("alice").await.unwrap();
    assert_eq!(orders.len(), 1, "a second accrual row would fan the listing out");
    assert_eq!(orders[0].accrual, Points::from_points(500));
}

#[tokio::test]
async fn accruing_an_unknown_order_fails() {
    let db = new_test_db().await;
    let result = db.accrue(order("79927398713"), Points::from_points(10)).await;
    assert!(matches!(result, Err(LedgerError::OrderNotFound(_))));
}

#[tokio::test]
async fn withdrawal_debits_and_creates_the_order() {
    let db = new_test_db().await;
    db.create_user("alice", DUMMY_HASH).await.unwrap();
    db.submit_order(order("79927398713"), "alice").await.unwrap();
    db.accrue(order("79927398713"), Points::from_points(500)).await.unwrap();

    db.withdraw("alice", order("4532015112830366"), Points::from_points(200)).await.unwrap();

    let balance = db.balance("alice").await.unwrap();
    assert_eq!(balance.current, Points::from_points(300));
    assert_eq!(balance.withdrawn, Points::from_points(200));

    let withdrawals = db.withdrawals("alice").await.unwrap();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0].order, order("4532015112830366"));
    assert_eq!(withdrawals[0].sum, Points::from_points(200));

    // The withdrawal order itself entered the normal lifecycle.
    let orders = db.order_list("alice").await.unwrap();
    assert_eq!(orders.len(), 2);
    assert!(db.pending_orders().await.unwrap().contains(&order("4532015112830366")));
}

#[tokio::test]
async fn failed_withdrawal_leaves_no_trace() {
    let db = new_test_db().await;
    db.create_user("alice", DUMMY_HASH).await.unwrap();
    db.submit_order(order("79927398713"), "alice").await.unwrap();
    db.accrue(order("79927398713"), Points::from_points(500)).await.unwrap();

    let result = db.withdraw("alice", order("4532015112830366"), Points::from_points(1000)).await;
    assert!(matches!(result, Err(LedgerError::OutOfBalance)));

    // Balance unchanged, no order row, no ledger entry.
    let balance = db.balance("alice").await.unwrap();
    assert_eq!(balance.current, Points::from_points(500));
    assert_eq!(balance.withdrawn, Points::default());
    assert!(db.withdrawals("alice").await.unwrap().is_empty());
    assert_eq!(db.order_list("alice").await.unwrap().len(), 1);
}

#[tokio::test]
async fn withdrawal_rolls_back_the_debit_on_an_order_conflict() {
    let db = new_test_db().await;
    db.create_user("alice", DUMMY_HASH).await.unwrap();
    db.create_user("bob", DUMMY_HASH).await.unwrap();
    db.submit_order(order("79927398713"), "alice").await.unwrap();
    db.accrue(order("79927398713"), Points::from_points(500)).await.unwrap();
    db.submit_order(order("4532015112830366"), "bob").await.unwrap();

    // The debit succeeds inside the transaction, then the order insert conflicts.
    let result = db.withdraw("alice", order("4532015112830366"), Points::from_points(100)).await;
    assert!(matches!(result, Err(LedgerError::OrderLoadedByAnotherUser(_))));

    let balance = db.balance("alice").await.unwrap();
    assert_eq!(balance.current, Points::from_points(500), "the debit must have been rolled back");
    assert!(db.withdrawals("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn withdrawal_with_no_prior_accrual_is_out_of_balance() {
    let db = new_test_db().await;
    db.create_user("alice", DUMMY_HASH).await.unwrap();
    let result = db.withdraw("alice", order("4532015112830366"), Points::from_points(1)).await;
    assert!(matches!(result, Err(LedgerError::OutOfBalance)));
}

#[tokio::test]
async fn balances_accumulate_across_orders() {
    let db = new_test_db().await;
    db.create_user("alice", DUMMY_HASH).await.unwrap();
    db.submit_order(order("79927398713"), "alice").await.unwrap();
    db.submit_order(order("4532015112830366"), "alice").await.unwrap();
    db.accrue(order("79927398713"), Points::try_from(729.98).unwrap()).await.unwrap();
    db.accrue(order("4532015112830366"), Points::try_from(0.02).unwrap()).await.unwrap();

    let balance = db.balance("alice").await.unwrap();
    assert_eq!(balance.current, Points::from_points(730));

    db.withdraw("alice", order("18"), Points::try_from(0.5).unwrap()).await.unwrap();
    let balance = db.balance("alice").await.unwrap();
    assert_eq!(balance.current, Points::try_from(729.5).unwrap());
    assert_eq!(balance.withdrawn, Points::try_from(0.5).unwrap());
}

#[tokio::test]
async fn fresh_users_have_a_zero_balance() {
    let db = new_test_db().await;
    db.create_user("alice", DUMMY_HASH).await.unwrap();
    let balance = db.balance("alice").await.unwrap();
    assert_eq!(balance.current, Points::default());
    assert_eq!(balance.withdrawn, Points::default());
    assert!(db.order_list("alice").await.unwrap().is_empty());
    assert!(db.withdrawals("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn order_listing_is_scoped_to_the_login() {
    let db = new_test_db().await;
    db.create_user("alice", DUMMY_HASH).await.unwrap();
    db.create_user("bob", DUMMY_HASH).await.unwrap();
    db.submit_order(order("79927398713"), "alice").await.unwrap();
    db.submit_order(order("4532015112830366"), "bob").await.unwrap();

    let alice_orders = db.order_list("alice").await.unwrap();
    assert_eq!(alice_orders.len(), 1);
    assert_eq!(alice_orders[0].number, order("79927398713"));
    let bob_orders = db.order_list("bob").await.unwrap();
    assert_eq!(bob_orders.len(), 1);
    assert_eq!(bob_orders[0].number, order("4532015112830366"));
}
