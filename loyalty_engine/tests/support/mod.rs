use loyalty_engine::SqliteDatabase;

/// A fresh in-memory database with all migrations applied. The pool is capped at a single
/// connection so that every caller sees the same in-memory store.
pub async fn new_test_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("Error creating test database")
}

pub fn order(id: &str) -> loyalty_engine::db_types::OrderId {
    id.parse().expect("invalid order id in test")
}
