use loyalty_engine::{
    db_types::{OrderId, OrderRecord, OrderStatus, UserBalance, WithdrawalRecord},
    traits::{LedgerDatabase, LedgerError, LedgerQueries, UserApiError, UserManagement},
};
use lpg_common::Points;
use mockall::mock;

mock! {
    pub Ledger {}
    impl LedgerDatabase for Ledger {
        async fn submit_order(&self, order_id: OrderId, login: &str) -> Result<(), LedgerError>;
        async fn withdraw(&self, login: &str, order_id: OrderId, amount: Points) -> Result<(), LedgerError>;
        async fn accrue(&self, order_id: OrderId, amount: Points) -> Result<(), LedgerError>;
        async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), LedgerError>;
        async fn pending_orders(&self) -> Result<Vec<OrderId>, LedgerError>;
    }
    impl LedgerQueries for Ledger {
        async fn order_list(&self, login: &str) -> Result<Vec<OrderRecord>, LedgerError>;
        async fn balance(&self, login: &str) -> Result<UserBalance, LedgerError>;
        async fn withdrawals(&self, login: &str) -> Result<Vec<WithdrawalRecord>, LedgerError>;
    }
}

mock! {
    pub UserStore {}
    impl UserManagement for UserStore {
        async fn create_user(&self, login: &str, password_hash: &str) -> Result<(), UserApiError>;
        async fn fetch_password_hash(&self, login: &str) -> Result<Option<String>, UserApiError>;
    }
}
