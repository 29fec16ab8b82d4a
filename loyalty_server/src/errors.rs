use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use loyalty_engine::{
    traits::{LedgerError, UserApiError},
    OrderApiError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Authentication required. {0}")]
    Unauthenticated(String),
    #[error("This login is already taken")]
    UserNotUnique,
    #[error("The order number is not valid")]
    InvalidOrderFormat,
    #[error("The withdrawal amount is not valid")]
    InvalidAmount,
    #[error("The order was uploaded by another user")]
    OrderOwnedByAnotherUser,
    #[error("The order was already uploaded")]
    DuplicateOrder,
    #[error("The balance does not cover this withdrawal")]
    OutOfBalance,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Server initialization error: {0}")]
    InitializeError(String),
    #[error("Backend error: {0}")]
    BackendError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::UserNotUnique | Self::OrderOwnedByAnotherUser | Self::DuplicateOrder => StatusCode::CONFLICT,
            Self::InvalidOrderFormat | Self::InvalidAmount => StatusCode::UNPROCESSABLE_ENTITY,
            Self::OutOfBalance => StatusCode::PAYMENT_REQUIRED,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).insert_header(ContentType::plaintext()).body(self.to_string())
    }
}

impl From<UserApiError> for ServerError {
    fn from(e: UserApiError) -> Self {
        match e {
            UserApiError::UserNotUnique(_) => Self::UserNotUnique,
            UserApiError::DatabaseError(_) | UserApiError::PasswordHash(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<LedgerError> for ServerError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::OrderIdNotUnique(_) => Self::DuplicateOrder,
            LedgerError::OrderLoadedByAnotherUser(_) => Self::OrderOwnedByAnotherUser,
            LedgerError::OutOfBalance => Self::OutOfBalance,
            LedgerError::DatabaseError(_) | LedgerError::OrderNotFound(_) | LedgerError::UserNotFound(_) => {
                Self::BackendError(e.to_string())
            },
        }
    }
}

impl From<OrderApiError> for ServerError {
    fn from(e: OrderApiError) -> Self {
        match e {
            OrderApiError::OrderFormat => Self::InvalidOrderFormat,
            OrderApiError::InvalidAmount => Self::InvalidAmount,
            OrderApiError::Ledger(inner) => inner.into(),
        }
    }
}

impl From<AuthError> for ServerError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::TokenCreation(msg) => Self::BackendError(msg),
            AuthError::PoorlyFormattedToken(_) | AuthError::ValidationError(_) => {
                Self::Unauthenticated(e.to_string())
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Could not create an access token. {0}")]
    TokenCreation(String),
    #[error("The access token is poorly formatted. {0}")]
    PoorlyFormattedToken(String),
    #[error("The access token failed validation. {0}")]
    ValidationError(String),
}
