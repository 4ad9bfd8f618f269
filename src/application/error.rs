use thiserror::Error;

use crate::domain::Cents;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error(
        "Insufficient funds in account {account}: balance {balance_cents}, required {required_cents}"
    )]
    InsufficientFunds {
        account: String,
        balance_cents: Cents,
        required_cents: Cents,
    },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
