use thiserror::Error;

use crate::domain::{AmountFieldError, CustomerId, InvalidInputKind};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Customer name is required")]
    MissingName,

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountFieldError),

    #[error("Invalid customer data: {0}")]
    InvalidInput(#[from] InvalidInputKind),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
