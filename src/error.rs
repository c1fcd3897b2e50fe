use crate::domain::card::Operation;
use thiserror::Error;

/// Convenience alias for operations that fail with [`CardError`].
pub type Result<T> = std::result::Result<T, CardError>;

/// Business failures of the card operations.
///
/// Every variant renders the exact message shown to the caller; errors cross
/// the operation boundary as values, never as panics. `InvalidPin` and
/// `InvalidAmount` are raised before any lock attempt, the other two only
/// afterwards.
#[derive(Error, Debug)]
pub enum CardError {
    #[error("Invalid PIN")]
    InvalidPin,
    #[error("Invalid amount=[{0}]. Please enter valid amount.")]
    InvalidAmount(f64),
    #[error(
        "Amount to be withdrawn=[{requested}] is greater than the available balance=[{available}]. Please enter valid amount."
    )]
    InsufficientFunds { requested: f64, available: f64 },
    #[error("Unable to {0}. Please try later.")]
    Busy(Operation),
}
