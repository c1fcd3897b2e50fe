use crate::error::CardError;
use serde::Serialize;
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::timeout;

/// How long an operation waits for exclusive access before giving up.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(1000);

/// The signed balance of a card.
///
/// A wrapper around `f64` to keep balances and transaction amounts from
/// mixing silently. Formats like the underlying float, so `1000.0` renders
/// as `1000` in user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
pub struct Balance(pub f64);

impl Balance {
    pub const ZERO: Self = Self(0.0);

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Balance {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

/// A strictly positive amount for withdrawals and top-ups.
///
/// The constructor rejects zero, negative, and NaN values, so an `Amount`
/// held by an operation is always valid before any lock is taken.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Amount(f64);

impl Amount {
    pub fn new(value: f64) -> Result<Self, CardError> {
        if value > 0.0 {
            Ok(Self(value))
        } else {
            Err(CardError::InvalidAmount(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Amount {
    type Error = CardError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

/// The three card operations, used to pick the right busy message when the
/// lock wait expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Withdraw,
    TopUp,
    GetBalance,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Withdraw => write!(f, "withdraw"),
            Operation::TopUp => write!(f, "topup"),
            Operation::GetBalance => write!(f, "fetch balance"),
        }
    }
}

/// A PIN-protected in-memory account.
///
/// The balance is the only mutable state and is reachable only through the
/// mutex, so debits and credits are atomic with respect to each other.
/// Acquisition is bounded: a caller that cannot get exclusive access within
/// `lock_timeout` receives [`CardError::Busy`] instead of blocking forever.
/// PIN and amount validation run before the lock is requested, so an invalid
/// call never queues behind a contended card.
pub struct Card {
    pin: u32,
    balance: Mutex<Balance>,
    lock_timeout: Duration,
}

impl Card {
    /// Creates a card with a zero balance and the default acquisition bound.
    pub fn new(pin: u32) -> Self {
        Self::with_lock_timeout(pin, DEFAULT_LOCK_TIMEOUT)
    }

    /// Creates a card with a custom acquisition bound.
    pub fn with_lock_timeout(pin: u32, lock_timeout: Duration) -> Self {
        Self {
            pin,
            balance: Mutex::new(Balance::ZERO),
            lock_timeout,
        }
    }

    /// Debits `amount` from the balance.
    ///
    /// Fails with `InsufficientFunds` if `amount` exceeds the current
    /// balance; the balance is left untouched on every error path.
    pub async fn withdraw(&self, pin: u32, amount: f64) -> Result<Balance, CardError> {
        self.check_pin(pin)?;
        let amount = Amount::new(amount)?;

        let mut balance = self.acquire(Operation::Withdraw).await?;
        let debit = Balance::from(amount);
        if debit > *balance {
            return Err(CardError::InsufficientFunds {
                requested: amount.value(),
                available: balance.value(),
            });
        }
        *balance -= debit;
        tracing::trace!(balance = %*balance, "withdrawal applied");
        Ok(*balance)
    }

    /// Credits `amount` to the balance. There is no upper bound.
    pub async fn top_up(&self, pin: u32, amount: f64) -> Result<Balance, CardError> {
        self.check_pin(pin)?;
        let amount = Amount::new(amount)?;

        let mut balance = self.acquire(Operation::TopUp).await?;
        *balance += Balance::from(amount);
        tracing::trace!(balance = %*balance, "top-up applied");
        Ok(*balance)
    }

    /// Returns the current balance without mutating it.
    ///
    /// Reads take the same exclusive access as mutations, so a returned
    /// balance is never a torn or in-between value.
    pub async fn balance(&self, pin: u32) -> Result<Balance, CardError> {
        self.check_pin(pin)?;

        let balance = self.acquire(Operation::GetBalance).await?;
        Ok(*balance)
    }

    fn check_pin(&self, pin: u32) -> Result<(), CardError> {
        if pin == self.pin {
            Ok(())
        } else {
            Err(CardError::InvalidPin)
        }
    }

    async fn acquire(&self, op: Operation) -> Result<MutexGuard<'_, Balance>, CardError> {
        match timeout(self.lock_timeout, self.balance.lock()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                tracing::debug!(%op, timeout = ?self.lock_timeout, "lock acquisition timed out");
                Err(CardError::Busy(op))
            }
        }
    }
}
