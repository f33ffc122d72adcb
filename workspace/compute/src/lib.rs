pub mod convert;
pub mod daily;
pub mod error;
pub mod period;
pub mod queries;
pub mod summary;
pub mod timezone;
pub mod transactions;

#[cfg(test)]
pub(crate) mod testing;

pub use daily::{DateRange, compute_daily_rows};
pub use error::{ComputeError, Result};
pub use summary::summarize;
pub use transactions::TransactionKind;

/// Zone used when a caller does not say which one it lives in.
pub const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";
