mod amount;
mod date;

pub use amount::{Amount, AmountParseError};
pub use date::{Date, Timestamp};
