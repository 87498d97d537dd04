//! Types shared by every crate in the donation payment gateway workspace.
mod minor_units;

pub mod helpers;
pub mod op;
mod secret;

pub use minor_units::{Direction, MinorUnits, MinorUnitsConversionError, DEFAULT_CURRENCY_CODE};
pub use secret::Secret;
