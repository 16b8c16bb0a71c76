// Account module - WHO holds value
// Addresses and base-unit amount handling

mod address;
pub mod units;

pub use address::{Address, AddressError};
pub use units::{Amount, UnitsError, UNIT};
