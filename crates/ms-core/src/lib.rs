//! ms-core: units, numeric helpers and the shared error type for multistage.

pub mod error;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use units::*;
