//! # Waternity Core
//!
//! Shared building blocks for the Waternity well-staking ledger:
//! - `Address` / `WellId` - identities and well identifiers
//! - `WaternityError` - the error vocabulary every crate reports with
//! - `Clock` - injected unix time, with a manual clock for tests
//! - `LedgerEvent` - the event journal entries

pub mod clock;
pub mod error;
pub mod events;
pub mod types;

pub use clock::*;
pub use error::*;
pub use events::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::error::{Result, WaternityError};
    pub use crate::events::LedgerEvent;
    pub use crate::types::*;
}
