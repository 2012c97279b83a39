//! Domain types for TierLab

pub mod bar;
pub mod equity;
pub mod portfolio;
pub mod position;
pub mod trade;

pub use bar::{validate_bars, Bar, InputError};
pub use equity::EquityPoint;
pub use portfolio::Portfolio;
pub use position::{CycleState, Direction, EntryTier, PositionTier, SIZE_EPSILON};
pub use trade::{ExitReason, Trade};
