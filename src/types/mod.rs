//! Shared data structures for CML elimination decisions
//!
//! - Measurements and remaining-life forecasts
//! - Model-driven elimination results and reconciled final decisions
//! - SME override records and their agreement statistics

mod measurement;
mod decision;
mod sme_override;

pub use measurement::*;
pub use decision::*;
pub use sme_override::*;
