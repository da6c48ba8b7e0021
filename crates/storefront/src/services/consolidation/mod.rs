//! Cart consolidation and session reconciliation.
//!
//! Two cooperating pieces:
//!
//! - the **executor** ([`CartConsolidator`]) owns every mutation: it merges a
//!   customer's duplicate cart sessions into one, collapses duplicate line
//!   items, and reports what it did;
//! - the **trigger** ([`ConsolidationTrigger`]) decides when a run happens
//!   (user action or login-time reconciliation), guards against concurrent
//!   runs, invalidates the cart view cache, and surfaces the outcome as a
//!   notice. It never touches cart rows itself.

mod executor;
mod trigger;

pub use executor::{CartConsolidator, ConsolidationError, ConsolidationExecutor};
pub use trigger::{ConsolidationTrigger, TriggerOutcome};
