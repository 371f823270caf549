//! Application services
//!
//! Tree construction, root selection and time-sliced queries.
//! Services depend on the ledger boundary trait (`ResourceLedger`)
//! but are themselves concrete structs, not traits.

mod inventory;
mod lineage;

pub use inventory::{inventory_at, lineage_changes, time_inventory, Inventory, LineageChanges};
pub use lineage::{ExitSet, RootSelection, SelectedRoots, TreeBuilder};
