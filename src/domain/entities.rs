//! Domain entities: core data structures

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Ledger identifier of a resource.
pub type ResourceId = i64;
/// Ledger identifier of a participant (agent).
pub type AgentId = i64;
/// Simulated time step.
pub type Time = i64;

/// Parent id used by the ledger to mean "no parent".
pub const NO_PARENT: ResourceId = 0;

/// One resource as represented in a lineage tree.
///
/// Equality, ordering and hashing use `id` alone, so sets of resources
/// collapse duplicates discovered through different trees.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Resource {
    pub id: ResourceId,
    /// Time the resource came into existence (or entered the boundary)
    pub time: Time,
    pub quantity: f64,
}

impl Resource {
    pub fn new(id: ResourceId, time: Time, quantity: f64) -> Self {
        Self { id, time, quantity }
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Resource {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Resource {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Res {} @ t={} (qty {})", self.id, self.time, self.quantity)
    }
}

/// Row of the ledger's resource table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    pub id: ResourceId,
    pub parent_1: ResourceId,
    pub parent_2: ResourceId,
    pub time_created: Time,
    pub quantity: f64,
}

impl ResourceRecord {
    pub fn resource(&self) -> Resource {
        Resource::new(self.id, self.time_created, self.quantity)
    }
}

/// A resource changing hands between two participants.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRecord {
    pub time: Time,
    pub sender: AgentId,
    pub receiver: AgentId,
    pub resource_id: ResourceId,
    /// Quantity of the transferred resource
    pub quantity: f64,
}

/// Simulated time span recorded by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimulationWindow {
    pub start: Time,
    pub duration: Time,
}

impl SimulationWindow {
    pub fn new(start: Time, duration: Time) -> Self {
        Self { start, duration }
    }

    /// Time steps covered by the simulation: `start..start + duration`.
    pub fn steps(&self) -> Range<Time> {
        self.start..self.start.saturating_add(self.duration.max(0))
    }
}

/// Child slot of a lineage node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Left,
    Right,
}

impl Slot {
    pub fn other(self) -> Self {
        match self {
            Slot::Left => Slot::Right,
            Slot::Right => Slot::Left,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Left => write!(f, "left"),
            Slot::Right => write!(f, "right"),
        }
    }
}

/// How discovered children are assigned to the left/right slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChildSlotPolicy {
    /// First child found goes left, second goes right, regardless of
    /// which parent column referenced the parent.
    #[default]
    DiscoveryOrder,
    /// Parent1 matches prefer left, Parent2 matches prefer right; falls
    /// back to the other slot when the preferred one is taken.
    ParentField,
}

impl ChildSlotPolicy {
    /// Slot the `position`-th child of `parent` should occupy.
    pub fn preferred_slot(
        &self,
        position: usize,
        record: &ResourceRecord,
        parent: ResourceId,
    ) -> Slot {
        match self {
            ChildSlotPolicy::DiscoveryOrder => {
                if position == 0 {
                    Slot::Left
                } else {
                    Slot::Right
                }
            }
            ChildSlotPolicy::ParentField => {
                if record.parent_1 == parent {
                    Slot::Left
                } else {
                    Slot::Right
                }
            }
        }
    }
}

impl fmt::Display for ChildSlotPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildSlotPolicy::DiscoveryOrder => write!(f, "discovery-order"),
            ChildSlotPolicy::ParentField => write!(f, "parent-field"),
        }
    }
}

impl FromStr for ChildSlotPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discovery-order" => Ok(ChildSlotPolicy::DiscoveryOrder),
            "parent-field" => Ok(ChildSlotPolicy::ParentField),
            other => Err(format!(
                "unknown slot policy '{}' (expected discovery-order or parent-field)",
                other
            )),
        }
    }
}

/// Expand `~`, `$VAR` and `${VAR}` in a path-like string.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
