//! Time-indexed inventories over a lineage forest

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::application::ApplicationResult;
use crate::domain::{LineageForest, Resource, SimulationWindow, Time};
use crate::infrastructure::traits::ResourceLedger;

/// Frontier of every tree at each requested time step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Inventory {
    steps: BTreeMap<Time, BTreeSet<Resource>>,
}

impl Inventory {
    /// Inventory for every step of the ledger's simulation window.
    pub fn from_ledger(
        ledger: &dyn ResourceLedger,
        forest: &LineageForest,
    ) -> ApplicationResult<Self> {
        let window = ledger.simulation_window()?;
        Ok(time_inventory(forest, window))
    }

    pub fn at(&self, time: Time) -> Option<&BTreeSet<Resource>> {
        self.steps.get(&time)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Time, &BTreeSet<Resource>)> {
        self.steps.iter()
    }

    /// Number of time steps covered.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (time, resources) in &self.steps {
            writeln!(f, "timestep {}", time)?;
            for resource in resources {
                writeln!(f, "     {}", resource)?;
            }
        }
        Ok(())
    }
}

/// Deduplicated frontier of all trees at `time`.
pub fn inventory_at(forest: &LineageForest, time: Time) -> BTreeSet<Resource> {
    forest.forest_frontier(Some(time))
}

/// Frontier at every step of `window`, each step computed independently.
#[instrument(level = "debug", skip(forest))]
pub fn time_inventory(forest: &LineageForest, window: SimulationWindow) -> Inventory {
    let steps = window
        .steps()
        .map(|t| (t, inventory_at(forest, t)))
        .collect::<BTreeMap<_, _>>();
    debug!("computed inventory for {} time steps", steps.len());
    Inventory { steps }
}

/// Per-time additions and removals implied by the forest's structure.
///
/// A node is added at its own time; its parent is removed at that time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineageChanges {
    pub added: BTreeMap<Time, BTreeSet<Resource>>,
    pub removed: BTreeMap<Time, BTreeSet<Resource>>,
}

impl LineageChanges {
    /// All times at which something was added or removed.
    pub fn times(&self) -> BTreeSet<Time> {
        self.added.keys().chain(self.removed.keys()).copied().collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for LineageChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for time in self.times() {
            writeln!(f, "timestep {}", time)?;
            for resource in self.added.get(&time).into_iter().flatten() {
                writeln!(f, "   + {}", resource)?;
            }
            for resource in self.removed.get(&time).into_iter().flatten() {
                writeln!(f, "   - {}", resource)?;
            }
        }
        Ok(())
    }
}

#[instrument(level = "debug", skip(forest))]
pub fn lineage_changes(forest: &LineageForest) -> LineageChanges {
    let mut changes = LineageChanges::default();
    for (_, node) in forest.iter() {
        let time = node.resource.time;
        changes
            .added
            .entry(time)
            .or_default()
            .insert(node.resource);
        if let Some(parent) = node.parent.and_then(|p| forest.get_node(p)) {
            changes
                .removed
                .entry(time)
                .or_default()
                .insert(parent.resource);
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Slot;

    fn split_forest() -> LineageForest {
        let mut forest = LineageForest::new();
        let r1 = forest.insert_root(Resource::new(1, 0, 10.0));
        let r2 = forest.insert_node(Resource::new(2, 5, 4.0));
        let r3 = forest.insert_node(Resource::new(3, 5, 6.0));
        forest.attach(r1, Slot::Left, r2).unwrap();
        forest.attach(r1, Slot::Right, r3).unwrap();
        forest
    }

    fn ids(set: &BTreeSet<Resource>) -> Vec<i64> {
        set.iter().map(|r| r.id).collect()
    }

    #[test]
    fn inventory_covers_window_steps() {
        let inventory = time_inventory(&split_forest(), SimulationWindow::new(0, 8));
        assert_eq!(inventory.len(), 8);
        assert!(inventory.at(0).unwrap().is_empty());
        assert_eq!(ids(inventory.at(3).unwrap()), vec![1]);
        assert_eq!(ids(inventory.at(5).unwrap()), vec![1]);
        assert_eq!(ids(inventory.at(6).unwrap()), vec![2, 3]);
        assert!(inventory.at(8).is_none());
    }

    #[test]
    fn inventory_text_lists_labels() {
        let inventory = time_inventory(&split_forest(), SimulationWindow::new(3, 1));
        assert_eq!(
            inventory.to_string(),
            "timestep 3\n     Res 1 @ t=0 (qty 10)\n"
        );
    }

    #[test]
    fn inventory_json_is_keyed_by_time() {
        let inventory = time_inventory(&split_forest(), SimulationWindow::new(6, 1));
        let value: serde_json::Value = serde_json::from_str(&inventory.to_json().unwrap()).unwrap();
        assert_eq!(value["6"][0]["id"], 2);
        assert_eq!(value["6"][1]["id"], 3);
    }

    #[test]
    fn changes_add_children_and_remove_parent() {
        let changes = lineage_changes(&split_forest());
        assert_eq!(ids(&changes.added[&0]), vec![1]);
        assert_eq!(ids(&changes.added[&5]), vec![2, 3]);
        assert_eq!(ids(&changes.removed[&5]), vec![1]);
        assert!(!changes.removed.contains_key(&0));
        assert_eq!(changes.times().into_iter().collect::<Vec<_>>(), vec![0, 5]);
    }
}
