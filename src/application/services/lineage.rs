//! Lineage tree construction
//!
//! Root selection decides which resources start a tree and where expansion
//! stops; the builder then walks the ledger's parent/child relationships
//! below each root.

use std::collections::{HashMap, HashSet};
use std::fmt;

use generational_arena::Index;
use tracing::{debug, info, instrument, trace, warn};

use crate::application::ApplicationResult;
use crate::domain::{
    AgentId, ChildSlotPolicy, DomainError, LineageForest, Resource, ResourceId,
};
use crate::infrastructure::traits::ResourceLedger;

/// Resource ids that left the boundary of interest; never expanded.
pub type ExitSet = HashSet<ResourceId>;

/// Policy deciding what counts as a root and what counts as an exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSelection {
    /// Every parentless resource is a root, nothing exits.
    WholePopulation,
    /// Resources received by the agent are roots, resources it sent away exit.
    BoundedAgent(AgentId),
}

impl fmt::Display for RootSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootSelection::WholePopulation => write!(f, "whole population"),
            RootSelection::BoundedAgent(agent) => write!(f, "agent {}", agent),
        }
    }
}

/// Builder inputs produced by a [`RootSelection`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectedRoots {
    pub roots: Vec<Resource>,
    pub exits: ExitSet,
}

impl RootSelection {
    #[instrument(level = "debug", skip(ledger))]
    pub fn select(&self, ledger: &dyn ResourceLedger) -> ApplicationResult<SelectedRoots> {
        match *self {
            RootSelection::WholePopulation => {
                let roots = ledger
                    .parentless_resources()?
                    .iter()
                    .map(|record| record.resource())
                    .collect();
                Ok(SelectedRoots {
                    roots,
                    exits: ExitSet::new(),
                })
            }
            RootSelection::BoundedAgent(agent) => {
                let mut selected = SelectedRoots::default();
                for transfer in ledger.transfers_involving(agent)? {
                    if transfer.receiver == agent {
                        // enters the boundary at transfer time
                        selected.roots.push(Resource::new(
                            transfer.resource_id,
                            transfer.time,
                            transfer.quantity,
                        ));
                    } else {
                        selected.exits.insert(transfer.resource_id);
                    }
                }
                if selected.roots.is_empty() && selected.exits.is_empty() {
                    debug!("agent {} has no transfers", agent);
                }
                Ok(selected)
            }
        }
    }
}

/// Builds lineage forests by querying the ledger for each node's children.
pub struct TreeBuilder<'l> {
    ledger: &'l dyn ResourceLedger,
    policy: ChildSlotPolicy,
}

impl<'l> TreeBuilder<'l> {
    pub fn new(ledger: &'l dyn ResourceLedger) -> Self {
        Self {
            ledger,
            policy: ChildSlotPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ChildSlotPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ChildSlotPolicy {
        self.policy
    }

    /// Select roots and exits with `selection`, then expand every root.
    #[instrument(level = "debug", skip(self))]
    pub fn build(&self, selection: RootSelection) -> ApplicationResult<LineageForest> {
        let selected = selection.select(self.ledger)?;
        self.build_from(&selected)
    }

    /// Expand a forest from already selected roots.
    pub fn build_from(&self, selected: &SelectedRoots) -> ApplicationResult<LineageForest> {
        info!(
            "Found {} root nodes, {} exit resources",
            selected.roots.len(),
            selected.exits.len()
        );
        let mut forest = LineageForest::new();
        let mut producers = Producers::new();
        for (i, resource) in selected.roots.iter().enumerate() {
            debug!("Processing root {} ({})...", i, resource);
            let root = forest.insert_root(*resource);
            self.expand_with(&mut forest, root, &selected.exits, &mut producers)?;
        }
        info!("tree finished: {} nodes", forest.len());
        Ok(forest)
    }

    /// Attach all descendants of `root`, stopping at resources in `exits`.
    ///
    /// Children are assigned to slots according to the builder's
    /// [`ChildSlotPolicy`]. A resource produced by two parents is attached
    /// under both and logged; forest-wide queries collapse it by id. More
    /// than two children, or a resource descending from itself, is a
    /// data-integrity error.
    pub fn expand(
        &self,
        forest: &mut LineageForest,
        root: Index,
        exits: &ExitSet,
    ) -> ApplicationResult<()> {
        self.expand_with(forest, root, exits, &mut Producers::new())
    }

    #[instrument(level = "debug", skip(self, forest, exits, producers))]
    fn expand_with(
        &self,
        forest: &mut LineageForest,
        root: Index,
        exits: &ExitSet,
        producers: &mut Producers,
    ) -> ApplicationResult<()> {
        let mut stack = vec![root];

        while let Some(current) = stack.pop() {
            let id = forest
                .get_node(current)
                .map(|n| n.resource.id)
                .ok_or(DomainError::UnknownNode)?;
            if exits.contains(&id) {
                trace!("resource {} left the boundary, not expanding", id);
                continue;
            }

            let records = self.ledger.children_of(id)?;
            if records.len() > 2 {
                return Err(DomainError::TooManyChildren {
                    parent: id,
                    count: records.len(),
                }
                .into());
            }

            let lineage = ancestry(forest, current);
            let mut attached = Vec::with_capacity(records.len());
            for (position, record) in records.iter().enumerate() {
                if lineage.contains(&record.id) {
                    return Err(DomainError::Cycle {
                        resource: record.id,
                        descendant: id,
                    }
                    .into());
                }
                match producers.get(&record.id) {
                    Some(&first) if first != id => warn!(
                        "resource {} has two parents ({} and {}), tracked under both",
                        record.id, first, id
                    ),
                    Some(_) => {}
                    None => {
                        producers.insert(record.id, id);
                    }
                }

                let preferred = self.policy.preferred_slot(position, record, id);
                let slot = if forest.is_slot_free(current, preferred) {
                    preferred
                } else {
                    preferred.other()
                };
                let child = forest.insert_node(record.resource());
                forest.attach(current, slot, child)?;
                attached.push(child);
            }

            // first discovered child is expanded first
            stack.extend(attached.into_iter().rev());
        }
        Ok(())
    }
}

/// First parent each resource was attached under.
type Producers = HashMap<ResourceId, ResourceId>;

/// Ids of `idx` and all its ancestors.
fn ancestry(forest: &LineageForest, idx: Index) -> HashSet<ResourceId> {
    let mut ids = HashSet::new();
    let mut current = Some(idx);
    while let Some(node) = current.and_then(|i| forest.get_node(i)) {
        ids.insert(node.resource.id);
        current = node.parent;
    }
    ids
}
