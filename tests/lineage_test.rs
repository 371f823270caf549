//! Tree building over SQLite ledgers with both root selection strategies

use rstest::{fixture, rstest};

use heritage::application::services::{time_inventory, RootSelection, TreeBuilder};
use heritage::application::ApplicationError;
use heritage::domain::{DomainError, LineageForest, ResourceId};
use heritage::infrastructure::{ResourceLedger, SqliteLedger};
use heritage::util::testing::{init_test_setup, LedgerFixture};

/// Agent 5 receives resource 5 at t=2 and resource 7 at t=3 from agent 1.
/// Resource 7 splits at t=4 into 8 and 9. Agent 5 hands resource 5 to
/// agent 6 at t=8, where it is split into 6 at t=9.
#[fixture]
fn agent_ledger() -> SqliteLedger {
    init_test_setup();
    LedgerFixture::new()
        .simulation(0, 12)
        .agent(1)
        .agent(5)
        .agent(6)
        .resource(5, 0, 0, 1, 3.0)
        .resource(7, 0, 0, 1, 2.0)
        .resource(8, 7, 0, 4, 1.5)
        .resource(9, 0, 7, 4, 0.5)
        .resource(6, 5, 0, 9, 3.0)
        .transfer(1, 2, 1, 5, &[5])
        .transfer(2, 3, 1, 5, &[7])
        .transfer(3, 8, 5, 6, &[5])
        .into_ledger()
}

fn node_ids(forest: &LineageForest) -> Vec<ResourceId> {
    let mut ids: Vec<_> = forest.iter().map(|(_, n)| n.resource.id).collect();
    ids.sort_unstable();
    ids
}

#[rstest]
fn given_agent_when_building_then_roots_are_received_resources(agent_ledger: SqliteLedger) {
    let forest = TreeBuilder::new(&agent_ledger)
        .build(RootSelection::BoundedAgent(5))
        .unwrap();

    let roots: Vec<_> = forest
        .roots()
        .iter()
        .filter_map(|&r| forest.get_node(r))
        .map(|n| (n.resource.id, n.resource.time))
        .collect();
    // roots enter the boundary at transfer time
    assert_eq!(roots, vec![(5, 2), (7, 3)]);
}

#[rstest]
fn given_resource_sent_away_when_building_then_descendants_are_not_followed(
    agent_ledger: SqliteLedger,
) {
    let forest = TreeBuilder::new(&agent_ledger)
        .build(RootSelection::BoundedAgent(5))
        .unwrap();

    assert_eq!(node_ids(&forest), vec![5, 7, 8, 9]);
    let exit = forest
        .iter()
        .find(|(_, n)| n.resource.id == 5)
        .map(|(_, n)| n.has_children());
    assert_eq!(exit, Some(false));

    let window = agent_ledger.simulation_window().unwrap();
    let inventory = time_inventory(&forest, window);
    for (time, resources) in inventory.iter() {
        assert!(
            resources.iter().all(|r| r.id != 6),
            "resource 6 present at t={}",
            time
        );
    }
}

#[rstest]
fn given_whole_population_when_building_then_follows_every_lineage(agent_ledger: SqliteLedger) {
    let forest = TreeBuilder::new(&agent_ledger)
        .build(RootSelection::WholePopulation)
        .unwrap();

    assert_eq!(forest.roots().len(), 2);
    assert_eq!(node_ids(&forest), vec![5, 6, 7, 8, 9]);
}

#[rstest]
fn given_agent_without_transfers_when_building_then_forest_is_empty(agent_ledger: SqliteLedger) {
    let forest = TreeBuilder::new(&agent_ledger)
        .build(RootSelection::BoundedAgent(42))
        .unwrap();

    assert!(forest.is_empty());
    let inventory = time_inventory(&forest, agent_ledger.simulation_window().unwrap());
    assert_eq!(inventory.len(), 12);
    assert!(inventory.iter().all(|(_, resources)| resources.is_empty()));
}

#[test]
fn given_three_children_when_building_then_reports_data_integrity_error() {
    let ledger = LedgerFixture::new()
        .resource(1, 0, 0, 0, 9.0)
        .resource(2, 1, 0, 1, 3.0)
        .resource(3, 1, 0, 1, 3.0)
        .resource(4, 0, 1, 1, 3.0)
        .into_ledger();

    let err = TreeBuilder::new(&ledger)
        .build(RootSelection::WholePopulation)
        .unwrap_err();

    match err {
        ApplicationError::Domain(e @ DomainError::TooManyChildren { .. }) => {
            assert!(e.is_data_integrity());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn given_failed_build_when_rebuilding_then_fresh_forest_is_unaffected() {
    let ledger = LedgerFixture::new()
        .resource(1, 0, 0, 0, 9.0)
        .resource(2, 1, 0, 1, 3.0)
        .resource(3, 1, 0, 1, 3.0)
        .resource(4, 1, 0, 1, 3.0)
        .resource(10, 0, 0, 0, 1.0)
        .transfer(1, 2, 0, 7, &[10])
        .into_ledger();
    let builder = TreeBuilder::new(&ledger);

    assert!(builder.build(RootSelection::WholePopulation).is_err());
    let forest = builder.build(RootSelection::BoundedAgent(7)).unwrap();

    assert_eq!(node_ids(&forest), vec![10]);
}

#[test]
fn given_ledger_file_when_opened_then_builds_same_forest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.sqlite");
    let conn = rusqlite::Connection::open(&path).unwrap();
    LedgerFixture::with_connection(conn)
        .simulation(0, 6)
        .resource(1, 0, 0, 0, 10.0)
        .resource(2, 1, 0, 5, 4.0)
        .resource(3, 0, 1, 5, 6.0)
        .into_connection()
        .close()
        .unwrap();

    let ledger = SqliteLedger::open(&path).unwrap();
    ledger.prepare().unwrap();
    ledger.prepare().unwrap();
    let forest = TreeBuilder::new(&ledger)
        .build(RootSelection::WholePopulation)
        .unwrap();

    assert_eq!(node_ids(&forest), vec![1, 2, 3]);
    assert_eq!(ledger.path(), Some(path.as_path()));
}
