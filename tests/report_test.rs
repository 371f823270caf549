//! Graph export, inventory, and change log reports

use rstest::{fixture, rstest};

use heritage::application::services::{lineage_changes, Inventory, RootSelection, TreeBuilder};
use heritage::application::{dot_edges, dot_graph, TreeRender};
use heritage::domain::{LineageForest, Resource, Slot};
use heritage::infrastructure::SqliteLedger;
use heritage::util::testing::{init_test_setup, LedgerFixture};

#[fixture]
fn ledger() -> SqliteLedger {
    init_test_setup();
    LedgerFixture::new()
        .simulation(4, 4)
        .resource(1, 0, 0, 0, 10.0)
        .resource(2, 1, 0, 5, 4.0)
        .resource(3, 0, 1, 5, 6.0)
        .resource(4, 3, 0, 6, 6.0)
        .into_ledger()
}

fn build(ledger: &SqliteLedger) -> LineageForest {
    TreeBuilder::new(ledger)
        .build(RootSelection::WholePopulation)
        .unwrap()
}

#[rstest]
fn given_forest_when_exported_twice_then_output_is_identical(ledger: SqliteLedger) {
    let first = dot_graph(&build(&ledger));
    let second = dot_graph(&build(&ledger));

    assert_eq!(first, second);
    assert!(first.starts_with("digraph G {\n"));
    assert!(first.ends_with("}\n"));
    assert_eq!(first.lines().count(), 2 + 3);
}

#[test]
fn given_duplicate_trees_when_exporting_then_edges_appear_once() {
    let mut forest = LineageForest::new();
    for _ in 0..2 {
        let root = forest.insert_root(Resource::new(1, 0, 10.0));
        let child = forest.insert_node(Resource::new(2, 5, 10.0));
        forest.attach(root, Slot::Left, child).unwrap();
    }

    let edges = dot_edges(&forest);

    assert_eq!(edges.len(), 1);
    assert_eq!(
        edges.iter().next().map(String::as_str),
        Some("\"Res 1 @ t=0 (qty 10)\" -> \"Res 2 @ t=5 (qty 10)\"")
    );
}

#[rstest]
fn given_ledger_window_when_computing_inventory_then_covers_each_step(ledger: SqliteLedger) {
    let forest = build(&ledger);

    let inventory = Inventory::from_ledger(&ledger, &forest).unwrap();

    let steps: Vec<_> = inventory
        .iter()
        .map(|(t, res)| (*t, res.iter().map(|r| r.id).collect::<Vec<_>>()))
        .collect();
    assert_eq!(
        steps,
        vec![
            (4, vec![1]),
            (5, vec![1]),
            (6, vec![2, 3]),
            (7, vec![2, 4]),
        ]
    );
}

#[rstest]
fn given_inventory_when_rendered_as_text_then_lists_labels_per_step(ledger: SqliteLedger) {
    let forest = build(&ledger);
    let inventory = Inventory::from_ledger(&ledger, &forest).unwrap();

    let text = inventory.to_string();

    assert!(text.starts_with("timestep 4\n     Res 1 @ t=0 (qty 10)\n"));
    assert!(text.contains("timestep 7\n     Res 2 @ t=5 (qty 4)\n     Res 4 @ t=6 (qty 6)\n"));
}

#[rstest]
fn given_forest_when_computing_changes_then_children_replace_parents(ledger: SqliteLedger) {
    let changes = lineage_changes(&build(&ledger));

    let ids = |set: Option<&std::collections::BTreeSet<Resource>>| -> Vec<i64> {
        set.into_iter().flatten().map(|r| r.id).collect()
    };
    assert_eq!(ids(changes.added.get(&5)), vec![2, 3]);
    assert_eq!(ids(changes.removed.get(&5)), vec![1]);
    assert_eq!(ids(changes.added.get(&6)), vec![4]);
    assert_eq!(ids(changes.removed.get(&6)), vec![3]);

    let json: serde_json::Value = serde_json::from_str(&changes.to_json().unwrap()).unwrap();
    assert_eq!(json["removed"]["6"][0]["id"], 3);
}

#[rstest]
fn given_forest_when_rendered_as_tree_then_nests_descendants(ledger: SqliteLedger) {
    let trees = build(&ledger).to_trees();

    assert_eq!(trees.len(), 1);
    let rendered = trees[0].to_string();
    assert!(rendered.starts_with("Res 1 @ t=0 (qty 10)\n"));
    assert!(rendered.contains("Res 4 @ t=6 (qty 6)"));
}
