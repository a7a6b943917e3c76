//! The five numbered testable properties: brute-force-equivalence,
//! WHERE-always-true, aggregated-cardinality, put/contains idempotence,
//! and assumption-pins-the-variable.

use factgraph::config::Config;
use factgraph::engine::FactEngine;
use factgraph::fact::Fact;
use factgraph::store::kv::MemoryKvStore;
use factgraph::store::FactStore;
use factgraph::value::Scalar;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn engine() -> FactEngine {
    FactEngine::new(FactStore::new(Arc::new(MemoryKvStore::new())), &Config::default())
}

fn seed_people(e: &FactEngine) {
    for (id, label, age) in [("n1", "Person", 40), ("n2", "Person", 20), ("n3", "Person", 65)] {
        e.insert_fact(Fact::NodeHasLabel { node_id: id.into(), label: label.into() }).unwrap();
        e.insert_fact(Fact::NodeHasAttribute { node_id: id.into(), attribute: "age".into(), value: Scalar::Int(age) })
            .unwrap();
    }
}

/// Invariant 1: `execute_query` matches brute-force enumeration over
/// every candidate assignment of pattern variables.
#[test]
fn invariant_matches_brute_force_enumeration() {
    let e = engine();
    seed_people(&e);

    let rows = e.execute_query("MATCH (p:Person) WHERE p.age > 30 RETURN p", HashMap::new()).unwrap();
    let got: HashSet<String> = rows.into_iter().map(|r| r["p"].to_string()).collect();

    // Brute force: every node with label Person, filtered by the same
    // predicate, computed independently of the query engine.
    let expected: HashSet<String> = [("n1", 40), ("n2", 20), ("n3", 65)]
        .into_iter()
        .filter(|(_, age)| *age > 30)
        .map(|(id, _)| id.to_string())
        .collect();

    assert_eq!(got, expected);
}

/// Invariant 2: every output projection satisfies the WHERE predicate.
#[test]
fn invariant_where_predicate_holds_on_output() {
    let e = engine();
    seed_people(&e);

    let rows = e.execute_query("MATCH (p:Person) WHERE p.age > 30 RETURN p, p.age AS age", HashMap::new()).unwrap();
    assert!(!rows.is_empty());
    for row in rows {
        match &row["age"] {
            Scalar::Int(age) => assert!(*age > 30),
            other => panic!("expected an int, got {other:?}"),
        }
    }
}

/// Invariant 3: an aggregated query's output cardinality equals the
/// number of distinct group-by-alias tuples.
#[test]
fn invariant_aggregated_cardinality_matches_distinct_groups() {
    let e = engine();
    e.insert_fact(Fact::NodeHasLabel { node_id: "michigan".into(), label: "State".into() }).unwrap();
    e.insert_fact(Fact::NodeHasLabel { node_id: "wisconsin".into(), label: "State".into() }).unwrap();
    for (rel_id, city, state) in [("r1", "kalamazoo", "michigan"), ("r2", "lansing", "michigan"), ("r3", "madison", "wisconsin")] {
        e.insert_fact(Fact::NodeHasLabel { node_id: city.into(), label: "City".into() }).unwrap();
        e.insert_fact(Fact::RelationshipHasLabel { rel_id: rel_id.into(), label: "In".into() }).unwrap();
        e.insert_fact(Fact::RelationshipHasSource { rel_id: rel_id.into(), node_id: city.into() }).unwrap();
        e.insert_fact(Fact::RelationshipHasTarget { rel_id: rel_id.into(), node_id: state.into() }).unwrap();
    }

    let rows = e
        .execute_query(
            "MATCH (c:City)-[r:In]->(s:State) WITH s, COLLECT(c) AS cities RETURN s, cities",
            HashMap::new(),
        )
        .unwrap();
    // Two distinct states among the relationship matches.
    assert_eq!(rows.len(), 2);
}

/// Invariant 4: `put`/`contains` round-trips and duplicate `put` is a
/// no-op (structural dedup, §3).
#[test]
fn invariant_put_contains_idempotent() {
    let store = FactStore::new(Arc::new(MemoryKvStore::new()));
    let fact = Fact::NodeHasLabel { node_id: "n1".into(), label: "Person".into() };
    assert!(!store.contains(&fact).unwrap());
    store.put(&fact).unwrap();
    assert!(store.contains(&fact).unwrap());
    store.put(&fact).unwrap();
    assert!(store.contains(&fact).unwrap());
    assert_eq!(store.nodes_with_label("Person").unwrap(), vec!["n1".to_string()]);
}

/// Invariant 5: with assumption `{v -> e}`, every output projection has
/// `projection[v] = e`.
#[test]
fn invariant_assumption_pins_variable() {
    let e = engine();
    e.insert_fact(Fact::NodeHasLabel { node_id: "kalamazoo".into(), label: "City".into() }).unwrap();
    e.insert_fact(Fact::NodeHasLabel { node_id: "lansing".into(), label: "City".into() }).unwrap();
    e.insert_fact(Fact::NodeHasLabel { node_id: "michigan".into(), label: "State".into() }).unwrap();
    for (rel_id, city) in [("r1", "kalamazoo"), ("r2", "lansing")] {
        e.insert_fact(Fact::RelationshipHasLabel { rel_id: rel_id.into(), label: "In".into() }).unwrap();
        e.insert_fact(Fact::RelationshipHasSource { rel_id: rel_id.into(), node_id: city.into() }).unwrap();
        e.insert_fact(Fact::RelationshipHasTarget { rel_id: rel_id.into(), node_id: "michigan".into() }).unwrap();
    }

    let mut assumptions = HashMap::new();
    assumptions.insert("c".to_string(), "kalamazoo".to_string());
    let rows = e
        .execute_query("MATCH (c:City)-[r:In]->(s:State) RETURN c, s", assumptions)
        .unwrap();
    assert!(!rows.is_empty());
    for row in rows {
        assert_eq!(row["c"], Scalar::Str("kalamazoo".to_string()));
    }
}
