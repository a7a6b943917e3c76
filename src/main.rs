//! # Fact Graph REPL
//!
//! A simple Read-Eval-Print Loop for the fact graph query engine.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin factgraph
//! ```
//!
//! Then enter facts or queries:
//! - `.fact label <node_id> <label>`         - assert `NodeHasLabel`
//! - `.fact attr <node_id> <attr> <value>`   - assert `NodeHasAttribute`
//! - `.fact rellabel <rel_id> <label>`       - assert `RelationshipHasLabel`
//! - `.fact relattr <rel_id> <attr> <value>` - assert `RelationshipHasAttribute`
//! - `.fact source <rel_id> <node_id>`       - assert `RelationshipHasSource`
//! - `.fact target <rel_id> <node_id>`       - assert `RelationshipHasTarget`
//! - `.query <cypher>`                       - run a MATCH ... RETURN query
//! - `.help`                                 - show this help
//! - `.quit`                                 - exit

use factgraph::config::Config;
use factgraph::engine::FactEngine;
use factgraph::fact::Fact;
use factgraph::store::kv::MemoryKvStore;
use factgraph::store::FactStore;
use factgraph::value::Scalar;
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;

fn main() {
    let config = Config::default();
    factgraph::logging::init_logging(&config.logging);

    println!("Fact Graph Query Engine REPL");
    println!("============================\n");
    print_help();

    let store = FactStore::new(Arc::new(MemoryKvStore::new()));
    let engine = FactEngine::new(store, &config);

    loop {
        print!("> ");
        io::stdout().flush().unwrap();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input == ".quit" || input == ".exit" {
            println!("Goodbye!");
            break;
        }
        if input == ".help" {
            print_help();
            continue;
        }
        if let Some(rest) = input.strip_prefix(".fact") {
            match parse_fact(rest.trim()) {
                Ok(fact) => match engine.insert_fact(fact) {
                    Ok(()) => println!("ok"),
                    Err(e) => println!("error: {e}"),
                },
                Err(msg) => println!("error: {msg}"),
            }
            continue;
        }
        if let Some(rest) = input.strip_prefix(".query") {
            match engine.execute_query(rest.trim(), HashMap::new()) {
                Ok(rows) => {
                    println!("{} row(s):", rows.len());
                    for row in rows {
                        println!("  {row:?}");
                    }
                }
                Err(e) => println!("error: {e}"),
            }
            continue;
        }

        println!("Unknown command: {input}");
        println!("Type .help for available commands");
    }
}

fn print_help() {
    println!("Commands:");
    println!("  .fact label <node_id> <label>");
    println!("  .fact attr <node_id> <attr> <value>");
    println!("  .fact rellabel <rel_id> <label>");
    println!("  .fact relattr <rel_id> <attr> <value>");
    println!("  .fact source <rel_id> <node_id>");
    println!("  .fact target <rel_id> <node_id>");
    println!("  .query <cypher>");
    println!("  .help");
    println!("  .quit\n");
}

fn parse_fact(rest: &str) -> Result<Fact, String> {
    let parts: Vec<&str> = rest.split_whitespace().collect();
    match parts.as_slice() {
        ["label", node_id, label] => Ok(Fact::NodeHasLabel {
            node_id: (*node_id).to_string(),
            label: (*label).to_string(),
        }),
        ["attr", node_id, attr, value] => Ok(Fact::NodeHasAttribute {
            node_id: (*node_id).to_string(),
            attribute: (*attr).to_string(),
            value: parse_scalar(value),
        }),
        ["rellabel", rel_id, label] => Ok(Fact::RelationshipHasLabel {
            rel_id: (*rel_id).to_string(),
            label: (*label).to_string(),
        }),
        ["relattr", rel_id, attr, value] => Ok(Fact::RelationshipHasAttribute {
            rel_id: (*rel_id).to_string(),
            attribute: (*attr).to_string(),
            value: parse_scalar(value),
        }),
        ["source", rel_id, node_id] => Ok(Fact::RelationshipHasSource {
            rel_id: (*rel_id).to_string(),
            node_id: (*node_id).to_string(),
        }),
        ["target", rel_id, node_id] => Ok(Fact::RelationshipHasTarget {
            rel_id: (*rel_id).to_string(),
            node_id: (*node_id).to_string(),
        }),
        _ => Err("usage: .fact <label|attr|rellabel|relattr|source|target> ...".to_string()),
    }
}

fn parse_scalar(raw: &str) -> Scalar {
    if raw == "null" {
        Scalar::Null
    } else if let Ok(b) = raw.parse::<bool>() {
        Scalar::Bool(b)
    } else if let Ok(i) = raw.parse::<i64>() {
        Scalar::Int(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        Scalar::Float(f)
    } else {
        Scalar::Str(raw.to_string())
    }
}
