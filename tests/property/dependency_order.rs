// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Dependency Ordering
//!
//! Random DAGs inserted in random order always come out topologically
//! sorted; any back edge on a chain is always reported as a cycle.

use passwordless_infra::composer::{Declaration, DependencyGraph, QueueSpec, ResourceId, ResourceSpec};
use passwordless_infra::SynthesisError;
use proptest::prelude::*;
use std::collections::HashSet;

fn node(index: usize, deps: &[usize]) -> Declaration {
    deps.iter().fold(
        Declaration::new(
            ResourceId::new(format!("node-{}", index)),
            ResourceSpec::Queue(QueueSpec {
                name: format!("node-{}", index),
                enforce_ssl: true,
            }),
        ),
        |decl, dep| decl.depends_on(&ResourceId::new(format!("node-{}", dep))),
    )
}

/// Node `i` may only depend on nodes `< i`, so the graph is acyclic
fn dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..24).prop_flat_map(|n| {
        (0..n)
            .map(|i| {
                if i == 0 {
                    Just(Vec::new()).boxed()
                } else {
                    prop::collection::vec(0..i, 0..4).boxed()
                }
            })
            .collect::<Vec<_>>()
    })
}

proptest! {
    #[test]
    fn prop_order_respects_every_edge(
        (deps, insertion) in dag().prop_flat_map(|deps| {
            let order: Vec<usize> = (0..deps.len()).collect();
            (Just(deps), Just(order).prop_shuffle())
        })
    ) {
        let mut graph = DependencyGraph::new();
        for &i in &insertion {
            graph.add(node(i, &deps[i])).unwrap();
        }

        let ordered = graph.order().unwrap();
        prop_assert_eq!(ordered.len(), deps.len());

        let mut seen = HashSet::new();
        for declaration in ordered.iter() {
            for dependency in declaration.dependencies() {
                prop_assert!(seen.contains(dependency));
            }
            seen.insert(declaration.id.clone());
        }
    }

    #[test]
    fn prop_order_is_deterministic(deps in dag()) {
        let build = || {
            let mut graph = DependencyGraph::new();
            for (i, d) in deps.iter().enumerate() {
                graph.add(node(i, d)).unwrap();
            }
            graph.order().unwrap()
        };
        prop_assert_eq!(build(), build());
    }

    #[test]
    fn prop_back_edge_is_a_cycle(len in 2usize..16, from in 0usize..16, to in 0usize..16) {
        let from = from % len;
        let to = to % len;
        prop_assume!(to <= from);

        let mut graph = DependencyGraph::new();
        for i in 0..len {
            let mut deps = if i > 0 { vec![i - 1] } else { Vec::new() };
            if i == to && from != to {
                deps.push(from);
            }
            graph.add(node(i, &deps)).unwrap();
        }

        if from == to {
            // a node never depends on itself
            prop_assert!(graph.order().is_ok());
        } else {
            match graph.order() {
                Err(SynthesisError::DependencyCycle(members)) => {
                    prop_assert!(!members.is_empty());
                    for member in members {
                        let index: usize = member.trim_start_matches("node-").parse().unwrap();
                        prop_assert!(index >= to && index <= from);
                    }
                }
                other => prop_assert!(false, "expected a cycle, got {:?}", other),
            }
        }
    }
}
