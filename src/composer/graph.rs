// Copyright (c) 2025 - Cowboy AI, Inc.
//! Declaration Dependency Graph
//!
//! Declarations are collected in any order, then ordered topologically. The
//! deploy engine parallelises independent subtrees of what we emit, so a
//! missing edge here is a real ordering bug there.
//!
//! # Ordering
//!
//! Kahn's algorithm with ties broken by insertion order: two runs over the
//! same declarations always produce the same sequence.

use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

use super::declaration::{Declaration, ResourceId};
use crate::errors::{SynthesisError, SynthesisResult};

/// Unordered collection of declarations with their edges
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<Declaration>,
    index: BTreeMap<ResourceId, usize>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration; ids must be unique
    pub fn add(&mut self, declaration: Declaration) -> SynthesisResult<&ResourceId> {
        if self.index.contains_key(&declaration.id) {
            return Err(SynthesisError::DuplicateResource(declaration.id.to_string()));
        }
        let position = self.nodes.len();
        self.index.insert(declaration.id.clone(), position);
        self.nodes.push(declaration);
        Ok(&self.nodes[position].id)
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Dependencies of every node as insertion indices
    fn edges(&self) -> SynthesisResult<Vec<BTreeSet<usize>>> {
        self.nodes
            .iter()
            .map(|node| {
                node.dependencies()
                    .into_iter()
                    .map(|dep| {
                        self.index
                            .get(dep)
                            .copied()
                            .ok_or_else(|| SynthesisError::UnknownDependency {
                                from: node.id.to_string(),
                                to: dep.to_string(),
                            })
                    })
                    .collect::<SynthesisResult<BTreeSet<usize>>>()
            })
            .collect()
    }

    /// Order declarations so every dependency precedes its dependents
    ///
    /// # Errors
    /// - `UnknownDependency` when an edge points at an undeclared id
    /// - `DependencyCycle` naming the resources on one cycle
    pub fn order(self) -> SynthesisResult<OrderedDeclarationSet> {
        let deps = self.edges()?;

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        let mut pending: Vec<usize> = deps.iter().map(BTreeSet::len).collect();
        for (node, node_deps) in deps.iter().enumerate() {
            for &dep in node_deps {
                dependents[dep].push(node);
            }
        }

        let mut ready: BTreeSet<usize> = (0..self.nodes.len()).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(next) = ready.pop_first() {
            order.push(next);
            for &dependent in &dependents[next] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != self.nodes.len() {
            let cycle = find_cycle(&deps, &pending)
                .into_iter()
                .map(|i| self.nodes[i].id.to_string())
                .collect();
            return Err(SynthesisError::DependencyCycle(cycle));
        }

        let mut slots: Vec<Option<Declaration>> = self.nodes.into_iter().map(Some).collect();
        let declarations = order
            .into_iter()
            .filter_map(|i| slots[i].take())
            .collect();

        OrderedDeclarationSet::from_ordered(declarations)
    }
}

/// Walk unresolved dependencies until a node repeats
///
/// Every node left with `pending > 0` has at least one unresolved dependency,
/// so the walk never leaves the unresolved set and must revisit a node.
fn find_cycle(deps: &[BTreeSet<usize>], pending: &[usize]) -> Vec<usize> {
    let Some(start) = pending.iter().position(|&p| p > 0) else {
        return Vec::new();
    };

    let mut path = vec![start];
    let mut current = start;
    loop {
        let Some(&next) = deps[current].iter().find(|&&d| pending[d] > 0) else {
            return path;
        };
        if let Some(pos) = path.iter().position(|&n| n == next) {
            return path.split_off(pos);
        }
        path.push(next);
        current = next;
    }
}

/// Declarations in dependency order
///
/// # Invariants
/// - Ids are unique
/// - Every dependency of a declaration appears earlier in the sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedDeclarationSet {
    declarations: Vec<Declaration>,
}

impl OrderedDeclarationSet {
    /// Accept an already ordered sequence after checking the invariants
    pub fn from_ordered(declarations: Vec<Declaration>) -> SynthesisResult<Self> {
        let mut seen = BTreeSet::new();
        for declaration in &declarations {
            for dep in declaration.dependencies() {
                if !seen.contains(dep) {
                    return Err(SynthesisError::UnknownDependency {
                        from: declaration.id.to_string(),
                        to: dep.to_string(),
                    });
                }
            }
            if !seen.insert(&declaration.id) {
                return Err(SynthesisError::DuplicateResource(declaration.id.to_string()));
            }
        }
        Ok(Self { declarations })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.declarations.iter().map(|d| &d.id)
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Declaration> {
        self.declarations.iter().find(|d| &d.id == id)
    }

    /// Position of `id` in the emitted order
    pub fn position(&self, id: &ResourceId) -> Option<usize> {
        self.declarations.iter().position(|d| &d.id == id)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl Serialize for OrderedDeclarationSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.declarations.serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a OrderedDeclarationSet {
    type Item = &'a Declaration;
    type IntoIter = std::slice::Iter<'a, Declaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.declarations.iter()
    }
}
