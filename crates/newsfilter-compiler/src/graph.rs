//! Filter graph arena
//!
//! Holds filters and atoms by id. Every traversal keeps a visited set, so
//! malformed data (cycles, self references) cannot loop forever.

use newsfilter_core::{ConditionAtom, FilterExpression};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Arena of filters and condition atoms, keyed by id
#[derive(Debug, Clone, Default)]
pub struct FilterGraph {
    filters: BTreeMap<String, FilterExpression>,
    atoms: BTreeMap<String, ConditionAtom>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: FilterExpression) -> Self {
        self.insert_filter(filter);
        self
    }

    pub fn with_atom(mut self, atom: ConditionAtom) -> Self {
        self.insert_atom(atom);
        self
    }

    pub fn insert_filter(&mut self, filter: FilterExpression) {
        self.filters.insert(filter.id.clone(), filter);
    }

    pub fn insert_atom(&mut self, atom: ConditionAtom) {
        self.atoms.insert(atom.id.clone(), atom);
    }

    pub fn filter(&self, id: &str) -> Option<&FilterExpression> {
        self.filters.get(id)
    }

    pub fn atom(&self, id: &str) -> Option<&ConditionAtom> {
        self.atoms.get(id)
    }

    pub fn contains_filter(&self, id: &str) -> bool {
        self.filters.contains_key(id)
    }

    pub fn contains_atom(&self, id: &str) -> bool {
        self.atoms.contains_key(id)
    }

    pub fn filters(&self) -> impl Iterator<Item = &FilterExpression> {
        self.filters.values()
    }

    pub fn atoms(&self) -> impl Iterator<Item = &ConditionAtom> {
        self.atoms.values()
    }

    /// Every filter reachable from `id` through nested references, in
    /// breadth-first order, excluding `id` itself
    pub fn referenced_filters(&self, id: &str) -> Vec<String> {
        let mut visited = BTreeSet::from([id.to_string()]);
        let mut queue = VecDeque::from([id.to_string()]);
        let mut reached = Vec::new();

        while let Some(current) = queue.pop_front() {
            let Some(filter) = self.filters.get(&current) else {
                continue;
            };
            for nested in filter.nested_filter_ids() {
                if visited.insert(nested.to_string()) {
                    reached.push(nested.to_string());
                    queue.push_back(nested.to_string());
                }
            }
        }

        reached
    }

    /// Every filter that reaches `id` through nested references, excluding
    /// `id` itself
    pub fn referencing_filters(&self, id: &str) -> Vec<String> {
        let mut visited = BTreeSet::from([id.to_string()]);
        let mut queue = VecDeque::from([id.to_string()]);
        let mut reached = Vec::new();

        while let Some(current) = queue.pop_front() {
            for filter in self.filters.values() {
                if filter.references_filter(&current) && visited.insert(filter.id.clone()) {
                    reached.push(filter.id.clone());
                    queue.push_back(filter.id.clone());
                }
            }
        }

        reached
    }

    /// Every filter that depends on an atom, directly or through nesting
    pub fn filters_using_atom(&self, atom_id: &str) -> Vec<String> {
        let mut using: Vec<String> = self
            .filters
            .values()
            .filter(|f| f.references_atom(atom_id))
            .map(|f| f.id.clone())
            .collect();

        let mut seen: BTreeSet<String> = using.iter().cloned().collect();
        for direct in using.clone() {
            for id in self.referencing_filters(&direct) {
                if seen.insert(id.clone()) {
                    using.push(id);
                }
            }
        }

        using
    }
}
