//! Graph loading
//!
//! Resolves a content filter and everything it reaches into a
//! [`FilterGraph`] so compilation, matching and validation can run without
//! touching storage again. Missing references are left out of the graph;
//! the compiler and validator decide what a missing reference means.

use crate::error::{RepositoryError, RepositoryResult};
use crate::traits::{AtomRepository, FilterRepository};
use newsfilter_compiler::{CompileError, FilterGraph, ReferenceKind};
use newsfilter_core::FilterExpression;
use std::collections::HashSet;

/// Loads filter graphs from storage
pub struct GraphLoader<'a> {
    atoms: &'a dyn AtomRepository,
    filters: &'a dyn FilterRepository,
    max_depth: usize,
}

impl<'a> GraphLoader<'a> {
    pub fn new(atoms: &'a dyn AtomRepository, filters: &'a dyn FilterRepository, max_depth: usize) -> Self {
        Self {
            atoms,
            filters,
            max_depth,
        }
    }

    /// Load a stored filter and its graph
    pub async fn load(&self, filter_id: &str) -> RepositoryResult<(FilterExpression, FilterGraph)> {
        let filter = self
            .filters
            .get_filter(filter_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                kind: ReferenceKind::Filter,
                id: filter_id.to_string(),
            })?;
        let graph = self.load_for(&filter).await?;
        Ok((filter, graph))
    }

    /// Graph of everything `root` reaches, level by level.
    ///
    /// `root` need not be stored; when it is, the given version replaces the
    /// stored one in the graph.
    pub async fn load_for(&self, root: &FilterExpression) -> RepositoryResult<FilterGraph> {
        let mut graph = FilterGraph::new();
        let mut visited: HashSet<String> = HashSet::from([root.id.clone()]);
        let mut level: Vec<String> = root
            .nested_filter_ids()
            .into_iter()
            .filter(|id| visited.insert(id.to_string()))
            .map(str::to_string)
            .collect();
        let mut atom_ids: HashSet<String> = root.atom_ids().into_iter().map(str::to_string).collect();
        let mut depth = 1;

        while !level.is_empty() {
            if depth > self.max_depth {
                return Err(CompileError::DepthExceeded {
                    filter_id: root.id.clone(),
                    limit: self.max_depth,
                }
                .into());
            }

            let mut next = Vec::new();
            for id in level {
                let Some(filter) = self.filters.get_filter(&id).await? else {
                    tracing::debug!("Content filter '{}' referenced but not stored", id);
                    continue;
                };
                for nested in filter.nested_filter_ids() {
                    if visited.insert(nested.to_string()) {
                        next.push(nested.to_string());
                    }
                }
                atom_ids.extend(filter.atom_ids().into_iter().map(str::to_string));
                graph.insert_filter(filter);
            }
            level = next;
            depth += 1;
        }

        for atom_id in atom_ids {
            if let Some(atom) = self.atoms.get_atom(&atom_id).await? {
                graph.insert_atom(atom);
            }
        }

        graph.insert_filter(root.clone());
        Ok(graph)
    }

    /// Every stored filter and atom, for reverse traversals
    pub async fn load_all(&self) -> RepositoryResult<FilterGraph> {
        let mut graph = FilterGraph::new();
        for filter in self.filters.list_filters().await? {
            graph.insert_filter(filter);
        }
        for atom in self.atoms.list_atoms().await? {
            graph.insert_atom(atom);
        }
        Ok(graph)
    }
}
