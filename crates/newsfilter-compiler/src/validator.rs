//! Content filter validation
//!
//! Run on every create and update, against a graph holding the stored
//! filters and atoms the candidate can reach.

use crate::error::{CompileError, ReferenceKind, Result};
use crate::graph::FilterGraph;
use newsfilter_core::FilterExpression;
use std::collections::HashSet;

/// At least one group, and no empty group
pub fn validate_structure(candidate: &FilterExpression) -> Result<()> {
    if candidate.groups.is_empty() {
        return Err(CompileError::EmptyFilter {
            filter_id: candidate.id.clone(),
        });
    }
    for (index, group) in candidate.groups.iter().enumerate() {
        if group.is_empty() {
            return Err(CompileError::EmptyGroup {
                filter_id: candidate.id.clone(),
                index: index + 1,
            });
        }
    }
    Ok(())
}

/// Every atom and nested filter the candidate references must exist
pub fn validate_references_resolvable(graph: &FilterGraph, candidate: &FilterExpression) -> Result<()> {
    for atom_id in candidate.atom_ids() {
        if !graph.contains_atom(atom_id) {
            return Err(CompileError::DanglingReference {
                kind: ReferenceKind::Atom,
                id: atom_id.to_string(),
                referenced_from: candidate.id.clone(),
            });
        }
    }
    for filter_id in candidate.nested_filter_ids() {
        if filter_id != candidate.id && !graph.contains_filter(filter_id) {
            return Err(CompileError::DanglingReference {
                kind: ReferenceKind::Filter,
                id: filter_id.to_string(),
                referenced_from: candidate.id.clone(),
            });
        }
    }
    Ok(())
}

/// Fail if `self_id` appears anywhere in the transitive closure of the
/// candidate's nested references.
///
/// The candidate stands in for the stored version of `self_id`, so an update
/// is checked against its new references.
pub fn validate_acyclic(graph: &FilterGraph, candidate: &FilterExpression, self_id: &str) -> Result<()> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<(&str, Vec<String>)> = candidate
        .nested_filter_ids()
        .into_iter()
        .rev()
        .map(|id| (id, vec![self_id.to_string(), id.to_string()]))
        .collect();

    while let Some((id, path)) = stack.pop() {
        if id == self_id {
            return Err(CompileError::CircularReference {
                filter_id: self_id.to_string(),
                path,
            });
        }
        if !visited.insert(id) {
            continue;
        }
        let Some(filter) = graph.filter(id) else {
            continue;
        };
        for nested in filter.nested_filter_ids().into_iter().rev() {
            let mut next = path.clone();
            next.push(nested.to_string());
            stack.push((nested, next));
        }
    }

    Ok(())
}

/// Structure, references and acyclicity
pub fn validate_filter(graph: &FilterGraph, candidate: &FilterExpression) -> Result<()> {
    validate_structure(candidate)?;
    validate_references_resolvable(graph, candidate)?;
    validate_acyclic(graph, candidate, &candidate.id)
}
