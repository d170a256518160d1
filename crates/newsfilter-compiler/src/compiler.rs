//! Content filter compiler
//!
//! Compilation and direct matching are pure functions of the graph, the field
//! catalog and the clock. Nested filters are expanded recursively; the walk
//! keeps the current reference path to reject cycles and is bounded by
//! [`CompilerOptions::max_depth`].

use crate::error::{CompileError, ReferenceKind, Result};
use crate::graph::FilterGraph;
use chrono::{DateTime, Utc};
use newsfilter_core::{document_id, Condition, FieldCatalog, FilterExpression, FilterGroup};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use std::collections::HashMap;

/// Workflow state excluded from every search-backend group
pub const SPIKED_STATE: &str = "spiked";

/// Default bound on nested filter expansion
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Compiler options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Maximum levels of nested filters below the root filter
    pub max_depth: usize,
    /// Reject unrecognised operator tokens instead of degrading them to `like`
    pub strict_operators: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict_operators: false,
        }
    }
}

/// Top-level combination of groups in a search-backend query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Items matching any group (`should`)
    #[default]
    Matching,
    /// Items matching no group (`must_not`)
    NotMatching,
}

impl MatchMode {
    fn clause(self) -> &'static str {
        match self {
            MatchMode::Matching => "should",
            MatchMode::NotMatching => "must_not",
        }
    }
}

/// Per-call memo of verdicts for one document
#[derive(Default)]
struct MatchState {
    atoms: HashMap<String, bool>,
    filters: HashMap<String, bool>,
}

/// Compiles and evaluates content filters over a [`FilterGraph`]
pub struct FilterCompiler<'a> {
    graph: &'a FilterGraph,
    catalog: &'a FieldCatalog,
    options: CompilerOptions,
    now: DateTime<Utc>,
}

impl<'a> FilterCompiler<'a> {
    pub fn new(graph: &'a FilterGraph, catalog: &'a FieldCatalog) -> Self {
        Self {
            graph,
            catalog,
            options: CompilerOptions::default(),
            now: Utc::now(),
        }
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    /// Fix the instant computed fields (embargo) are evaluated against
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Document-store query: `$or` of `$and` groups, single-element lists
    /// flattened
    pub fn to_store_query(&self, filter: &FilterExpression) -> Result<Json> {
        tracing::debug!("Compiling store query for content filter '{}'", filter.id);
        self.store_query(filter, &mut Vec::new())
    }

    /// Search-backend query
    pub fn to_search_query(&self, filter: &FilterExpression, mode: MatchMode) -> Result<Json> {
        tracing::debug!(
            "Compiling search query for content filter '{}' ({:?})",
            filter.id,
            mode
        );
        self.search_query(filter, mode, &mut Vec::new())
    }

    /// Direct match of one document.
    ///
    /// An absent filter matches everything.
    pub fn does_match(&self, filter: Option<&FilterExpression>, doc: &Json) -> Result<bool> {
        let Some(filter) = filter else {
            return Ok(true);
        };
        let doc_id = document_id(doc);
        let mut state = MatchState::default();
        self.match_filter(filter, doc, &doc_id, &mut state, &mut Vec::new())
    }

    fn store_query(&self, filter: &FilterExpression, path: &mut Vec<String>) -> Result<Json> {
        self.enter(filter, path)?;
        if filter.groups.is_empty() {
            return Err(CompileError::EmptyFilter {
                filter_id: filter.id.clone(),
            });
        }

        let mut groups = Vec::with_capacity(filter.groups.len());
        for (index, group) in filter.groups.iter().enumerate() {
            check_group(filter, index, group)?;
            let mut clauses = Vec::new();
            for atom_id in &group.expression.atoms {
                clauses.push(self.condition(atom_id, filter)?.to_store_query(self.now));
            }
            for nested_id in &group.expression.filters {
                let nested = self.nested(nested_id, filter)?;
                clauses.push(self.store_query(nested, path)?);
            }
            groups.push(flatten("$and", clauses));
        }

        path.pop();
        Ok(flatten("$or", groups))
    }

    fn search_query(
        &self,
        filter: &FilterExpression,
        mode: MatchMode,
        path: &mut Vec<String>,
    ) -> Result<Json> {
        self.enter(filter, path)?;
        if filter.groups.is_empty() {
            return Err(CompileError::EmptyFilter {
                filter_id: filter.id.clone(),
            });
        }

        let mut groups = Vec::with_capacity(filter.groups.len());
        for (index, group) in filter.groups.iter().enumerate() {
            check_group(filter, index, group)?;
            let mut must = Vec::new();
            let mut must_not = vec![json!({ "term": { "state": SPIKED_STATE } })];
            for atom_id in &group.expression.atoms {
                let condition = self.condition(atom_id, filter)?;
                if condition.contains_negation() {
                    must_not.push(condition.to_search_query());
                } else {
                    must.push(condition.to_search_query());
                }
            }
            for nested_id in &group.expression.filters {
                let nested = self.nested(nested_id, filter)?;
                must.push(self.search_query(nested, MatchMode::Matching, path)?);
            }
            groups.push(json!({ "bool": { "must": must, "must_not": must_not } }));
        }

        path.pop();
        Ok(json!({ "bool": { mode.clause(): groups } }))
    }

    fn match_filter(
        &self,
        filter: &FilterExpression,
        doc: &Json,
        doc_id: &str,
        state: &mut MatchState,
        path: &mut Vec<String>,
    ) -> Result<bool> {
        if let Some(verdict) = state.filters.get(&filter.id) {
            return Ok(*verdict);
        }
        self.enter(filter, path)?;

        let mut verdict = false;
        for (index, group) in filter.groups.iter().enumerate() {
            check_group(filter, index, group)?;
            if self.match_group(filter, group, doc, doc_id, state, path)? {
                verdict = true;
                break;
            }
        }

        path.pop();
        if !filter.id.is_empty() {
            state.filters.insert(filter.id.clone(), verdict);
        }
        Ok(verdict)
    }

    fn match_group(
        &self,
        filter: &FilterExpression,
        group: &FilterGroup,
        doc: &Json,
        doc_id: &str,
        state: &mut MatchState,
        path: &mut Vec<String>,
    ) -> Result<bool> {
        for atom_id in &group.expression.atoms {
            let verdict = match state.atoms.get(atom_id) {
                Some(verdict) => *verdict,
                None => {
                    let Some(atom) = self.graph.atom(atom_id) else {
                        tracing::error!(
                            "Missing filter condition {} in content filter {}",
                            atom_id,
                            filter.name
                        );
                        return Ok(false);
                    };
                    let condition = atom
                        .compile(self.catalog, self.options.strict_operators)
                        .map_err(|source| CompileError::Evaluation {
                            filter_id: filter.id.clone(),
                            document_id: doc_id.to_string(),
                            source,
                        })?;
                    let verdict = condition.does_match(doc, self.now);
                    state.atoms.insert(atom_id.clone(), verdict);
                    verdict
                }
            };
            if !verdict {
                return Ok(false);
            }
        }

        for nested_id in &group.expression.filters {
            let verdict = match self.graph.filter(nested_id) {
                Some(nested) => self.match_filter(nested, doc, doc_id, state, path)?,
                None => {
                    tracing::warn!(
                        "Missing content filter {} referenced from {}, treating as match",
                        nested_id,
                        filter.name
                    );
                    true
                }
            };
            if !verdict {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Push `filter` on the reference path, rejecting cycles and excess depth
    fn enter(&self, filter: &FilterExpression, path: &mut Vec<String>) -> Result<()> {
        if path.iter().any(|id| *id == filter.id) {
            let mut cycle = path.clone();
            cycle.push(filter.id.clone());
            return Err(CompileError::CircularReference {
                filter_id: filter.id.clone(),
                path: cycle,
            });
        }
        if path.len() > self.options.max_depth {
            return Err(CompileError::DepthExceeded {
                filter_id: path.first().cloned().unwrap_or_else(|| filter.id.clone()),
                limit: self.options.max_depth,
            });
        }
        path.push(filter.id.clone());
        Ok(())
    }

    fn condition(&self, atom_id: &str, from: &FilterExpression) -> Result<Condition> {
        let atom = self
            .graph
            .atom(atom_id)
            .ok_or_else(|| CompileError::DanglingReference {
                kind: ReferenceKind::Atom,
                id: atom_id.to_string(),
                referenced_from: from.id.clone(),
            })?;
        Ok(atom.compile(self.catalog, self.options.strict_operators)?)
    }

    fn nested(&self, filter_id: &str, from: &FilterExpression) -> Result<&'a FilterExpression> {
        self.graph
            .filter(filter_id)
            .ok_or_else(|| CompileError::DanglingReference {
                kind: ReferenceKind::Filter,
                id: filter_id.to_string(),
                referenced_from: from.id.clone(),
            })
    }
}

fn check_group(filter: &FilterExpression, index: usize, group: &FilterGroup) -> Result<()> {
    if group.is_empty() {
        return Err(CompileError::EmptyGroup {
            filter_id: filter.id.clone(),
            index: index + 1,
        });
    }
    Ok(())
}

/// Wrap clauses in `op` unless there is exactly one
fn flatten(op: &str, mut clauses: Vec<Json>) -> Json {
    if clauses.len() == 1 {
        if let Some(only) = clauses.pop() {
            return only;
        }
    }
    json!({ op: clauses })
}
