//! Evolution chain flattening.
//!
//! `/evolution-chain/{id}` documents are trees:
//!
//! ```text
//! chain: { species: { name }, evolves_to: [ { species, evolves_to: [...] }, ... ] }
//! ```
//!
//! We flatten them into `(from_species, to_species)` edges. For each node all
//! of its direct-child edges are emitted first, then each child is walked in
//! document order, so the edge list is stable across runs.

use serde_json::Value;

use crate::{ExtractError, Result};

const CHAIN: &str = "evolution-chain";

/// Nesting bound for chain walks. Real chains are three or four levels deep.
///
/// Each level costs two levels of JSON nesting (the node object and its
/// `evolves_to` array), so this must stay well below serde_json's parse
/// recursion limit of 128 for a too-deep chain to reach the flattener at all.
pub const MAX_CHAIN_DEPTH: usize = 48;

/// One directed evolutionary step, by species name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EvolutionEdge {
    pub from_species: String,
    pub to_species: String,
}

impl EvolutionEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from_species: from.into(),
            to_species: to.into(),
        }
    }
}

/// Flatten the top-level `chain` node of an evolution-chain document.
///
/// A document without a `chain` node has no edges.
pub fn flatten_chain_document(doc: &Value) -> Result<Vec<EvolutionEdge>> {
    match doc.get("chain") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(node) => flatten_chain(node),
    }
}

/// Flatten one chain node (and everything below it) into edges.
pub fn flatten_chain(root: &Value) -> Result<Vec<EvolutionEdge>> {
    let mut edges = Vec::new();
    walk(root, 0, &mut edges)?;
    Ok(edges)
}

fn walk(node: &Value, depth: usize, edges: &mut Vec<EvolutionEdge>) -> Result<()> {
    if depth >= MAX_CHAIN_DEPTH {
        return Err(ExtractError::ChainTooDeep {
            limit: MAX_CHAIN_DEPTH,
        });
    }

    let from = species_name(node)?;
    let children = children(node)?;

    for child in children {
        edges.push(EvolutionEdge::new(from, species_name(child)?));
    }
    for child in children {
        walk(child, depth + 1, edges)?;
    }
    Ok(())
}

fn species_name(node: &Value) -> Result<&str> {
    node.get("species")
        .and_then(|s| s.get("name"))
        .and_then(Value::as_str)
        .ok_or(ExtractError::MissingField {
            kind: CHAIN,
            field: "species.name",
        })
}

fn children(node: &Value) -> Result<&[Value]> {
    match node.get("evolves_to") {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(ExtractError::InvalidField {
            kind: CHAIN,
            field: "evolves_to",
            expected: "an array",
        }),
    }
}
