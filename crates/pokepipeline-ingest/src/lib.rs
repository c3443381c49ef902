//! Pokemon document ingestion for PokePipeline
//!
//! Turns raw PokeAPI documents into flat, relational-ready records:
//! - `/pokemon/{id}` -> basic info, type links, ability links, stat rows
//! - `/pokemon-species/{id}` -> evolution-chain reference
//! - `/evolution-chain/{id}` -> directed species edges
//!
//! Everything here is pure: no I/O, no clocks, no database.

pub mod chain;
pub mod document;

pub use chain::{flatten_chain, flatten_chain_document, EvolutionEdge, MAX_CHAIN_DEPTH};
pub use document::{
    evolution_chain_url, extract_abilities, extract_basic, extract_pokemon, extract_stats,
    extract_types, trailing_id, AbilityLink, BasicInfo, ExtractedPokemon, StatRow, TypeLink,
};

/// Errors raised while projecting upstream documents.
///
/// Any of these is fatal for the document being processed; callers decide
/// whether that aborts a single identifier or more.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("malformed {kind} document: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed {kind} document: missing `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("malformed {kind} document: `{field}` is not {expected}")]
    InvalidField {
        kind: &'static str,
        field: &'static str,
        expected: &'static str,
    },

    #[error("evolution chain nests deeper than {limit} levels")]
    ChainTooDeep { limit: usize },
}

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;
