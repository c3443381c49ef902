//! Projection of `/pokemon/{id}` documents into flat records.
//!
//! Optional attributes stay optional (`None`, not zero). The only numeric
//! defaults are the ones upstream consumers have always relied on: `slot`,
//! `base_stat` and `effort` fall back to 0 when absent.

use serde::Deserialize;
use serde_json::Value;

use crate::{ExtractError, Result};

const POKEMON: &str = "pokemon";

// ============================================================================
// Output records
// ============================================================================

/// Scalar attributes of one pokemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicInfo {
    pub id: i64,
    pub name: String,
    pub height: Option<i64>,
    pub weight: Option<i64>,
    pub base_experience: Option<i64>,
    pub species_url: Option<String>,
}

/// A pokemon -> type association.
///
/// `type_id` is `None` when the upstream URL carries no trailing integer; the
/// id must then be resolved by name when persisting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeLink {
    pub type_id: Option<i64>,
    pub name: String,
    pub slot: i64,
}

/// A pokemon -> ability association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityLink {
    pub ability_id: Option<i64>,
    pub name: String,
    pub slot: i64,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRow {
    pub name: String,
    pub base_stat: i64,
    pub effort: i64,
}

/// Everything the pipeline persists for one pokemon document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPokemon {
    pub basic: BasicInfo,
    pub types: Vec<TypeLink>,
    pub abilities: Vec<AbilityLink>,
    pub stats: Vec<StatRow>,
}

// ============================================================================
// Raw document views
// ============================================================================

#[derive(Deserialize)]
struct RawBasic {
    id: i64,
    name: String,
    height: Option<i64>,
    weight: Option<i64>,
    base_experience: Option<i64>,
    species: Option<RawResource>,
}

/// The `species` link; its `name` is not needed here.
#[derive(Deserialize)]
struct RawResource {
    url: Option<String>,
}

/// `{ "name": ..., "url": ... }` as PokeAPI uses it for types and abilities.
#[derive(Deserialize)]
struct RawNamedLink {
    name: String,
    url: String,
}

#[derive(Deserialize)]
struct RawTypes {
    types: Option<Vec<RawTypeSlot>>,
}

#[derive(Deserialize)]
struct RawTypeSlot {
    #[serde(rename = "type")]
    kind: RawNamedLink,
    slot: Option<i64>,
}

#[derive(Deserialize)]
struct RawAbilities {
    abilities: Option<Vec<RawAbilitySlot>>,
}

#[derive(Deserialize)]
struct RawAbilitySlot {
    ability: RawNamedLink,
    slot: Option<i64>,
    is_hidden: Option<bool>,
}

#[derive(Deserialize)]
struct RawStats {
    stats: Option<Vec<RawStatEntry>>,
}

#[derive(Deserialize)]
struct RawStatEntry {
    stat: RawStatName,
    base_stat: Option<i64>,
    effort: Option<i64>,
}

#[derive(Deserialize)]
struct RawStatName {
    name: String,
}

fn view<'a, T: Deserialize<'a>>(doc: &'a Value) -> Result<T> {
    T::deserialize(doc).map_err(|source| ExtractError::Malformed {
        kind: POKEMON,
        source,
    })
}

// ============================================================================
// Extraction
// ============================================================================

/// Parse the integer id at the end of a PokeAPI resource URL.
///
/// `https://pokeapi.co/api/v2/type/3/` -> `Some(3)`. Anything whose last path
/// segment is not an integer yields `None`.
pub fn trailing_id(url: &str) -> Option<i64> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.trim().parse::<i64>().ok())
}

/// Project the scalar attributes of a pokemon document.
///
/// `id`, `name` and the `species` key are required. A `null` species (or one
/// without a `url`) just means there is no species document to follow.
pub fn extract_basic(doc: &Value) -> Result<BasicInfo> {
    if doc.get("species").is_none() {
        return Err(ExtractError::MissingField {
            kind: POKEMON,
            field: "species",
        });
    }
    let raw: RawBasic = view(doc)?;

    Ok(BasicInfo {
        id: raw.id,
        name: raw.name,
        height: raw.height,
        weight: raw.weight,
        base_experience: raw.base_experience,
        species_url: raw.species.and_then(|s| s.url).filter(|u| !u.is_empty()),
    })
}

pub fn extract_types(doc: &Value) -> Result<Vec<TypeLink>> {
    let raw: RawTypes = view(doc)?;
    Ok(raw
        .types
        .unwrap_or_default()
        .into_iter()
        .map(|t| TypeLink {
            type_id: trailing_id(&t.kind.url),
            name: t.kind.name,
            slot: t.slot.unwrap_or(0),
        })
        .collect())
}

pub fn extract_abilities(doc: &Value) -> Result<Vec<AbilityLink>> {
    let raw: RawAbilities = view(doc)?;
    Ok(raw
        .abilities
        .unwrap_or_default()
        .into_iter()
        .map(|a| AbilityLink {
            ability_id: trailing_id(&a.ability.url),
            name: a.ability.name,
            slot: a.slot.unwrap_or(0),
            is_hidden: a.is_hidden.unwrap_or(false),
        })
        .collect())
}

pub fn extract_stats(doc: &Value) -> Result<Vec<StatRow>> {
    let raw: RawStats = view(doc)?;
    Ok(raw
        .stats
        .unwrap_or_default()
        .into_iter()
        .map(|s| StatRow {
            name: s.stat.name,
            base_stat: s.base_stat.unwrap_or(0),
            effort: s.effort.unwrap_or(0),
        })
        .collect())
}

/// Run all four projections over one document.
pub fn extract_pokemon(doc: &Value) -> Result<ExtractedPokemon> {
    Ok(ExtractedPokemon {
        basic: extract_basic(doc)?,
        types: extract_types(doc)?,
        abilities: extract_abilities(doc)?,
        stats: extract_stats(doc)?,
    })
}

/// The `evolution_chain.url` of a `/pokemon-species/{id}` document, if any.
pub fn evolution_chain_url(species: &Value) -> Option<&str> {
    species
        .get("evolution_chain")?
        .get("url")?
        .as_str()
        .filter(|u| !u.is_empty())
}
