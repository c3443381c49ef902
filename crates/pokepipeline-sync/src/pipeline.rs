//! Per-pokemon orchestration.
//!
//! For each id, in order:
//!
//! ```text
//! Pending ─► Fetched ─► Extracted ─► ChainResolved ─► Persisted ─► Done
//!    └─► Skipped (not found / fetch gave up)
//! ```
//!
//! All network work for an id happens before its transaction opens; the
//! transaction then writes evolution edges, the pokemon row, its types,
//! abilities and stats, and commits. An interrupted run leaves every earlier
//! pokemon committed and the current one absent.

use pokepipeline_ingest::{
    evolution_chain_url, extract_pokemon, flatten_chain_document, trailing_id, EvolutionEdge,
    ExtractError, ExtractedPokemon,
};
use pokepipeline_storage::{LinkAttrs, ReferenceKind, Store, StoreError};

use crate::fetch::{FetchOutcome, Fetcher};
use crate::observer::PipelineObserver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Pending,
    Fetched,
    Extracted,
    ChainResolved,
    Persisted,
    Done,
    Skipped,
}

/// Errors that abandon one id. The run itself carries on.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to extract pokemon {id}: {source}")]
    Extract {
        id: i64,
        #[source]
        source: ExtractError,
    },

    #[error("failed to persist pokemon {id}: {source}")]
    Store {
        id: i64,
        #[source]
        source: StoreError,
    },
}

/// What happened to one requested id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityReport {
    pub id: i64,
    pub state: EntityState,
    pub name: Option<String>,
    pub evolution_chain_id: Option<i64>,
    pub evolution_edges: usize,
}

impl EntityReport {
    fn skipped(id: i64) -> Self {
        Self {
            id,
            state: EntityState::Skipped,
            name: None,
            evolution_chain_id: None,
            evolution_edges: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<EntityReport>,
    /// Ids abandoned with a fatal error, with its message.
    pub failures: Vec<(i64, String)>,
}

impl RunSummary {
    pub fn stored(&self) -> usize {
        self.count(EntityState::Done)
    }

    pub fn skipped(&self) -> usize {
        self.count(EntityState::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    fn count(&self, state: EntityState) -> usize {
        self.reports.iter().filter(|r| r.state == state).count()
    }
}

struct ResolvedChain {
    chain_id: i64,
    edges: Vec<EvolutionEdge>,
}

pub struct Pipeline<'a> {
    fetcher: Fetcher,
    store: &'a mut Store,
    observer: &'a dyn PipelineObserver,
    base_url: String,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        fetcher: Fetcher,
        store: &'a mut Store,
        observer: &'a dyn PipelineObserver,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            fetcher,
            store,
            observer,
            base_url,
        }
    }

    /// Process every id in order. Per-id failures are recorded, never raised.
    pub fn run(&mut self, ids: &[i64]) -> RunSummary {
        let mut summary = RunSummary::default();
        for &id in ids {
            match self.process(id) {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    self.observer.on_failure(&e.to_string());
                    summary.failures.push((id, e.to_string()));
                }
            }
        }
        summary
    }

    /// Fetch, transform and persist a single pokemon.
    pub fn process(&mut self, id: i64) -> Result<EntityReport, PipelineError> {
        let mut state = EntityState::Pending;
        self.observer
            .on_progress(&format!("Fetching pokemon id={id} ..."));

        let url = format!("{}/pokemon/{id}", self.base_url);
        let doc = match self.fetcher.fetch(&url, self.observer) {
            FetchOutcome::Document(doc) => doc,
            FetchOutcome::NotFound | FetchOutcome::Failed { .. } => {
                self.observer
                    .on_progress(&format!("Skipping id {id} (no data)."));
                advance(id, &mut state, EntityState::Skipped);
                return Ok(EntityReport::skipped(id));
            }
        };
        advance(id, &mut state, EntityState::Fetched);

        let pokemon =
            extract_pokemon(&doc).map_err(|source| PipelineError::Extract { id, source })?;
        advance(id, &mut state, EntityState::Extracted);

        let chain = pokemon
            .basic
            .species_url
            .as_deref()
            .and_then(|species_url| self.resolve_chain(id, species_url));
        advance(id, &mut state, EntityState::ChainResolved);

        self.persist(&pokemon, chain.as_ref())
            .map_err(|source| PipelineError::Store { id, source })?;
        advance(id, &mut state, EntityState::Persisted);

        if let Some(chain) = &chain {
            if !chain.edges.is_empty() {
                self.observer.on_progress(&format!(
                    "Inserted {} evolution edges for chain {}",
                    chain.edges.len(),
                    chain.chain_id
                ));
            }
        }
        self.observer.on_progress(&format!(
            "Stored pokemon {} (id={})",
            pokemon.basic.name, pokemon.basic.id
        ));
        advance(id, &mut state, EntityState::Done);

        Ok(EntityReport {
            id,
            state,
            name: Some(pokemon.basic.name),
            evolution_chain_id: chain.as_ref().map(|c| c.chain_id),
            evolution_edges: chain.as_ref().map_or(0, |c| c.edges.len()),
        })
    }

    /// Species -> evolution chain -> edges. Any failure leaves the pokemon
    /// without chain linkage.
    fn resolve_chain(&self, id: i64, species_url: &str) -> Option<ResolvedChain> {
        let Some(species) = self.fetcher.fetch(species_url, self.observer).into_document() else {
            self.observer.on_warning(&format!(
                "No species data for pokemon id={id}; storing without evolution chain."
            ));
            return None;
        };

        let Some(chain_url) = evolution_chain_url(&species) else {
            tracing::debug!(id, "species has no evolution chain");
            return None;
        };
        let Some(chain_id) = trailing_id(chain_url) else {
            self.observer.on_warning(&format!(
                "Cannot derive evolution chain id from {chain_url}; storing pokemon id={id} without it."
            ));
            return None;
        };

        let Some(chain_doc) = self.fetcher.fetch(chain_url, self.observer).into_document() else {
            self.observer.on_warning(&format!(
                "No evolution chain data at {chain_url}; storing pokemon id={id} without it."
            ));
            return None;
        };

        match flatten_chain_document(&chain_doc) {
            Ok(edges) => Some(ResolvedChain { chain_id, edges }),
            Err(e) => {
                self.observer.on_warning(&format!(
                    "Ignoring evolution chain {chain_id} for pokemon id={id}: {e}"
                ));
                None
            }
        }
    }

    fn persist(
        &mut self,
        pokemon: &ExtractedPokemon,
        chain: Option<&ResolvedChain>,
    ) -> Result<(), StoreError> {
        let entity_id = pokemon.basic.id;
        let tx = self.store.begin()?;

        if let Some(chain) = chain {
            tx.upsert_evolution_edges(chain.chain_id, &chain.edges)?;
        }

        tx.upsert_entity(&pokemon.basic, chain.map(|c| c.chain_id))?;
        tx.clear_entity_links(entity_id)?;

        for t in &pokemon.types {
            let type_id = tx.upsert_reference_value(ReferenceKind::Type, t.type_id, &t.name)?;
            tx.link_entity_reference(entity_id, type_id, LinkAttrs::Type { slot: t.slot })?;
        }

        for a in &pokemon.abilities {
            let ability_id =
                tx.upsert_reference_value(ReferenceKind::Ability, a.ability_id, &a.name)?;
            tx.link_entity_reference(
                entity_id,
                ability_id,
                LinkAttrs::Ability {
                    slot: a.slot,
                    is_hidden: a.is_hidden,
                },
            )?;
        }

        for stat in &pokemon.stats {
            tx.upsert_stat(entity_id, stat)?;
        }

        tx.commit()?;
        tracing::debug!(entity_id, "committed");
        Ok(())
    }
}

fn advance(id: i64, state: &mut EntityState, next: EntityState) {
    tracing::debug!(id, from = ?*state, to = ?next, "state");
    *state = next;
}
