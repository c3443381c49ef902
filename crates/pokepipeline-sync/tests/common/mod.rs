//! Shared test doubles: a scripted in-process API, a sleep recorder and an
//! event recorder.

#![allow(dead_code)]

use pokepipeline_sync::{HttpResponse, PipelineObserver, Sleeper, Transport, TransportError};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

pub const BASE: &str = "http://pokeapi.test/api/v2";

#[derive(Clone)]
pub enum Reply {
    Status(u16, String),
    Error(String),
}

impl Reply {
    pub fn json(doc: &Value) -> Self {
        Reply::Status(200, doc.to_string())
    }
}

#[derive(Default)]
struct Script {
    /// Replies consumed in order; the last one repeats.
    routes: HashMap<String, VecDeque<Reply>>,
    calls: Vec<String>,
}

/// Unrouted URLs answer 404.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Rc<RefCell<Script>>,
}

impl ScriptedTransport {
    pub fn route(&self, url: impl Into<String>, reply: Reply) -> &Self {
        self.route_sequence(url, vec![reply])
    }

    pub fn route_sequence(&self, url: impl Into<String>, replies: Vec<Reply>) -> &Self {
        self.inner
            .borrow_mut()
            .routes
            .insert(url.into(), replies.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.borrow().calls.clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter(|c| c.as_str() == url)
            .count()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let mut script = self.inner.borrow_mut();
        script.calls.push(url.to_string());
        let reply = match script.routes.get_mut(url) {
            None => return Ok(HttpResponse::new(404, "Not Found")),
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
        };
        match reply {
            Some(Reply::Status(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Reply::Error(message)) => Err(TransportError {
                url: url.to_string(),
                message,
            }),
            None => Ok(HttpResponse::new(404, "Not Found")),
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingSleeper {
    naps: Rc<RefCell<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn naps(&self) -> Vec<Duration> {
        self.naps.borrow().clone()
    }

    pub fn total(&self) -> Duration {
        self.naps.borrow().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.naps.borrow_mut().push(duration);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Progress(String),
    Warning(String),
    Failure(String),
}

#[derive(Default)]
pub struct RecordingObserver {
    events: RefCell<Vec<Event>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn warnings(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::Warning(_)))
            .count()
    }

    pub fn failures(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Failure(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn saw_progress(&self, needle: &str) -> bool {
        self.events
            .borrow()
            .iter()
            .any(|e| matches!(e, Event::Progress(m) if m.contains(needle)))
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_progress(&self, message: &str) {
        self.events
            .borrow_mut()
            .push(Event::Progress(message.to_string()));
    }

    fn on_warning(&self, message: &str) {
        self.events
            .borrow_mut()
            .push(Event::Warning(message.to_string()));
    }

    fn on_failure(&self, message: &str) {
        self.events
            .borrow_mut()
            .push(Event::Failure(message.to_string()));
    }
}

// ============================================================================
// Upstream fixtures
// ============================================================================

pub fn pokemon_url(id: i64) -> String {
    format!("{BASE}/pokemon/{id}")
}

pub fn species_url(id: i64) -> String {
    format!("{BASE}/pokemon-species/{id}/")
}

pub fn chain_url(id: i64) -> String {
    format!("{BASE}/evolution-chain/{id}/")
}

pub fn pokemon_doc(id: i64, name: &str, types: &[(i64, &str)], abilities: &[(i64, &str, bool)]) -> Value {
    let types: Vec<Value> = types
        .iter()
        .enumerate()
        .map(|(i, (tid, tname))| {
            json!({ "slot": i + 1, "type": { "name": tname, "url": format!("{BASE}/type/{tid}/") } })
        })
        .collect();
    let abilities: Vec<Value> = abilities
        .iter()
        .enumerate()
        .map(|(i, (aid, aname, hidden))| {
            json!({
                "slot": i + 1,
                "is_hidden": hidden,
                "ability": { "name": aname, "url": format!("{BASE}/ability/{aid}/") }
            })
        })
        .collect();
    json!({
        "id": id,
        "name": name,
        "height": 7,
        "weight": 69,
        "base_experience": 64,
        "species": { "name": name, "url": species_url(id) },
        "types": types,
        "abilities": abilities,
        "stats": [
            { "base_stat": 45, "effort": 0, "stat": { "name": "hp" } },
            { "base_stat": 49, "effort": 1, "stat": { "name": "attack" } }
        ]
    })
}

pub fn species_doc(chain_id: i64) -> Value {
    json!({ "evolution_chain": { "url": chain_url(chain_id) } })
}

pub fn chain_doc(chain_id: i64, root: Value) -> Value {
    json!({ "id": chain_id, "chain": root })
}

pub fn chain_node(name: &str, children: Vec<Value>) -> Value {
    json!({ "species": { "name": name }, "evolves_to": children })
}

/// Bulbasaur line, fully routed: pokemon 1, species 1, chain 1.
pub fn route_bulbasaur(api: &ScriptedTransport) {
    api.route(
        pokemon_url(1),
        Reply::json(&pokemon_doc(
            1,
            "bulbasaur",
            &[(12, "grass"), (4, "poison")],
            &[(65, "overgrow", false), (34, "chlorophyll", true)],
        )),
    );
    api.route(species_url(1), Reply::json(&species_doc(1)));
    api.route(
        chain_url(1),
        Reply::json(&chain_doc(
            1,
            chain_node(
                "bulbasaur",
                vec![chain_node("ivysaur", vec![chain_node("venusaur", vec![])])],
            ),
        )),
    );
}
