//! Relational schema.
//!
//! Evolution edges are keyed by `(chain_id, from_species, to_species)` and
//! carry no foreign key: chains name species that may never be fetched.

/// DDL applied on every open. Idempotent.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS pokemon (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    height INTEGER,
    weight INTEGER,
    base_experience INTEGER,
    species_url TEXT,
    evolution_chain_id INTEGER
);

CREATE TABLE IF NOT EXISTS types (
    id INTEGER PRIMARY KEY,
    name TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS abilities (
    id INTEGER PRIMARY KEY,
    name TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS pokemon_types (
    pokemon_id INTEGER NOT NULL,
    type_id INTEGER NOT NULL,
    slot INTEGER,
    PRIMARY KEY (pokemon_id, type_id),
    FOREIGN KEY (pokemon_id) REFERENCES pokemon(id) ON DELETE CASCADE,
    FOREIGN KEY (type_id) REFERENCES types(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS pokemon_abilities (
    pokemon_id INTEGER NOT NULL,
    ability_id INTEGER NOT NULL,
    slot INTEGER,
    is_hidden INTEGER,
    PRIMARY KEY (pokemon_id, ability_id),
    FOREIGN KEY (pokemon_id) REFERENCES pokemon(id) ON DELETE CASCADE,
    FOREIGN KEY (ability_id) REFERENCES abilities(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS stats (
    pokemon_id INTEGER NOT NULL,
    stat_name TEXT NOT NULL,
    base_stat INTEGER,
    effort INTEGER,
    PRIMARY KEY (pokemon_id, stat_name),
    FOREIGN KEY (pokemon_id) REFERENCES pokemon(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS evolutions (
    chain_id INTEGER NOT NULL,
    from_species TEXT NOT NULL,
    to_species TEXT NOT NULL,
    PRIMARY KEY (chain_id, from_species, to_species)
);
";

/// Every table with the ordering used when dumping it (its primary key).
pub const TABLES: &[(&str, &str)] = &[
    ("pokemon", "id"),
    ("types", "id"),
    ("abilities", "id"),
    ("pokemon_types", "pokemon_id, type_id"),
    ("pokemon_abilities", "pokemon_id, ability_id"),
    ("stats", "pokemon_id, stat_name"),
    ("evolutions", "chain_id, from_species, to_species"),
];
