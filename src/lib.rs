//! Casebook — a GraphQL API over a document store for surgical case
//! records, with JWT-backed sessions.
//!
//! Layers, bottom up: `db` (SQLite-backed document collections with a
//! JSON filter language), `models` (stored entities), `resolver`
//! (generic CRUD plus case referential integrity), `auth` (passwords,
//! tokens, session lifecycle), `api` (axum router, GraphQL schema,
//! bearer middleware).

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod models;
pub mod resolver;
