//! # reg-census
//!
//! A regulatory corpus ingestion and per-agency metrics pipeline.
//!
//! reg-census syncs the eCFR title corpus to local storage, resolves each
//! agency's regulatory scope from the nested agency tree, counts words and
//! sections over every referenced subtree, and persists one metrics row per
//! agency for querying over a CLI and a JSON HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────┐
//! │ eCFR feeds  │──▶│   Pipeline    │──▶│  SQLite    │
//! │ titles/tree │   │ Locate+Count │   │ metrics    │
//! └─────────────┘   └──────────────┘   └────┬──────┘
//!                                           │
//!                       ┌───────────────────┤
//!                       ▼                   ▼
//!                  ┌──────────┐       ┌──────────┐
//!                  │   CLI    │       │   HTTP   │
//!                  │  (regc)  │       │  (JSON)  │
//!                  └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! regc init                     # create database
//! regc sync                     # download/refresh the title corpus
//! regc ingest                   # count and persist per-agency metrics
//! regc top --limit 10           # largest agencies by word count
//! regc serve                    # start the JSON API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`fetch`] | HTTP retrieval with retry + staleness-aware file cache |
//! | [`corpus`] | Title corpus synchronization |
//! | [`scope`] | Agency tree flattening |
//! | [`document`] | Structural XML tree parsing |
//! | [`navigate`] | Coarse-to-fine subtree location |
//! | [`count`] | Word and section counting |
//! | [`result_cache`] | (file, reference) → counts memo |
//! | [`ingest`] | End-to-end orchestration |
//! | [`store`] | Metrics row persistence and queries |
//! | [`server`] | JSON HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod corpus;
pub mod count;
pub mod db;
pub mod document;
pub mod fetch;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod navigate;
pub mod result_cache;
pub mod scope;
pub mod server;
pub mod store;
