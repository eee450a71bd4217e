//! Agency scope resolution.
//!
//! The agency feed is a nested tree: agencies may have sub-agencies, each
//! with their own reference lists. An agency's effective scope is its own
//! references followed by every descendant's, depth-first, children in
//! listed order. Agencies whose flattened scope is empty are omitted.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::models::CfrReference;

#[derive(Debug, Deserialize)]
pub struct AgencyFeed {
    pub agencies: Vec<AgencyNode>,
}

#[derive(Debug, Deserialize)]
pub struct AgencyNode {
    pub name: String,
    #[serde(default)]
    pub cfr_references: Vec<CfrReference>,
    #[serde(default)]
    pub children: Vec<AgencyNode>,
}

pub fn parse_agency_feed(bytes: &[u8]) -> Result<AgencyFeed> {
    serde_json::from_slice(bytes).with_context(|| "Failed to parse agency feed")
}

/// Flatten the tree into one scope per top-level agency, rebuilt wholesale
/// on every ingestion run.
pub fn resolve_agency_scopes(feed: &AgencyFeed) -> BTreeMap<String, Vec<CfrReference>> {
    let mut scopes = BTreeMap::new();
    for agency in &feed.agencies {
        let refs = collect_references(agency);
        if !refs.is_empty() {
            scopes.insert(agency.name.clone(), refs);
        }
    }
    scopes
}

// The upstream tree is acyclic by construction, so plain recursion over a
// finite tree terminates without a cycle guard.
fn collect_references(agency: &AgencyNode) -> Vec<CfrReference> {
    let mut refs = agency.cfr_references.clone();
    for child in &agency.children {
        refs.extend(collect_references(child));
    }
    refs
}
