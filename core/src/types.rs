//! Domain DTOs for the catalog API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently;
//! the integration tests catch any schema drift between the two crates.
//! Field names go over the wire in camelCase.

use serde::{Deserialize, Serialize};

/// A single title in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: u64,
    pub title: String,
    pub poster_url: String,
    pub description: String,
    pub release_year: u16,
    pub rating: f32,
    pub genre: String,
}

/// Request payload for creating or replacing a catalog item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewCatalogItem {
    pub title: String,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub description: String,
    pub release_year: u16,
    pub rating: f32,
    pub genre: String,
}

/// Request payload for a partial update. Only the fields present in the
/// JSON are applied; omitted fields remain unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}
