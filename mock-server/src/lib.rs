use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

/// Number of items `app()` starts with.
pub const SEED_SIZE: usize = 60;

const GENRES: [&str; 6] = ["Action", "Comedy", "Drama", "Thriller", "Documentary", "Sci-Fi"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
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

#[derive(Deserialize)]
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

#[derive(Deserialize)]
pub struct CatalogItemPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub rating: Option<f32>,
    pub genre: Option<String>,
}

#[derive(Debug, Default)]
pub struct Catalog {
    items: BTreeMap<u64, CatalogItem>,
    next_id: u64,
}

impl Catalog {
    pub fn with_items(items: Vec<CatalogItem>) -> Self {
        let next_id = items
            .iter()
            .map(|item| item.id)
            .max()
            .map_or(1, |max| max.saturating_add(1));
        Self {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
            next_id,
        }
    }

    fn insert(&mut self, input: NewCatalogItem) -> CatalogItem {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        let item = build_item(id, input);
        self.items.insert(id, item.clone());
        item
    }
}

pub type Db = Arc<RwLock<Catalog>>;

/// Deterministic catalog of `count` items, ids starting at 1.
pub fn seed_catalog(count: usize) -> Vec<CatalogItem> {
    (0..count)
        .map(|index| {
            let id = index as u64 + 1;
            CatalogItem {
                id,
                title: format!("Catalog Hit {id}"),
                poster_url: format!("/api/posters/{id}.jpg"),
                description: format!("A detailed summary for item number {id}."),
                release_year: 1995 + (index % 28) as u16,
                rating: 3.0 + (index % 21) as f32 / 10.0,
                genre: GENRES[index % GENRES.len()].to_string(),
            }
        })
        .collect()
}

pub fn app() -> Router {
    app_with(seed_catalog(SEED_SIZE))
}

/// Router serving `items` under `/api/v1`.
pub fn app_with(items: Vec<CatalogItem>) -> Router {
    let db: Db = Arc::new(RwLock::new(Catalog::with_items(items)));
    let api = Router::new()
        .route("/catalog", get(list_items).post(create_item))
        .route(
            "/catalog/{id}",
            get(get_item)
                .put(replace_item)
                .patch(patch_item)
                .delete(delete_item),
        )
        .route("/empty", get(empty_list))
        .route("/maintenance", get(maintenance))
        .route("/garbled", get(garbled))
        .route("/binary", get(binary))
        .with_state(db);
    Router::new().nest("/api/v1", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn build_item(id: u64, input: NewCatalogItem) -> CatalogItem {
    CatalogItem {
        id,
        title: input.title,
        poster_url: input.poster_url,
        description: input.description,
        release_year: input.release_year,
        rating: input.rating,
        genre: input.genre,
    }
}

/// 404 with a JSON reason body.
pub struct NotFound;

impl IntoResponse for NotFound {
    fn into_response(self) -> Response {
        (StatusCode::NOT_FOUND, Json(json!({ "reason": "not found" }))).into_response()
    }
}

async fn list_items(State(db): State<Db>) -> Json<Vec<CatalogItem>> {
    let catalog = db.read().await;
    Json(catalog.items.values().cloned().collect())
}

async fn create_item(
    State(db): State<Db>,
    Json(input): Json<NewCatalogItem>,
) -> (StatusCode, Json<CatalogItem>) {
    let item = db.write().await.insert(input);
    debug!(id = item.id, "created catalog item");
    (StatusCode::CREATED, Json(item))
}

async fn get_item(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<CatalogItem>, NotFound> {
    let catalog = db.read().await;
    catalog.items.get(&id).cloned().map(Json).ok_or(NotFound)
}

async fn replace_item(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<NewCatalogItem>,
) -> Result<Json<CatalogItem>, NotFound> {
    let mut catalog = db.write().await;
    let slot = catalog.items.get_mut(&id).ok_or(NotFound)?;
    *slot = build_item(id, input);
    Ok(Json(slot.clone()))
}

async fn patch_item(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<CatalogItemPatch>,
) -> Result<Json<CatalogItem>, NotFound> {
    let mut catalog = db.write().await;
    let item = catalog.items.get_mut(&id).ok_or(NotFound)?;
    if let Some(title) = input.title {
        item.title = title;
    }
    if let Some(description) = input.description {
        item.description = description;
    }
    if let Some(rating) = input.rating {
        item.rating = rating;
    }
    if let Some(genre) = input.genre {
        item.genre = genre;
    }
    Ok(Json(item.clone()))
}

async fn delete_item(State(db): State<Db>, Path(id): Path<u64>) -> Result<StatusCode, NotFound> {
    let mut catalog = db.write().await;
    catalog
        .items
        .remove(&id)
        .map(|_| {
            debug!(id, "deleted catalog item");
            StatusCode::NO_CONTENT
        })
        .ok_or(NotFound)
}

async fn empty_list() -> Json<Vec<CatalogItem>> {
    Json(Vec::new())
}

async fn maintenance() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance")
}

async fn garbled() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "<html>not json</html>")
}

async fn binary() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], vec![b'[', b'"', 0xff, 0xfe, b'"', b']'])
}
