use std::sync::Arc;

use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use santa_core::{
    AccessGateway, Exchange, PersistentStore, Reveal, SantaError, StorageRecord, StoreError,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub mod admin;
pub mod backup;
pub mod config;
pub mod startup;

/// Shared handle to the running exchange. One lock guards every read and
/// write of the roster.
#[derive(Clone)]
pub struct AppState {
    exchange: Arc<Mutex<Exchange>>,
    store: Option<PersistentStore>,
    // Serializes writers so an older snapshot never lands after a newer one.
    write_lock: Arc<Mutex<()>>,
    internal: bool,
}

impl AppState {
    pub fn new(exchange: Exchange) -> Self {
        Self {
            exchange: Arc::new(Mutex::new(exchange)),
            store: None,
            write_lock: Arc::new(Mutex::new(())),
            internal: false,
        }
    }

    pub fn with_store(exchange: Exchange, store: PersistentStore) -> Self {
        Self {
            store: Some(store),
            ..Self::new(exchange)
        }
    }

    pub fn internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }

    pub async fn snapshot(&self) -> Exchange {
        self.exchange.lock().await.clone()
    }

    /// Saves after a participant request. The file is written off the
    /// roster lock.
    async fn persist(&self) -> Result<(), StoreError> {
        let Some(store) = self.store.clone() else {
            return Ok(());
        };
        let _writer = self.write_lock.lock().await;
        let record = self.exchange.lock().await.to_record();
        save_blocking(store, record)
            .await
            .inspect_err(|err| error!(%err, "persist error"))
    }

    /// Final save on shutdown. The roster lock stays held until the file is
    /// written, so no request slips in after the snapshot.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let Some(store) = self.store.clone() else {
            return Ok(());
        };
        let _writer = self.write_lock.lock().await;
        let exchange = self.exchange.lock().await;
        save_blocking(store, exchange.to_record()).await?;
        drop(exchange);
        info!("data saved");
        Ok(())
    }
}

async fn save_blocking(store: PersistentStore, record: StorageRecord) -> Result<(), StoreError> {
    tokio::task::spawn_blocking(move || store.save(&record))
        .await
        .map_err(|err| StoreError::Io(std::io::Error::other(err)))?
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/choose", get(choose))
        .route("/api/list", get(recipient_wishlist).post(update_wishlist))
        .route("/api/exchange", get(overview))
        .with_state(state)
}

pub enum ApiError {
    Rejected(SantaError),
    NotSaved(StoreError),
}

impl From<SantaError> for ApiError {
    fn from(err: SantaError) -> Self {
        Self::Rejected(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::NotSaved(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::Rejected(err) => err,
            ApiError::NotSaved(_) => {
                return (StatusCode::INTERNAL_SERVER_ERROR, "could not save").into_response();
            }
        };
        let status = match err {
            SantaError::NotFound | SantaError::InvalidToken | SantaError::AlreadyRevealed => {
                StatusCode::NOT_FOUND
            }
            SantaError::NotAssigned | SantaError::NameTaken => StatusCode::CONFLICT,
            SantaError::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, err.to_string()).into_response()
    }
}

fn rejected(name: &str, err: SantaError) -> ApiError {
    warn!(name, %err, "request rejected");
    ApiError::Rejected(err)
}

#[derive(Deserialize)]
struct Credentials {
    #[serde(default)]
    name: String,
    #[serde(default)]
    token: String,
}

#[derive(Deserialize)]
struct WishlistForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    token: String,
}

#[derive(Serialize)]
struct PersonView {
    name: String,
    has_picked: bool,
}

#[derive(Serialize)]
struct ExchangeView {
    shared_access_key: u64,
    internal: bool,
    people: Vec<PersonView>,
}

async fn choose(
    State(state): State<AppState>,
    Query(params): Query<Credentials>,
) -> Result<Json<Reveal>, ApiError> {
    let reveal = {
        let mut exchange = state.exchange.lock().await;
        AccessGateway::new(&mut exchange.directory)
            .verify(&params.name, &params.token)
            .and_then(|mut verified| verified.reveal())
            .map_err(|err| rejected(&params.name, err))?
    };
    if let Err(err) = state.persist().await {
        // Not on disk, so let the participant reveal again.
        let _ = state.exchange.lock().await.directory.unpick(&params.name);
        return Err(err.into());
    }
    Ok(Json(reveal))
}

async fn recipient_wishlist(
    State(state): State<AppState>,
    Query(params): Query<Credentials>,
) -> Result<String, ApiError> {
    let mut exchange = state.exchange.lock().await;
    let wishlist = AccessGateway::new(&mut exchange.directory)
        .verify(&params.name, &params.token)
        .and_then(|verified| verified.recipient_wishlist())
        .map_err(|err| rejected(&params.name, err))?;
    Ok(wishlist)
}

async fn update_wishlist(
    State(state): State<AppState>,
    Form(form): Form<WishlistForm>,
) -> Result<&'static str, ApiError> {
    info!(name = %form.name, "edit wishlist");
    {
        let mut exchange = state.exchange.lock().await;
        let mut verified = AccessGateway::new(&mut exchange.directory)
            .verify(&form.name, &form.token)
            .map_err(|err| rejected(&form.name, err))?;
        verified.update_own_wishlist(form.text);
    }
    state.persist().await?;
    Ok("ok")
}

async fn overview(State(state): State<AppState>) -> Json<ExchangeView> {
    let exchange = state.exchange.lock().await;
    Json(ExchangeView {
        shared_access_key: exchange.shared_access_key,
        internal: state.internal,
        people: exchange
            .directory
            .participants()
            .iter()
            .map(|p| PersonView {
                name: p.name.clone(),
                has_picked: p.has_picked,
            })
            .collect(),
    })
}
