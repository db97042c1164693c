use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, Method},
    routing::{get, post},
    Json, Router,
};
use murmur_shared::{Event, EventId, ProfileContent, Pubkey64};
use murmur_store::{Database, EventStore};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::NodeError;
use crate::publish::Publisher;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Database>,
    pub publisher: Arc<Publisher>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_check))
        .route("/postEvent", post(post_event))
        .route("/updateProfile", post(update_profile))
        .route("/events", get(list_events))
        .route("/event/:id_hex", get(get_event))
        .route("/profile/:pubkey64_hex", get(get_profile))
        .route("/followList/:pubkey64_hex", get(get_follow_list))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PostEventRequest {
    #[serde(rename = "Content", default)]
    content: String,
}

#[derive(Deserialize)]
struct UpdateProfileRequest {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "About", default)]
    about: String,
    #[serde(rename = "Picture", default)]
    picture: String,
}

#[derive(Serialize)]
struct GeneralResponse {
    #[serde(rename = "Status")]
    status: &'static str,
}

const SUCCESS: GeneralResponse = GeneralResponse { status: "SUCCESS" };

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    author: String,
    /// Name from the profile published during this run, if any.
    profile_name: Option<String>,
    events: u64,
}

#[derive(Deserialize)]
struct EventsQuery {
    since: Option<i64>,
    until: Option<i64>,
    /// Absent or `-1` means no count bound.
    limit: Option<i64>,
}

/// JSON rendering of an [`Event`] with hex-encoded binary fields.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct EventView {
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

impl From<Event> for EventView {
    fn from(event: Event) -> Self {
        Self {
            id: event.id.to_hex(),
            pubkey: event.pubkey.to_hex(),
            created_at: event.created_at,
            kind: event.kind,
            tags: event.tags,
            content: event.content,
            sig: hex::encode(event.sig),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Run a store-bound closure on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, NodeError>
where
    F: FnOnce() -> Result<T, NodeError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, NodeError> {
    let store = state.store.clone();
    let events = blocking(move || Ok(store.try_ledger_len()?)).await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        author: state.publisher.author_key().to_hex(),
        profile_name: state
            .publisher
            .own_profile()
            .and_then(|evt| ProfileContent::from_event(&evt))
            .map(|p| p.name),
        events,
    }))
}

async fn post_event(
    State(state): State<AppState>,
    Json(req): Json<PostEventRequest>,
) -> Result<Json<GeneralResponse>, NodeError> {
    let publisher = state.publisher.clone();
    blocking(move || publisher.post_note(&req.content)).await?;
    Ok(Json(SUCCESS))
}

async fn update_profile(
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<GeneralResponse>, NodeError> {
    let profile = ProfileContent {
        name: req.name,
        about: req.about,
        picture: req.picture,
    };

    let publisher = state.publisher.clone();
    blocking(move || publisher.update_profile(&profile)).await?;
    Ok(Json(SUCCESS))
}

async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<EventView>>, NodeError> {
    let limit = match query.limit {
        None | Some(-1) => None,
        Some(n) if n >= 0 => Some(n as u64),
        Some(n) => return Err(NodeError::BadRequest(format!("invalid limit {n}"))),
    };
    let since = query.since.unwrap_or(i64::MIN);
    let until = query.until.unwrap_or(i64::MAX);

    let store = state.store.clone();
    let events = blocking(move || Ok(store.get_latest_events(since, until, limit))).await?;
    Ok(Json(events.into_iter().map(EventView::from).collect()))
}

async fn get_event(
    State(state): State<AppState>,
    Path(id_hex): Path<String>,
) -> Result<Json<EventView>, NodeError> {
    let id = EventId::from_hex(&id_hex)
        .map_err(|e| NodeError::BadRequest(format!("event id: {e}")))?;

    let store = state.store.clone();
    blocking(move || {
        store
            .get_event_by_id(&id)
            .ok_or_else(|| NodeError::NotFound(format!("event {id}")))
    })
    .await
    .map(|event| Json(EventView::from(event)))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(author_hex): Path<String>,
) -> Result<Json<EventView>, NodeError> {
    let author = parse_author(&author_hex)?;

    let store = state.store.clone();
    blocking(move || {
        store
            .get_profile_local(author)
            .ok_or_else(|| NodeError::NotFound(format!("profile of {author}")))
    })
    .await
    .map(|event| Json(EventView::from(event)))
}

async fn get_follow_list(
    State(state): State<AppState>,
    Path(author_hex): Path<String>,
) -> Result<Json<EventView>, NodeError> {
    let author = parse_author(&author_hex)?;

    let store = state.store.clone();
    blocking(move || {
        store
            .get_follow_list_local(author)
            .ok_or_else(|| NodeError::NotFound(format!("follow list of {author}")))
    })
    .await
    .map(|event| Json(EventView::from(event)))
}

fn parse_author(hex_key: &str) -> Result<Pubkey64, NodeError> {
    Pubkey64::from_hex(hex_key).map_err(|e| NodeError::BadRequest(format!("author key: {e}")))
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use murmur_shared::constants::KIND_FOLLOW_LIST;
    use murmur_shared::identity::Identity;
    use murmur_shared::Pubkey;
    use tower::ServiceExt;

    use super::*;
    use crate::broadcast::Standalone;

    fn app() -> (Router, AppState) {
        let store = Arc::new(Database::open_in_memory().unwrap());
        let publisher = Arc::new(Publisher::new(
            Identity::generate(),
            store.clone(),
            Arc::new(Standalone),
        ));
        let state = AppState { store, publisher };
        (build_router(state.clone()), state)
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body<T: serde::de::DeserializeOwned>(resp: Response) -> T {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let resp = send(&app, get_req("/health")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = json_body(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["events"], 0);
    }

    #[tokio::test]
    async fn test_post_event_then_list() {
        let (app, state) = app();
        let resp = send(&app, post_json("/postEvent", serde_json::json!({"Content": "hi"}))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = json_body(resp).await;
        assert_eq!(body, serde_json::json!({"Status": "SUCCESS"}));

        let resp = send(&app, get_req("/events?limit=10")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let events: Vec<EventView> = json_body(resp).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].content, "hi");
        let author = Pubkey::from_hex(&events[0].pubkey).unwrap();
        assert_eq!(author.pubkey64(), state.publisher.author_key());
    }

    #[tokio::test]
    async fn test_post_event_requires_content() {
        let (app, state) = app();
        let resp = send(&app, post_json("/postEvent", serde_json::json!({"Content": ""}))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.store.try_ledger_len().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_profile_round_trip() {
        let (app, state) = app();
        let resp = send(
            &app,
            post_json(
                "/updateProfile",
                serde_json::json!({"Name": "alice", "About": "hello", "Picture": ""}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(state.publisher.own_profile().is_some());

        let health: serde_json::Value = json_body(send(&app, get_req("/health")).await).await;
        assert_eq!(health["profile_name"], "alice");
        assert_eq!(health["events"], 1);

        let author = state.publisher.author_key().to_hex();
        let resp = send(&app, get_req(&format!("/profile/{author}"))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let view: EventView = json_body(resp).await;
        let content: ProfileContent = serde_json::from_str(&view.content).unwrap();
        assert_eq!(content.name, "alice");
    }

    #[tokio::test]
    async fn test_update_profile_requires_name() {
        let (app, _) = app();
        let resp = send(&app, post_json("/updateProfile", serde_json::json!({"About": "x"}))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_event_by_id() {
        let (app, state) = app();
        let event = state.publisher.post_note("find me").unwrap();

        let resp = send(&app, get_req(&format!("/event/{}", event.id.to_hex()))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let view: EventView = json_body(resp).await;
        assert_eq!(view, EventView::from(event));

        let missing = "00".repeat(32);
        let resp = send(&app, get_req(&format!("/event/{missing}"))).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(&app, get_req("/event/zz")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_follow_list_lookup() {
        let (app, state) = app();
        let author = Identity::generate();
        let list = author
            .sign_event(KIND_FOLLOW_LIST, vec![vec!["p".into(), "00".into()]], String::new(), 7)
            .unwrap();
        state.store.try_ingest(&list).unwrap();

        let uri = format!("/followList/{}", author.pubkey64().to_hex());
        let resp = send(&app, get_req(&uri)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let view: EventView = json_body(resp).await;
        assert_eq!(view.id, list.id.to_hex());

        let resp = send(&app, get_req("/followList/0000000000000001")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_events_window_and_limit_validation() {
        let (app, state) = app();
        let author = Identity::generate();
        for ts in [10, 20, 30, 40] {
            let evt = author.sign_event(1, Vec::new(), format!("n{ts}"), ts).unwrap();
            state.store.try_ingest(&evt).unwrap();
        }

        let resp = send(&app, get_req("/events?since=15&until=35")).await;
        let events: Vec<EventView> = json_body(resp).await;
        let stamps: Vec<i64> = events.iter().map(|e| e.created_at).collect();
        assert_eq!(stamps, vec![20, 30]);

        let resp = send(&app, get_req("/events?since=15&until=35&limit=-1")).await;
        let events: Vec<EventView> = json_body(resp).await;
        assert_eq!(events.len(), 2);

        let resp = send(&app, get_req("/events?limit=-5")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_events_default_window_includes_negative_timestamps() {
        let (app, state) = app();
        let author = Identity::generate();
        for ts in [-50, 0, 50] {
            let evt = author.sign_event(1, Vec::new(), format!("t{ts}"), ts).unwrap();
            state.store.try_ingest(&evt).unwrap();
        }

        let resp = send(&app, get_req("/events")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let events: Vec<EventView> = json_body(resp).await;
        let stamps: Vec<i64> = events.iter().map(|e| e.created_at).collect();
        assert_eq!(stamps, vec![-50, 0, 50]);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let (app, _) = app();
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/postEvent")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();

        let resp = send(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }
}
