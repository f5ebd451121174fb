use axum::{
    Extension, Json, Router,
    extract::{FromRef, Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use handlebars::Handlebars;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::charts::{self, ChartMount, DashboardRange, Period};
use crate::compose::Recipient;
use crate::config::ServerConfig;
use crate::dashboard;
use crate::error::AcademyError;
use crate::login::{self, AuthState, UserRecord};
use crate::page::{AnimationSettings, PageAction, PageKind, PageSession, PageSnapshot, PageSources};
use crate::storage::JsonFileStore;
use crate::toast::{ToastBoard, ToastPolicy};

/// Header carrying the page session id on API calls
pub const SESSION_HEADER: &str = "x-page-session";

const SHELL_TEMPLATE: &str = "page";

/// Sessions untouched for this long are dropped on the next page load
const SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

struct LiveSession {
    page: PageSession,
    last_seen: Instant,
}

pub struct AppState {
    config: ServerConfig,
    auth: AuthState,
    sessions: Mutex<HashMap<Uuid, LiveSession>>,
    shells: Handlebars<'static>,
}

impl FromRef<Arc<AppState>> for AuthState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.auth.clone()
    }
}

impl AppState {
    /// Set up the state shared by every request
    ///
    /// # Errors
    /// * Returns an error if the store file cannot be opened or the page shell does not compile
    pub fn new(config: ServerConfig) -> Result<Self, AcademyError> {
        let shared = match &config.store {
            Some(path) => {
                let store = JsonFileStore::open(path)?;
                info!("keeping userData in {}", store.path().display());
                Some(Arc::new(tokio::sync::Mutex::new(store)))
            }
            None => None,
        };
        let auth = AuthState {
            remote: config.remote(),
            shared,
        };

        let mut shells = Handlebars::new();
        shells.register_template_string(SHELL_TEMPLATE, include_str!("./static/page.html"))?;

        Ok(Self {
            config,
            auth,
            sessions: Mutex::new(HashMap::new()),
            shells,
        })
    }

    /// Build a fresh session for a page load and remember it
    fn open_session(&self, kind: PageKind) -> Result<(Uuid, PageSnapshot), AcademyError> {
        let sources = PageSources::demo(self.config.charts_available());
        let page = PageSession::build(kind, &sources, ToastBoard::new(ToastPolicy::default()))?;
        let snapshot = page.snapshot()?;
        let id = Uuid::new_v4();

        let mut sessions = self.lock_sessions();
        let now = Instant::now();
        sessions.retain(|_, live| now.duration_since(live.last_seen) < SESSION_IDLE);
        sessions.insert(
            id,
            LiveSession {
                page,
                last_seen: now,
            },
        );
        debug!("{} live page sessions", sessions.len());
        Ok((id, snapshot))
    }

    /// Run `f` on a live session; `None` when the id is unknown
    fn with_session<R>(&self, id: Uuid, f: impl FnOnce(&mut PageSession) -> R) -> Option<R> {
        let mut sessions = self.lock_sessions();
        let live = sessions.get_mut(&id)?;
        live.last_seen = Instant::now();
        Some(f(&mut live.page))
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, LiveSession>> {
        // A panic mid-mutation leaves at worst one odd page; keep serving
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn render_shell(
        &self,
        kind: PageKind,
        id: Uuid,
        snapshot: &PageSnapshot,
        user: Option<&UserRecord>,
    ) -> Result<String, AcademyError> {
        let nav: Vec<_> = PageKind::ALL
            .iter()
            .map(|page| {
                json!({
                    "path": page.path(),
                    "title": page.title(),
                    "active": *page == kind,
                })
            })
            .collect();
        let charts: Vec<_> = snapshot
            .charts
            .iter()
            .filter_map(|view| match &view.mount {
                ChartMount::Skipped => None,
                ChartMount::Config(_) => Some(json!({ "canvas": view.canvas, "title": view.title })),
                ChartMount::Fallback(message) => Some(json!({
                    "canvas": view.canvas,
                    "title": view.title,
                    "fallback": message,
                })),
            })
            .collect();
        let animations = match self.config.animations_enabled() {
            true => Some(embed_json(&AnimationSettings::default())?),
            false => None,
        };
        let periods: Vec<_> = Period::ALL
            .iter()
            .map(|period| {
                json!({
                    "value": period.as_str(),
                    "selected": snapshot.period == Some(*period),
                })
            })
            .collect();
        let ranges: Vec<_> = DashboardRange::ALL
            .iter()
            .map(|range| {
                json!({
                    "value": range.as_str(),
                    "selected": snapshot.range == Some(*range),
                })
            })
            .collect();
        let recipients: Vec<_> = Recipient::ALL
            .iter()
            .map(|recipient| json!({ "value": recipient.as_str(), "label": recipient.label() }))
            .collect();

        let context = json!({
            "title": kind.title(),
            "page": kind,
            "session": id.to_string(),
            "nav": nav,
            "user_name": user.map(UserRecord::display_name),
            "user_email": user.map(|u| u.email.clone()),
            "charts": charts,
            "charts_library": self.config.charts_available() && !snapshot.charts.is_empty(),
            "animations": animations,
            "periods": periods,
            "ranges": ranges,
            "cards": (kind == PageKind::Dashboard).then(dashboard::demo_cards),
            "recipients": recipients,
            "is_dashboard": kind == PageKind::Dashboard,
            "is_analytics": kind == PageKind::Analytics,
            "is_catalog": kind == PageKind::Catalog,
            "is_community": kind == PageKind::Community,
            "courses_html": snapshot.courses_html,
            "community_html": snapshot.community.as_ref().map(|view| view.html.clone()),
            "state": embed_json(snapshot)?,
        });
        Ok(self.shells.render(SHELL_TEMPLATE, &context)?)
    }
}

/// JSON safe to place inside a `<script>` element
fn embed_json<T: Serialize>(value: &T) -> Result<String, AcademyError> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

/// Build the router with every page and API route
///
/// # Arguments
/// * `state` - Shared application state
///
/// # Returns
/// * `Router` - Ready to be served
pub fn router(state: Arc<AppState>) -> Router {
    let auth = AuthState::from_ref(&state);

    let private = Router::new()
        .route("/dashboard", get(serve_dashboard))
        .route("/analytics", get(serve_analytics))
        .route("/community", get(serve_community))
        .route_layer(middleware::from_fn_with_state(auth, login::require_auth));

    Router::new()
        .route("/", get(|| async { Redirect::to(PageKind::Catalog.path()) }))
        .route("/catalog", get(serve_catalog))
        .route("/login", get(login::serve_login_page).post(login::handle_login))
        .route(
            "/register",
            get(login::serve_register_page).post(login::handle_register),
        )
        .route("/logout", post(login::handle_logout))
        .route("/api/social-login", post(login::handle_social_login))
        .route("/api/password-strength", get(login::handle_password_strength))
        .route("/api/action", post(handle_action))
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/charts/daily-activity", get(get_daily_activity))
        .merge(private)
        .nest_service("/static", ServeDir::new(&state.config.assets))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server
///
/// # Arguments
/// * `config` - Listener address, storage and collaborator switches
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Only returns on failure
pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let bind = config.bind;
    let state = Arc::new(AppState::new(config)?);
    let app = router(state);

    let listener = TcpListener::bind(bind).await?;
    info!("Listening on http://{}", bind);
    axum::serve(listener, app).await?;

    Ok(())
}

fn render_page(state: &AppState, kind: PageKind, user: Option<&UserRecord>) -> Response {
    let rendered = state
        .open_session(kind)
        .and_then(|(id, snapshot)| state.render_shell(kind, id, &snapshot, user));
    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("failed to render {:?} page: {}", kind, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

async fn serve_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserRecord>,
) -> Response {
    render_page(&state, PageKind::Dashboard, Some(&user))
}

async fn serve_analytics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserRecord>,
) -> Response {
    render_page(&state, PageKind::Analytics, Some(&user))
}

async fn serve_community(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<UserRecord>,
) -> Response {
    render_page(&state, PageKind::Community, Some(&user))
}

async fn serve_catalog(State(state): State<Arc<AppState>>) -> Response {
    render_page(&state, PageKind::Catalog, None)
}

#[derive(Serialize)]
struct ApiError {
    error: &'static str,
}

fn api_error(status: StatusCode, error: &'static str) -> Response {
    (status, Json(ApiError { error })).into_response()
}

fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    let raw = headers.get(SESSION_HEADER)?.to_str().ok()?;
    Uuid::parse_str(raw).ok()
}

/// Apply a page action and answer with the new snapshot
async fn handle_action(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(action): Json<PageAction>,
) -> Response {
    let Some(id) = session_id(&headers) else {
        return api_error(StatusCode::NOT_FOUND, "unknown page session");
    };
    let snapshot = state.with_session(id, |page| {
        page.dispatch(action);
        page.snapshot()
    });
    snapshot_response(snapshot)
}

async fn get_snapshot(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(id) = session_id(&headers) else {
        return api_error(StatusCode::NOT_FOUND, "unknown page session");
    };
    snapshot_response(state.with_session(id, |page| page.snapshot()))
}

fn snapshot_response(snapshot: Option<Result<PageSnapshot, AcademyError>>) -> Response {
    match snapshot {
        Some(Ok(snapshot)) => Json(snapshot).into_response(),
        Some(Err(e)) => {
            error!("failed to snapshot page session: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to render page state")
        }
        None => api_error(StatusCode::NOT_FOUND, "unknown page session"),
    }
}

#[derive(Deserialize)]
struct PeriodQuery {
    #[serde(default)]
    period: Option<String>,
}

#[derive(Serialize)]
struct DailyActivity {
    period: Period,
    #[serde(flatten)]
    mount: ChartMount,
}

/// Daily activity series for a period, without touching any page session
async fn get_daily_activity(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PeriodQuery>,
) -> Response {
    let period = match query.period.as_deref() {
        None => Period::default(),
        Some(raw) => match raw.parse::<Period>() {
            Ok(period) => period,
            Err(e) => {
                debug!("{}", e);
                return api_error(StatusCode::BAD_REQUEST, "unknown period");
            }
        },
    };
    let config = charts::daily_activity(period, &mut rand::thread_rng());
    Json(DailyActivity {
        period,
        mount: ChartMount::decide(true, state.config.charts_available(), Some(config)),
    })
    .into_response()
}
