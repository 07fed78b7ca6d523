//! HTTP surface: shared state, the route table and the server loop.

mod caller;
mod error;
mod handlers;
pub mod params;

use crate::clock::Clock;
use crate::config::Config;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use caller::{Caller, CALLER_HEADER};

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    config: Arc<Config>,
    clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(conn: Connection, config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            config: Arc::new(config),
            clock,
        }
    }

    /// Locks the store. Never hold the guard across an `.await`.
    pub fn db(&self) -> MutexGuard<'_, Connection> {
        self.db.lock()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

pub fn router(state: AppState) -> Router {
    use handlers::{
        calendars, competences, dashboard, health, learning_situations, modules, planning_units,
        regions, scheduled_situations, school_types, schools, subjects, terms, uploads, users,
        years,
    };

    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    // Routes that need a resolved caller.
    let protected = Router::new()
        .route("/subjects/", get(subjects::list).post(subjects::create))
        .route("/subjects/create/", post(subjects::create))
        .route(
            "/subjects/:id/",
            get(subjects::retrieve)
                .put(subjects::update)
                .delete(subjects::destroy),
        )
        .route(
            "/learning-situations/",
            get(learning_situations::list).post(learning_situations::create),
        )
        .route(
            "/learning-situations/create/",
            post(learning_situations::create),
        )
        .route(
            "/learning-situations/:id/",
            get(learning_situations::retrieve)
                .put(learning_situations::update)
                .delete(learning_situations::destroy),
        )
        .route("/modules/", get(modules::list).post(modules::create))
        .route("/modules/create/", post(modules::create))
        .route(
            "/modules/:id/",
            get(modules::retrieve)
                .put(modules::update)
                .delete(modules::destroy),
        )
        .route(
            "/specific-competences/",
            get(competences::list).post(competences::create),
        )
        .route("/school-calendars/", get(calendars::list))
        .route("/school-calendars/:id/", get(calendars::retrieve))
        .route("/terms/", get(terms::list))
        .route("/terms/:id/", get(terms::retrieve).put(terms::update))
        .route(
            "/scheduled-situations/",
            get(scheduled_situations::list).post(scheduled_situations::create),
        )
        .route(
            "/scheduled-situations/reorder/",
            post(scheduled_situations::reorder),
        )
        .route(
            "/scheduled-situations/:id/",
            get(scheduled_situations::retrieve)
                .put(scheduled_situations::update)
                .delete(scheduled_situations::destroy),
        )
        .route(
            "/planning-units/",
            get(planning_units::list).post(planning_units::create),
        )
        .route(
            "/planning-units/bulk-update/",
            post(planning_units::bulk_update),
        )
        .route(
            "/planning-units/:id/",
            get(planning_units::retrieve)
                .put(planning_units::update)
                .delete(planning_units::destroy),
        )
        .route(
            "/file-upload/",
            post(uploads::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/dashboard/", get(dashboard::dashboard))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            caller::require_caller,
        ));

    // Public routes (no caller)
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/regions/", get(regions::list).post(regions::create))
        .route(
            "/regions/:id/",
            get(regions::retrieve)
                .put(regions::update)
                .delete(regions::destroy),
        )
        .route("/years/", get(years::list).post(years::create))
        .route(
            "/years/:id/",
            get(years::retrieve).put(years::update).delete(years::destroy),
        )
        .route(
            "/school-types/",
            get(school_types::list).post(school_types::create),
        )
        .route("/school-types/:id/", get(school_types::retrieve))
        .route("/schools/", get(schools::list).post(schools::create))
        .route(
            "/schools/:id/",
            get(schools::retrieve)
                .put(schools::update)
                .delete(schools::destroy),
        )
        .route("/users/", get(users::list).post(users::create))
        .route("/users/:id/", put(users::update));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.bind_addr;
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "curriculumd listening");
    axum::serve(listener, app).await?;
    Ok(())
}
