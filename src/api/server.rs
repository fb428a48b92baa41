use std::any::Any;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::extract::ApiRequest;
use super::services::{self, ResourceView, CITIES, COUNTRIES, ROLES, STATES, USERS};
use super::state::AppState;
use crate::config::Config;
use crate::handlers::HandlerRegistry;
use crate::models::Entity;
use crate::pipeline::{ApiResponse, Envelope, PkScope};
use crate::store::RecordStore;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Open the store and serve the API until a shutdown signal arrives
pub async fn run(config: Config) -> Result<(), AnyError> {
    info!(path = %config.server.data_path.display(), "Opening record store");
    let store = RecordStore::open(&config.server.data_path)
        .map_err(|e| format!("Failed to open record store: {e}"))?;

    let address = config.server.bind_addr;
    let state = AppState::new(config, HandlerRegistry::with_defaults(), store.clone());
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "Weepstay API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.persist()?;
    info!("Record store flushed");
    Ok(())
}

/// Every route with its middleware, bound to `state`
pub fn router(state: AppState) -> Router {
    let limit = state.config.server.max_payload_bytes;
    let exception_message = state.config.views.exception_message.clone();

    let mut app = Router::new()
        .route("/health", get(services::health))
        .route(
            "/regions/summary",
            get(|State(state): State<AppState>, request: ApiRequest| async move {
                services::paginated(&state, request, "region.summary", Entity::Country).await
            }),
        )
        .route(
            "/roles",
            get(|State(state): State<AppState>, request: ApiRequest| async move {
                services::list(&state, request, ROLES).await
            })
            .post(|State(state): State<AppState>, request: ApiRequest| async move {
                services::process(&state, request, "role.create".to_string(), Entity::UserRole).await
            }),
        )
        .route("/roles/choices", get(services::role_choices))
        .route(
            "/users",
            get(|State(state): State<AppState>, request: ApiRequest| async move {
                services::list(&state, request, USERS).await
            })
            .post(|State(state): State<AppState>, request: ApiRequest| async move {
                services::process(&state, request, USERS.handler("create"), Entity::User).await
            }),
        )
        .route(
            "/users/detail",
            get(|State(state): State<AppState>, request: ApiRequest| async move {
                let scope = state.config.views.user_lookup;
                services::retrieve(&state, request, USERS, scope).await
            }),
        )
        .route(
            "/users/{id}",
            axum::routing::delete(|State(state): State<AppState>, request: ApiRequest| async move {
                services::process_instance(&state, request, USERS, "delete").await
            }),
        )
        .route(
            "/tokens/blacklist",
            post(|State(state): State<AppState>, request: ApiRequest| async move {
                services::process(&state, request, "token.blacklist".to_string(), Entity::BlacklistedToken)
                    .await
            }),
        );

    for (path, view) in [
        ("/regions/countries", COUNTRIES),
        ("/regions/states", STATES),
        ("/regions/cities", CITIES),
    ] {
        app = app.merge(region_routes(path, view));
    }

    app.fallback(services::not_found)
        .layer(DefaultBodyLimit::max(limit))
        .layer(RequestDecompressionLayer::new())
        .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
            panic_response(&exception_message, panic)
        }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// List and create on `path`; retrieve, update and delete on `path/{id}`
fn region_routes(path: &str, view: ResourceView) -> Router<AppState> {
    Router::new()
        .route(
            path,
            get(move |State(state): State<AppState>, request: ApiRequest| async move {
                services::list(&state, request, view).await
            })
            .post(move |State(state): State<AppState>, request: ApiRequest| async move {
                services::process(&state, request, view.handler("create"), view.entity).await
            }),
        )
        .route(
            &format!("{path}/{{id}}"),
            get(move |State(state): State<AppState>, request: ApiRequest| async move {
                services::retrieve(&state, request, view, PkScope::Kwargs).await
            })
            .put(move |State(state): State<AppState>, request: ApiRequest| async move {
                services::process_instance(&state, request, view, "update").await
            })
            .delete(move |State(state): State<AppState>, request: ApiRequest| async move {
                services::process_instance(&state, request, view, "delete").await
            }),
        )
}

fn panic_response(exception_message: &str, panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "Handler panicked");

    ApiResponse {
        status: StatusCode::BAD_REQUEST,
        body: Envelope::Exception {
            message: exception_message.to_string(),
            error: detail,
        },
    }
    .into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
