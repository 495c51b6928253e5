use anyhow::{Context, Result};
use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    BoxError, Router,
};
use hyper::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use std::{borrow::Cow, sync::Arc, time::Duration};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::{cors::Any, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    admin_handlers, announcement_handlers, auth, comment_handlers,
    config::{AppState, Config},
    db::{map::MapDB, seed, sqlite::SqlDB, DBType},
    document_handlers, favorite_handlers, handlers, rating_handlers, setting_handlers,
    subject_handlers,
};

/// Opens the SQLite store at `sqlite_path`, or an in-memory one when unset.
pub async fn open_db(config: &Config) -> Result<DBType> {
    match &config.sqlite_path {
        Some(sqlite_path) => {
            log::info!("Using SQLite database at: {}", sqlite_path);
            let db = SqlDB::new(sqlite_path)
                .await
                .context("failed to open sqlite database")?;
            Ok(DBType::SqlDB(db))
        }
        None => {
            log::info!("Using in-memory MapDB database");
            Ok(DBType::MapDB(MapDB::new()))
        }
    }
}

pub fn router(app_state: Arc<AppState>) -> Router {
    let authorize = || middleware::from_fn_with_state(app_state.clone(), auth::authorize);

    let admin_routes = Router::new()
        .route("/users", get(admin_handlers::list_users_handler))
        .route(
            "/users/:id",
            put(admin_handlers::update_user_handler).delete(admin_handlers::delete_user_handler),
        )
        .route("/stats", get(admin_handlers::stats_handler))
        .route("/documents", post(document_handlers::create_document_handler))
        .route(
            "/documents/:id",
            put(document_handlers::update_document_handler)
                .delete(document_handlers::delete_document_handler),
        )
        .route("/subjects", post(subject_handlers::create_subject_handler))
        .route(
            "/subjects/:id",
            put(subject_handlers::update_subject_handler)
                .delete(subject_handlers::delete_subject_handler),
        )
        .route(
            "/announcements",
            post(announcement_handlers::create_announcement_handler),
        )
        .route(
            "/announcements/:id",
            put(announcement_handlers::update_announcement_handler)
                .delete(announcement_handlers::delete_announcement_handler),
        )
        .route("/settings", post(setting_handlers::upsert_setting_handler))
        .route(
            "/settings/:id",
            axum::routing::delete(setting_handlers::delete_setting_handler),
        )
        .route(
            "/comments/:id",
            axum::routing::delete(comment_handlers::delete_comment_handler),
        )
        .layer(middleware::from_fn(auth::require_admin))
        .layer(authorize());

    let api_routes = Router::new()
        .route("/api", get(handlers::health_check_handler))
        .route("/api/register", post(auth::register_handler))
        .route("/api/login", post(auth::sign_in_handler))
        .route("/api/logout", post(auth::sign_out_handler))
        .route(
            "/api/user",
            get(auth::current_user_handler).layer(authorize()),
        )
        .route("/api/subjects", get(subject_handlers::list_subjects_handler))
        .route(
            "/api/subjects/:id",
            get(subject_handlers::get_subject_handler),
        )
        .route(
            "/api/documents",
            get(document_handlers::list_documents_handler),
        )
        .route(
            "/api/documents/:id",
            get(document_handlers::get_document_handler).layer(
                middleware::from_fn_with_state(app_state.clone(), auth::identify),
            ),
        )
        .route(
            "/api/documents/:id/download",
            get(document_handlers::download_document_handler).layer(authorize()),
        )
        .route(
            "/api/documents/:id/comments",
            get(comment_handlers::list_comments_handler)
                .merge(post(comment_handlers::create_comment_handler).layer(authorize())),
        )
        .route(
            "/api/documents/:id/ratings",
            post(rating_handlers::create_rating_handler).layer(authorize()),
        )
        .route(
            "/api/documents/:id/favorites",
            post(favorite_handlers::add_favorite_handler)
                .delete(favorite_handlers::remove_favorite_handler)
                .layer(authorize()),
        )
        .route(
            "/api/favorites",
            get(favorite_handlers::list_favorites_handler).layer(authorize()),
        )
        .route(
            "/api/announcements",
            get(announcement_handlers::list_announcements_handler),
        )
        .route(
            "/api/settings",
            get(setting_handlers::list_settings_handler),
        )
        .nest("/api/admin", admin_routes);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    Router::new()
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", handlers::ApiDoc::openapi()),
        )
        .merge(api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_error))
                .load_shed()
                .concurrency_limit(1024)
                .timeout(Duration::from_secs(10))
                .layer(TraceLayer::new_for_http()),
        )
        .with_state(app_state)
        .layer(cors)
}

pub async fn run(config: Config) -> Result<()> {
    let db = open_db(&config).await?;
    if config.seed {
        seed::seed(&db, &config)
            .await
            .context("failed to seed the store")?;
    }

    let app_state = Arc::new(AppState {
        db: Arc::new(db),
        config,
    });

    let address = format!("{}:{}", app_state.config.host, app_state.config.port);
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .context("failed to bind address")?;

    log::info!(
        "🚀 Server started successfully at {}:{}",
        app_state.config.host,
        app_state.config.port
    );

    axum::serve(listener, router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("failed to serve listener")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {}", err);
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

    log::info!("shutting down");
}

async fn handle_error(error: BoxError) -> impl IntoResponse {
    if error.is::<tower::timeout::error::Elapsed>() {
        return (StatusCode::REQUEST_TIMEOUT, Cow::from("request timed out"));
    }

    if error.is::<tower::load_shed::error::Overloaded>() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Cow::from("service is overloaded, try again later"),
        );
    }

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Cow::from(format!("Unhandled internal error: {}", error)),
    )
}
