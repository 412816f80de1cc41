use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use vows_api::middleware::{require_admin, require_auth};
use vows_api::{AppState, AppStateInner, admin, auth, comments, invitations};
use vows_storage::MediaStore;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vows=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = std::env::var("VOWS_JWT_SECRET").unwrap_or_default();
    if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
        eprintln!("FATAL: VOWS_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Tokens signed with a guessable secret are forgeable.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let host = std::env::var("VOWS_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("VOWS_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let db_path = std::env::var("VOWS_DB_PATH").unwrap_or_else(|_| "vows.db".into());
    let media_dir: PathBuf = std::env::var("VOWS_MEDIA_DIR")
        .unwrap_or_else(|_| "./media".into())
        .into();
    let media_public_base =
        std::env::var("VOWS_MEDIA_PUBLIC_BASE").unwrap_or_else(|_| "/media".into());

    // Init database and media storage
    let db = vows_db::Database::open(&PathBuf::from(&db_path))?;
    let media = MediaStore::new(media_dir.clone(), media_public_base).await?;

    // Bootstrap admin account from env, if configured
    let admin_email = std::env::var("VOWS_ADMIN_EMAIL").unwrap_or_default();
    let admin_password = std::env::var("VOWS_ADMIN_PASSWORD").unwrap_or_default();
    if !admin_email.is_empty() && !admin_password.is_empty() {
        admin::seed_admin(&db, &admin_email, &admin_password)?;
    } else if admin_email.is_empty() != admin_password.is_empty() {
        warn!(
            "VOWS_ADMIN_EMAIL and VOWS_ADMIN_PASSWORD must both be set; skipping admin bootstrap"
        );
    }

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        media,
        jwt_secret,
    });

    // Routes
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/invitations/{slug}", get(invitations::get_public_invitation))
        .route("/invitations/{slug}/comments", post(comments::create_comment))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/me/invitations", get(invitations::list_my_invitations))
        .route("/me/invitations/{id}", delete(invitations::delete_invitation))
        .route("/invitations", post(invitations::create_invitation))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}/verify", post(admin::verify_user))
        .route("/admin/users/{id}", delete(admin::delete_user))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .nest_service("/media", ServeDir::new(&media_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("vows server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
