//src/main.rs

use std::net::SocketAddr;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::{auth::admin_guard, rate_limit::rate_limit_guard};
use crate::services::rate_limit::Bucket;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new().await?;

    // Sem migrações aplicadas nenhuma rota é servida
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let addr = app_state.settings.server_addr;
    let app = build_router(app_state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    // ConnectInfo alimenta o rate limit quando não há X-Forwarded-For
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

fn build_router(app_state: AppState) -> Router {
    let limited = |bucket: Bucket| {
        axum_middleware::from_fn_with_state((app_state.clone(), bucket), rate_limit_guard)
    };

    // Rotas públicas (anônimas)
    let public_routes = Router::new()
        .route(
            "/submit",
            post(handlers::submissions::submit).layer(limited(Bucket::Submit)),
        )
        .route("/submitted", get(handlers::submissions::submitted))
        .route("/status", post(handlers::submissions::status))
        .route(
            "/hr/register",
            post(handlers::hr::register).layer(limited(Bucket::HrRegister)),
        );

    // Rotas do RH (token estático)
    let admin_routes = Router::new()
        .route("/dashboard", get(handlers::admin::get_dashboard))
        .route("/submissions", get(handlers::admin::list_submissions))
        .route("/submissions/status", post(handlers::admin::set_status))
        .route("/submissions/{id}", get(handlers::admin::get_submission))
        .route(
            "/submissions/{id}/response",
            post(handlers::admin::create_response).put(handlers::admin::update_response),
        )
        .route("/tenants", get(handlers::admin::list_tenants))
        .route("/tenants/{id}", patch(handlers::admin::update_tenant))
        .route("/tenants/{id}/rotate-code", post(handlers::admin::rotate_access_code))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            admin_guard,
        ));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(public_routes)
        .nest("/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
