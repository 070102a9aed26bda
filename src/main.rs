//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppConfig, AppState};
use crate::docs::ApiDoc;
use crate::middleware::auth::{auth_guard, tenant_guard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,accounting_backend=debug")),
        )
        .with_target(false)
        .compact()
        .init();

    // Sem configuração válida a aplicação não sobe
    let config = AppConfig::from_env()?;
    let app_state = AppState::new(config).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    spawn_credential_purge(&app_state);

    // Rotas públicas de autenticação
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
        .route("/logout", post(handlers::auth::logout))
        .route("/password-reset/request", post(handlers::auth::request_password_reset))
        .route("/password-reset/confirm", post(handlers::auth::confirm_password_reset))
        .route("/otp/request", post(handlers::auth::request_otp))
        .route("/otp/verify", post(handlers::auth::verify_otp));

    // Só precisam de usuário autenticado (sem contexto de tenant)
    let user_routes = Router::new()
        .route("/api/users/me", get(handlers::auth::get_me))
        .route("/api/tenants", post(handlers::tenancy::create_tenant))
        .route(
            "/api/system/modules",
            get(handlers::modules::list_system_modules).put(handlers::modules::upsert_system_module),
        )
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Tudo que roda dentro de um tenant: auth_guard (externo) e depois tenant_guard
    let tenant_routes = Router::new()
        .route(
            "/api/tenant",
            get(handlers::tenancy::get_current_tenant).put(handlers::tenancy::update_current_tenant),
        )
        .route(
            "/api/tenant/branches",
            post(handlers::tenancy::create_branch).get(handlers::tenancy::list_branches),
        )
        .route(
            "/api/tenant/branches/{id}",
            put(handlers::tenancy::update_branch).delete(handlers::tenancy::deactivate_branch),
        )
        .route(
            "/api/tenant/users",
            get(handlers::tenancy::list_tenant_users).post(handlers::tenancy::assign_user),
        )
        .route("/api/tenant/modules", get(handlers::modules::list_tenant_modules))
        .route("/api/tenant/modules/{key}", put(handlers::modules::set_tenant_module))
        // Exercícios
        .route(
            "/api/fiscal-years",
            post(handlers::fiscal::create_fiscal_year).get(handlers::fiscal::list_fiscal_years),
        )
        .route("/api/fiscal-years/by-date", get(handlers::fiscal::find_fiscal_year_for_date))
        .route(
            "/api/fiscal-years/{id}",
            get(handlers::fiscal::get_fiscal_year).put(handlers::fiscal::update_fiscal_year),
        )
        .route("/api/fiscal-years/{id}/lock", post(handlers::fiscal::lock_fiscal_year))
        .route("/api/fiscal-years/{id}/unlock", post(handlers::fiscal::unlock_fiscal_year))
        // Plano de contas
        .route(
            "/api/accounts",
            post(handlers::accounts::create_account).get(handlers::accounts::list_accounts),
        )
        .route("/api/accounts/tree", get(handlers::accounts::account_tree))
        .route(
            "/api/accounts/{id}",
            get(handlers::accounts::get_account)
                .put(handlers::accounts::update_account)
                .delete(handlers::accounts::delete_account),
        )
        // Lançamentos
        .route(
            "/api/journal-entries",
            post(handlers::journal::create_entry).get(handlers::journal::list_entries),
        )
        .route(
            "/api/journal-entries/{id}",
            get(handlers::journal::get_entry)
                .put(handlers::journal::update_entry)
                .delete(handlers::journal::delete_entry),
        )
        .route("/api/journal-entries/{id}/post", post(handlers::journal::post_entry))
        .route("/api/journal-entries/{id}/reverse", post(handlers::journal::reverse_entry))
        .route("/api/journal-entries/{id}/voucher", get(handlers::journal::entry_voucher_pdf))
        // Relatórios
        .route("/api/reports/trial-balance/{fiscal_year_id}", get(handlers::reports::trial_balance))
        .route("/api/reports/ledger/{account_id}", get(handlers::reports::account_ledger))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let bind_addr = app_state.config.bind_addr.clone();

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .merge(user_routes)
        .merge(tenant_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

// Limpeza periódica de refresh tokens, resets e OTPs vencidos
fn spawn_credential_purge(app_state: &AppState) {
    let auth_service = app_state.auth_service.clone();
    let every = app_state.config.credential_purge_interval;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = auth_service.purge_expired_credentials().await {
                tracing::error!("Falha na limpeza de credenciais: {}", e);
            }
        }
    });
}
