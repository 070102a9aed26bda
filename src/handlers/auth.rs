// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::{
        AuthResponse, LoginUserPayload, OtpRequestPayload, OtpVerifyPayload, OtpVerifyResponse,
        PasswordResetConfirmPayload, PasswordResetRequestPayload, RefreshTokenPayload, RegisterUserPayload, User,
    },
};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Usuário criado; código de verificação enviado", body = User),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "E-mail já cadastrado")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let user = app_state
        .auth_service
        .register_user(&payload.email, &payload.password, &payload.full_name)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login bem-sucedido", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas ou usuário inativo")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<LoginUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let auth = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(auth))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenPayload,
    responses(
        (status = 200, description = "Novo par de tokens", body = AuthResponse),
        (status = 401, description = "Refresh token inválido, expirado ou reutilizado")
    )
)]
pub async fn refresh(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<RefreshTokenPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let auth = app_state
        .auth_service
        .refresh(&payload.refresh_token)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(auth))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    request_body = RefreshTokenPayload,
    responses((status = 204, description = "Refresh token revogado"))
)]
pub async fn logout(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<RefreshTokenPayload>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .auth_service
        .logout(&payload.refresh_token)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/auth/password-reset/request",
    tag = "Auth",
    request_body = PasswordResetRequestPayload,
    responses((status = 202, description = "Pedido aceito (mesmo para e-mail desconhecido)"))
)]
pub async fn request_password_reset(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<PasswordResetRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .auth_service
        .request_password_reset(&payload.email)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::ACCEPTED)
}

#[utoipa::path(
    post,
    path = "/api/auth/password-reset/confirm",
    tag = "Auth",
    request_body = PasswordResetConfirmPayload,
    responses(
        (status = 204, description = "Senha alterada; sessões encerradas"),
        (status = 401, description = "Token inválido ou expirado")
    )
)]
pub async fn confirm_password_reset(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<PasswordResetConfirmPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .auth_service
        .reset_password(&payload.token, &payload.new_password)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/auth/otp/request",
    tag = "Auth",
    request_body = OtpRequestPayload,
    responses((status = 202, description = "Código gerado e enviado"))
)]
pub async fn request_otp(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<OtpRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .auth_service
        .request_otp(&payload.email, payload.purpose)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::ACCEPTED)
}

#[utoipa::path(
    post,
    path = "/api/auth/otp/verify",
    tag = "Auth",
    request_body = OtpVerifyPayload,
    responses(
        (status = 200, description = "Código aceito", body = OtpVerifyResponse),
        (status = 400, description = "Código inválido ou expirado"),
        (status = 429, description = "Tentativas esgotadas")
    )
)]
pub async fn verify_otp(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<OtpVerifyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let result = app_state
        .auth_service
        .verify_otp(&payload.email, payload.purpose, &payload.code)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(result))
}

// Rota protegida /me
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Usuário autenticado", body = User),
        (status = 401, description = "Token ausente ou inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}
