use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use serde_json::json;
use validator::Validate;

use crate::auth::{
    generate_access_token, generate_refresh_token, generate_temporary_token, hash_password,
    hash_token, verify_password, verify_refresh_token, AuthResponse, AuthenticatedUser,
    LoginRequest, RefreshRequest, RegisterRequest, TokenPair, ACCESS_TOKEN_COOKIE,
    REFRESH_TOKEN_COOKIE, VERIFY_EMAIL_TOKEN_TTL_MINUTES,
};
use crate::config::Config;
use crate::db::{Entity, Filter, Query, SoftDeleteStore, Store, Value, UUID};
use crate::error::AppError;
use crate::models::{Token, TokenKind, User, UserRole};
use crate::response::{self, ApiResponse};

const USER_ID: &str = "user_id";
const KIND: &str = "kind";
const TOKEN: &str = "token";
const EXPIRY_AT: &str = "expiry_at";

fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .finish()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Deletes the user's tokens, all of them or only those of `kind`.
async fn revoke_tokens(
    db: &SoftDeleteStore,
    user_id: i64,
    kind: Option<TokenKind>,
) -> Result<(), AppError> {
    let mut filter = Filter::new().eq(USER_ID, user_id);
    if let Some(kind) = kind {
        filter = filter.eq(KIND, kind);
    }
    for token in db.list::<Token>(&Query::new(filter)).await? {
        db.delete(Entity::Tokens, token.id).await?;
    }
    Ok(())
}

/// Finds the live (unexpired) token of `kind` stored under `raw`'s digest.
async fn live_token(
    db: &SoftDeleteStore,
    raw: &str,
    kind: TokenKind,
) -> Result<Option<Token>, AppError> {
    db.first::<Token>(
        &Filter::new()
            .eq(TOKEN, hash_token(raw))
            .eq(KIND, kind)
            .gt(EXPIRY_AT, Utc::now()),
    )
    .await
}

/// Replaces any pending verification token of the user and returns the new raw token.
pub async fn issue_email_verification(
    db: &SoftDeleteStore,
    user_id: i64,
) -> Result<String, AppError> {
    revoke_tokens(db, user_id, Some(TokenKind::VerifyEmailToken)).await?;

    let (raw, hashed) = generate_temporary_token();
    db.insert::<Token>(vec![
        (USER_ID, Value::Int(user_id)),
        (TOKEN, hashed.into()),
        (KIND, TokenKind::VerifyEmailToken.into()),
        (
            EXPIRY_AT,
            (Utc::now() + Duration::minutes(VERIFY_EMAIL_TOKEN_TTL_MINUTES)).into(),
        ),
    ])
    .await?;
    Ok(raw)
}

/// Issues a new access/refresh pair. The refresh token is stored as the only valid one.
async fn issue_session(
    db: &SoftDeleteStore,
    config: &Config,
    user: &User,
) -> Result<TokenPair, AppError> {
    // `refresh_token` names the handler below, so the local cannot reuse it.
    let access = generate_access_token(user, config)?;
    let refresh = generate_refresh_token(user, config)?;

    revoke_tokens(db, user.id, Some(TokenKind::RefreshToken)).await?;
    db.insert::<Token>(vec![
        (USER_ID, Value::Int(user.id)),
        (TOKEN, hash_token(&refresh).into()),
        (KIND, TokenKind::RefreshToken.into()),
        (
            EXPIRY_AT,
            (Utc::now() + Duration::seconds(config.refresh_token_expiry_secs)).into(),
        ),
    ])
    .await?;

    Ok(TokenPair {
        access_token: access,
        refresh_token: refresh,
    })
}

fn session_response<T: serde::Serialize>(
    config: &Config,
    pair: &TokenPair,
    message: &str,
    data: T,
) -> HttpResponse {
    let secure = config.is_production();
    HttpResponse::Ok()
        .cookie(session_cookie(
            ACCESS_TOKEN_COOKIE,
            pair.access_token.clone(),
            secure,
        ))
        .cookie(session_cookie(
            REFRESH_TOKEN_COOKIE,
            pair.refresh_token.clone(),
            secure,
        ))
        .json(ApiResponse::new(StatusCode::OK, message, data))
}

/// Register a new user
///
/// Creates the account with role `USER` and a pending email-verification token.
///
/// ## Responses:
/// - `201 Created`: the new user's public profile.
/// - `400 Bad Request`: missing or malformed fields.
/// - `409 Conflict`: the email is already registered.
#[post("/register")]
pub async fn register(
    db: web::Data<SoftDeleteStore>,
    config: web::Data<Config>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;

    let email = body.email.trim().to_lowercase();
    if db
        .first::<User>(&Filter::new().eq("email", email.as_str()))
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "User with email or username already exists".into(),
        ));
    }

    let password = hash_password(&body.password, config.bcrypt_cost)?;
    let user = db
        .insert::<User>(vec![
            ("name", body.name.into()),
            ("email", email.into()),
            ("password", password.into()),
            ("role", UserRole::User.into()),
            ("is_email_verified", false.into()),
        ])
        .await?;

    let verification_token = issue_email_verification(&db, user.id).await?;
    log::info!("Registered user {}", user.uuid);
    log::debug!(
        "Email verification path for {}: /api/v1/users/verify-email/{}",
        user.email,
        verification_token
    );

    Ok(response::created(
        "Users registered successfully and verification email has been sent on your email",
        user.public(),
    ))
}

/// Login user
///
/// Checks the credentials, rotates the stored refresh token and sets both
/// tokens as http-only cookies.
#[post("/login")]
pub async fn login(
    db: web::Data<SoftDeleteStore>,
    config: web::Data<Config>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;

    let email = body.email.trim().to_lowercase();
    let user = db
        .first::<User>(&Filter::new().eq("email", email.as_str()))
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".into()))?;

    if !verify_password(&body.password, &user.password)? {
        log::warn!("Failed login for user {}", user.uuid);
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    let pair = issue_session(&db, &config, &user).await?;
    let data = AuthResponse {
        user: user.public(),
        access_token: pair.access_token.clone(),
        refresh_token: pair.refresh_token.clone(),
    };
    Ok(session_response(
        &config,
        &pair,
        "User logged in successfully",
        data,
    ))
}

#[get("/verify-email/{token}")]
pub async fn verify_email(
    db: web::Data<SoftDeleteStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let raw = path.into_inner();
    if raw.trim().is_empty() {
        return Err(AppError::BadRequest("Verification token is required".into()));
    }

    let token = live_token(&db, &raw, TokenKind::VerifyEmailToken)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired token".into()))?;

    db.delete(Entity::Tokens, token.id).await?;
    let user = db
        .modify::<User>(token.user_id, vec![("is_email_verified", true.into())])
        .await?;

    Ok(response::ok(
        "Email verified successfully",
        json!({ "isEmailVerified": user.is_email_verified }),
    ))
}

/// Exchanges a refresh token (cookie or body) for a new token pair.
///
/// Only the most recently issued refresh token is accepted; presenting an older
/// one, even if its signature is still valid, fails with 401.
#[post("/refresh-token")]
pub async fn refresh_token(
    req: HttpRequest,
    db: web::Data<SoftDeleteStore>,
    config: web::Data<Config>,
    body: Option<web::Json<RefreshRequest>>,
) -> Result<HttpResponse, AppError> {
    let incoming = req
        .cookie(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| body.and_then(|body| body.into_inner().refresh_token))
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| AppError::Unauthorized("Unauthorized request".into()))?;

    let claims = verify_refresh_token(&incoming, &config)
        .map_err(|_| AppError::Unauthorized("Invalid refresh token".into()))?;

    let user = db
        .first::<User>(&Filter::new().eq(UUID, claims.sub))
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".into()))?;

    match live_token(&db, &incoming, TokenKind::RefreshToken).await? {
        Some(stored) if stored.user_id == user.id => {}
        _ => {
            log::warn!("Stale refresh token presented for user {}", user.uuid);
            return Err(AppError::Unauthorized(
                "Refresh token is expired or used".into(),
            ));
        }
    }

    let pair = issue_session(&db, &config, &user).await?;
    Ok(session_response(
        &config,
        &pair,
        "Access token refreshed",
        &pair,
    ))
}

#[post("/logout")]
pub async fn logout(
    db: web::Data<SoftDeleteStore>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    revoke_tokens(&db, user.0.id, None).await?;

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie(ACCESS_TOKEN_COOKIE))
        .cookie(removal_cookie(REFRESH_TOKEN_COOKIE))
        .json(ApiResponse::new(StatusCode::OK, "User logged out", json!({}))))
}

#[get("/current-user")]
pub async fn current_user(user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    Ok(response::ok(
        "Current user fetched successfully",
        user.0.public(),
    ))
}
