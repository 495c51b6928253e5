use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::IntoResponse,
    Extension,
};
use axum_macros::debug_handler;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    config::AppState,
    db::DB,
    models::{NewUser, Role, User},
    response::{ResponseError, ResponseResult},
    validation::{FieldError, Validate, ValidJson, Validator},
};

pub const SESSION_COOKIE: &str = "bachub_session";

#[derive(Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize,       // Expiry time of the token
    pub iat: usize,       // Issued at time of the token
    pub id: i64,          // Id of the user the token was issued to
    pub username: String, // Username associated with the token
}

#[derive(Deserialize, ToSchema)]
pub struct SignInBody {
    pub username: String,
    pub password: String,
}

impl Validate for SignInBody {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .non_empty("username", &self.username)
            .non_empty("password", &self.password)
            .finish()
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub user: User,
    pub access_token: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
}

impl Validate for RegisterBody {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .min_len("username", self.username.trim(), 3)
            .min_len("password", &self.password, 6)
            .email("email", &self.email)
            .non_empty("fullName", &self.full_name)
            .finish()
    }
}

pub fn encode_jwt(
    id: i64,
    username: String,
    jwt_secret: &str,
    jwt_expire: i64,
) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let exp: usize = (now + Duration::hours(jwt_expire)).timestamp() as usize;
    let iat: usize = now.timestamp() as usize;
    let claim = Claims {
        iat,
        exp,
        id,
        username,
    };

    encode(
        &Header::default(),
        &claim,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
}

pub fn decode_jwt(jwt_token: &str, jwt_secret: &str) -> jsonwebtoken::errors::Result<TokenData<Claims>> {
    decode(
        jwt_token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
}

/// Salted bcrypt hash, computed on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("password hashing task failed")?
        .context("failed to hash password")
}

pub async fn verify_password(password: String, hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .context("password verification task failed")?
        .context("failed to verify password")
}

/// Session token from an `Authorization: Bearer` header, else from the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
}

pub fn session_cookie(token: &str, expire_hours: i64) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        expire_hours * 3600
    )
}

pub fn clear_session_cookie() -> String {
    format!("{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Resolves the caller from the session token. A missing, expired or
/// forged token, or one whose user is gone, yields `None`.
async fn session_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, ResponseError> {
    let token = match session_token(headers) {
        Some(token) => token,
        None => return Ok(None),
    };

    let token_data = match decode_jwt(&token, &state.config.jwt_secret) {
        Ok(data) => data,
        Err(err) => {
            log::debug!("rejected session token: {}", err);
            return Ok(None);
        }
    };

    Ok(state.db.get_user(token_data.claims.id).await?)
}

fn issue_session(state: &AppState, user: &User) -> Result<(String, String), ResponseError> {
    let token = encode_jwt(
        user.id,
        user.username.clone(),
        &state.config.jwt_secret,
        state.config.jwt_expire_hours,
    )
    .map_err(|err| {
        log::error!("failed to encode session token: {}", err);
        ResponseError::InternalServerError
    })?;
    let cookie = session_cookie(&token, state.config.jwt_expire_hours);

    Ok((token, cookie))
}

/// Rejects anonymous callers with 401 and hands the [`User`] to the handler.
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> impl IntoResponse {
    let current_user = match session_user(&state, req.headers()).await? {
        Some(user) => user,
        None => {
            return Err(ResponseError::Unauthorized(
                "Not authenticated".to_string(),
            ))
        }
    };

    req.extensions_mut().insert(current_user);
    Ok(next.run(req).await)
}

/// Like [`authorize`] but lets anonymous callers through without a user.
pub async fn identify(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> impl IntoResponse {
    if let Some(user) = session_user(&state, req.headers()).await? {
        req.extensions_mut().insert(user);
    }

    Ok::<_, ResponseError>(next.run(req).await)
}

/// Must run after [`authorize`].
pub async fn require_admin(req: Request, next: Next) -> impl IntoResponse {
    let is_admin = req.extensions().get::<User>().map(User::is_admin);
    match is_admin {
        Some(true) => Ok(next.run(req).await),
        Some(false) => Err(ResponseError::Forbidden(
            "Admin access required".to_string(),
        )),
        None => Err(ResponseError::Unauthorized(
            "Not authenticated".to_string(),
        )),
    }
}

#[utoipa::path(
    post,
    path = "/api/register",
    tag = "Authentication",
    request_body = RegisterBody,
    responses(
        (status = 201, description = "Account created and signed in", body = User),
        (status = 400, description = "Invalid input or username/email taken", body = crate::response::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::response::ErrorBody),
    )
)]
#[debug_handler]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(body): ValidJson<RegisterBody>,
) -> Result<ResponseResult, ResponseError> {
    let username = body.username.trim().to_string();

    if state.db.get_user_by_username(&username).await?.is_some() {
        return Err(ResponseError::BadRequest(
            "Username already exists".to_string(),
        ));
    }
    if state.db.get_user_by_email(&body.email).await?.is_some() {
        return Err(ResponseError::BadRequest("Email already exists".to_string()));
    }

    let password = hash_password(body.password, state.config.bcrypt_cost())
        .await
        .map_err(|err| {
            log::error!("{:#}", err);
            ResponseError::InternalServerError
        })?;

    let user = state
        .db
        .create_user(NewUser {
            username,
            password,
            email: body.email,
            full_name: body.full_name,
            role: Role::User,
        })
        .await?;

    log::info!("registered user '{}'", user.username);
    let (_, cookie) = issue_session(&state, &user)?;
    Ok(ResponseResult::Registered(user, cookie))
}

#[utoipa::path(
    post,
    path = "/api/login",
    tag = "Authentication",
    request_body = SignInBody,
    responses(
        (status = 200, description = "User signed in successfully", body = SignInResponse),
        (status = 401, description = "Wrong username or password", body = crate::response::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::response::ErrorBody),
    )
)]
#[debug_handler]
pub async fn sign_in_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(body): ValidJson<SignInBody>,
) -> Result<ResponseResult, ResponseError> {
    let user = match state.db.get_user_by_username(body.username.trim()).await? {
        Some(user) => user,
        None => {
            return Err(ResponseError::Unauthorized(
                "Invalid username or password".to_string(),
            ));
        }
    };

    let valid = verify_password(body.password, user.password.clone())
        .await
        .map_err(|err| {
            log::error!("{:#}", err);
            ResponseError::InternalServerError
        })?;
    if !valid {
        return Err(ResponseError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let (access_token, cookie) = issue_session(&state, &user)?;
    Ok(ResponseResult::SignedIn(
        SignInResponse { user, access_token },
        cookie,
    ))
}

#[utoipa::path(
    post,
    path = "/api/logout",
    tag = "Authentication",
    responses(
        (status = 200, description = "Session cookie cleared", body = crate::response::MessageResponse),
    )
)]
#[debug_handler]
pub async fn sign_out_handler() -> ResponseResult {
    ResponseResult::SignedOut(clear_session_cookie())
}

#[utoipa::path(
    get,
    path = "/api/user",
    tag = "Authentication",
    responses(
        (status = 200, description = "The signed in user", body = User),
        (status = 401, description = "Not authenticated", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn current_user_handler(Extension(user): Extension<User>) -> axum::Json<User> {
    axum::Json(user)
}
