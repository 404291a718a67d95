use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, SecondsFormat, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use burrow_types::api::{LoginForm, SignupForm};

use crate::AppState;
use crate::error::ApiError;
use crate::middleware::SESSION_COOKIE;

const SESSION_TTL_DAYS: i64 = 30;

pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<Redirect, ApiError> {
    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();
    let password = form.password;

    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::Validation("all fields are required".into()));
    }
    if !email.contains('@') || !email.contains('.') {
        return Err(ApiError::Validation("invalid email address".into()));
    }

    let user_id = Uuid::new_v4();
    let logged_name = username.clone();

    // Existence check, Argon2id hash, and insert all run off the async
    // runtime; the plaintext password never leaves this closure.
    let created = tokio::task::spawn_blocking(move || -> Result<bool, ApiError> {
        if state
            .db
            .identity_taken(&username, &email)
            .map_err(ApiError::Storage)?
        {
            return Ok(false);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| ApiError::Storage(anyhow!("password hash failed: {e}")))?
            .to_string();

        state
            .db
            .create_user(&user_id.to_string(), &username, &email, &password_hash)
            .map_err(ApiError::Storage)?;
        Ok(true)
    })
    .await
    .map_err(ApiError::join)??;

    if !created {
        // One generic message whichever field collided.
        return Err(ApiError::Conflict("email or username already in use".into()));
    }

    info!("user {} registered", logged_name);
    Ok(Redirect::to("/login"))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let email = form.email.trim().to_string();
    let password = form.password;

    let db = state.clone();
    let lookup_email = email.clone();
    let verified = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<String>> {
        let Some(user) = db.db.get_user_by_email(&lookup_email)? else {
            return Ok(None);
        };

        let parsed_hash =
            PasswordHash::new(&user.password).map_err(|e| anyhow!("stored hash unreadable: {e}"))?;

        // Constant-time comparison inside argon2's verifier.
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Ok(None);
        }

        Ok(Some(user.id))
    })
    .await
    .map_err(ApiError::join)?
    .map_err(ApiError::Storage)?;

    let Some(user_id) = verified else {
        // Unknown email and wrong password produce the identical response,
        // and the form re-render carries no status-code signal.
        debug!("login rejected for {}", email);
        return Ok((StatusCode::OK, "Invalid credentials").into_response());
    };

    let token = Uuid::new_v4().to_string();
    let expires_at =
        (Utc::now() + Duration::days(SESSION_TTL_DAYS)).to_rfc3339_opts(SecondsFormat::Secs, true);

    let db = state.clone();
    let session_token = token.clone();
    tokio::task::spawn_blocking(move || db.db.create_session(&session_token, &user_id, &expires_at))
        .await
        .map_err(ApiError::join)?
        .map_err(ApiError::Storage)?;

    Ok((jar.add(session_cookie(token)), Redirect::to("/")).into_response())
}

/// Logout always succeeds: the session row goes away if it exists, the
/// cookie is cleared either way.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let token = cookie.value().to_string();
        let db = state.clone();
        let revoked = tokio::task::spawn_blocking(move || db.db.delete_session(&token)).await;

        match revoked {
            Ok(Err(e)) => warn!("session revoke failed: {:#}", e),
            Err(e) => warn!("session revoke task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }

    let removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    (jar.remove(removal), Redirect::to("/"))
}

/// HttpOnly, Path=/, SameSite=Lax. No Secure flag: transport posture is
/// left to the deployment.
fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}
