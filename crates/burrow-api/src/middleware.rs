use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{SecondsFormat, Utc};
use tracing::warn;

use burrow_types::viewer::{Identity, Viewer};

use crate::AppState;

pub const SESSION_COOKIE: &str = "session_id";

/// Resolve the session cookie to a `Viewer` and attach it to the request.
/// This runs for every request; any miss (no cookie, unknown token, expired
/// token) is a normal `Anonymous` outcome, never a response error.
pub async fn with_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let viewer = match jar.get(SESSION_COOKIE) {
        Some(cookie) => resolve(&state, cookie.value().to_string()).await,
        None => Viewer::Anonymous,
    };

    req.extensions_mut().insert(viewer);
    next.run(req).await
}

async fn resolve(state: &AppState, token: String) -> Viewer {
    let db = state.clone();
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    // Pure read joining sessions+users; expired rows are filtered, not
    // deleted.
    let looked_up =
        tokio::task::spawn_blocking(move || db.db.resolve_session(&token, &now)).await;

    match looked_up {
        Ok(Ok(Some((user_id, username)))) => match user_id.parse() {
            Ok(user_id) => Viewer::User(Identity { user_id, username }),
            Err(e) => {
                warn!("corrupt user id on session lookup: {}", e);
                Viewer::Anonymous
            }
        },
        Ok(Ok(None)) => Viewer::Anonymous,
        // A storage fault on this read path degrades to Anonymous rather
        // than failing the request.
        Ok(Err(e)) => {
            warn!("session lookup failed: {:#}", e);
            Viewer::Anonymous
        }
        Err(e) => {
            warn!("session lookup task failed: {}", e);
            Viewer::Anonymous
        }
    }
}
