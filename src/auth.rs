use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tower_sessions::Session;

use crate::db::DatabasePool;
use crate::error::AppError;
use crate::models::LoginRequest;
use crate::portfolio::MemberCaps;

const SESSION_KEY: &str = "SESSION";

/// The member stored in the session after login.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SessionUser {
    pub username: String,
    pub is_club_head: bool,
}

/// SHA-256 hex digest of a password, matching what the users table stores.
pub fn hash_password(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Log a member in against the users table and store them in the session.
pub async fn login(
    session: Session,
    State(pool): State<DatabasePool>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionUser>, AppError> {
    let username = req.username.trim().to_string();
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "username and password are required".to_string(),
        ));
    }

    let user = {
        let conn = pool.0.lock().await;
        match conn.query_row(
            "SELECT username, is_club_head FROM users WHERE username = ?1 AND password_hash = ?2",
            rusqlite::params![username, hash_password(&req.password)],
            |row| {
                Ok(SessionUser {
                    username: row.get(0)?,
                    is_club_head: row.get::<_, i64>(1)? != 0,
                })
            },
        ) {
            Ok(user) => user,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                tracing::warn!("failed login attempt for '{}'", username);
                return Err(AppError::Unauthorized);
            }
            Err(e) => return Err(e.into()),
        }
    };

    session.insert(SESSION_KEY, user.clone()).await?;
    tracing::info!("{} logged in", user.username);
    Ok(Json(user))
}

pub async fn logout(session: Session) -> Result<StatusCode, AppError> {
    session.flush().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The logged-in member, for the frontend to display.
pub async fn current_user(session: Session) -> Result<Json<SessionUser>, AppError> {
    Ok(Json(require_member(&session).await?))
}

/// Pull the member out of the session, rejecting anonymous requests.
pub async fn require_member(session: &Session) -> Result<SessionUser, AppError> {
    let user: SessionUser = session.get(SESSION_KEY).await?.unwrap_or_default();
    if user.username.is_empty() {
        return Err(AppError::Unauthorized);
    }
    Ok(user)
}

/// Capability set for the session's member, handed to the portfolio
/// mutation entry points.
pub async fn member_caps(session: &Session) -> Result<MemberCaps, AppError> {
    let user = require_member(session).await?;
    Ok(MemberCaps {
        can_mutate_portfolio: user.is_club_head,
    })
}
