//! Club social features: announcements, meeting recaps, notices. Listings
//! are public; posting needs the club-head flag on the session.

use axum::{extract::State, http::StatusCode, Json};
use rusqlite::Connection;
use tower_sessions::Session;

use crate::auth::{self, SessionUser};
use crate::db::DatabasePool;
use crate::error::AppError;
use crate::models::{Announcement, Notice, PostContentRequest, PostRecapRequest, Recap};

async fn require_club_head(session: &Session) -> Result<SessionUser, AppError> {
    let user = auth::require_member(session).await?;
    if !user.is_club_head {
        return Err(AppError::Forbidden(
            "only club heads can post".to_string(),
        ));
    }
    Ok(user)
}

fn now_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// The latest announcements, newest first. Also used by the dashboard.
pub fn recent_announcements(conn: &Connection, limit: i64) -> Result<Vec<Announcement>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, content, posted_by, posted_at FROM announcements
         ORDER BY posted_at DESC, id DESC LIMIT ?1",
    )?;
    let announcements = stmt
        .query_map([limit], |row| {
            Ok(Announcement {
                id: row.get(0)?,
                content: row.get(1)?,
                posted_by: row.get(2)?,
                posted_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(announcements)
}

pub async fn list_announcements(
    State(pool): State<DatabasePool>,
) -> Result<Json<Vec<Announcement>>, AppError> {
    let conn = pool.0.lock().await;
    Ok(Json(recent_announcements(&conn, -1)?))
}

pub async fn post_announcement(
    State(pool): State<DatabasePool>,
    session: Session,
    Json(req): Json<PostContentRequest>,
) -> Result<StatusCode, AppError> {
    let user = require_club_head(&session).await?;
    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("content is required".to_string()));
    }

    let conn = pool.0.lock().await;
    conn.execute(
        "INSERT INTO announcements (content, posted_by, posted_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![content, user.username, now_stamp()],
    )?;
    Ok(StatusCode::CREATED)
}

pub async fn list_recaps(State(pool): State<DatabasePool>) -> Result<Json<Vec<Recap>>, AppError> {
    let conn = pool.0.lock().await;
    let mut stmt = conn.prepare(
        "SELECT id, title, content, posted_by, posted_at FROM recaps
         ORDER BY posted_at DESC, id DESC",
    )?;
    let recaps = stmt
        .query_map([], |row| {
            Ok(Recap {
                id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
                posted_by: row.get(3)?,
                posted_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(recaps))
}

pub async fn post_recap(
    State(pool): State<DatabasePool>,
    session: Session,
    Json(req): Json<PostRecapRequest>,
) -> Result<StatusCode, AppError> {
    let user = require_club_head(&session).await?;
    let title = req.title.trim();
    let content = req.content.trim();
    if title.is_empty() || content.is_empty() {
        return Err(AppError::Validation(
            "title and content are required".to_string(),
        ));
    }

    let conn = pool.0.lock().await;
    conn.execute(
        "INSERT INTO recaps (title, content, posted_by, posted_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![title, content, user.username, now_stamp()],
    )?;
    Ok(StatusCode::CREATED)
}

pub async fn list_notices(State(pool): State<DatabasePool>) -> Result<Json<Vec<Notice>>, AppError> {
    let conn = pool.0.lock().await;
    let mut stmt = conn.prepare(
        "SELECT id, content, posted_by, posted_at FROM notices
         ORDER BY posted_at DESC, id DESC",
    )?;
    let notices = stmt
        .query_map([], |row| {
            Ok(Notice {
                id: row.get(0)?,
                content: row.get(1)?,
                posted_by: row.get(2)?,
                posted_at: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(notices))
}

pub async fn post_notice(
    State(pool): State<DatabasePool>,
    session: Session,
    Json(req): Json<PostContentRequest>,
) -> Result<StatusCode, AppError> {
    let user = require_club_head(&session).await?;
    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("content is required".to_string()));
    }

    let conn = pool.0.lock().await;
    conn.execute(
        "INSERT INTO notices (content, posted_by, posted_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![content, user.username, now_stamp()],
    )?;
    Ok(StatusCode::CREATED)
}
