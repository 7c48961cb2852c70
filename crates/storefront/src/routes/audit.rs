//! Audit log viewer (admin).

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::db::AuditRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{AuditLogEntry, AuditStats};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/audit", get(list))
        .route("/api/audit/stats", get(stats))
}

#[derive(Debug, Default, Deserialize)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Page {
    /// Clamp to `1..=500` rows and a non-negative offset.
    fn bounds(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[derive(Debug, Serialize)]
pub struct AuditPage {
    pub entries: Vec<AuditLogEntry>,
    pub limit: i64,
    pub offset: i64,
}

/// `GET /api/audit?limit=&offset=`
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Json<AuditPage>> {
    let (limit, offset) = page.bounds();
    let entries = AuditRepository::new(state.pool())
        .list(limit, offset)
        .await?;
    Ok(Json(AuditPage {
        entries,
        limit,
        offset,
    }))
}

/// `GET /api/audit/stats`: queue counters since startup.
pub async fn stats(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Json<AuditStats> {
    Json(state.audit().stats())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        assert_eq!(Page::default().bounds(), (DEFAULT_LIMIT, 0));
    }

    #[test]
    fn test_page_is_clamped() {
        let page = Page {
            limit: Some(10_000),
            offset: Some(-3),
        };
        assert_eq!(page.bounds(), (MAX_LIMIT, 0));

        let page = Page {
            limit: Some(0),
            offset: Some(20),
        };
        assert_eq!(page.bounds(), (1, 20));
    }
}
