//! Completed-booking history for customers.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use sparkure_core::{Page, ServiceType};

use crate::db::cleanings::CleaningFilter;
use crate::error::{AppError, Result};
use crate::middleware::RequireCustomer;
use crate::models::timestamp;
use crate::services::CleaningService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub service_type: Option<ServiceType>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl HistoryQuery {
    fn filter(&self) -> Result<CleaningFilter> {
        let date = |name: &str, raw: Option<&String>| {
            raw.filter(|s| !s.trim().is_empty())
                .map(|s| {
                    timestamp::parse(s)
                        .ok_or_else(|| AppError::BadRequest(format!("{name} must be a date")))
                })
                .transpose()
        };

        Ok(CleaningFilter {
            service_type: self.service_type,
            date_from: date("dateFrom", self.date_from.as_ref())?,
            date_to: date("dateTo", self.date_to.as_ref())?,
            ..CleaningFilter::default()
        })
    }
}

/// GET /api/history
pub async fn index(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>> {
    let filter = query.filter()?;
    let page = Page::new(query.limit, query.offset);
    let (cleanings, info, summary) = CleaningService::new(state.pool())
        .history(user.id, filter, page)
        .await?;

    Ok(Json(json!({
        "cleanings": cleanings,
        "totalCount": info.total_count,
        "hasMore": info.has_more,
        "summary": summary,
    })))
}
