//! History aggregation: one user's stored rounds shaped for the dashboard.
//!
//! Sorting happens here, never in the store: the session list is newest first,
//! the chart series oldest first. Rounds without a timestamp sort last in the
//! list and never appear on the chart.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::interview::notice::Notice;
use crate::models::interview::InterviewRow;
use crate::models::user::User;
use crate::store::InterviewStore;

const CHART_DATE_FORMAT: &str = "%b %-d";
const TABLE_DATE_FORMAT: &str = "%b %-d, %Y";
const UNKNOWN_DATE: &str = "Unknown date";
const MISSING_SCORE: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: String,
    pub timestamp: DateTime<Utc>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryTableRow {
    pub id: Uuid,
    pub date: String,
    pub interview_type: String,
    pub session_name: String,
    pub question: String,
    pub score: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryReport {
    pub status: HistoryStatus,
    pub sessions: Vec<InterviewRow>,
    pub chart: Vec<ChartPoint>,
    pub table: Vec<HistoryTableRow>,
    pub notice: Option<Notice>,
}

impl HistoryReport {
    fn failed() -> Self {
        Self {
            status: HistoryStatus::Error,
            sessions: Vec::new(),
            chart: Vec::new(),
            table: Vec::new(),
            notice: Some(Notice::history()),
        }
    }
}

#[derive(Clone)]
pub struct HistoryAggregator {
    store: Arc<dyn InterviewStore>,
}

impl HistoryAggregator {
    pub fn new(store: Arc<dyn InterviewStore>) -> Self {
        Self { store }
    }

    pub async fn load_history(&self, user: &User) -> HistoryReport {
        match self.store.list_for_user(&user.id).await {
            Ok(rows) => {
                let report = build_report(rows);
                info!(
                    "Loaded history for user {}: {} sessions, {} chart points",
                    user.id,
                    report.sessions.len(),
                    report.chart.len()
                );
                report
            }
            Err(e) => {
                warn!("History load failed for user {}: {e}", user.id);
                HistoryReport::failed()
            }
        }
    }
}

/// Shapes raw rows into the report. Input order does not matter.
pub fn build_report(mut rows: Vec<InterviewRow>) -> HistoryReport {
    rows.sort_by(|a, b| newest_first(a.created_at, b.created_at));

    let mut chart: Vec<ChartPoint> = rows
        .iter()
        .filter_map(|row| {
            let timestamp = row.created_at?;
            let score = row.overall_score()?;
            Some(ChartPoint {
                date: timestamp.format(CHART_DATE_FORMAT).to_string(),
                timestamp,
                score,
            })
        })
        .collect();
    chart.sort_by_key(|p| p.timestamp);

    let table = rows.iter().map(table_row).collect();

    HistoryReport {
        status: HistoryStatus::Ok,
        sessions: rows,
        chart,
        table,
        notice: None,
    }
}

fn newest_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn table_row(row: &InterviewRow) -> HistoryTableRow {
    HistoryTableRow {
        id: row.id,
        date: row
            .created_at
            .map(|t| t.format(TABLE_DATE_FORMAT).to_string())
            .unwrap_or_else(|| UNKNOWN_DATE.to_string()),
        interview_type: row.interview_type.clone(),
        session_name: row.session_name.clone(),
        question: row.question.clone(),
        score: row
            .overall_score()
            .map(|s| s.to_string())
            .unwrap_or_else(|| MISSING_SCORE.to_string()),
    }
}
