use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 团队（被评审单位）
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "team.ts")]
pub struct Team {
    pub id: i64,
    pub assignment_id: i64,
    pub name: String,
    pub topic_id: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
