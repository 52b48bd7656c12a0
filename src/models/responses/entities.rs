use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 评审答卷，本服务只查询其存在性并可撤回提交
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "response.ts")]
pub struct Response {
    pub id: i64,
    pub map_id: i64,
    pub round: i32,
    pub is_submitted: bool,
    pub total_score: Option<f64>,
    pub additional_comment: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
