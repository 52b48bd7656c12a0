use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 教师给评审者的成绩与评语
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "review_grade.ts")]
pub struct ReviewGrade {
    pub id: i64,
    pub participant_id: i64,
    pub grade_for_reviewer: Option<i32>,
    pub comment_for_reviewer: Option<String>,
    pub review_graded_at: chrono::DateTime<chrono::Utc>,
    pub reviewer_id_who_graded: i64,
}
