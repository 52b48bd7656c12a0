use serde::Deserialize;
use ts_rs::TS;

// 保存评审者成绩请求
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "review_grade.ts")]
pub struct SaveReviewGradeRequest {
    pub assignment_id: i64,
    pub participant_id: i64,
    pub grade_for_reviewer: Option<i32>,
    pub comment_for_reviewer: Option<String>,
}
