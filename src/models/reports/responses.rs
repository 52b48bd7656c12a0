use serde::Serialize;
use ts_rs::TS;

use crate::models::{
    participants::entities::Participant, response_maps::entities::ResponseMap,
    responses::entities::Response, review_grades::entities::ReviewGrade,
};

// 评审者的一条评审
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "report.ts")]
pub struct ReviewerMappingRow {
    pub mapping: ResponseMap,
    pub reviewee_name: String,
    pub submitted_responses: u64,
}

// 单个评审者的评审汇总
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "report.ts")]
pub struct ReviewerReport {
    pub reviewer: Participant,
    pub reviewer_name: String,
    pub mappings: Vec<ReviewerMappingRow>,
    pub grade: Option<ReviewGrade>,
}

// 被评审团队的得分统计
#[derive(Debug, Clone, Serialize, PartialEq, TS)]
#[ts(export, export_to = "report.ts")]
pub struct RevieweeScore {
    pub reviewee_id: i64,
    pub reviewee_name: String,
    pub response_count: u64,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "report.ts")]
pub struct ReviewResponseReport {
    pub reviewers: Vec<ReviewerReport>,
    pub scores: Vec<RevieweeScore>,
}

// 按轮次分组的答卷
#[derive(Debug, Clone, Serialize, PartialEq, TS)]
#[ts(export, export_to = "report.ts")]
pub struct RoundResponses {
    pub round: i32,
    pub response_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "report.ts")]
pub struct FeedbackReport {
    pub reviewers: Vec<Participant>,
    pub response_ids: Vec<i64>,
    /// 仅在作业按轮次使用不同问卷时给出
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounds: Option<Vec<RoundResponses>>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "report.ts")]
pub struct TeammateReviewerRow {
    pub reviewer: Participant,
    pub reviewer_name: String,
    pub mappings: Vec<ResponseMap>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "report.ts")]
pub struct TeammateReport {
    pub reviewers: Vec<TeammateReviewerRow>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "report.ts")]
pub struct CalibrationEntry {
    pub mapping: ResponseMap,
    pub responses: Vec<Response>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "report.ts")]
pub struct CalibrationReport {
    pub participant: Participant,
    pub calibrations: Vec<CalibrationEntry>,
    pub student_responses: Vec<Response>,
}

// 报告结果
#[derive(Debug, Clone, Serialize, TS)]
#[serde(tag = "type", content = "data")]
#[ts(export, export_to = "report.ts")]
pub enum ResponseReport {
    ReviewResponseMap(ReviewResponseReport),
    FeedbackResponseMap(FeedbackReport),
    TeammateReviewResponseMap(TeammateReport),
    Calibration(CalibrationReport),
}
