use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 问卷
//
// 测验问卷的 `instructor_id` 指向出题团队。
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "questionnaire.ts")]
pub struct Questionnaire {
    pub id: i64,
    pub name: String,
    pub questionnaire_type: String,
    pub instructor_id: i64,
}
