use serde::{Deserialize, Deserializer};
use ts_rs::TS;

// 表单中的勾选框可能以 "1"/"true"/"on" 等形式出现
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        None => false,
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(i)) => i != 0,
        Some(Flag::Text(s)) => matches!(s.as_str(), "1" | "true" | "on" | "yes"),
    })
}

// 添加校准评审
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct AddCalibrationRequest {
    pub assignment_id: i64,
    pub team_id: i64,
}

// 手动添加评审者
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct AddReviewerRequest {
    pub assignment_id: i64,
    pub topic_id: Option<i64>,
    pub contributor_id: i64,
    pub user_name: String,
}

// 将用户加入作业
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct AddUserToAssignmentRequest {
    /// 注册链接中以 `id` 传递
    #[serde(alias = "id")]
    pub assignment_id: i64,
    pub user_id: i64,
    pub contributor_id: Option<i64>,
}

// 添加元评审者
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct AddMetareviewerRequest {
    pub map_id: i64,
    pub user_name: String,
}

// 动态分配评审
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct AssignDynamicRequest {
    pub assignment_id: i64,
    /// 评审者的用户 ID
    pub reviewer_id: i64,
    pub topic_id: Option<i64>,
}

// 动态分配测验
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct AssignQuizRequest {
    pub assignment_id: i64,
    /// 答题者的参与者 ID
    pub participant_id: i64,
    pub questionnaire_id: i64,
}

// 动态分配元评审
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct AssignMetareviewerRequest {
    pub assignment_id: i64,
    /// 元评审者的用户 ID
    pub metareviewer_id: i64,
}

// 删除某团队尚未开始的评审
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct DeleteOutstandingReviewersRequest {
    pub assignment_id: i64,
    pub contributor_id: i64,
}

// 删除某评审映射下的全部元评审
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct DeleteAllMetareviewersQuery {
    pub id: i64,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub force: bool,
}

// 以教师身份评审
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct AddInstructorAsReviewerRequest {
    pub assignment_id: i64,
    pub team_id: i64,
}

// 映射列表查询
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct ListMappingsQuery {
    pub id: i64,
    pub msg: Option<String>,
}

// 自动分配配置
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct AutomaticMappingRequest {
    pub id: i64,
    #[serde(default)]
    pub max_team_size: i32,
    #[serde(default)]
    pub num_reviews_per_student: u32,
    #[serde(default)]
    pub num_reviews_per_submission: u32,
    #[serde(default)]
    pub num_calibrated_artifacts: u32,
    #[serde(default)]
    pub num_uncalibrated_artifacts: u32,
}

// 交错自动分配
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct StaggeredMappingRequest {
    pub id: i64,
    pub num_reviews: u32,
    #[serde(default)]
    pub num_metareviews: u32,
}

// 报告查询
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct ResponseReportQuery {
    pub id: i64,
    #[serde(rename = "type")]
    pub report_type: Option<String>,
    pub user: Option<String>,
}

// 开始自评
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct StartSelfReviewRequest {
    pub assignment_id: i64,
    /// 评审者的参与者 ID
    pub reviewer_id: i64,
    /// 评审者的用户 ID
    pub reviewer_userid: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_flag_forms() {
        let q: DeleteAllMetareviewersQuery =
            serde_urlencoded::from_str("force=1&id=4").unwrap();
        assert!(q.force);
        assert_eq!(q.id, 4);

        let q: DeleteAllMetareviewersQuery = serde_urlencoded::from_str("id=4").unwrap();
        assert!(!q.force);

        let q: DeleteAllMetareviewersQuery =
            serde_json::from_str(r#"{"id": 4, "force": true}"#).unwrap();
        assert!(q.force);
    }

    #[test]
    fn test_register_link_query() {
        let req: AddUserToAssignmentRequest =
            serde_urlencoded::from_str("contributor_id=3&id=1&user_id=7").unwrap();
        assert_eq!(req.assignment_id, 1);
        assert_eq!(req.contributor_id, Some(3));
        assert_eq!(req.user_id, 7);
    }

    #[test]
    fn test_automatic_mapping_defaults_to_zero() {
        let req: AutomaticMappingRequest = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert_eq!(req.num_reviews_per_student, 0);
        assert_eq!(req.num_reviews_per_submission, 0);
        assert_eq!(req.max_team_size, 0);
    }
}
