use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 作业实体（本服务只读）
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "assignment.ts")]
pub struct Assignment {
    pub id: i64,
    pub name: String,
    pub course_id: Option<i64>,
    pub has_topics: bool,
    pub can_choose_topic_to_review: bool,
    pub varying_rubrics_by_round: bool,
    pub max_team_size: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Assignment {
    /// 是否为个人作业（每个团队只有一名成员）
    pub fn is_individual(&self) -> bool {
        self.max_team_size <= 1
    }
}

// 选题
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "assignment.ts")]
pub struct SignUpTopic {
    pub id: i64,
    pub assignment_id: i64,
    pub topic_name: String,
    pub max_choosers: i32,
}
