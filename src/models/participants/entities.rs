use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 作业参与者
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "participant.ts")]
pub struct Participant {
    pub id: i64,
    pub assignment_id: i64,
    pub user_id: i64,
    pub handle: Option<String>,
    pub can_submit: bool,
    pub can_review: bool,
    pub can_take_quiz: bool,
    pub topic_id: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// 懒创建参与者时使用的默认能力集
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantDefaults {
    pub can_submit: bool,
    pub can_review: bool,
    pub can_take_quiz: bool,
    pub handle: String,
}

impl ParticipantDefaults {
    /// 提交、评审、测验全部开放
    pub fn full(handle: impl Into<String>) -> Self {
        Self {
            can_submit: true,
            can_review: true,
            can_take_quiz: true,
            handle: handle.into(),
        }
    }

    /// 教师以评审者身份加入时只开放评审
    pub fn instructor_reviewer(handle: impl Into<String>) -> Self {
        Self {
            can_submit: false,
            can_review: true,
            can_take_quiz: false,
            handle: handle.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capability_sets() {
        let full = ParticipantDefaults::full("handle");
        assert!(full.can_submit && full.can_review && full.can_take_quiz);
        assert_eq!(full.handle, "handle");

        let instructor = ParticipantDefaults::instructor_reviewer("handle");
        assert!(!instructor.can_submit);
        assert!(instructor.can_review);
        assert!(!instructor.can_take_quiz);
    }
}
