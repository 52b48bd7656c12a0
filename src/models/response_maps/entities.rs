use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 映射类型
//
// 所有类型共用同一张表与同一套唯一键、删除保护规则，仅创建时的默认值不同。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "response_map.ts")]
pub enum MappingKind {
    Review,
    Metareview,
    Calibration,
    SelfReview,
    TeammateReview,
    Feedback,
    Quiz,
}

impl MappingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingKind::Review => "review",
            MappingKind::Metareview => "metareview",
            MappingKind::Calibration => "calibration",
            MappingKind::SelfReview => "self_review",
            MappingKind::TeammateReview => "teammate_review",
            MappingKind::Feedback => "feedback",
            MappingKind::Quiz => "quiz",
        }
    }

    /// `reviewed_object_id` 指向另一条评审映射的类型
    pub fn reviews_a_mapping(&self) -> bool {
        matches!(self, MappingKind::Metareview | MappingKind::Feedback)
    }
}

impl std::fmt::Display for MappingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MappingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "review" => Ok(MappingKind::Review),
            "metareview" => Ok(MappingKind::Metareview),
            "calibration" => Ok(MappingKind::Calibration),
            "self_review" => Ok(MappingKind::SelfReview),
            "teammate_review" => Ok(MappingKind::TeammateReview),
            "feedback" => Ok(MappingKind::Feedback),
            "quiz" => Ok(MappingKind::Quiz),
            _ => Err(format!("Invalid mapping kind: {s}")),
        }
    }
}

// 评审映射：评审者参与者 -> 被评审对象
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "response_map.ts")]
pub struct ResponseMap {
    pub id: i64,
    pub assignment_id: i64,
    pub reviewed_object_id: i64,
    pub reviewer_id: i64,
    pub reviewee_id: i64,
    pub kind: MappingKind,
    pub calibrate_to: bool,
    pub course_staff: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ResponseMap {
    pub fn key(&self) -> MappingKey {
        MappingKey {
            reviewed_object_id: self.reviewed_object_id,
            reviewer_id: self.reviewer_id,
            reviewee_id: self.reviewee_id,
            kind: self.kind,
        }
    }
}

/// 映射唯一键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappingKey {
    pub reviewed_object_id: i64,
    pub reviewer_id: i64,
    pub reviewee_id: i64,
    pub kind: MappingKind,
}

impl MappingKey {
    pub fn new(
        kind: MappingKind,
        reviewed_object_id: i64,
        reviewer_id: i64,
        reviewee_id: i64,
    ) -> Self {
        Self {
            reviewed_object_id,
            reviewer_id,
            reviewee_id,
            kind,
        }
    }
}

/// 新映射的创建参数
#[derive(Debug, Clone)]
pub struct NewMapping {
    pub key: MappingKey,
    pub assignment_id: i64,
    pub course_staff: bool,
}

impl NewMapping {
    pub fn new(key: MappingKey, assignment_id: i64) -> Self {
        Self {
            key,
            assignment_id,
            course_staff: false,
        }
    }

    pub fn course_staff(mut self, course_staff: bool) -> Self {
        self.course_staff = course_staff;
        self
    }

    /// 校准映射总是带有 calibrate_to 标记
    pub fn calibrate_to(&self) -> bool {
        self.key.kind == MappingKind::Calibration
    }
}

/// 批量删除结果
///
/// `blocked` 为存在答卷的映射数量；强制删除时这些映射同样被删除，但仍计入 `blocked`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "response_map.ts")]
pub struct BatchDeleteReport {
    pub deleted: u64,
    pub blocked: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_text_round_trip() {
        for kind in [
            MappingKind::Review,
            MappingKind::Metareview,
            MappingKind::Calibration,
            MappingKind::SelfReview,
            MappingKind::TeammateReview,
            MappingKind::Feedback,
            MappingKind::Quiz,
        ] {
            assert_eq!(kind.as_str().parse::<MappingKind>().unwrap(), kind);
        }
        assert!("ReviewResponseMap".parse::<MappingKind>().is_err());
    }

    #[test]
    fn test_calibration_key_differs_from_review_key() {
        let review = MappingKey::new(MappingKind::Review, 1, 2, 3);
        let calibration = MappingKey::new(MappingKind::Calibration, 1, 2, 3);
        assert_ne!(review, calibration);
        assert!(NewMapping::new(calibration, 1).calibrate_to());
        assert!(!NewMapping::new(review, 1).calibrate_to());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&MappingKind::TeammateReview).unwrap();
        assert_eq!(json, "\"teammate_review\"");
    }
}
