use serde::Serialize;
use ts_rs::TS;

use crate::models::{
    assignments::entities::Assignment, participants::entities::Participant,
    response_maps::entities::ResponseMap, teams::entities::Team,
};

// 提示消息类别
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "review_mapping.ts")]
pub enum FlashKind {
    Success,
    Error,
    Note,
}

// 提示消息
#[derive(Debug, Clone, Serialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Note,
            message: message.into(),
        }
    }
}

// 操作结果：提示消息 + 跳转目标
#[derive(Debug, Clone, Serialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct Navigation {
    pub redirect_to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_id: Option<i64>,
}

impl Navigation {
    pub fn to(redirect_to: impl Into<String>) -> Self {
        Self {
            redirect_to: redirect_to.into(),
            flash: None,
            mapping_id: None,
        }
    }

    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flash = Some(flash);
        self
    }

    pub fn with_mapping(mut self, mapping_id: i64) -> Self {
        self.mapping_id = Some(mapping_id);
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self.flash,
            Some(Flash {
                kind: FlashKind::Error,
                ..
            })
        )
    }

    /// 提示消息文本，无提示时为空串
    pub fn message(&self) -> &str {
        self.flash.as_ref().map(|f| f.message.as_str()).unwrap_or("")
    }
}

// 映射列表中的一条映射
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct MappingEntry {
    pub mapping: ResponseMap,
    pub reviewer_name: String,
}

// 一条评审映射及其元评审
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct ReviewMappingEntry {
    pub mapping: ResponseMap,
    pub reviewer_name: String,
    pub metareviews: Vec<MappingEntry>,
}

// 一个团队收到的全部评审
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct TeamMappings {
    pub team: Team,
    pub reviews: Vec<ReviewMappingEntry>,
}

// 映射列表
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct MappingListResponse {
    pub assignment: Assignment,
    pub teams: Vec<TeamMappings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
}

// 选中的被评审团队
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct SelectedContributor {
    pub contributor: Team,
}

// 选中的评审映射
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "review_mapping.ts")]
pub struct SelectedMapping {
    pub mapping: ResponseMap,
    pub reviewer: Participant,
}
