//! 参与者注册与通用查找
//!
//! 所有懒创建参与者的入口都经过 [`resolve_or_create`]，
//! 其余函数把"记录不存在"统一转换为 `NotFound` 领域错误。

use tracing::info;

use crate::errors::{ReviewSystemError, Result};
use crate::models::{
    assignments::entities::Assignment,
    participants::entities::{Participant, ParticipantDefaults},
    response_maps::entities::{MappingKind, ResponseMap},
    teams::entities::Team,
};
use crate::storage::Storage;

/// 查找或按默认能力集创建参与者
pub async fn resolve_or_create(
    storage: &dyn Storage,
    assignment_id: i64,
    user_id: i64,
    defaults: &ParticipantDefaults,
) -> Result<Participant> {
    if storage.get_user_by_id(user_id).await?.is_none() {
        return Err(ReviewSystemError::not_found(format!(
            "User {user_id} does not exist."
        )));
    }

    let (participant, created) = storage
        .find_or_create_participant(assignment_id, user_id, defaults)
        .await?;

    if created {
        info!(
            "Created participant {} for user {} in assignment {}",
            participant.id, user_id, assignment_id
        );
    }

    Ok(participant)
}

pub async fn require_assignment(storage: &dyn Storage, id: i64) -> Result<Assignment> {
    storage
        .get_assignment_by_id(id)
        .await?
        .ok_or_else(|| ReviewSystemError::not_found(format!("Assignment {id} does not exist.")))
}

pub async fn require_team(storage: &dyn Storage, id: i64) -> Result<Team> {
    storage
        .get_team_by_id(id)
        .await?
        .ok_or_else(|| ReviewSystemError::not_found(format!("Team {id} does not exist.")))
}

pub async fn require_mapping(storage: &dyn Storage, id: i64) -> Result<ResponseMap> {
    storage
        .get_mapping_by_id(id)
        .await?
        .ok_or_else(|| ReviewSystemError::not_found(format!("Mapping {id} does not exist.")))
}

pub async fn require_participant(storage: &dyn Storage, id: i64) -> Result<Participant> {
    storage
        .get_participant_by_id(id)
        .await?
        .ok_or_else(|| ReviewSystemError::not_found(format!("Participant {id} does not exist.")))
}

/// 参与者的展示名称
pub async fn participant_name(storage: &dyn Storage, participant_id: i64) -> Result<String> {
    let participant = require_participant(storage, participant_id).await?;
    let name = match storage.get_user_by_id(participant.user_id).await? {
        Some(user) => user.name().to_string(),
        None => participant
            .handle
            .unwrap_or_else(|| format!("participant {participant_id}")),
    };
    Ok(name)
}

/// 被评审对象的展示名称：团队映射取团队名，其余取参与者名
pub async fn reviewee_name(storage: &dyn Storage, mapping: &ResponseMap) -> Result<String> {
    match mapping.kind {
        MappingKind::Review
        | MappingKind::Calibration
        | MappingKind::SelfReview
        | MappingKind::Quiz => match storage.get_team_by_id(mapping.reviewee_id).await? {
            Some(team) => Ok(team.name),
            None => Ok(format!("team {}", mapping.reviewee_id)),
        },
        MappingKind::Metareview | MappingKind::TeammateReview | MappingKind::Feedback => {
            participant_name(storage, mapping.reviewee_id).await
        }
    }
}
