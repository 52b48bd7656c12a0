use tracing::info;

use super::{
    recover,
    registry::{require_assignment, require_team, resolve_or_create},
};
use crate::config::ReviewConfig;
use crate::errors::Result;
use crate::models::{
    participants::entities::ParticipantDefaults,
    response_maps::entities::{MappingKey, MappingKind, NewMapping},
    review_mapping::responses::Navigation,
};
use crate::storage::Storage;
use crate::utils::url;

/// 教师为团队添加校准评审
pub async fn add_calibration(
    storage: &dyn Storage,
    config: &ReviewConfig,
    assignment_id: i64,
    team_id: i64,
    current_user_id: i64,
) -> Result<Navigation> {
    let result =
        create_calibration_mapping(storage, config, assignment_id, team_id, current_user_id).await;
    recover(result, || url::list_mappings(assignment_id))
}

async fn create_calibration_mapping(
    storage: &dyn Storage,
    config: &ReviewConfig,
    assignment_id: i64,
    team_id: i64,
    current_user_id: i64,
) -> Result<Navigation> {
    let assignment = require_assignment(storage, assignment_id).await?;
    let team = require_team(storage, team_id).await?;
    let participant = resolve_or_create(
        storage,
        assignment.id,
        current_user_id,
        &ParticipantDefaults::full(&config.default_handle),
    )
    .await?;

    let key = MappingKey::new(MappingKind::Calibration, assignment.id, participant.id, team.id);
    let (mapping, created) = storage
        .find_or_create_mapping(&NewMapping::new(key, assignment.id).course_staff(true))
        .await?;
    if created {
        info!(
            "Created calibration mapping {} for team {} in assignment {}",
            mapping.id, team.id, assignment.id
        );
    }

    Ok(
        Navigation::to(url::new_calibration_response(assignment.id, mapping.id))
            .with_mapping(mapping.id),
    )
}

/// 教师以评审者身份评审某个团队
pub async fn add_instructor_as_reviewer(
    storage: &dyn Storage,
    config: &ReviewConfig,
    assignment_id: i64,
    team_id: i64,
    current_user_id: i64,
) -> Result<Navigation> {
    let result =
        create_instructor_mapping(storage, config, assignment_id, team_id, current_user_id).await;
    recover(result, || url::list_mappings(assignment_id))
}

async fn create_instructor_mapping(
    storage: &dyn Storage,
    config: &ReviewConfig,
    assignment_id: i64,
    team_id: i64,
    current_user_id: i64,
) -> Result<Navigation> {
    let assignment = require_assignment(storage, assignment_id).await?;
    let team = require_team(storage, team_id).await?;
    let reviewer = resolve_or_create(
        storage,
        assignment.id,
        current_user_id,
        &ParticipantDefaults::instructor_reviewer(&config.default_handle),
    )
    .await?;

    let key = MappingKey::new(MappingKind::Review, assignment.id, reviewer.id, team.id);
    let (mapping, created) = storage
        .find_or_create_mapping(&NewMapping::new(key, assignment.id).course_staff(true))
        .await?;
    if created {
        info!(
            "Instructor participant {} assigned to review team {}",
            reviewer.id, team.id
        );
    }

    Ok(Navigation::to(url::new_response(mapping.id)).with_mapping(mapping.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::response_maps::requests::MappingQuery;
    use crate::storage::test_support::test_db;

    #[tokio::test]
    async fn test_add_calibration_creates_participant_and_mapping() {
        let t = test_db().await;
        let instructor = t.user_with_role("instructor6", "instructor").await;
        let assignment = t.assignment("calibrated").await;
        let team = t.team(assignment.id, "team1", &[]).await;
        let config = ReviewConfig::default();

        let nav = add_calibration(
            t.storage.as_ref(),
            &config,
            assignment.id,
            team.id,
            instructor.id,
        )
        .await
        .unwrap();

        let participant = t
            .storage
            .get_participant_by_user(assignment.id, instructor.id)
            .await
            .unwrap()
            .unwrap();
        assert!(participant.can_submit && participant.can_review && participant.can_take_quiz);

        let mappings = t
            .storage
            .list_mappings(
                &MappingQuery::of_kind(MappingKind::Calibration).assignment(assignment.id),
            )
            .await
            .unwrap();
        assert_eq!(mappings.len(), 1);
        assert!(mappings[0].calibrate_to);
        assert!(mappings[0].course_staff);
        assert_eq!(mappings[0].reviewee_id, team.id);

        assert_eq!(nav.mapping_id, Some(mappings[0].id));
        assert_eq!(
            nav.redirect_to,
            format!(
                "/response/new?assignment_id={}&id={}&return=assignment_edit",
                assignment.id, mappings[0].id
            )
        );
    }

    #[tokio::test]
    async fn test_add_calibration_reuses_existing_mapping() {
        let t = test_db().await;
        let instructor = t.user_with_role("instructor6", "instructor").await;
        let assignment = t.assignment("calibrated").await;
        let team = t.team(assignment.id, "team1", &[]).await;
        let config = ReviewConfig::default();

        let first = add_calibration(
            t.storage.as_ref(),
            &config,
            assignment.id,
            team.id,
            instructor.id,
        )
        .await
        .unwrap();
        let second = add_calibration(
            t.storage.as_ref(),
            &config,
            assignment.id,
            team.id,
            instructor.id,
        )
        .await
        .unwrap();

        assert_eq!(first.mapping_id, second.mapping_id);
        assert_eq!(first.redirect_to, second.redirect_to);
    }

    #[tokio::test]
    async fn test_calibration_does_not_collide_with_review() {
        let t = test_db().await;
        let instructor = t.user_with_role("instructor6", "instructor").await;
        let assignment = t.assignment("calibrated").await;
        let team = t.team(assignment.id, "team1", &[]).await;
        let config = ReviewConfig::default();

        let review = add_instructor_as_reviewer(
            t.storage.as_ref(),
            &config,
            assignment.id,
            team.id,
            instructor.id,
        )
        .await
        .unwrap();
        let calibration =
            add_calibration(t.storage.as_ref(), &config, assignment.id, team.id, instructor.id)
                .await
                .unwrap();

        assert_ne!(review.mapping_id, calibration.mapping_id);
        assert_eq!(
            review.redirect_to,
            format!("/response/new?id={}", review.mapping_id.unwrap())
        );
    }

    #[tokio::test]
    async fn test_instructor_reviewer_capabilities() {
        let t = test_db().await;
        let instructor = t.user_with_role("instructor6", "instructor").await;
        let assignment = t.assignment("a").await;
        let team = t.team(assignment.id, "team1", &[]).await;

        add_instructor_as_reviewer(
            t.storage.as_ref(),
            &ReviewConfig::default(),
            assignment.id,
            team.id,
            instructor.id,
        )
        .await
        .unwrap();

        let participant = t
            .storage
            .get_participant_by_user(assignment.id, instructor.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!participant.can_submit);
        assert!(participant.can_review);
        assert!(!participant.can_take_quiz);
    }

    #[tokio::test]
    async fn test_missing_team_becomes_error_flash() {
        let t = test_db().await;
        let instructor = t.user_with_role("instructor6", "instructor").await;
        let assignment = t.assignment("a").await;

        let nav = add_calibration(
            t.storage.as_ref(),
            &ReviewConfig::default(),
            assignment.id,
            999,
            instructor.id,
        )
        .await
        .unwrap();

        assert!(nav.is_error());
        assert_eq!(nav.redirect_to, format!("/review_mapping/list_mappings?id={}", assignment.id));
    }
}
