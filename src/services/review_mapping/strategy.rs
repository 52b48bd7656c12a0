//! 自动分配的策略选择

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{info, warn};

use super::{
    distribution::{Strategy, assign_reviewers_staggered, distribute_reviews},
    recover,
    registry::require_assignment,
};
use crate::errors::{ReviewSystemError, Result};
use crate::models::{
    participants::entities::Participant,
    response_maps::{entities::MappingKind, requests::MappingQuery},
    review_mapping::{
        requests::{AutomaticMappingRequest, StaggeredMappingRequest},
        responses::{Flash, Navigation},
    },
    teams::entities::Team,
};
use crate::storage::Storage;
use crate::utils::url;

/// 校准轮次：先为带校准作品的团队分配，再为其余团队分配，两轮均按每名学生计数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationPass {
    pub calibrated: u32,
    pub uncalibrated: u32,
}

/// 策略选择结果，校准轮次先于常规分配执行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyPlan {
    pub calibration: Option<CalibrationPass>,
    pub regular: Option<Strategy>,
}

pub fn select_strategy(
    config: &AutomaticMappingRequest,
    teams_count: usize,
) -> Result<StrategyPlan> {
    let calibration = (config.num_calibrated_artifacts > 0
        || config.num_uncalibrated_artifacts > 0)
        .then_some(CalibrationPass {
            calibrated: config.num_calibrated_artifacts,
            uncalibrated: config.num_uncalibrated_artifacts,
        });

    let per_student = config.num_reviews_per_student;
    let per_submission = config.num_reviews_per_submission;

    if per_student == 0 && per_submission == 0 {
        // 仅请求校准轮次时不做常规分配
        if calibration.is_some() {
            return Ok(StrategyPlan {
                calibration,
                regular: None,
            });
        }
        return Err(ReviewSystemError::invalid_configuration(
            "Please choose either the number of reviews per student or the number of reviewers per team (student).",
        ));
    }
    if per_student != 0 && per_submission != 0 {
        return Err(ReviewSystemError::invalid_configuration(
            "Please choose either the number of reviews per student or the number of reviewers per team (student), not both.",
        ));
    }
    if per_student as usize >= teams_count {
        return Err(ReviewSystemError::invalid_configuration(
            "You cannot set the number of reviews done by each student to be greater than or equal to total number of teams [or \"participants\" if it is an individual assignment].",
        ));
    }

    let regular = if per_student > 0 {
        Strategy::PerStudent(per_student)
    } else {
        Strategy::PerSubmission(per_submission)
    };
    Ok(StrategyPlan {
        calibration,
        regular: Some(regular),
    })
}

// 个人作业：为尚未组队的评审者各建一个单人团队
async fn create_individual_teams(
    storage: &dyn Storage,
    assignment_id: i64,
    participants: &[Participant],
) -> Result<Vec<Team>> {
    let mut teams = Vec::new();
    for participant in participants {
        if storage
            .get_team_for_user(assignment_id, participant.user_id)
            .await?
            .is_some()
        {
            continue;
        }
        let name = match storage.get_user_by_id(participant.user_id).await? {
            Some(user) => format!("{}_team", user.username),
            None => format!("participant_{}_team", participant.id),
        };
        let team = storage
            .create_team_with_member(assignment_id, &name, participant.user_id)
            .await?;
        info!(
            "Created individual team {} for participant {}",
            team.id, participant.id
        );
        teams.push(team);
    }
    Ok(teams)
}

/// 按配置自动分配评审者
pub async fn run_automatic_mapping(
    storage: &dyn Storage,
    request: AutomaticMappingRequest,
    rng: &mut impl Rng,
) -> Result<Navigation> {
    let assignment_id = request.id;
    let result = automatic_mapping(storage, request, rng).await;
    recover(result, || url::list_mappings(assignment_id))
}

async fn automatic_mapping(
    storage: &dyn Storage,
    request: AutomaticMappingRequest,
    rng: &mut impl Rng,
) -> Result<Navigation> {
    let assignment = require_assignment(storage, request.id).await?;
    let mut reviewers: Vec<Participant> = storage
        .list_participants(assignment.id)
        .await?
        .into_iter()
        .filter(|p| p.can_review)
        .collect();
    reviewers.shuffle(rng);

    let mut teams = storage.list_teams(assignment.id).await?;
    if teams.is_empty() && request.max_team_size == 1 {
        teams = create_individual_teams(storage, assignment.id, &reviewers).await?;
    }

    let plan = select_strategy(&request, teams.len())?;
    let mut created = 0;
    if let Some(pass) = plan.calibration {
        created +=
            run_calibration_pass(storage, assignment.id, &reviewers, &teams, pass, rng).await?;
    }
    if let Some(strategy) = plan.regular {
        created +=
            distribute_reviews(storage, assignment.id, &reviewers, &teams, strategy, rng).await?;
    }

    info!(
        "Automatic mapping for assignment {} created {} mappings",
        assignment.id, created
    );
    Ok(Navigation::to(url::list_mappings(assignment.id)))
}

// 带校准作品的团队即已有校准映射的被评审团队
async fn run_calibration_pass(
    storage: &dyn Storage,
    assignment_id: i64,
    reviewers: &[Participant],
    teams: &[Team],
    pass: CalibrationPass,
    rng: &mut impl Rng,
) -> Result<usize> {
    let calibrated_ids: HashSet<i64> = storage
        .list_mappings(&MappingQuery::of_kind(MappingKind::Calibration).assignment(assignment_id))
        .await?
        .into_iter()
        .map(|m| m.reviewee_id)
        .collect();
    let (with_calibration, without_calibration): (Vec<Team>, Vec<Team>) = teams
        .iter()
        .cloned()
        .partition(|team| calibrated_ids.contains(&team.id));

    let mut created = 0;
    if pass.calibrated > 0 {
        created += distribute_reviews(
            storage,
            assignment_id,
            reviewers,
            &with_calibration,
            Strategy::PerStudent(pass.calibrated),
            rng,
        )
        .await?;
    }
    if pass.uncalibrated > 0 {
        created += distribute_reviews(
            storage,
            assignment_id,
            reviewers,
            &without_calibration,
            Strategy::PerStudent(pass.uncalibrated),
            rng,
        )
        .await?;
    }
    Ok(created)
}

/// 轮转分配
pub async fn run_staggered_mapping(
    storage: &dyn Storage,
    request: StaggeredMappingRequest,
) -> Result<Navigation> {
    let assignment_id = request.id;
    let result = staggered_mapping(storage, request).await;
    recover(result, || url::list_mappings(assignment_id))
}

async fn staggered_mapping(
    storage: &dyn Storage,
    request: StaggeredMappingRequest,
) -> Result<Navigation> {
    let assignment = require_assignment(storage, request.id).await?;
    if request.num_reviews == 0 {
        warn!(
            "Staggered mapping for assignment {} requested with zero reviews",
            assignment.id
        );
        return Err(ReviewSystemError::invalid_configuration(
            "Please choose the number of reviews per student.",
        ));
    }

    let note = assign_reviewers_staggered(
        storage,
        assignment.id,
        request.num_reviews,
        request.num_metareviews,
    )
    .await?;
    Ok(Navigation::to(url::list_mappings(assignment.id)).with_flash(Flash::note(note)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::test_db;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn config(per_student: u32, per_submission: u32) -> AutomaticMappingRequest {
        AutomaticMappingRequest {
            id: 1,
            num_reviews_per_student: per_student,
            num_reviews_per_submission: per_submission,
            ..Default::default()
        }
    }

    #[test]
    fn test_select_strategy_decision_table() {
        let err = select_strategy(&config(0, 0), 5).unwrap_err();
        assert_eq!(
            err.message(),
            "Please choose either the number of reviews per student or the number of reviewers per team (student)."
        );

        let err = select_strategy(&config(1, 4), 0).unwrap_err();
        assert_eq!(err.code(), "E104");
        assert!(err.message().ends_with("not both."));

        assert_eq!(
            select_strategy(&config(1, 0), 5).unwrap().regular,
            Some(Strategy::PerStudent(1))
        );
        assert_eq!(
            select_strategy(&config(0, 3), 5).unwrap(),
            StrategyPlan {
                calibration: None,
                regular: Some(Strategy::PerSubmission(3)),
            }
        );
    }

    #[test]
    fn test_per_student_must_be_below_team_count() {
        let err = select_strategy(&config(3, 0), 3).unwrap_err();
        assert!(err.message().starts_with("You cannot set the number of reviews"));
    }

    #[test]
    fn test_calibration_pass_skips_zero_checks() {
        let mut request = config(0, 0);
        request.num_calibrated_artifacts = 1;
        assert_eq!(
            select_strategy(&request, 0).unwrap(),
            StrategyPlan {
                calibration: Some(CalibrationPass {
                    calibrated: 1,
                    uncalibrated: 0
                }),
                regular: None,
            }
        );
    }

    #[test]
    fn test_calibration_pass_keeps_regular_strategy() {
        let mut request = config(2, 0);
        request.num_calibrated_artifacts = 1;
        request.num_uncalibrated_artifacts = 1;
        let plan = select_strategy(&request, 4).unwrap();
        assert!(plan.calibration.is_some());
        assert_eq!(plan.regular, Some(Strategy::PerStudent(2)));

        let mut request = config(1, 4);
        request.num_calibrated_artifacts = 1;
        let err = select_strategy(&request, 4).unwrap_err();
        assert!(err.message().ends_with("not both."));
    }

    #[tokio::test]
    async fn test_automatic_mapping_zero_config_redirects_with_error() {
        let t = test_db().await;
        let assignment = t.assignment("auto").await;
        let mut rng = StdRng::seed_from_u64(3);

        let mut request = config(0, 0);
        request.id = assignment.id;
        let nav = run_automatic_mapping(t.storage.as_ref(), request, &mut rng)
            .await
            .unwrap();

        assert!(nav.is_error());
        assert_eq!(
            nav.redirect_to,
            format!("/review_mapping/list_mappings?id={}", assignment.id)
        );
    }

    #[tokio::test]
    async fn test_individual_assignment_creates_teams_before_selection() {
        let t = test_db().await;
        let assignment = t.assignment("solo").await;
        for i in 0..3 {
            let user = t.user(&format!("student{i}")).await;
            t.participant(assignment.id, user.id).await;
        }
        let mut rng = StdRng::seed_from_u64(3);

        let mut request = config(1, 4);
        request.id = assignment.id;
        request.max_team_size = 1;
        let nav = run_automatic_mapping(t.storage.as_ref(), request, &mut rng)
            .await
            .unwrap();

        assert!(nav.message().ends_with("not both."));
        assert_eq!(t.storage.list_teams(assignment.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_automatic_mapping_per_student() {
        let t = test_db().await;
        let assignment = t.assignment("auto").await;
        for i in 0..4 {
            let user = t.user(&format!("student{i}")).await;
            t.participant(assignment.id, user.id).await;
            t.team(assignment.id, &format!("team{i}"), &[user.id]).await;
        }
        let mut rng = StdRng::seed_from_u64(5);

        let mut request = config(2, 0);
        request.id = assignment.id;
        let nav = run_automatic_mapping(t.storage.as_ref(), request, &mut rng)
            .await
            .unwrap();

        assert!(nav.flash.is_none());
        let reviews = t
            .storage
            .list_mappings(&MappingQuery::of_kind(MappingKind::Review).assignment(assignment.id))
            .await
            .unwrap();
        assert_eq!(reviews.len(), 8);
    }

    #[tokio::test]
    async fn test_calibrated_pass_targets_calibrated_teams() {
        let t = test_db().await;
        let assignment = t.assignment("calibrated").await;
        let instructor = t.user_with_role("instructor", "instructor").await;
        let instructor_p = t.participant(assignment.id, instructor.id).await;

        let mut teams = Vec::new();
        for i in 0..3 {
            let user = t.user(&format!("student{i}")).await;
            t.participant(assignment.id, user.id).await;
            teams.push(t.team(assignment.id, &format!("team{i}"), &[user.id]).await);
        }
        t.mapping(
            MappingKind::Calibration,
            assignment.id,
            assignment.id,
            instructor_p.id,
            teams[0].id,
        )
        .await;

        let mut request = config(0, 0);
        request.id = assignment.id;
        request.num_calibrated_artifacts = 1;
        let mut rng = StdRng::seed_from_u64(9);
        run_automatic_mapping(t.storage.as_ref(), request, &mut rng)
            .await
            .unwrap();

        let reviews = t
            .storage
            .list_mappings(&MappingQuery::of_kind(MappingKind::Review).assignment(assignment.id))
            .await
            .unwrap();
        assert!(!reviews.is_empty());
        assert!(reviews.iter().all(|m| m.reviewee_id == teams[0].id));
    }

    #[tokio::test]
    async fn test_calibrated_pass_then_per_student() {
        let t = test_db().await;
        let assignment = t.assignment("calibrated").await;
        let instructor = t.user_with_role("instructor", "instructor").await;
        let instructor_p = t.participant(assignment.id, instructor.id).await;

        let mut teams = Vec::new();
        for i in 0..4 {
            let user = t.user(&format!("student{i}")).await;
            t.participant(assignment.id, user.id).await;
            teams.push(t.team(assignment.id, &format!("team{i}"), &[user.id]).await);
        }
        t.mapping(
            MappingKind::Calibration,
            assignment.id,
            assignment.id,
            instructor_p.id,
            teams[0].id,
        )
        .await;

        let mut request = config(2, 0);
        request.id = assignment.id;
        request.num_calibrated_artifacts = 1;
        let mut rng = StdRng::seed_from_u64(11);
        let nav = run_automatic_mapping(t.storage.as_ref(), request, &mut rng)
            .await
            .unwrap();
        assert!(nav.flash.is_none());

        let reviews = t
            .storage
            .list_mappings(&MappingQuery::of_kind(MappingKind::Review).assignment(assignment.id))
            .await
            .unwrap();
        assert!(reviews.iter().any(|m| m.reviewee_id == teams[0].id));
        assert!(reviews.iter().any(|m| m.reviewee_id != teams[0].id));

        // 常规轮次让每名学生至少完成两次评审
        let students: Vec<i64> = t
            .storage
            .list_participants(assignment.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|p| p.id != instructor_p.id)
            .map(|p| p.id)
            .collect();
        for student in students {
            let done = reviews.iter().filter(|m| m.reviewer_id == student).count();
            assert!(done >= 2, "participant {student} has {done} reviews");
        }
    }

    #[tokio::test]
    async fn test_staggered_mapping_note() {
        let t = test_db().await;
        let assignment = t.assignment("staggered").await;
        for i in 0..2 {
            let user = t.user(&format!("student{i}")).await;
            t.participant(assignment.id, user.id).await;
            t.team(assignment.id, &format!("team{i}"), &[user.id]).await;
        }

        let nav = run_staggered_mapping(
            t.storage.as_ref(),
            StaggeredMappingRequest {
                id: assignment.id,
                num_reviews: 1,
                num_metareviews: 0,
            },
        )
        .await
        .unwrap();

        assert_eq!(
            nav.flash,
            Some(Flash::note(
                "2 review mapping(s) and 0 metareview mapping(s) were created for 2 participant(s)."
            ))
        );
        assert_eq!(
            nav.redirect_to,
            format!("/review_mapping/list_mappings?id={}", assignment.id)
        );
    }
}
