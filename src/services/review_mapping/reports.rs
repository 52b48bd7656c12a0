//! 评审报告与评审者成绩

use std::collections::{BTreeMap, HashMap};

use tracing::{error, info};

use super::{
    listing::participant_names,
    recover,
    registry::{require_assignment, require_participant, resolve_or_create},
};
use crate::config::ReviewConfig;
use crate::errors::{ReviewSystemError, Result};
use crate::models::{
    assignments::entities::Assignment,
    participants::entities::ParticipantDefaults,
    reports::{
        entities::ReportType,
        responses::{
            CalibrationEntry, CalibrationReport, FeedbackReport, ResponseReport,
            ReviewResponseReport, RevieweeScore, ReviewerMappingRow, ReviewerReport,
            RoundResponses, TeammateReport, TeammateReviewerRow,
        },
    },
    response_maps::{
        entities::{MappingKind, ResponseMap},
        requests::MappingQuery,
    },
    responses::entities::Response,
    review_grades::requests::SaveReviewGradeRequest,
    review_mapping::{
        requests::ResponseReportQuery,
        responses::{Flash, Navigation},
    },
    users::entities::User,
};
use crate::storage::Storage;
use crate::utils::url;

fn parse_report_type(tag: Option<&str>) -> Result<ReportType> {
    let report_type = match tag {
        None | Some("") => ReportType::ReviewResponseMap,
        Some(tag) => tag
            .parse::<ReportType>()
            .map_err(ReviewSystemError::invalid_configuration)?,
    };

    if report_type.is_external() {
        return Err(ReviewSystemError::invalid_configuration(format!(
            "{report_type:?} reports are served by the external summary service."
        )));
    }
    Ok(report_type)
}

/// 按类型生成作业的评审报告
pub async fn response_report(
    storage: &dyn Storage,
    config: &ReviewConfig,
    query: ResponseReportQuery,
    current_user: &User,
) -> Result<ResponseReport> {
    let report_type = parse_report_type(query.report_type.as_deref())?;
    let assignment = require_assignment(storage, query.id).await?;

    match report_type {
        ReportType::ReviewResponseMap => Ok(ResponseReport::ReviewResponseMap(
            review_report(storage, &assignment, query.user.as_deref()).await?,
        )),
        ReportType::FeedbackResponseMap => Ok(ResponseReport::FeedbackResponseMap(
            feedback_report(storage, &assignment).await?,
        )),
        ReportType::TeammateReviewResponseMap => Ok(ResponseReport::TeammateReviewResponseMap(
            teammate_report(storage, &assignment).await?,
        )),
        ReportType::Calibration => Ok(ResponseReport::Calibration(
            calibration_report(storage, config, &assignment, current_user).await?,
        )),
        other => Err(ReviewSystemError::invalid_configuration(format!(
            "Unsupported report type: {other:?}"
        ))),
    }
}

fn matches_filter(name: &str, filter: Option<&str>) -> bool {
    match filter.map(str::trim) {
        None | Some("") => true,
        Some(filter) => name.to_lowercase().contains(&filter.to_lowercase()),
    }
}

async fn review_report(
    storage: &dyn Storage,
    assignment: &Assignment,
    user_filter: Option<&str>,
) -> Result<ReviewResponseReport> {
    let mappings = storage
        .list_mappings(&MappingQuery::of_kind(MappingKind::Review).assignment(assignment.id))
        .await?;
    let map_ids: Vec<i64> = mappings.iter().map(|m| m.id).collect();
    let responses = storage.list_responses_by_map_ids(&map_ids).await?;

    let mut submitted_by_map: HashMap<i64, Vec<&Response>> = HashMap::new();
    for response in responses.iter().filter(|r| r.is_submitted) {
        submitted_by_map.entry(response.map_id).or_default().push(response);
    }

    let team_names: HashMap<i64, String> = storage
        .list_teams(assignment.id)
        .await?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect();
    let team_name = |id: i64| {
        team_names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("team {id}"))
    };

    let mut by_reviewer: BTreeMap<i64, Vec<ResponseMap>> = BTreeMap::new();
    for mapping in &mappings {
        by_reviewer.entry(mapping.reviewer_id).or_default().push(mapping.clone());
    }
    let reviewer_ids: Vec<i64> = by_reviewer.keys().copied().collect();
    let names = participant_names(storage, &reviewer_ids).await?;
    let participants: HashMap<i64, _> = storage
        .list_participants_by_ids(&reviewer_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut reviewers = Vec::new();
    for (reviewer_id, mappings) in by_reviewer {
        let Some(reviewer) = participants.get(&reviewer_id).cloned() else {
            continue;
        };
        let reviewer_name = names
            .get(&reviewer_id)
            .cloned()
            .unwrap_or_else(|| format!("participant {reviewer_id}"));
        if !matches_filter(&reviewer_name, user_filter) {
            continue;
        }

        let rows = mappings
            .into_iter()
            .map(|mapping| ReviewerMappingRow {
                reviewee_name: team_name(mapping.reviewee_id),
                submitted_responses: submitted_by_map
                    .get(&mapping.id)
                    .map_or(0, |r| r.len() as u64),
                mapping,
            })
            .collect();
        let grade = storage.get_review_grade(reviewer_id).await?;

        reviewers.push(ReviewerReport {
            reviewer,
            reviewer_name,
            mappings: rows,
            grade,
        });
    }

    // 被评审团队的已提交得分
    let mut scores_by_team: BTreeMap<i64, Vec<Option<f64>>> = BTreeMap::new();
    for mapping in &mappings {
        let entry = scores_by_team.entry(mapping.reviewee_id).or_default();
        if let Some(submitted) = submitted_by_map.get(&mapping.id) {
            entry.extend(submitted.iter().map(|r| r.total_score));
        }
    }
    let scores = scores_by_team
        .into_iter()
        .map(|(reviewee_id, submitted)| {
            score_summary(reviewee_id, team_name(reviewee_id), &submitted)
        })
        .collect();

    Ok(ReviewResponseReport { reviewers, scores })
}

fn score_summary(
    reviewee_id: i64,
    reviewee_name: String,
    submitted: &[Option<f64>],
) -> RevieweeScore {
    let scored: Vec<f64> = submitted.iter().flatten().copied().collect();
    let average = if scored.is_empty() {
        None
    } else {
        Some(scored.iter().sum::<f64>() / scored.len() as f64)
    };

    RevieweeScore {
        reviewee_id,
        reviewee_name,
        response_count: submitted.len() as u64,
        average,
        min: scored.iter().copied().reduce(f64::min),
        max: scored.iter().copied().reduce(f64::max),
    }
}

async fn feedback_report(storage: &dyn Storage, assignment: &Assignment) -> Result<FeedbackReport> {
    let mappings = storage
        .list_mappings(&MappingQuery::of_kind(MappingKind::Feedback).assignment(assignment.id))
        .await?;

    let mut reviewer_ids: Vec<i64> = mappings.iter().map(|m| m.reviewer_id).collect();
    reviewer_ids.sort_unstable();
    reviewer_ids.dedup();
    let mut reviewers = storage.list_participants_by_ids(&reviewer_ids).await?;
    reviewers.sort_by_key(|p| p.id);

    let map_ids: Vec<i64> = mappings.iter().map(|m| m.id).collect();
    let responses = storage.list_responses_by_map_ids(&map_ids).await?;
    let response_ids = responses.iter().map(|r| r.id).collect();

    let rounds = assignment.varying_rubrics_by_round.then(|| {
        let mut grouped: BTreeMap<i32, Vec<i64>> = BTreeMap::new();
        for response in &responses {
            grouped.entry(response.round).or_default().push(response.id);
        }
        grouped
            .into_iter()
            .map(|(round, response_ids)| RoundResponses {
                round,
                response_ids,
            })
            .collect()
    });

    Ok(FeedbackReport {
        reviewers,
        response_ids,
        rounds,
    })
}

async fn teammate_report(storage: &dyn Storage, assignment: &Assignment) -> Result<TeammateReport> {
    let mappings = storage
        .list_mappings(
            &MappingQuery::of_kind(MappingKind::TeammateReview).assignment(assignment.id),
        )
        .await?;

    let mut by_reviewer: BTreeMap<i64, Vec<ResponseMap>> = BTreeMap::new();
    for mapping in mappings {
        by_reviewer.entry(mapping.reviewer_id).or_default().push(mapping);
    }
    let reviewer_ids: Vec<i64> = by_reviewer.keys().copied().collect();
    let names = participant_names(storage, &reviewer_ids).await?;
    let mut participants: HashMap<i64, _> = storage
        .list_participants_by_ids(&reviewer_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let reviewers = by_reviewer
        .into_iter()
        .filter_map(|(reviewer_id, mappings)| {
            let reviewer = participants.remove(&reviewer_id)?;
            Some(TeammateReviewerRow {
                reviewer_name: names.get(&reviewer_id).cloned().unwrap_or_default(),
                reviewer,
                mappings,
            })
        })
        .collect();

    Ok(TeammateReport { reviewers })
}

async fn calibration_report(
    storage: &dyn Storage,
    config: &ReviewConfig,
    assignment: &Assignment,
    current_user: &User,
) -> Result<CalibrationReport> {
    let participant = resolve_or_create(
        storage,
        assignment.id,
        current_user.id,
        &ParticipantDefaults::full(config.default_handle.clone()),
    )
    .await?;

    let calibration_maps = storage
        .list_mappings(&MappingQuery::of_kind(MappingKind::Calibration).assignment(assignment.id))
        .await?;
    let map_ids: Vec<i64> = calibration_maps.iter().map(|m| m.id).collect();
    let mut responses_by_map: HashMap<i64, Vec<Response>> = HashMap::new();
    for response in storage.list_responses_by_map_ids(&map_ids).await? {
        responses_by_map.entry(response.map_id).or_default().push(response);
    }

    // 学生对同一批校准作品的评审
    let mut student_map_ids = Vec::new();
    for mapping in &calibration_maps {
        let reviews = storage
            .list_mappings(
                &MappingQuery::of_kind(MappingKind::Review)
                    .assignment(assignment.id)
                    .reviewee(mapping.reviewee_id),
            )
            .await?;
        student_map_ids.extend(reviews.into_iter().map(|m| m.id));
    }
    let student_responses = storage
        .list_responses_by_map_ids(&student_map_ids)
        .await?
        .into_iter()
        .filter(|r| r.is_submitted)
        .collect();

    let calibrations = calibration_maps
        .into_iter()
        .map(|mapping| CalibrationEntry {
            responses: responses_by_map.remove(&mapping.id).unwrap_or_default(),
            mapping,
        })
        .collect();

    Ok(CalibrationReport {
        participant,
        calibrations,
        student_responses,
    })
}

/// 保存教师给评审者的成绩与评语
pub async fn save_grade_and_comment(
    storage: &dyn Storage,
    request: SaveReviewGradeRequest,
    graded_by: i64,
) -> Result<Navigation> {
    let assignment_id = request.assignment_id;
    let target = url::response_report(assignment_id);

    let participant = match require_participant(storage, request.participant_id).await {
        Ok(participant) => participant,
        Err(e) => return recover(Err(e), || target),
    };

    match storage.save_review_grade(request, graded_by).await {
        Ok(grade) => {
            info!(
                "Saved review grade {:?} for participant {} by user {}",
                grade.grade_for_reviewer, participant.id, graded_by
            );
            Ok(Navigation::to(target))
        }
        Err(e) => {
            error!(
                "Failed to save review grade for participant {}: {}",
                participant.id, e
            );
            Ok(Navigation::to(target).with_flash(Flash::error(
                "Grade and comment for reviewer could not be saved.",
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::test_db;

    fn query(id: i64, report_type: Option<&str>) -> ResponseReportQuery {
        ResponseReportQuery {
            id,
            report_type: report_type.map(str::to_string),
            user: None,
        }
    }

    #[test]
    fn test_parse_report_type() {
        assert_eq!(parse_report_type(None).unwrap(), ReportType::ReviewResponseMap);
        let err = parse_report_type(Some("SummaryByCriteria")).unwrap_err();
        assert_eq!(err.code(), "E104");
        assert!(err.message().contains("external summary service"));
        assert_eq!(parse_report_type(Some("Bogus")).unwrap_err().code(), "E104");
    }

    #[test]
    fn test_score_summary_ignores_unscored() {
        let score = score_summary(1, "t".to_string(), &[Some(2.0), None, Some(4.0)]);
        assert_eq!(score.response_count, 3);
        assert_eq!(score.average, Some(3.0));
        assert_eq!(score.min, Some(2.0));
        assert_eq!(score.max, Some(4.0));

        let empty = score_summary(2, "u".to_string(), &[]);
        assert_eq!(empty.average, None);
    }

    #[tokio::test]
    async fn test_review_report() {
        let t = test_db().await;
        let instructor = t.user_with_role("instructor6", "instructor").await;
        let author = t.user("author").await;
        let alice = t.user("alice").await;
        let bob = t.user("bob").await;
        let assignment = t.assignment("a").await;
        let team = t.team(assignment.id, "reviewee", &[author.id]).await;
        let alice_p = t.participant(assignment.id, alice.id).await;
        let bob_p = t.participant(assignment.id, bob.id).await;
        let m1 = t
            .mapping(MappingKind::Review, assignment.id, assignment.id, alice_p.id, team.id)
            .await;
        let m2 = t
            .mapping(MappingKind::Review, assignment.id, assignment.id, bob_p.id, team.id)
            .await;
        t.response(m1.id, 1, Some(80.0)).await;
        t.response(m2.id, 1, Some(90.0)).await;

        let report = response_report(
            t.storage.as_ref(),
            &ReviewConfig::default(),
            query(assignment.id, None),
            &instructor,
        )
        .await
        .unwrap();
        let ResponseReport::ReviewResponseMap(report) = report else {
            panic!("expected review report");
        };
        assert_eq!(report.reviewers.len(), 2);
        assert_eq!(report.reviewers[0].mappings[0].submitted_responses, 1);
        assert_eq!(report.scores.len(), 1);
        assert_eq!(report.scores[0].average, Some(85.0));
        assert_eq!(report.scores[0].reviewee_name, "reviewee");

        let filtered = response_report(
            t.storage.as_ref(),
            &ReviewConfig::default(),
            ResponseReportQuery {
                id: assignment.id,
                report_type: Some("ReviewResponseMap".to_string()),
                user: Some("BO".to_string()),
            },
            &instructor,
        )
        .await
        .unwrap();
        let ResponseReport::ReviewResponseMap(filtered) = filtered else {
            panic!("expected review report");
        };
        assert_eq!(filtered.reviewers.len(), 1);
        assert_eq!(filtered.reviewers[0].reviewer_name, "bob");
    }

    #[tokio::test]
    async fn test_feedback_report_groups_rounds() {
        let t = test_db().await;
        let instructor = t.user_with_role("instructor6", "instructor").await;
        let author = t.user("author").await;
        let reviewer = t.user("reviewer").await;
        let assignment = t
            .assignment_with("a", |m| m.varying_rubrics_by_round = sea_orm::Set(true))
            .await;
        let author_p = t.participant(assignment.id, author.id).await;
        let reviewer_p = t.participant(assignment.id, reviewer.id).await;
        let team = t.team(assignment.id, "reviewee", &[author.id]).await;
        let review = t
            .mapping(MappingKind::Review, assignment.id, assignment.id, reviewer_p.id, team.id)
            .await;
        let feedback = t
            .mapping(MappingKind::Feedback, assignment.id, review.id, author_p.id, reviewer_p.id)
            .await;
        let r1 = t.response(feedback.id, 1, None).await;
        let r2 = t.response(feedback.id, 2, None).await;

        let report = response_report(
            t.storage.as_ref(),
            &ReviewConfig::default(),
            query(assignment.id, Some("FeedbackResponseMap")),
            &instructor,
        )
        .await
        .unwrap();
        let ResponseReport::FeedbackResponseMap(report) = report else {
            panic!("expected feedback report");
        };
        assert_eq!(report.reviewers.len(), 1);
        assert_eq!(report.response_ids, vec![r1, r2]);
        assert_eq!(
            report.rounds,
            Some(vec![
                RoundResponses {
                    round: 1,
                    response_ids: vec![r1]
                },
                RoundResponses {
                    round: 2,
                    response_ids: vec![r2]
                },
            ])
        );
    }

    #[tokio::test]
    async fn test_calibration_report_registers_current_user() {
        let t = test_db().await;
        let instructor = t.user_with_role("instructor6", "instructor").await;
        let assignment = t.assignment("a").await;

        let report = response_report(
            t.storage.as_ref(),
            &ReviewConfig::default(),
            query(assignment.id, Some("Calibration")),
            &instructor,
        )
        .await
        .unwrap();
        let ResponseReport::Calibration(report) = report else {
            panic!("expected calibration report");
        };
        assert_eq!(report.participant.user_id, instructor.id);
        assert!(report.participant.can_take_quiz);
        assert!(report.calibrations.is_empty());
    }

    #[tokio::test]
    async fn test_save_grade_and_comment() {
        let t = test_db().await;
        let instructor = t.user_with_role("instructor6", "instructor").await;
        let reviewer = t.user("reviewer").await;
        let assignment = t.assignment("a").await;
        let reviewer_p = t.participant(assignment.id, reviewer.id).await;

        let nav = save_grade_and_comment(
            t.storage.as_ref(),
            SaveReviewGradeRequest {
                assignment_id: assignment.id,
                participant_id: reviewer_p.id,
                grade_for_reviewer: Some(90),
                comment_for_reviewer: Some("keep it up".to_string()),
            },
            instructor.id,
        )
        .await
        .unwrap();
        assert_eq!(
            nav.redirect_to,
            format!("/review_mapping/response_report?id={}", assignment.id)
        );
        assert!(nav.flash.is_none());

        let grade = t.storage.get_review_grade(reviewer_p.id).await.unwrap().unwrap();
        assert_eq!(grade.grade_for_reviewer, Some(90));
        assert_eq!(grade.reviewer_id_who_graded, instructor.id);
    }
}
