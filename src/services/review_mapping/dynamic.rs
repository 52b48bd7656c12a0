//! 学生侧的动态分配：评审、测验与元评审
//!
//! 候选团队 = 作业内至少有一名成员、不包含评审者本人、且评审者尚未评审过的团队。
//! 指定题目时取该题目下被评审次数最少的团队，否则在候选集中均匀随机选取。

use std::collections::{HashMap, HashSet};

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{debug, info, warn};

use super::{
    recover,
    registry::{require_assignment, require_participant},
};
use crate::errors::{ReviewSystemError, Result};
use crate::models::{
    assignments::entities::Assignment,
    participants::entities::Participant,
    response_maps::{
        entities::{MappingKey, MappingKind, NewMapping, ResponseMap},
        requests::MappingQuery,
    },
    review_mapping::{
        requests::{AssignDynamicRequest, AssignMetareviewerRequest, AssignQuizRequest},
        responses::Navigation,
    },
    teams::entities::Team,
};
use crate::storage::Storage;
use crate::utils::url;

const NO_TOPIC_SELECTED: &str = "No topic is selected.  Please go back and select a topic.";
const NO_SUBMISSIONS: &str = "There are no more submissions to review on this assignment.";
const NO_REVIEWS: &str = "There are no reviews to metareview at this time for this assignment.";

async fn require_participant_for_user(
    storage: &dyn Storage,
    assignment_id: i64,
    user_id: i64,
) -> Result<Participant> {
    storage
        .get_participant_by_user(assignment_id, user_id)
        .await?
        .ok_or_else(|| {
            ReviewSystemError::not_found(format!(
                "User {user_id} is not a participant in assignment {assignment_id}."
            ))
        })
}

/// 评审者的候选团队
pub async fn candidate_teams(
    storage: &dyn Storage,
    assignment_id: i64,
    reviewer: &Participant,
) -> Result<Vec<Team>> {
    let reviewed: HashSet<i64> = storage
        .list_mappings(
            &MappingQuery::of_kind(MappingKind::Review)
                .assignment(assignment_id)
                .reviewer(reviewer.id),
        )
        .await?
        .into_iter()
        .map(|m| m.reviewee_id)
        .collect();

    let mut candidates = Vec::new();
    for team in storage.list_teams(assignment_id).await? {
        if reviewed.contains(&team.id) {
            continue;
        }
        let members = storage.list_team_member_ids(team.id).await?;
        if members.is_empty() || members.contains(&reviewer.user_id) {
            continue;
        }
        candidates.push(team);
    }
    Ok(candidates)
}

/// 每个团队已收到的评审数
pub async fn review_counts(
    storage: &dyn Storage,
    assignment_id: i64,
) -> Result<HashMap<i64, usize>> {
    let mut counts = HashMap::new();
    for mapping in storage
        .list_mappings(&MappingQuery::of_kind(MappingKind::Review).assignment(assignment_id))
        .await?
    {
        *counts.entry(mapping.reviewee_id).or_insert(0) += 1;
    }
    Ok(counts)
}

// 选定评审题目：指定题目需属于该作业；未指定时随机取一个仍有候选团队的题目
fn pick_topic(
    assignment: &Assignment,
    requested: Option<i64>,
    candidates: &[Team],
    rng: &mut impl Rng,
) -> Result<i64> {
    if let Some(topic_id) = requested {
        return Ok(topic_id);
    }
    if assignment.can_choose_topic_to_review {
        return Err(ReviewSystemError::no_topic_selected(NO_TOPIC_SELECTED));
    }

    let mut topics: Vec<i64> = candidates.iter().filter_map(|t| t.topic_id).collect();
    topics.sort_unstable();
    topics.dedup();
    topics
        .choose(rng)
        .copied()
        .ok_or_else(|| ReviewSystemError::no_topic_selected(NO_TOPIC_SELECTED))
}

async fn choose_reviewee(
    storage: &dyn Storage,
    assignment: &Assignment,
    reviewer: &Participant,
    topic_id: Option<i64>,
    rng: &mut impl Rng,
) -> Result<Team> {
    let candidates = candidate_teams(storage, assignment.id, reviewer).await?;

    if !assignment.has_topics {
        return candidates
            .choose(rng)
            .cloned()
            .ok_or_else(|| ReviewSystemError::not_found(NO_SUBMISSIONS));
    }

    let topic_id = pick_topic(assignment, topic_id, &candidates, rng)?;
    match storage.get_topic_by_id(topic_id).await? {
        Some(topic) if topic.assignment_id == assignment.id => {}
        _ => {
            return Err(ReviewSystemError::not_found(format!(
                "Topic {topic_id} does not exist."
            )));
        }
    }

    let counts = review_counts(storage, assignment.id).await?;
    candidates
        .into_iter()
        .filter(|team| team.topic_id == Some(topic_id))
        .min_by_key(|team| (counts.get(&team.id).copied().unwrap_or(0), team.id))
        .ok_or_else(|| ReviewSystemError::not_found(NO_SUBMISSIONS))
}

/// 学生请求一份新的评审任务
pub async fn assign_dynamic(
    storage: &dyn Storage,
    request: AssignDynamicRequest,
    rng: &mut impl Rng,
) -> Result<Navigation> {
    let reviewer = match require_participant_for_user(
        storage,
        request.assignment_id,
        request.reviewer_id,
    )
    .await
    {
        Ok(participant) => participant,
        Err(e) => return recover(Err(e), url::student_task_list),
    };

    let result = assign_review_for(storage, &reviewer, request.topic_id, rng).await;
    recover(result, || url::student_review_list(reviewer.id))
}

async fn assign_review_for(
    storage: &dyn Storage,
    reviewer: &Participant,
    topic_id: Option<i64>,
    rng: &mut impl Rng,
) -> Result<Navigation> {
    let assignment = require_assignment(storage, reviewer.assignment_id).await?;
    if !reviewer.can_review {
        return Err(ReviewSystemError::invariant_violation(
            "You are not allowed to review on this assignment.",
        ));
    }

    let team = choose_reviewee(storage, &assignment, reviewer, topic_id, rng).await?;
    debug!(
        "Dynamic assignment picked team {} for participant {}",
        team.id, reviewer.id
    );

    let key = MappingKey::new(MappingKind::Review, assignment.id, reviewer.id, team.id);
    let (mapping, _) = storage
        .find_or_create_mapping(&NewMapping::new(key, assignment.id))
        .await?;
    info!(
        "Participant {} dynamically assigned to review team {} (mapping {})",
        reviewer.id, team.id, mapping.id
    );

    Ok(Navigation::to(url::student_review_list(reviewer.id)).with_mapping(mapping.id))
}

/// 学生参加测验
pub async fn assign_quiz_dynamic(
    storage: &dyn Storage,
    request: AssignQuizRequest,
) -> Result<Navigation> {
    let participant_id = request.participant_id;
    let result = take_quiz(storage, request).await;
    recover(result, || url::student_quizzes(participant_id))
}

async fn take_quiz(storage: &dyn Storage, request: AssignQuizRequest) -> Result<Navigation> {
    let reviewer = require_participant(storage, request.participant_id).await?;
    if reviewer.assignment_id != request.assignment_id {
        return Err(ReviewSystemError::not_found(format!(
            "Participant {} is not in assignment {}.",
            reviewer.id, request.assignment_id
        )));
    }

    let questionnaire = storage
        .get_questionnaire_by_id(request.questionnaire_id)
        .await?
        .ok_or_else(|| {
            ReviewSystemError::not_found(format!(
                "Questionnaire {} does not exist.",
                request.questionnaire_id
            ))
        })?;

    let key = MappingKey::new(
        MappingKind::Quiz,
        questionnaire.id,
        reviewer.id,
        questionnaire.instructor_id,
    );
    let (mapping, created) = storage
        .find_or_create_mapping(&NewMapping::new(key, request.assignment_id))
        .await?;
    if !created {
        warn!(
            "Participant {} attempted to retake quiz {}",
            reviewer.id, questionnaire.id
        );
        return Err(ReviewSystemError::already_taken("You have already taken that quiz."));
    }

    info!(
        "Quiz mapping {} created for participant {}",
        mapping.id, reviewer.id
    );
    Ok(Navigation::to(url::student_quizzes(reviewer.id)).with_mapping(mapping.id))
}

// 选出元评审数最少的评审映射
fn least_metareviewed(
    reviews: Vec<ResponseMap>,
    metareviews: &[ResponseMap],
    metareviewer_id: i64,
) -> Option<ResponseMap> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    let mut already: HashSet<i64> = HashSet::new();
    for meta in metareviews {
        *counts.entry(meta.reviewed_object_id).or_insert(0) += 1;
        if meta.reviewer_id == metareviewer_id {
            already.insert(meta.reviewed_object_id);
        }
    }

    reviews
        .into_iter()
        .filter(|review| review.reviewer_id != metareviewer_id && !already.contains(&review.id))
        .min_by_key(|review| (counts.get(&review.id).copied().unwrap_or(0), review.id))
}

/// 学生请求一份新的元评审任务
pub async fn assign_metareviewer_dynamic(
    storage: &dyn Storage,
    request: AssignMetareviewerRequest,
) -> Result<Navigation> {
    let metareviewer = match require_participant_for_user(
        storage,
        request.assignment_id,
        request.metareviewer_id,
    )
    .await
    {
        Ok(participant) => participant,
        Err(e) => return recover(Err(e), url::student_task_list),
    };

    let result = assign_metareview_for(storage, &metareviewer).await;
    recover(result, || url::student_review_list(metareviewer.id))
}

async fn assign_metareview_for(
    storage: &dyn Storage,
    metareviewer: &Participant,
) -> Result<Navigation> {
    let assignment_id = metareviewer.assignment_id;
    let reviews = storage
        .list_mappings(&MappingQuery::of_kind(MappingKind::Review).assignment(assignment_id))
        .await?;
    let metareviews = storage
        .list_mappings(&MappingQuery::of_kind(MappingKind::Metareview).assignment(assignment_id))
        .await?;

    let review = least_metareviewed(reviews, &metareviews, metareviewer.id)
        .ok_or_else(|| ReviewSystemError::not_found(NO_REVIEWS))?;

    let key = MappingKey::new(
        MappingKind::Metareview,
        review.id,
        metareviewer.id,
        review.reviewer_id,
    );
    let (mapping, _) = storage
        .find_or_create_mapping(&NewMapping::new(key, assignment_id))
        .await?;
    info!(
        "Participant {} dynamically assigned to metareview mapping {}",
        metareviewer.id, review.id
    );

    Ok(Navigation::to(url::student_review_list(metareviewer.id)).with_mapping(mapping.id))
}
