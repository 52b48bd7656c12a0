//! 批量分配评审者
//!
//! [`plan_assignments`] 只做纯计算，便于用固定种子测试；
//! [`distribute_reviews`] 与 [`assign_reviewers_staggered`] 负责落库。

use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::errors::{ReviewSystemError, Result};
use crate::models::{
    participants::entities::Participant,
    response_maps::{
        entities::{MappingKey, MappingKind, NewMapping},
        requests::MappingQuery,
    },
    teams::entities::Team,
};
use crate::storage::Storage;

/// 分配目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// 每名学生完成的评审数
    PerStudent(u32),
    /// 每份提交收到的评审数
    PerSubmission(u32),
}

impl Strategy {
    /// 换算为 (每名评审者的评审数, 每个团队的评审数)
    pub fn targets(&self, reviewers: usize, teams: usize) -> (usize, usize) {
        if reviewers == 0 || teams == 0 {
            return (0, 0);
        }
        match *self {
            Strategy::PerStudent(k) => {
                let k = k as usize;
                let per_team = ((reviewers * k) as f64 / teams as f64).round() as usize;
                (k, per_team)
            }
            Strategy::PerSubmission(s) => {
                let s = s as usize;
                let per_student = ((teams * s) as f64 / reviewers as f64).round() as usize;
                (per_student.max(1), s)
            }
        }
    }
}

/// 待分配的评审者
#[derive(Debug, Clone)]
pub struct ReviewerSlot {
    pub participant_id: i64,
    pub user_id: i64,
}

/// 待评审的团队及其成员
#[derive(Debug, Clone)]
pub struct TeamSlot {
    pub team_id: i64,
    pub member_ids: Vec<i64>,
}

/// 计算 (评审者参与者 ID, 团队 ID) 配对
///
/// 先按团队轮转，每轮把当前评审最少的团队交给负载最小的合格评审者；
/// 团队达到目标后，再把评审者剩余的额度补到评审最少的合格团队上。
/// 评审者不会评审自己所在的团队，也不会与 `existing` 中已有的配对重复。
pub fn plan_assignments(
    reviewers: &[ReviewerSlot],
    teams: &[TeamSlot],
    existing: &HashSet<(i64, i64)>,
    per_student: usize,
    per_team: usize,
) -> Vec<(i64, i64)> {
    let mut paired = existing.clone();
    let mut reviewer_load: Vec<usize> = reviewers
        .iter()
        .map(|r| existing.iter().filter(|(p, _)| *p == r.participant_id).count())
        .collect();
    let mut team_load: Vec<usize> = teams
        .iter()
        .map(|t| existing.iter().filter(|(_, team)| *team == t.team_id).count())
        .collect();
    let mut plan = Vec::new();

    let eligible = |paired: &HashSet<(i64, i64)>, ri: usize, ti: usize| {
        let reviewer = &reviewers[ri];
        let team = &teams[ti];
        !team.member_ids.contains(&reviewer.user_id)
            && !paired.contains(&(reviewer.participant_id, team.team_id))
    };

    for _ in 0..per_team {
        let mut order: Vec<usize> = (0..teams.len()).collect();
        order.sort_by_key(|&ti| team_load[ti]);

        let mut progressed = false;
        for ti in order {
            if team_load[ti] >= per_team {
                continue;
            }
            let pick = (0..reviewers.len())
                .filter(|&ri| reviewer_load[ri] < per_student && eligible(&paired, ri, ti))
                .min_by_key(|&ri| reviewer_load[ri]);
            if let Some(ri) = pick {
                let pair = (reviewers[ri].participant_id, teams[ti].team_id);
                paired.insert(pair);
                plan.push(pair);
                reviewer_load[ri] += 1;
                team_load[ti] += 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    for ri in 0..reviewers.len() {
        while reviewer_load[ri] < per_student {
            let pick = (0..teams.len())
                .filter(|&ti| eligible(&paired, ri, ti))
                .min_by_key(|&ti| team_load[ti]);
            let Some(ti) = pick else { break };
            let pair = (reviewers[ri].participant_id, teams[ti].team_id);
            paired.insert(pair);
            plan.push(pair);
            reviewer_load[ri] += 1;
            team_load[ti] += 1;
        }
    }

    plan
}

async fn team_slots(storage: &dyn Storage, teams: &[Team]) -> Result<Vec<TeamSlot>> {
    let mut slots = Vec::with_capacity(teams.len());
    for team in teams {
        slots.push(TeamSlot {
            team_id: team.id,
            member_ids: storage.list_team_member_ids(team.id).await?,
        });
    }
    Ok(slots)
}

/// 按策略为一组团队分配评审者，返回新建的映射数
pub async fn distribute_reviews(
    storage: &dyn Storage,
    assignment_id: i64,
    reviewers: &[Participant],
    teams: &[Team],
    strategy: Strategy,
    rng: &mut impl Rng,
) -> Result<usize> {
    let mut reviewer_slots: Vec<ReviewerSlot> = reviewers
        .iter()
        .filter(|p| p.can_review)
        .map(|p| ReviewerSlot {
            participant_id: p.id,
            user_id: p.user_id,
        })
        .collect();
    let mut slots = team_slots(storage, teams).await?;
    reviewer_slots.shuffle(rng);
    slots.shuffle(rng);

    let (per_student, per_team) = strategy.targets(reviewer_slots.len(), slots.len());
    let team_ids: HashSet<i64> = slots.iter().map(|t| t.team_id).collect();
    let existing: HashSet<(i64, i64)> = storage
        .list_mappings(&MappingQuery::of_kind(MappingKind::Review).assignment(assignment_id))
        .await?
        .into_iter()
        .filter(|m| team_ids.contains(&m.reviewee_id))
        .map(|m| (m.reviewer_id, m.reviewee_id))
        .collect();
    debug!(
        "Distributing reviews for assignment {}: {} reviewers, {} teams, {} per student, {} per team",
        assignment_id,
        reviewer_slots.len(),
        slots.len(),
        per_student,
        per_team
    );

    let mut created = 0;
    let plan = plan_assignments(&reviewer_slots, &slots, &existing, per_student, per_team);
    for (reviewer_id, team_id) in plan {
        let key = MappingKey::new(MappingKind::Review, assignment_id, reviewer_id, team_id);
        let (_, inserted) = storage
            .find_or_create_mapping(&NewMapping::new(key, assignment_id))
            .await?;
        if inserted {
            created += 1;
        }
    }

    info!(
        "Created {} review mappings for assignment {}",
        created, assignment_id
    );
    Ok(created)
}

/// 轮转分配：第 i 名参与者依次评审其后的 `num_reviews` 个团队，
/// 再依次元评审其后的 `num_metareviews` 份评审（均跳过自己的）。
pub async fn assign_reviewers_staggered(
    storage: &dyn Storage,
    assignment_id: i64,
    num_reviews: u32,
    num_metareviews: u32,
) -> Result<String> {
    let mut participants: Vec<Participant> = storage
        .list_participants(assignment_id)
        .await?
        .into_iter()
        .filter(|p| p.can_review)
        .collect();
    participants.sort_by_key(|p| p.id);
    let mut teams = storage.list_teams(assignment_id).await?;
    teams.sort_by_key(|t| t.id);

    if participants.is_empty() || teams.is_empty() {
        return Err(ReviewSystemError::invalid_configuration(
            "There are no reviewers or submissions available for this assignment.",
        ));
    }

    let slots = team_slots(storage, &teams).await?;
    let mut reviews_created = 0;
    for (i, participant) in participants.iter().enumerate() {
        let mut assigned = 0;
        for step in 0..slots.len() {
            if assigned >= num_reviews {
                break;
            }
            let team = &slots[(i + step) % slots.len()];
            if team.member_ids.contains(&participant.user_id) {
                continue;
            }
            let key =
                MappingKey::new(MappingKind::Review, assignment_id, participant.id, team.team_id);
            let (_, created) = storage
                .find_or_create_mapping(&NewMapping::new(key, assignment_id))
                .await?;
            if created {
                reviews_created += 1;
            }
            assigned += 1;
        }
    }

    let mut metareviews_created = 0;
    if num_metareviews > 0 {
        let mut reviews = storage
            .list_mappings(&MappingQuery::of_kind(MappingKind::Review).assignment(assignment_id))
            .await?;
        reviews.sort_by_key(|m| m.id);

        if !reviews.is_empty() {
            for (i, participant) in participants.iter().enumerate() {
                let mut assigned = 0;
                for step in 0..reviews.len() {
                    if assigned >= num_metareviews {
                        break;
                    }
                    let review = &reviews[(i + step) % reviews.len()];
                    if review.reviewer_id == participant.id {
                        continue;
                    }
                    let key = MappingKey::new(
                        MappingKind::Metareview,
                        review.id,
                        participant.id,
                        review.reviewer_id,
                    );
                    let (_, created) = storage
                        .find_or_create_mapping(&NewMapping::new(key, assignment_id))
                        .await?;
                    if created {
                        metareviews_created += 1;
                    }
                    assigned += 1;
                }
            }
        }
    }

    info!(
        "Staggered mapping for assignment {}: {} reviews, {} metareviews created",
        assignment_id, reviews_created, metareviews_created
    );
    Ok(format!(
        "{} review mapping(s) and {} metareview mapping(s) were created for {} participant(s).",
        reviews_created,
        metareviews_created,
        participants.len()
    ))
}
