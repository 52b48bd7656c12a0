//! 映射列表与选择页面的数据

use std::collections::HashMap;

use super::registry::{require_assignment, require_mapping, require_participant, require_team};
use crate::errors::Result;
use crate::models::{
    participants::entities::Participant,
    response_maps::{
        entities::{MappingKind, ResponseMap},
        requests::MappingQuery,
    },
    review_mapping::{
        requests::ListMappingsQuery,
        responses::{
            Flash, MappingEntry, MappingListResponse, ReviewMappingEntry, SelectedContributor,
            SelectedMapping, TeamMappings,
        },
    },
};
use crate::storage::Storage;

/// 参与者 ID 到展示名称的映射
pub(crate) async fn participant_names(
    storage: &dyn Storage,
    participant_ids: &[i64],
) -> Result<HashMap<i64, String>> {
    let participants = storage.list_participants_by_ids(participant_ids).await?;
    let user_ids: Vec<i64> = participants.iter().map(|p| p.user_id).collect();
    let users: HashMap<i64, String> = storage
        .list_users_by_ids(&user_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name().to_string()))
        .collect();

    Ok(participants
        .into_iter()
        .map(|p: Participant| {
            let name = users
                .get(&p.user_id)
                .cloned()
                .or(p.handle)
                .unwrap_or_else(|| format!("participant {}", p.id));
            (p.id, name)
        })
        .collect())
}

fn name_of(names: &HashMap<i64, String>, participant_id: i64) -> String {
    names
        .get(&participant_id)
        .cloned()
        .unwrap_or_else(|| format!("participant {participant_id}"))
}

/// 作业的全部评审映射，按被评审团队分组
pub async fn list_mappings(
    storage: &dyn Storage,
    query: ListMappingsQuery,
) -> Result<MappingListResponse> {
    let assignment = require_assignment(storage, query.id).await?;
    let teams = storage.list_teams(assignment.id).await?;

    let reviews = storage
        .list_mappings(&MappingQuery::of_kind(MappingKind::Review).assignment(assignment.id))
        .await?;
    let metareviews = storage
        .list_mappings(&MappingQuery::of_kind(MappingKind::Metareview).assignment(assignment.id))
        .await?;

    let mut ids: Vec<i64> = reviews
        .iter()
        .chain(metareviews.iter())
        .map(|m| m.reviewer_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    let names = participant_names(storage, &ids).await?;

    let mut metareviews_by_review: HashMap<i64, Vec<MappingEntry>> = HashMap::new();
    for mapping in metareviews {
        let reviewer_name = name_of(&names, mapping.reviewer_id);
        metareviews_by_review
            .entry(mapping.reviewed_object_id)
            .or_default()
            .push(MappingEntry {
                mapping,
                reviewer_name,
            });
    }

    let mut reviews_by_team: HashMap<i64, Vec<ResponseMap>> = HashMap::new();
    for mapping in reviews {
        reviews_by_team.entry(mapping.reviewee_id).or_default().push(mapping);
    }

    let teams = teams
        .into_iter()
        .map(|team| {
            let reviews = reviews_by_team
                .remove(&team.id)
                .unwrap_or_default()
                .into_iter()
                .map(|mapping| ReviewMappingEntry {
                    reviewer_name: name_of(&names, mapping.reviewer_id),
                    metareviews: metareviews_by_review.remove(&mapping.id).unwrap_or_default(),
                    mapping,
                })
                .collect();
            TeamMappings { team, reviews }
        })
        .collect();

    let flash = query
        .msg
        .filter(|msg| !msg.is_empty())
        .map(Flash::error);

    Ok(MappingListResponse {
        assignment,
        teams,
        flash,
    })
}

/// 选中被评审团队
pub async fn select_reviewer(
    storage: &dyn Storage,
    contributor_id: i64,
) -> Result<SelectedContributor> {
    let contributor = require_team(storage, contributor_id).await?;
    Ok(SelectedContributor { contributor })
}

/// 选中评审映射及其评审者
pub async fn select_metareviewer(storage: &dyn Storage, map_id: i64) -> Result<SelectedMapping> {
    let mapping = require_mapping(storage, map_id).await?;
    let reviewer = require_participant(storage, mapping.reviewer_id).await?;
    Ok(SelectedMapping { mapping, reviewer })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::test_db;

    #[tokio::test]
    async fn test_list_mappings_groups_by_team() {
        let t = test_db().await;
        let author = t.user("author").await;
        let reviewer = t.user("reviewer").await;
        let meta = t.user("metareviewer").await;
        let assignment = t.assignment("a").await;
        let team = t.team(assignment.id, "reviewee", &[author.id]).await;
        let empty = t.team(assignment.id, "idle", &[]).await;
        let reviewer_p = t.participant(assignment.id, reviewer.id).await;
        let meta_p = t.participant(assignment.id, meta.id).await;
        let review = t
            .mapping(MappingKind::Review, assignment.id, assignment.id, reviewer_p.id, team.id)
            .await;
        t.mapping(MappingKind::Metareview, assignment.id, review.id, meta_p.id, reviewer_p.id)
            .await;

        let list = list_mappings(
            t.storage.as_ref(),
            ListMappingsQuery {
                id: assignment.id,
                msg: Some(String::new()),
            },
        )
        .await
        .unwrap();

        assert!(list.flash.is_none());
        assert_eq!(list.teams.len(), 2);
        let group = list.teams.iter().find(|g| g.team.id == team.id).unwrap();
        assert_eq!(group.reviews.len(), 1);
        assert_eq!(group.reviews[0].reviewer_name, "reviewer");
        assert_eq!(group.reviews[0].metareviews.len(), 1);
        assert_eq!(group.reviews[0].metareviews[0].reviewer_name, "metareviewer");
        let idle = list.teams.iter().find(|g| g.team.id == empty.id).unwrap();
        assert!(idle.reviews.is_empty());
    }

    #[tokio::test]
    async fn test_list_mappings_shows_msg_as_error() {
        let t = test_db().await;
        let assignment = t.assignment("a").await;

        let list = list_mappings(
            t.storage.as_ref(),
            ListMappingsQuery {
                id: assignment.id,
                msg: Some("Self review already assigned!".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(list.flash, Some(Flash::error("Self review already assigned!")));
    }

    #[tokio::test]
    async fn test_select_metareviewer() {
        let t = test_db().await;
        let reviewer = t.user("reviewer").await;
        let assignment = t.assignment("a").await;
        let team = t.team(assignment.id, "reviewee", &[]).await;
        let reviewer_p = t.participant(assignment.id, reviewer.id).await;
        let review = t
            .mapping(MappingKind::Review, assignment.id, assignment.id, reviewer_p.id, team.id)
            .await;

        let selected = select_metareviewer(t.storage.as_ref(), review.id).await.unwrap();
        assert_eq!(selected.reviewer.id, reviewer_p.id);

        let err = select_reviewer(t.storage.as_ref(), team.id + 100).await.unwrap_err();
        assert_eq!(err.code(), "E101");
    }
}
