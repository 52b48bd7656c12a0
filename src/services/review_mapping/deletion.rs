//! 删除映射与撤回答卷
//!
//! 存在答卷的映射不可单独删除；批量删除时拒绝的条目汇总为一个计数，
//! 只有显式 `force` 才会连同答卷一起删除。

use tracing::{error, info, warn};

use super::{
    recover,
    registry::{participant_name, require_assignment, require_mapping, require_team, reviewee_name},
};
use crate::config::ReviewConfig;
use crate::errors::{ReviewSystemError, Result};
use crate::models::{
    response_maps::{
        entities::{MappingKind, ResponseMap},
        requests::MappingQuery,
    },
    review_mapping::{
        requests::{DeleteAllMetareviewersQuery, DeleteOutstandingReviewersRequest},
        responses::{Flash, Navigation},
    },
};
use crate::storage::Storage;
use crate::utils::url;

const LIST_MAPPINGS: &str = "/review_mapping/list_mappings";

async fn require_mapping_of_kind(
    storage: &dyn Storage,
    id: i64,
    kinds: &[MappingKind],
) -> Result<ResponseMap> {
    let mapping = require_mapping(storage, id).await?;
    if !kinds.contains(&mapping.kind) {
        return Err(ReviewSystemError::not_found(format!(
            "Mapping {id} is not a {} mapping.",
            kinds[0]
        )));
    }
    Ok(mapping)
}

/// 删除团队所有尚未开始的评审
pub async fn delete_outstanding_reviewers(
    storage: &dyn Storage,
    request: DeleteOutstandingReviewersRequest,
) -> Result<Navigation> {
    let assignment_id = request.assignment_id;
    let result = delete_outstanding(storage, request).await;
    recover(result, || url::list_mappings(assignment_id))
}

async fn delete_outstanding(
    storage: &dyn Storage,
    request: DeleteOutstandingReviewersRequest,
) -> Result<Navigation> {
    let assignment = require_assignment(storage, request.assignment_id).await?;
    let team = require_team(storage, request.contributor_id).await?;

    let ids: Vec<i64> = storage
        .list_mappings(
            &MappingQuery::of_kind(MappingKind::Review)
                .assignment(assignment.id)
                .reviewee(team.id),
        )
        .await?
        .into_iter()
        .map(|m| m.id)
        .collect();
    let report = storage.delete_mappings(&ids, false).await?;
    info!(
        "Deleted {} outstanding review mappings of team {} ({} kept)",
        report.deleted, team.id, report.blocked
    );

    let nav = Navigation::to(url::list_mappings(assignment.id));
    if report.blocked > 0 {
        Ok(nav.with_flash(Flash::error(format!(
            "{} reviewer(s) cannot be deleted because they have already started a review.",
            report.blocked
        ))))
    } else {
        Ok(nav.with_flash(Flash::success(format!(
            "All review mappings for \"{}\" have been deleted.",
            team.name
        ))))
    }
}

/// 删除一份评审下的全部元评审
pub async fn delete_all_metareviewers(
    storage: &dyn Storage,
    config: &ReviewConfig,
    query: DeleteAllMetareviewersQuery,
) -> Result<Navigation> {
    let mapping = match require_mapping(storage, query.id).await {
        Ok(mapping) => mapping,
        Err(e) => return recover(Err(e), || LIST_MAPPINGS.to_string()),
    };

    let ids: Vec<i64> = storage
        .list_mappings(&MappingQuery::of_kind(MappingKind::Metareview).reviewed_object(mapping.id))
        .await?
        .into_iter()
        .map(|m| m.id)
        .collect();
    let report = storage.delete_mappings(&ids, query.force).await?;
    info!(
        "Metareview batch delete for mapping {} (force = {}): {} deleted, {} with responses",
        mapping.id, query.force, report.deleted, report.blocked
    );

    let nav = Navigation::to(url::list_mappings(mapping.assignment_id));
    if report.blocked > 0 && !query.force {
        let base = &config.public_base_url;
        let yes = url::absolute(
            base,
            &url::with_query(
                "/review_mapping/delete_all_metareviewers",
                &[("force", 1), ("id", mapping.id)],
            ),
        );
        let no = url::absolute(
            base,
            &url::with_query("/review_mapping/delete_all_metareviewers", &[("id", mapping.id)]),
        );
        return Ok(nav.with_flash(Flash::error(format!(
            "A delete action failed:<br/>{} metareviews exist for these mappings. Delete these mappings anyway?&nbsp;<a href='{yes}'>Yes</a>&nbsp;|&nbsp;<a href='{no}'>No</a><BR/>",
            report.blocked
        ))));
    }

    let reviewee = reviewee_name(storage, &mapping).await?;
    let reviewer = participant_name(storage, mapping.reviewer_id).await?;
    Ok(nav.with_flash(Flash::note(format!(
        "All metareview mappings for contributor \"{reviewee}\" and reviewer \"{reviewer}\" have been deleted."
    ))))
}

/// 删除单条评审映射，返回来源页面
pub async fn delete_reviewer(
    storage: &dyn Storage,
    map_id: i64,
    referer: Option<String>,
) -> Result<Navigation> {
    let mapping = match require_mapping(storage, map_id).await {
        Ok(mapping) => mapping,
        Err(e) => {
            return recover(Err(e), || referer.unwrap_or_else(|| LIST_MAPPINGS.to_string()));
        }
    };
    let target = referer.unwrap_or_else(|| url::list_mappings(mapping.assignment_id));

    let reviewee = reviewee_name(storage, &mapping).await?;
    let reviewer = participant_name(storage, mapping.reviewer_id).await?;

    if storage.delete_mapping(mapping.id).await? {
        info!("Deleted review mapping {}", mapping.id);
        Ok(Navigation::to(target).with_flash(Flash::success(format!(
            "The review mapping for \"{reviewee}\" and \"{reviewer}\" has been deleted."
        ))))
    } else {
        warn!("Refused to delete review mapping {} with responses", mapping.id);
        Ok(Navigation::to(target).with_flash(Flash::error(
            "This review has already been done. It cannot been deleted.",
        )))
    }
}

fn delete_failed(map_id: i64, reason: &str) -> Flash {
    Flash::error(format!(
        "A delete action failed:<br/>{reason}<a href='/review_mapping/delete_metareview/{map_id}'>Delete this mapping anyway>?"
    ))
}

/// 删除单条元评审映射
pub async fn delete_metareviewer(storage: &dyn Storage, map_id: i64) -> Result<Navigation> {
    let mapping = match require_mapping_of_kind(storage, map_id, &[MappingKind::Metareview]).await {
        Ok(mapping) => mapping,
        Err(e) => return recover(Err(e), || LIST_MAPPINGS.to_string()),
    };
    let nav = Navigation::to(url::list_mappings(mapping.assignment_id));

    let reviewee = reviewee_name(storage, &mapping).await?;
    let reviewer = participant_name(storage, mapping.reviewer_id).await?;

    match storage.delete_mapping(mapping.id).await {
        Ok(true) => {
            info!("Deleted metareview mapping {}", mapping.id);
            Ok(nav.with_flash(Flash::note(format!(
                "The metareview mapping for {reviewee} and {reviewer} has been deleted."
            ))))
        }
        Ok(false) => {
            warn!(
                "Refused to delete metareview mapping {} with responses",
                mapping.id
            );
            Ok(nav.with_flash(delete_failed(
                mapping.id,
                "This metareview has already been done.",
            )))
        }
        Err(e) => {
            error!("Failed to delete metareview mapping {}: {}", mapping.id, e);
            Ok(nav.with_flash(delete_failed(mapping.id, e.message())))
        }
    }
}

/// 删除元评审（同样受答卷保护）
pub async fn delete_metareview(storage: &dyn Storage, map_id: i64) -> Result<Navigation> {
    let mapping = match require_mapping_of_kind(storage, map_id, &[MappingKind::Metareview]).await {
        Ok(mapping) => mapping,
        Err(e) => return recover(Err(e), || LIST_MAPPINGS.to_string()),
    };
    let nav = Navigation::to(url::list_mappings(mapping.assignment_id));

    if storage.delete_mapping(mapping.id).await? {
        info!("Deleted metareview mapping {}", mapping.id);
        Ok(nav)
    } else {
        warn!(
            "Refused to delete metareview mapping {} with responses",
            mapping.id
        );
        Ok(nav.with_flash(Flash::error(
            "This metareview has already been done. It cannot be deleted.",
        )))
    }
}

/// 撤回评审答卷的提交状态
pub async fn unsubmit_response(storage: &dyn Storage, map_id: i64) -> Result<Navigation> {
    let mapping = match require_mapping(storage, map_id).await {
        Ok(mapping) => mapping,
        Err(e) => return recover(Err(e), || LIST_MAPPINGS.to_string()),
    };
    let nav = Navigation::to(url::list_mappings(mapping.assignment_id)).with_mapping(mapping.id);

    let reviewee = reviewee_name(storage, &mapping).await?;
    let reviewer = participant_name(storage, mapping.reviewer_id).await?;

    let unsubmitted = match storage.unsubmit_latest_response(mapping.id).await {
        Ok(found) => found,
        Err(e) => {
            error!("Failed to unsubmit the response of mapping {}: {}", mapping.id, e);
            false
        }
    };

    if unsubmitted {
        info!("Unsubmitted the latest response of mapping {}", mapping.id);
        Ok(nav.with_flash(Flash::success(format!(
            "The review by \"{reviewer}\" for \"{reviewee}\" has been unsubmitted."
        ))))
    } else {
        Ok(nav.with_flash(Flash::error(format!(
            "The review by \"{reviewer}\" for \"{reviewee}\" could not be unsubmitted."
        ))))
    }
}
