//! 教师手动添加评审者、元评审者，以及学生发起自评

use tracing::{info, warn};

use super::{
    recover,
    registry::{
        require_assignment, require_mapping, require_participant, require_team, resolve_or_create,
    },
};
use crate::config::ReviewConfig;
use crate::errors::{ReviewSystemError, Result};
use crate::models::{
    assignments::entities::Assignment,
    participants::entities::{Participant, ParticipantDefaults},
    response_maps::entities::{MappingKey, MappingKind, NewMapping, ResponseMap},
    review_mapping::{
        requests::{
            AddMetareviewerRequest, AddReviewerRequest, AddUserToAssignmentRequest,
            StartSelfReviewRequest,
        },
        responses::{Flash, Navigation},
    },
    teams::entities::Team,
    users::entities::User,
};
use crate::storage::Storage;
use crate::utils::url;

async fn require_user_named(storage: &dyn Storage, user_name: &str) -> Result<User> {
    let user_name = user_name.trim();
    storage
        .get_user_by_username(user_name)
        .await?
        .ok_or_else(|| {
            ReviewSystemError::not_found(format!("\"{user_name}\" is not a valid user."))
        })
}

// 评审者必须已是作业参与者，否则提示注册链接
async fn require_registered(
    storage: &dyn Storage,
    config: &ReviewConfig,
    assignment_id: i64,
    user: &User,
    register_query: &[(&str, i64)],
) -> Result<Participant> {
    match storage.get_participant_by_user(assignment_id, user.id).await? {
        Some(participant) => Ok(participant),
        None => {
            let link = url::absolute(
                &config.public_base_url,
                &url::with_query("/review_mapping/add_user_to_assignment", register_query),
            );
            Err(ReviewSystemError::not_found(format!(
                "\"{}\" is not a participant in the assignment. Please <a href='{}'>register</a> this user to continue.",
                user.name(),
                link
            )))
        }
    }
}

// 评审者所在团队尚未选题时为其报名该题目
async fn sign_up_for_topic(
    storage: &dyn Storage,
    assignment: &Assignment,
    topic_id: i64,
    user_id: i64,
) -> Result<()> {
    let topic = storage
        .get_topic_by_id(topic_id)
        .await?
        .filter(|topic| topic.assignment_id == assignment.id)
        .ok_or_else(|| ReviewSystemError::not_found(format!("Topic {topic_id} does not exist.")))?;

    let Some(team) = storage.get_team_for_user(assignment.id, user_id).await? else {
        return Ok(());
    };
    if team.topic_id.is_none() && storage.set_team_topic(team.id, topic.id).await? {
        info!("Team {} signed up for topic {}", team.id, topic.id);
    }
    Ok(())
}

async fn assign_named_reviewer(
    storage: &dyn Storage,
    config: &ReviewConfig,
    assignment: &Assignment,
    team: &Team,
    user: &User,
) -> Result<ResponseMap> {
    let reviewer = require_registered(
        storage,
        config,
        assignment.id,
        user,
        &[
            ("contributor_id", team.id),
            ("id", assignment.id),
            ("user_id", user.id),
        ],
    )
    .await?;

    let key = MappingKey::new(MappingKind::Review, assignment.id, reviewer.id, team.id);
    let (mapping, created) = storage
        .find_or_create_mapping(&NewMapping::new(key, assignment.id))
        .await?;
    if !created {
        return Err(ReviewSystemError::already_exists(format!(
            "The reviewer, \"{}\", is already assigned to this contributor.",
            user.name()
        )));
    }

    info!(
        "Participant {} assigned to review team {} (mapping {})",
        reviewer.id, team.id, mapping.id
    );
    Ok(mapping)
}

// 把领域错误收敛为 msg 参数
fn into_msg(result: Result<ResponseMap>) -> Result<(String, Option<i64>)> {
    match result {
        Ok(mapping) => Ok((String::new(), Some(mapping.id))),
        Err(e) if e.is_domain() => Ok((e.message().to_string(), None)),
        Err(e) => Err(e),
    }
}

fn with_msg(assignment_id: i64, msg: String, mapping_id: Option<i64>) -> Navigation {
    let nav = Navigation::to(url::list_mappings_with_msg(assignment_id, &msg));
    let nav = match mapping_id {
        Some(id) => nav.with_mapping(id),
        None => nav,
    };
    if msg.is_empty() {
        nav
    } else {
        nav.with_flash(Flash::error(msg))
    }
}

/// 为团队手动添加评审者
pub async fn add_reviewer(
    storage: &dyn Storage,
    config: &ReviewConfig,
    request: AddReviewerRequest,
) -> Result<Navigation> {
    let assignment_id = request.assignment_id;
    let result = add_reviewer_checked(storage, config, request).await;
    recover(result, || url::list_mappings(assignment_id))
}

async fn add_reviewer_checked(
    storage: &dyn Storage,
    config: &ReviewConfig,
    request: AddReviewerRequest,
) -> Result<Navigation> {
    let assignment = require_assignment(storage, request.assignment_id).await?;
    let team = require_team(storage, request.contributor_id).await?;
    let user = require_user_named(storage, &request.user_name).await?;

    if storage.is_team_member(team.id, user.id).await? {
        warn!("User {} refused as reviewer of own team {}", user.id, team.id);
        return Err(ReviewSystemError::invariant_violation(
            "You cannot assign this student to review his/her own artifact.",
        ));
    }

    if let Some(topic_id) = request.topic_id {
        sign_up_for_topic(storage, &assignment, topic_id, user.id).await?;
    }

    let (msg, mapping_id) =
        into_msg(assign_named_reviewer(storage, config, &assignment, &team, &user).await)?;
    Ok(with_msg(assignment.id, msg, mapping_id))
}

/// 将用户注册为作业参与者；带 contributor_id 时继续为该团队添加评审者
pub async fn add_user_to_assignment(
    storage: &dyn Storage,
    config: &ReviewConfig,
    request: AddUserToAssignmentRequest,
) -> Result<Navigation> {
    let assignment_id = request.assignment_id;
    let result = register_user(storage, config, request).await;
    recover(result, || url::list_mappings(assignment_id))
}

async fn register_user(
    storage: &dyn Storage,
    config: &ReviewConfig,
    request: AddUserToAssignmentRequest,
) -> Result<Navigation> {
    let assignment = require_assignment(storage, request.assignment_id).await?;
    let participant = resolve_or_create(
        storage,
        assignment.id,
        request.user_id,
        &ParticipantDefaults::full(&config.default_handle),
    )
    .await?;

    let user = storage
        .get_user_by_id(participant.user_id)
        .await?
        .ok_or_else(|| {
            ReviewSystemError::not_found(format!("User {} does not exist.", request.user_id))
        })?;

    match request.contributor_id {
        Some(contributor_id) => {
            add_reviewer(
                storage,
                config,
                AddReviewerRequest {
                    assignment_id: assignment.id,
                    topic_id: None,
                    contributor_id,
                    user_name: user.username.clone(),
                },
            )
            .await
        }
        None => Ok(
            Navigation::to(url::list_mappings(assignment.id)).with_flash(Flash::success(
                format!("\"{}\" has been added to the assignment.", user.name()),
            )),
        ),
    }
}

/// 为评审映射添加元评审者
pub async fn add_metareviewer(
    storage: &dyn Storage,
    config: &ReviewConfig,
    request: AddMetareviewerRequest,
) -> Result<Navigation> {
    let mapping = match require_mapping(storage, request.map_id).await {
        Ok(mapping) => mapping,
        Err(e) => return recover(Err(e), || "/review_mapping/list_mappings".to_string()),
    };

    let (msg, mapping_id) =
        into_msg(assign_named_metareviewer(storage, config, &mapping, &request.user_name).await)?;
    Ok(with_msg(mapping.assignment_id, msg, mapping_id))
}

async fn assign_named_metareviewer(
    storage: &dyn Storage,
    config: &ReviewConfig,
    mapping: &ResponseMap,
    user_name: &str,
) -> Result<ResponseMap> {
    let assignment_id = mapping.assignment_id;
    let user = require_user_named(storage, user_name).await?;
    let metareviewer = require_registered(
        storage,
        config,
        assignment_id,
        &user,
        &[("id", assignment_id), ("user_id", user.id)],
    )
    .await?;

    let key = MappingKey::new(
        MappingKind::Metareview,
        mapping.id,
        metareviewer.id,
        mapping.reviewer_id,
    );
    let (metareview, created) = storage
        .find_or_create_mapping(&NewMapping::new(key, assignment_id))
        .await?;
    if !created {
        return Err(ReviewSystemError::already_exists(format!(
            "The metareviewer \"{}\" is already assigned to this reviewer.",
            user.name()
        )));
    }

    info!(
        "Participant {} assigned to metareview mapping {}",
        metareviewer.id, mapping.id
    );
    Ok(metareview)
}

/// 学生为自己的团队发起自评
pub async fn start_self_review(
    storage: &dyn Storage,
    request: StartSelfReviewRequest,
) -> Result<Navigation> {
    let participant = match require_participant(storage, request.reviewer_id).await {
        Ok(participant)
            if participant.assignment_id == request.assignment_id
                && participant.user_id == request.reviewer_userid =>
        {
            participant
        }
        Ok(_) => {
            return recover(
                Err(ReviewSystemError::not_found(
                    "The participant does not belong to this user and assignment.",
                )),
                || url::submitted_content_edit(request.reviewer_id, None),
            );
        }
        Err(e) => {
            return recover(Err(e), || {
                url::submitted_content_edit(request.reviewer_id, None)
            });
        }
    };

    let Some(team) = storage
        .get_team_for_user(request.assignment_id, request.reviewer_userid)
        .await?
    else {
        let msg = "No team is found for this user.";
        return Ok(
            Navigation::to(url::submitted_content_edit(participant.id, Some(msg)))
                .with_flash(Flash::error(msg)),
        );
    };

    let key = MappingKey::new(
        MappingKind::SelfReview,
        request.assignment_id,
        participant.id,
        team.id,
    );
    let (mapping, created) = storage
        .find_or_create_mapping(&NewMapping::new(key, request.assignment_id))
        .await?;

    if !created {
        let msg = "Self review already assigned!";
        return Ok(
            Navigation::to(url::submitted_content_edit(participant.id, Some(msg)))
                .with_flash(Flash::error(msg))
                .with_mapping(mapping.id),
        );
    }

    info!(
        "Self review mapping {} created for participant {}",
        mapping.id, participant.id
    );
    Ok(Navigation::to(url::submitted_content_edit(participant.id, None)).with_mapping(mapping.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::response_maps::requests::MappingQuery;
    use crate::storage::test_support::{TestDb, test_db};

    fn config() -> ReviewConfig {
        ReviewConfig {
            public_base_url: "http://test.host".to_string(),
            ..Default::default()
        }
    }

    struct Fixture {
        assignment: Assignment,
        team: Team,
        author: User,
        reviewer: User,
    }

    async fn fixture(t: &TestDb) -> Fixture {
        let author = t.user("author").await;
        let reviewer = t.user("expertiza").await;
        let assignment = t.assignment("review").await;
        let team = t.team(assignment.id, "no one", &[author.id]).await;
        Fixture {
            assignment,
            team,
            author,
            reviewer,
        }
    }

    fn request(f: &Fixture, user_name: &str) -> AddReviewerRequest {
        AddReviewerRequest {
            assignment_id: f.assignment.id,
            topic_id: None,
            contributor_id: f.team.id,
            user_name: user_name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_reviewer_refuses_own_artifact() {
        let t = test_db().await;
        let f = fixture(&t).await;

        let nav = add_reviewer(t.storage.as_ref(), &config(), request(&f, "author"))
            .await
            .unwrap();

        assert_eq!(
            nav.message(),
            "You cannot assign this student to review his/her own artifact."
        );
        assert_eq!(
            nav.redirect_to,
            format!("/review_mapping/list_mappings?id={}", f.assignment.id)
        );
        assert!(
            t.storage
                .list_mappings(&MappingQuery::of_kind(MappingKind::Review))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_add_reviewer_creates_mapping_with_empty_msg() {
        let t = test_db().await;
        let f = fixture(&t).await;
        let participant = t.participant(f.assignment.id, f.reviewer.id).await;

        let nav = add_reviewer(t.storage.as_ref(), &config(), request(&f, "expertiza"))
            .await
            .unwrap();

        assert!(nav.flash.is_none());
        assert_eq!(
            nav.redirect_to,
            format!("/review_mapping/list_mappings?id={}&msg=", f.assignment.id)
        );
        let mapping = t
            .storage
            .get_mapping_by_id(nav.mapping_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mapping.reviewer_id, participant.id);
        assert_eq!(mapping.reviewee_id, f.team.id);
        assert_eq!(mapping.kind, MappingKind::Review);
    }

    #[tokio::test]
    async fn test_add_reviewer_twice_reports_duplicate() {
        let t = test_db().await;
        let f = fixture(&t).await;
        t.participant(f.assignment.id, f.reviewer.id).await;

        add_reviewer(t.storage.as_ref(), &config(), request(&f, "expertiza"))
            .await
            .unwrap();
        let nav = add_reviewer(t.storage.as_ref(), &config(), request(&f, "expertiza"))
            .await
            .unwrap();

        assert!(nav.is_error());
        assert_eq!(
            nav.message(),
            "The reviewer, \"expertiza\", is already assigned to this contributor."
        );
        assert!(nav.redirect_to.contains("&msg=The+reviewer"));
        assert_eq!(
            t.storage
                .list_mappings(&MappingQuery::of_kind(MappingKind::Review))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_add_reviewer_requires_registration() {
        let t = test_db().await;
        let f = fixture(&t).await;

        let nav = add_reviewer(t.storage.as_ref(), &config(), request(&f, "expertiza"))
            .await
            .unwrap();

        let link = format!(
            "http://test.host/review_mapping/add_user_to_assignment?contributor_id={}&id={}&user_id={}",
            f.team.id, f.assignment.id, f.reviewer.id
        );
        assert!(nav.message().starts_with("\"expertiza\" is not a participant in the assignment."));
        assert!(nav.message().contains(&link));
    }

    #[tokio::test]
    async fn test_add_reviewer_signs_team_up_for_topic() {
        let t = test_db().await;
        let f = fixture(&t).await;
        t.participant(f.assignment.id, f.reviewer.id).await;
        let reviewer_team = t.team(f.assignment.id, "reviewers", &[f.reviewer.id]).await;
        let topic = t.topic(f.assignment.id, "compilers").await;

        let mut req = request(&f, "expertiza");
        req.topic_id = Some(topic);
        add_reviewer(t.storage.as_ref(), &config(), req).await.unwrap();

        let team = t.storage.get_team_by_id(reviewer_team.id).await.unwrap().unwrap();
        assert_eq!(team.topic_id, Some(topic));
    }

    #[tokio::test]
    async fn test_add_user_to_assignment_then_reviewer() {
        let t = test_db().await;
        let f = fixture(&t).await;

        let nav = add_user_to_assignment(
            t.storage.as_ref(),
            &config(),
            AddUserToAssignmentRequest {
                assignment_id: f.assignment.id,
                user_id: f.reviewer.id,
                contributor_id: Some(f.team.id),
            },
        )
        .await
        .unwrap();

        assert!(!nav.is_error());
        assert!(nav.mapping_id.is_some());
        let participant = t
            .storage
            .get_participant_by_user(f.assignment.id, f.reviewer.id)
            .await
            .unwrap()
            .unwrap();
        assert!(participant.can_submit && participant.can_review && participant.can_take_quiz);
    }

    #[tokio::test]
    async fn test_add_metareviewer() {
        let t = test_db().await;
        let f = fixture(&t).await;
        let reviewer_p = t.participant(f.assignment.id, f.reviewer.id).await;
        let meta_user = t.user("meta").await;
        let meta_p = t.participant(f.assignment.id, meta_user.id).await;
        let review = t
            .mapping(
                MappingKind::Review,
                f.assignment.id,
                f.assignment.id,
                reviewer_p.id,
                f.team.id,
            )
            .await;

        let req = AddMetareviewerRequest {
            map_id: review.id,
            user_name: "meta".to_string(),
        };
        let nav = add_metareviewer(t.storage.as_ref(), &config(), req.clone())
            .await
            .unwrap();
        assert_eq!(
            nav.redirect_to,
            format!("/review_mapping/list_mappings?id={}&msg=", f.assignment.id)
        );

        let meta = t
            .storage
            .get_mapping_by_id(nav.mapping_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(meta.kind, MappingKind::Metareview);
        assert_eq!(meta.reviewed_object_id, review.id);
        assert_eq!(meta.reviewer_id, meta_p.id);
        assert_eq!(meta.reviewee_id, reviewer_p.id);

        let again = add_metareviewer(t.storage.as_ref(), &config(), req).await.unwrap();
        assert_eq!(
            again.message(),
            "The metareviewer \"meta\" is already assigned to this reviewer."
        );
    }

    #[tokio::test]
    async fn test_add_metareviewer_not_participant_link() {
        let t = test_db().await;
        let f = fixture(&t).await;
        let reviewer_p = t.participant(f.assignment.id, f.reviewer.id).await;
        let outsider = t.user("outsider").await;
        let review = t
            .mapping(
                MappingKind::Review,
                f.assignment.id,
                f.assignment.id,
                reviewer_p.id,
                f.team.id,
            )
            .await;

        let nav = add_metareviewer(
            t.storage.as_ref(),
            &config(),
            AddMetareviewerRequest {
                map_id: review.id,
                user_name: "outsider".to_string(),
            },
        )
        .await
        .unwrap();

        assert!(nav.message().contains(&format!(
            "http://test.host/review_mapping/add_user_to_assignment?id={}&user_id={}",
            f.assignment.id, outsider.id
        )));
    }

    #[tokio::test]
    async fn test_start_self_review() {
        let t = test_db().await;
        let f = fixture(&t).await;
        let author_p = t.participant(f.assignment.id, f.author.id).await;
        let req = StartSelfReviewRequest {
            assignment_id: f.assignment.id,
            reviewer_id: author_p.id,
            reviewer_userid: f.author.id,
        };

        let nav = start_self_review(t.storage.as_ref(), req.clone()).await.unwrap();
        assert_eq!(
            nav.redirect_to,
            format!("/submitted_content/{}/edit", author_p.id)
        );

        let again = start_self_review(t.storage.as_ref(), req).await.unwrap();
        assert_eq!(
            again.redirect_to,
            format!(
                "/submitted_content/{}/edit?msg=Self+review+already+assigned%21",
                author_p.id
            )
        );
        assert_eq!(again.mapping_id, nav.mapping_id);
    }

    #[tokio::test]
    async fn test_start_self_review_without_team() {
        let t = test_db().await;
        let f = fixture(&t).await;
        let reviewer_p = t.participant(f.assignment.id, f.reviewer.id).await;

        let nav = start_self_review(
            t.storage.as_ref(),
            StartSelfReviewRequest {
                assignment_id: f.assignment.id,
                reviewer_id: reviewer_p.id,
                reviewer_userid: f.reviewer.id,
            },
        )
        .await
        .unwrap();

        assert!(nav.is_error());
        assert_eq!(nav.message(), "No team is found for this user.");
    }
}
