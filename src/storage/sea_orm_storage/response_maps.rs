//! 评审映射存储操作
//!
//! 唯一索引 (reviewed_object_id, reviewer_id, reviewee_id, map_type) 保证同一键只有一条映射；
//! 删除路径在同一事务内检查答卷是否存在。

use super::SeaOrmStorage;
use crate::entity::response_maps::{ActiveModel, Column, Entity as ResponseMaps};
use crate::entity::responses::{Column as ResponseColumn, Entity as Responses};
use crate::errors::{ReviewSystemError, Result};
use crate::models::response_maps::{
    entities::{BatchDeleteReport, MappingKey, NewMapping, ResponseMap},
    requests::MappingQuery,
};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait, sea_query::OnConflict,
};
use tracing::debug;

fn key_condition(key: &MappingKey) -> Condition {
    Condition::all()
        .add(Column::ReviewedObjectId.eq(key.reviewed_object_id))
        .add(Column::ReviewerId.eq(key.reviewer_id))
        .add(Column::RevieweeId.eq(key.reviewee_id))
        .add(Column::MapType.eq(key.kind.as_str()))
}

async fn has_responses<C: ConnectionTrait>(db: &C, map_id: i64) -> Result<bool> {
    let count = Responses::find()
        .filter(ResponseColumn::MapId.eq(map_id))
        .count(db)
        .await
        .map_err(|e| ReviewSystemError::database_operation(format!("查询答卷失败: {e}")))?;

    Ok(count > 0)
}

impl SeaOrmStorage {
    /// 通过 ID 获取映射
    pub async fn get_mapping_by_id_impl(&self, id: i64) -> Result<Option<ResponseMap>> {
        let result = ResponseMaps::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("查询评审映射失败: {e}")))?;

        Ok(result.map(|m| m.into_response_map()))
    }

    /// 按唯一键查找映射
    pub async fn find_mapping_impl(&self, key: &MappingKey) -> Result<Option<ResponseMap>> {
        let result = ResponseMaps::find()
            .filter(key_condition(key))
            .one(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("查询评审映射失败: {e}")))?;

        Ok(result.map(|m| m.into_response_map()))
    }

    /// 查找或创建映射
    ///
    /// 插入冲突视为"已存在"，随后按键重新读取，不信任之前的查询结果。
    pub async fn find_or_create_mapping_impl(
        &self,
        mapping: &NewMapping,
    ) -> Result<(ResponseMap, bool)> {
        let key = mapping.key;
        let model = ActiveModel {
            assignment_id: Set(mapping.assignment_id),
            reviewed_object_id: Set(key.reviewed_object_id),
            reviewer_id: Set(key.reviewer_id),
            reviewee_id: Set(key.reviewee_id),
            map_type: Set(key.kind.as_str().to_string()),
            calibrate_to: Set(mapping.calibrate_to()),
            course_staff: Set(mapping.course_staff),
            created_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        };

        let inserted = ResponseMaps::insert(model)
            .on_conflict(
                OnConflict::columns([
                    Column::ReviewedObjectId,
                    Column::ReviewerId,
                    Column::RevieweeId,
                    Column::MapType,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("创建评审映射失败: {e}")))?;

        let stored = self.find_mapping_impl(&key).await?.ok_or_else(|| {
            ReviewSystemError::database_operation(format!("创建评审映射失败: {key:?}"))
        })?;

        if inserted == 0 {
            debug!("Mapping {} already exists for {:?}", stored.id, key);
        }

        Ok((stored, inserted > 0))
    }

    /// 按条件列出映射
    pub async fn list_mappings_impl(&self, query: &MappingQuery) -> Result<Vec<ResponseMap>> {
        let mut condition = Condition::all();

        if let Some(assignment_id) = query.assignment_id {
            condition = condition.add(Column::AssignmentId.eq(assignment_id));
        }
        if let Some(reviewed_object_id) = query.reviewed_object_id {
            condition = condition.add(Column::ReviewedObjectId.eq(reviewed_object_id));
        }
        if let Some(reviewer_id) = query.reviewer_id {
            condition = condition.add(Column::ReviewerId.eq(reviewer_id));
        }
        if let Some(reviewee_id) = query.reviewee_id {
            condition = condition.add(Column::RevieweeId.eq(reviewee_id));
        }
        if !query.kinds.is_empty() {
            condition =
                condition.add(Column::MapType.is_in(query.kinds.iter().map(|k| k.as_str())));
        }
        if let Some(course_staff) = query.course_staff {
            condition = condition.add(Column::CourseStaff.eq(course_staff));
        }

        let mappings = ResponseMaps::find()
            .filter(condition)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| {
                ReviewSystemError::database_operation(format!("查询评审映射列表失败: {e}"))
            })?;

        Ok(mappings
            .into_iter()
            .map(|m| m.into_response_map())
            .collect())
    }

    /// 删除单条映射，存在答卷时拒绝
    pub async fn delete_mapping_impl(&self, id: i64) -> Result<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("开启事务失败: {e}")))?;

        if has_responses(&txn, id).await? {
            return Ok(false);
        }

        let result = ResponseMaps::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("删除评审映射失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 批量删除映射
    ///
    /// 非强制模式跳过有答卷的映射；强制模式连同答卷一起删除。两种模式下 `blocked`
    /// 都是有答卷的映射数量。
    pub async fn delete_mappings_impl(
        &self,
        ids: &[i64],
        force: bool,
    ) -> Result<BatchDeleteReport> {
        let mut report = BatchDeleteReport::default();
        if ids.is_empty() {
            return Ok(report);
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("开启事务失败: {e}")))?;

        for &id in ids {
            if has_responses(&txn, id).await? {
                report.blocked += 1;
                if !force {
                    continue;
                }
                Responses::delete_many()
                    .filter(ResponseColumn::MapId.eq(id))
                    .exec(&txn)
                    .await
                    .map_err(|e| {
                        ReviewSystemError::database_operation(format!("删除答卷失败: {e}"))
                    })?;
            }

            let result = ResponseMaps::delete_by_id(id)
                .exec(&txn)
                .await
                .map_err(|e| {
                    ReviewSystemError::database_operation(format!("删除评审映射失败: {e}"))
                })?;
            report.deleted += result.rows_affected;
        }

        txn.commit()
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::response_maps::entities::{MappingKey, MappingKind, NewMapping};
    use crate::storage::Storage;
    use crate::storage::test_support::test_db;

    async fn seeded() -> (crate::storage::test_support::TestDb, i64, i64, i64) {
        let t = test_db().await;
        let user = t.user("reviewer").await;
        let assignment = t.assignment("hw1").await;
        let participant = t.participant(assignment.id, user.id).await;
        let team = t.team(assignment.id, "team1", &[]).await;
        (t, assignment.id, participant.id, team.id)
    }

    #[tokio::test]
    async fn test_find_or_create_is_idempotent() {
        let (t, assignment_id, reviewer_id, team_id) = seeded().await;
        let key = MappingKey::new(MappingKind::Review, assignment_id, reviewer_id, team_id);

        let (first, created) = t
            .storage
            .find_or_create_mapping(&NewMapping::new(key, assignment_id))
            .await
            .unwrap();
        assert!(created);

        let (second, created) = t
            .storage
            .find_or_create_mapping(&NewMapping::new(key, assignment_id))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);

        let all = t
            .storage
            .list_mappings(&Default::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_calibration_mapping_is_distinct_from_review() {
        let (t, assignment_id, reviewer_id, team_id) = seeded().await;
        let review = MappingKey::new(MappingKind::Review, assignment_id, reviewer_id, team_id);
        let calibration =
            MappingKey::new(MappingKind::Calibration, assignment_id, reviewer_id, team_id);

        let (r, _) = t
            .storage
            .find_or_create_mapping(&NewMapping::new(review, assignment_id))
            .await
            .unwrap();
        let (c, created) = t
            .storage
            .find_or_create_mapping(&NewMapping::new(calibration, assignment_id).course_staff(true))
            .await
            .unwrap();

        assert!(created);
        assert_ne!(r.id, c.id);
        assert!(c.calibrate_to);
        assert!(c.course_staff);
        assert!(!r.calibrate_to);
    }

    #[tokio::test]
    async fn test_delete_one_respects_response_guard() {
        let (t, assignment_id, reviewer_id, team_id) = seeded().await;
        let other_team = t.team(assignment_id, "team2", &[]).await;

        let (done, _) = t
            .storage
            .find_or_create_mapping(&NewMapping::new(
                MappingKey::new(MappingKind::Review, assignment_id, reviewer_id, team_id),
                assignment_id,
            ))
            .await
            .unwrap();
        let (fresh, _) = t
            .storage
            .find_or_create_mapping(&NewMapping::new(
                MappingKey::new(MappingKind::Review, assignment_id, reviewer_id, other_team.id),
                assignment_id,
            ))
            .await
            .unwrap();
        t.response(done.id, 1, Some(80.0)).await;

        assert!(!t.storage.delete_mapping(done.id).await.unwrap());
        assert!(t.storage.get_mapping_by_id(done.id).await.unwrap().is_some());

        assert!(t.storage.delete_mapping(fresh.id).await.unwrap());
        assert!(t.storage.get_mapping_by_id(fresh.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_batch_delete_force_reports_guard_count() {
        let (t, assignment_id, reviewer_id, team_id) = seeded().await;
        let mut ids = Vec::new();
        for i in 0..3 {
            let team = if i == 0 {
                team_id
            } else {
                t.team(assignment_id, &format!("extra{i}"), &[]).await.id
            };
            let (m, _) = t
                .storage
                .find_or_create_mapping(&NewMapping::new(
                    MappingKey::new(MappingKind::Review, assignment_id, reviewer_id, team),
                    assignment_id,
                ))
                .await
                .unwrap();
            ids.push(m.id);
        }
        t.response(ids[0], 1, None).await;
        t.response(ids[1], 1, None).await;

        let report = t.storage.delete_mappings(&ids, false).await.unwrap();
        assert_eq!(report.blocked, 2);
        assert_eq!(report.deleted, 1);
        assert!(t.storage.get_mapping_by_id(ids[0]).await.unwrap().is_some());

        let report = t.storage.delete_mappings(&ids, true).await.unwrap();
        assert_eq!(report.blocked, 2);
        assert_eq!(report.deleted, 2);
        assert!(t.storage.get_mapping_by_id(ids[0]).await.unwrap().is_none());
        assert!(t.storage.get_mapping_by_id(ids[1]).await.unwrap().is_none());
    }
}
