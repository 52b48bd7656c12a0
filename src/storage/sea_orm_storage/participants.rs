//! 参与者存储操作

use super::SeaOrmStorage;
use crate::entity::participants::{ActiveModel, Column, Entity as Participants};
use crate::errors::{ReviewSystemError, Result};
use crate::models::participants::entities::{Participant, ParticipantDefaults};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set, sea_query::OnConflict,
};

impl SeaOrmStorage {
    /// 通过 ID 获取参与者
    pub async fn get_participant_by_id_impl(&self, id: i64) -> Result<Option<Participant>> {
        let result = Participants::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("查询参与者失败: {e}")))?;

        Ok(result.map(|m| m.into_participant()))
    }

    /// 通过作业和用户获取参与者
    pub async fn get_participant_by_user_impl(
        &self,
        assignment_id: i64,
        user_id: i64,
    ) -> Result<Option<Participant>> {
        let result = Participants::find()
            .filter(
                Condition::all()
                    .add(Column::AssignmentId.eq(assignment_id))
                    .add(Column::UserId.eq(user_id)),
            )
            .one(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("查询参与者失败: {e}")))?;

        Ok(result.map(|m| m.into_participant()))
    }

    /// 查找或创建参与者
    ///
    /// 依赖 (assignment_id, user_id) 唯一索引：插入冲突时不做任何修改，随后重新读取。
    pub async fn find_or_create_participant_impl(
        &self,
        assignment_id: i64,
        user_id: i64,
        defaults: &ParticipantDefaults,
    ) -> Result<(Participant, bool)> {
        let model = ActiveModel {
            assignment_id: Set(assignment_id),
            user_id: Set(user_id),
            handle: Set(Some(defaults.handle.clone())),
            can_submit: Set(defaults.can_submit),
            can_review: Set(defaults.can_review),
            can_take_quiz: Set(defaults.can_take_quiz),
            topic_id: Set(None),
            created_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        };

        let inserted = Participants::insert(model)
            .on_conflict(
                OnConflict::columns([Column::AssignmentId, Column::UserId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("创建参与者失败: {e}")))?;

        let participant = self
            .get_participant_by_user_impl(assignment_id, user_id)
            .await?
            .ok_or_else(|| {
                ReviewSystemError::database_operation(format!(
                    "创建参与者失败: assignment {assignment_id}, user {user_id}"
                ))
            })?;

        Ok((participant, inserted > 0))
    }

    /// 列出作业的全部参与者
    pub async fn list_participants_impl(&self, assignment_id: i64) -> Result<Vec<Participant>> {
        let participants = Participants::find()
            .filter(Column::AssignmentId.eq(assignment_id))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| {
                ReviewSystemError::database_operation(format!("查询参与者列表失败: {e}"))
            })?;

        Ok(participants
            .into_iter()
            .map(|m| m.into_participant())
            .collect())
    }

    /// 批量获取参与者
    pub async fn list_participants_by_ids_impl(&self, ids: &[i64]) -> Result<Vec<Participant>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let participants = Participants::find()
            .filter(Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| {
                ReviewSystemError::database_operation(format!("查询参与者列表失败: {e}"))
            })?;

        Ok(participants
            .into_iter()
            .map(|m| m.into_participant())
            .collect())
    }
}
