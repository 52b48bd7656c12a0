//! 团队存储操作

use super::SeaOrmStorage;
use crate::entity::teams::{ActiveModel, Column, Entity as Teams};
use crate::entity::teams_users::{
    ActiveModel as TeamUserActiveModel, Column as TeamUserColumn, Entity as TeamsUsers,
};
use crate::errors::{ReviewSystemError, Result};
use crate::models::teams::entities::Team;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

impl SeaOrmStorage {
    /// 通过 ID 获取团队
    pub async fn get_team_by_id_impl(&self, id: i64) -> Result<Option<Team>> {
        let result = Teams::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("查询团队失败: {e}")))?;

        Ok(result.map(|m| m.into_team()))
    }

    /// 列出作业的全部团队
    pub async fn list_teams_impl(&self, assignment_id: i64) -> Result<Vec<Team>> {
        let teams = Teams::find()
            .filter(Column::AssignmentId.eq(assignment_id))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("查询团队列表失败: {e}")))?;

        Ok(teams.into_iter().map(|m| m.into_team()).collect())
    }

    /// 团队成员的用户 ID
    pub async fn list_team_member_ids_impl(&self, team_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = TeamsUsers::find()
            .select_only()
            .column(TeamUserColumn::UserId)
            .filter(TeamUserColumn::TeamId.eq(team_id))
            .order_by_asc(TeamUserColumn::UserId)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("查询团队成员失败: {e}")))?;

        Ok(ids)
    }

    /// 用户在作业中所属的团队
    pub async fn get_team_for_user_impl(
        &self,
        assignment_id: i64,
        user_id: i64,
    ) -> Result<Option<Team>> {
        let result = Teams::find()
            .inner_join(TeamsUsers)
            .filter(
                Condition::all()
                    .add(Column::AssignmentId.eq(assignment_id))
                    .add(TeamUserColumn::UserId.eq(user_id)),
            )
            .order_by_asc(Column::Id)
            .one(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("查询用户团队失败: {e}")))?;

        Ok(result.map(|m| m.into_team()))
    }

    /// 用户是否为团队成员
    pub async fn is_team_member_impl(&self, team_id: i64, user_id: i64) -> Result<bool> {
        let count = TeamsUsers::find()
            .filter(
                Condition::all()
                    .add(TeamUserColumn::TeamId.eq(team_id))
                    .add(TeamUserColumn::UserId.eq(user_id)),
            )
            .count(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("查询团队成员失败: {e}")))?;

        Ok(count > 0)
    }

    /// 创建只有一名成员的团队
    pub async fn create_team_with_member_impl(
        &self,
        assignment_id: i64,
        name: &str,
        user_id: i64,
    ) -> Result<Team> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("开启事务失败: {e}")))?;

        let team = ActiveModel {
            assignment_id: Set(assignment_id),
            name: Set(name.to_string()),
            topic_id: Set(None),
            created_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| ReviewSystemError::database_operation(format!("创建团队失败: {e}")))?;

        TeamUserActiveModel {
            team_id: Set(team.id),
            user_id: Set(user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| ReviewSystemError::database_operation(format!("添加团队成员失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(team.into_team())
    }

    /// 为团队设置选题
    pub async fn set_team_topic_impl(&self, team_id: i64, topic_id: i64) -> Result<bool> {
        let result = Teams::update_many()
            .col_expr(Column::TopicId, sea_orm::sea_query::Expr::value(topic_id))
            .filter(Column::Id.eq(team_id))
            .exec(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("更新团队选题失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Storage;
    use crate::storage::test_support::test_db;

    #[tokio::test]
    async fn test_team_membership_queries() {
        let t = test_db().await;
        let alice = t.user("alice").await;
        let bob = t.user("bob").await;
        let assignment = t.assignment("hw1").await;
        let team = t.team(assignment.id, "team1", &[alice.id, bob.id]).await;

        assert!(t.storage.is_team_member(team.id, alice.id).await.unwrap());
        assert_eq!(
            t.storage.list_team_member_ids(team.id).await.unwrap(),
            vec![alice.id, bob.id]
        );
        let found = t
            .storage
            .get_team_for_user(assignment.id, bob.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, team.id);

        let carol = t.user("carol").await;
        let solo = t
            .storage
            .create_team_with_member(assignment.id, "carol_team", carol.id)
            .await
            .unwrap();
        assert!(t.storage.is_team_member(solo.id, carol.id).await.unwrap());
        assert!(t.storage.set_team_topic(solo.id, 9).await.unwrap());
        let solo = t.storage.get_team_by_id(solo.id).await.unwrap().unwrap();
        assert_eq!(solo.topic_id, Some(9));
    }
}
