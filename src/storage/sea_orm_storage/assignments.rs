//! 作业与选题存储操作（只读）

use super::SeaOrmStorage;
use crate::entity::assignments::Entity as Assignments;
use crate::entity::sign_up_topics::Entity as SignUpTopics;
use crate::errors::{ReviewSystemError, Result};
use crate::models::assignments::entities::{Assignment, SignUpTopic};
use sea_orm::EntityTrait;

impl SeaOrmStorage {
    /// 通过 ID 获取作业
    pub async fn get_assignment_by_id_impl(&self, id: i64) -> Result<Option<Assignment>> {
        let result = Assignments::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("查询作业失败: {e}")))?;

        Ok(result.map(|m| m.into_assignment()))
    }

    /// 通过 ID 获取选题
    pub async fn get_topic_by_id_impl(&self, id: i64) -> Result<Option<SignUpTopic>> {
        let result = SignUpTopics::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("查询选题失败: {e}")))?;

        Ok(result.map(|m| m.into_topic()))
    }
}
