use super::SeaOrmStorage;
use crate::entity::questionnaires::Entity as Questionnaires;
use crate::errors::{ReviewSystemError, Result};
use crate::models::questionnaires::entities::Questionnaire;
use sea_orm::EntityTrait;

impl SeaOrmStorage {
    /// 通过 ID 获取问卷
    pub async fn get_questionnaire_by_id_impl(&self, id: i64) -> Result<Option<Questionnaire>> {
        let result = Questionnaires::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("查询问卷失败: {e}")))?;

        Ok(result.map(|m| m.into_questionnaire()))
    }
}
