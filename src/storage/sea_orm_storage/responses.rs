use super::SeaOrmStorage;
use crate::entity::responses::{ActiveModel, Column, Entity as Responses};
use crate::errors::{ReviewSystemError, Result};
use crate::models::responses::entities::Response;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

impl SeaOrmStorage {
    /// 映射是否已有答卷
    pub async fn mapping_has_responses_impl(&self, map_id: i64) -> Result<bool> {
        let count = Responses::find()
            .filter(Column::MapId.eq(map_id))
            .count(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("查询答卷失败: {e}")))?;

        Ok(count > 0)
    }

    /// 列出一组映射下的答卷
    pub async fn list_responses_by_map_ids_impl(&self, map_ids: &[i64]) -> Result<Vec<Response>> {
        if map_ids.is_empty() {
            return Ok(Vec::new());
        }

        let responses = Responses::find()
            .filter(Column::MapId.is_in(map_ids.iter().copied()))
            .order_by_asc(Column::MapId)
            .order_by_asc(Column::Round)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("查询答卷列表失败: {e}")))?;

        Ok(responses.into_iter().map(|m| m.into_response()).collect())
    }

    /// 撤回映射下最新一份答卷的提交状态，没有答卷时返回 false
    pub async fn unsubmit_latest_response_impl(&self, map_id: i64) -> Result<bool> {
        let latest = Responses::find()
            .filter(Column::MapId.eq(map_id))
            .order_by_desc(Column::Round)
            .order_by_desc(Column::Id)
            .one(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("查询答卷失败: {e}")))?;

        let Some(latest) = latest else {
            return Ok(false);
        };

        ActiveModel {
            id: Set(latest.id),
            is_submitted: Set(false),
            updated_at: Set(chrono::Utc::now().timestamp()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(|e| ReviewSystemError::database_operation(format!("撤回答卷失败: {e}")))?;

        Ok(true)
    }
}
