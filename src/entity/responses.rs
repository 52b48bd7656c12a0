//! 评审答卷实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "responses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub map_id: i64,
    pub round: i32,
    pub is_submitted: bool,
    pub total_score: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub additional_comment: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::response_maps::Entity",
        from = "Column::MapId",
        to = "super::response_maps::Column::Id"
    )]
    ResponseMap,
}

impl Related<super::response_maps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ResponseMap.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_response(self) -> crate::models::responses::entities::Response {
        use crate::models::responses::entities::Response;
        use chrono::{DateTime, Utc};

        Response {
            id: self.id,
            map_id: self.map_id,
            round: self.round,
            is_submitted: self.is_submitted,
            total_score: self.total_score,
            additional_comment: self.additional_comment,
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
            updated_at: DateTime::<Utc>::from_timestamp(self.updated_at, 0).unwrap_or_default(),
        }
    }
}
