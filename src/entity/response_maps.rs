//! 评审映射实体
//!
//! 所有映射类型共用一张表，通过 `map_type` 区分。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "response_maps")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub assignment_id: i64,
    pub reviewed_object_id: i64,
    pub reviewer_id: i64,
    pub reviewee_id: i64,
    pub map_type: String,
    pub calibrate_to: bool,
    pub course_staff: bool,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::participants::Entity",
        from = "Column::ReviewerId",
        to = "super::participants::Column::Id"
    )]
    Reviewer,
    #[sea_orm(has_many = "super::responses::Entity")]
    Responses,
}

impl Related<super::participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviewer.def()
    }
}

impl Related<super::responses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Responses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_response_map(self) -> crate::models::response_maps::entities::ResponseMap {
        use crate::models::response_maps::entities::{MappingKind, ResponseMap};
        use chrono::{DateTime, Utc};

        ResponseMap {
            id: self.id,
            assignment_id: self.assignment_id,
            reviewed_object_id: self.reviewed_object_id,
            reviewer_id: self.reviewer_id,
            reviewee_id: self.reviewee_id,
            kind: self
                .map_type
                .parse::<MappingKind>()
                .unwrap_or(MappingKind::Review),
            calibrate_to: self.calibrate_to,
            course_staff: self.course_staff,
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
        }
    }
}
