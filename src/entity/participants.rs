//! 作业参与者实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "participants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub assignment_id: i64,
    pub user_id: i64,
    pub handle: Option<String>,
    pub can_submit: bool,
    pub can_review: bool,
    pub can_take_quiz: bool,
    pub topic_id: Option<i64>,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assignments::Entity",
        from = "Column::AssignmentId",
        to = "super::assignments::Column::Id"
    )]
    Assignment,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::response_maps::Entity")]
    ResponseMaps,
}

impl Related<super::assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::response_maps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ResponseMaps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_participant(self) -> crate::models::participants::entities::Participant {
        use crate::models::participants::entities::Participant;
        use chrono::{DateTime, Utc};

        Participant {
            id: self.id,
            assignment_id: self.assignment_id,
            user_id: self.user_id,
            handle: self.handle,
            can_submit: self.can_submit,
            can_review: self.can_review,
            can_take_quiz: self.can_take_quiz,
            topic_id: self.topic_id,
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
        }
    }
}
