//! 问卷实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "questionnaires")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub questionnaire_type: String,
    pub instructor_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_questionnaire(self) -> crate::models::questionnaires::entities::Questionnaire {
        crate::models::questionnaires::entities::Questionnaire {
            id: self.id,
            name: self.name,
            questionnaire_type: self.questionnaire_type,
            instructor_id: self.instructor_id,
        }
    }
}
