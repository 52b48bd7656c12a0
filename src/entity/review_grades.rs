//! 评审者成绩实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "review_grades")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub participant_id: i64,
    pub grade_for_reviewer: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub comment_for_reviewer: Option<String>,
    pub review_graded_at: i64,
    pub reviewer_id_who_graded: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_review_grade(self) -> crate::models::review_grades::entities::ReviewGrade {
        use crate::models::review_grades::entities::ReviewGrade;
        use chrono::{DateTime, Utc};

        ReviewGrade {
            id: self.id,
            participant_id: self.participant_id,
            grade_for_reviewer: self.grade_for_reviewer,
            comment_for_reviewer: self.comment_for_reviewer,
            review_graded_at: DateTime::<Utc>::from_timestamp(self.review_graded_at, 0)
                .unwrap_or_default(),
            reviewer_id_who_graded: self.reviewer_id_who_graded,
        }
    }
}
