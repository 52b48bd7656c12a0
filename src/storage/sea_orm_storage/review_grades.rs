use super::SeaOrmStorage;
use crate::entity::review_grades::{ActiveModel, Column, Entity as ReviewGrades};
use crate::errors::{ReviewSystemError, Result};
use crate::models::review_grades::{entities::ReviewGrade, requests::SaveReviewGradeRequest};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set, sea_query::OnConflict};

impl SeaOrmStorage {
    /// 获取评审者成绩
    pub async fn get_review_grade_impl(&self, participant_id: i64) -> Result<Option<ReviewGrade>> {
        let result = ReviewGrades::find()
            .filter(Column::ParticipantId.eq(participant_id))
            .one(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("查询评审成绩失败: {e}")))?;

        Ok(result.map(|m| m.into_review_grade()))
    }

    /// 保存评审者成绩（按参与者覆盖）
    pub async fn save_review_grade_impl(
        &self,
        req: SaveReviewGradeRequest,
        graded_by: i64,
    ) -> Result<ReviewGrade> {
        let participant_id = req.participant_id;
        let model = ActiveModel {
            participant_id: Set(participant_id),
            grade_for_reviewer: Set(req.grade_for_reviewer),
            comment_for_reviewer: Set(req.comment_for_reviewer),
            review_graded_at: Set(chrono::Utc::now().timestamp()),
            reviewer_id_who_graded: Set(graded_by),
            ..Default::default()
        };

        ReviewGrades::insert(model)
            .on_conflict(
                OnConflict::column(Column::ParticipantId)
                    .update_columns([
                        Column::GradeForReviewer,
                        Column::CommentForReviewer,
                        Column::ReviewGradedAt,
                        Column::ReviewerIdWhoGraded,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("保存评审成绩失败: {e}")))?;

        self.get_review_grade_impl(participant_id)
            .await?
            .ok_or_else(|| {
                ReviewSystemError::database_operation(format!(
                    "保存评审成绩失败: participant {participant_id}"
                ))
            })
    }
}
