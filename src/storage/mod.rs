use std::sync::Arc;

use crate::models::{
    assignments::entities::{Assignment, SignUpTopic},
    participants::entities::{Participant, ParticipantDefaults},
    questionnaires::entities::Questionnaire,
    response_maps::{
        entities::{BatchDeleteReport, MappingKey, NewMapping, ResponseMap},
        requests::MappingQuery,
    },
    responses::entities::Response,
    review_grades::{entities::ReviewGrade, requests::SaveReviewGradeRequest},
    teams::entities::Team,
    users::{entities::User, requests::CreateUserRequest},
};

use crate::errors::Result;

pub mod sea_orm_storage;

#[cfg(test)]
pub mod test_support;

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 用户方法
    // 创建本地用户镜像
    async fn create_user(&self, user: CreateUserRequest) -> Result<User>;
    // 通过ID获取用户信息
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    // 通过用户名获取用户信息
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    // 批量获取用户
    async fn list_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>>;

    /// 作业方法（只读）
    async fn get_assignment_by_id(&self, id: i64) -> Result<Option<Assignment>>;
    async fn get_topic_by_id(&self, id: i64) -> Result<Option<SignUpTopic>>;

    /// 参与者方法
    async fn get_participant_by_id(&self, id: i64) -> Result<Option<Participant>>;
    // 通过 (作业, 用户) 查找参与者
    async fn get_participant_by_user(
        &self,
        assignment_id: i64,
        user_id: i64,
    ) -> Result<Option<Participant>>;
    // 查找或按默认能力集创建参与者，返回值第二项表示是否新建
    async fn find_or_create_participant(
        &self,
        assignment_id: i64,
        user_id: i64,
        defaults: &ParticipantDefaults,
    ) -> Result<(Participant, bool)>;
    // 列出作业的全部参与者
    async fn list_participants(&self, assignment_id: i64) -> Result<Vec<Participant>>;
    async fn list_participants_by_ids(&self, ids: &[i64]) -> Result<Vec<Participant>>;

    /// 团队方法
    async fn get_team_by_id(&self, id: i64) -> Result<Option<Team>>;
    async fn list_teams(&self, assignment_id: i64) -> Result<Vec<Team>>;
    // 团队成员的用户 ID
    async fn list_team_member_ids(&self, team_id: i64) -> Result<Vec<i64>>;
    // 用户在作业中所属的团队
    async fn get_team_for_user(&self, assignment_id: i64, user_id: i64) -> Result<Option<Team>>;
    async fn is_team_member(&self, team_id: i64, user_id: i64) -> Result<bool>;
    // 创建只有一名成员的团队
    async fn create_team_with_member(
        &self,
        assignment_id: i64,
        name: &str,
        user_id: i64,
    ) -> Result<Team>;
    // 团队选题
    async fn set_team_topic(&self, team_id: i64, topic_id: i64) -> Result<bool>;

    /// 问卷方法
    async fn get_questionnaire_by_id(&self, id: i64) -> Result<Option<Questionnaire>>;

    /// 映射方法
    async fn get_mapping_by_id(&self, id: i64) -> Result<Option<ResponseMap>>;
    async fn find_mapping(&self, key: &MappingKey) -> Result<Option<ResponseMap>>;
    // 原子地查找或创建映射，返回值第二项表示是否新建
    async fn find_or_create_mapping(&self, mapping: &NewMapping) -> Result<(ResponseMap, bool)>;
    async fn list_mappings(&self, query: &MappingQuery) -> Result<Vec<ResponseMap>>;
    // 删除单条映射；存在答卷时拒绝并返回 false
    async fn delete_mapping(&self, id: i64) -> Result<bool>;
    // 批量删除映射
    async fn delete_mappings(&self, ids: &[i64], force: bool) -> Result<BatchDeleteReport>;

    /// 答卷方法
    async fn mapping_has_responses(&self, map_id: i64) -> Result<bool>;
    async fn list_responses_by_map_ids(&self, map_ids: &[i64]) -> Result<Vec<Response>>;
    // 撤回映射下最新一轮答卷的提交状态，返回是否存在该答卷
    async fn unsubmit_latest_response(&self, map_id: i64) -> Result<bool>;

    /// 评审者成绩方法
    async fn get_review_grade(&self, participant_id: i64) -> Result<Option<ReviewGrade>>;
    async fn save_review_grade(
        &self,
        request: SaveReviewGradeRequest,
        graded_by: i64,
    ) -> Result<ReviewGrade>;
}

pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
