//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod assignments;
mod participants;
mod questionnaires;
mod response_maps;
mod responses;
mod review_grades;
mod teams;
mod users;

use crate::config::AppConfig;
use crate::errors::{ReviewSystemError, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        let db_url = Self::build_database_url(&config.database.url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite://") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        // 运行迁移
        Migrator::up(&db, None)
            .await
            .map_err(|e| ReviewSystemError::database_operation(format!("数据库迁移失败: {e}")))?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(Self { db })
    }

    /// 使用已有连接创建存储实例（不运行迁移）
    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| ReviewSystemError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory")
            .pragma("mmap_size", "536870912")
            .pragma("wal_autocheckpoint", "1000");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database.pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| ReviewSystemError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.database.pool_size)
            .min_connections(5)
            .connect_timeout(Duration::from_secs(config.database.timeout))
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| ReviewSystemError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite://") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") || url == ":memory:" {
            Ok(format!("sqlite://{}?mode=rwc", url))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(ReviewSystemError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}

// Storage trait 实现
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
use crate::storage::Storage;
use async_trait::async_trait;

#[async_trait]
impl Storage for SeaOrmStorage {
    // 用户模块
    async fn create_user(&self, user: CreateUserRequest) -> Result<User> {
        self.create_user_impl(user).await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.get_user_by_id_impl(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.get_user_by_username_impl(username).await
    }

    async fn list_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>> {
        self.list_users_by_ids_impl(ids).await
    }

    // 作业模块
    async fn get_assignment_by_id(&self, id: i64) -> Result<Option<Assignment>> {
        self.get_assignment_by_id_impl(id).await
    }

    async fn get_topic_by_id(&self, id: i64) -> Result<Option<SignUpTopic>> {
        self.get_topic_by_id_impl(id).await
    }

    // 参与者模块
    async fn get_participant_by_id(&self, id: i64) -> Result<Option<Participant>> {
        self.get_participant_by_id_impl(id).await
    }

    async fn get_participant_by_user(
        &self,
        assignment_id: i64,
        user_id: i64,
    ) -> Result<Option<Participant>> {
        self.get_participant_by_user_impl(assignment_id, user_id)
            .await
    }

    async fn find_or_create_participant(
        &self,
        assignment_id: i64,
        user_id: i64,
        defaults: &ParticipantDefaults,
    ) -> Result<(Participant, bool)> {
        self.find_or_create_participant_impl(assignment_id, user_id, defaults)
            .await
    }

    async fn list_participants(&self, assignment_id: i64) -> Result<Vec<Participant>> {
        self.list_participants_impl(assignment_id).await
    }

    async fn list_participants_by_ids(&self, ids: &[i64]) -> Result<Vec<Participant>> {
        self.list_participants_by_ids_impl(ids).await
    }

    // 团队模块
    async fn get_team_by_id(&self, id: i64) -> Result<Option<Team>> {
        self.get_team_by_id_impl(id).await
    }

    async fn list_teams(&self, assignment_id: i64) -> Result<Vec<Team>> {
        self.list_teams_impl(assignment_id).await
    }

    async fn list_team_member_ids(&self, team_id: i64) -> Result<Vec<i64>> {
        self.list_team_member_ids_impl(team_id).await
    }

    async fn get_team_for_user(&self, assignment_id: i64, user_id: i64) -> Result<Option<Team>> {
        self.get_team_for_user_impl(assignment_id, user_id).await
    }

    async fn is_team_member(&self, team_id: i64, user_id: i64) -> Result<bool> {
        self.is_team_member_impl(team_id, user_id).await
    }

    async fn create_team_with_member(
        &self,
        assignment_id: i64,
        name: &str,
        user_id: i64,
    ) -> Result<Team> {
        self.create_team_with_member_impl(assignment_id, name, user_id)
            .await
    }

    async fn set_team_topic(&self, team_id: i64, topic_id: i64) -> Result<bool> {
        self.set_team_topic_impl(team_id, topic_id).await
    }

    // 问卷模块
    async fn get_questionnaire_by_id(&self, id: i64) -> Result<Option<Questionnaire>> {
        self.get_questionnaire_by_id_impl(id).await
    }

    // 映射模块
    async fn get_mapping_by_id(&self, id: i64) -> Result<Option<ResponseMap>> {
        self.get_mapping_by_id_impl(id).await
    }

    async fn find_mapping(&self, key: &MappingKey) -> Result<Option<ResponseMap>> {
        self.find_mapping_impl(key).await
    }

    async fn find_or_create_mapping(&self, mapping: &NewMapping) -> Result<(ResponseMap, bool)> {
        self.find_or_create_mapping_impl(mapping).await
    }

    async fn list_mappings(&self, query: &MappingQuery) -> Result<Vec<ResponseMap>> {
        self.list_mappings_impl(query).await
    }

    async fn delete_mapping(&self, id: i64) -> Result<bool> {
        self.delete_mapping_impl(id).await
    }

    async fn delete_mappings(&self, ids: &[i64], force: bool) -> Result<BatchDeleteReport> {
        self.delete_mappings_impl(ids, force).await
    }

    // 答卷模块
    async fn mapping_has_responses(&self, map_id: i64) -> Result<bool> {
        self.mapping_has_responses_impl(map_id).await
    }

    async fn list_responses_by_map_ids(&self, map_ids: &[i64]) -> Result<Vec<Response>> {
        self.list_responses_by_map_ids_impl(map_ids).await
    }

    async fn unsubmit_latest_response(&self, map_id: i64) -> Result<bool> {
        self.unsubmit_latest_response_impl(map_id).await
    }

    // 评审者成绩模块
    async fn get_review_grade(&self, participant_id: i64) -> Result<Option<ReviewGrade>> {
        self.get_review_grade_impl(participant_id).await
    }

    async fn save_review_grade(
        &self,
        request: SaveReviewGradeRequest,
        graded_by: i64,
    ) -> Result<ReviewGrade> {
        self.save_review_grade_impl(request, graded_by).await
    }
}
