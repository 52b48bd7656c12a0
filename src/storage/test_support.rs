//! 测试辅助：内存 SQLite 存储与种子数据

use std::sync::Arc;

use crate::entity::{
    assignments, participants, questionnaires, responses, sign_up_topics, teams, teams_users,
    users,
};
use crate::models::{
    assignments::entities::Assignment,
    participants::entities::Participant,
    response_maps::entities::{MappingKey, MappingKind, NewMapping, ResponseMap},
    teams::entities::Team,
    users::entities::User,
};
use crate::storage::Storage;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

use super::sea_orm_storage::SeaOrmStorage;

pub struct TestDb {
    pub db: DatabaseConnection,
    pub storage: Arc<SeaOrmStorage>,
}

/// 新建一个已完成迁移的内存数据库
pub async fn test_db() -> TestDb {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    TestDb {
        storage: Arc::new(SeaOrmStorage::from_connection(db.clone())),
        db,
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

impl TestDb {
    pub async fn user(&self, username: &str) -> User {
        self.user_with_role(username, "student").await
    }

    pub async fn user_with_role(&self, username: &str, role: &str) -> User {
        users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(None),
            role: Set(role.to_string()),
            status: Set("active".to_string()),
            display_name: Set(None),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap()
        .into_user()
    }

    pub async fn assignment(&self, name: &str) -> Assignment {
        self.assignment_with(name, |_| {}).await
    }

    pub async fn assignment_with(
        &self,
        name: &str,
        customize: impl FnOnce(&mut assignments::ActiveModel),
    ) -> Assignment {
        let mut model = assignments::ActiveModel {
            name: Set(name.to_string()),
            course_id: Set(None),
            has_topics: Set(false),
            can_choose_topic_to_review: Set(false),
            varying_rubrics_by_round: Set(false),
            max_team_size: Set(3),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        };
        customize(&mut model);
        model.insert(&self.db).await.unwrap().into_assignment()
    }

    pub async fn topic(&self, assignment_id: i64, name: &str) -> i64 {
        sign_up_topics::ActiveModel {
            assignment_id: Set(assignment_id),
            topic_name: Set(name.to_string()),
            max_choosers: Set(2),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap()
        .id
    }

    pub async fn participant(&self, assignment_id: i64, user_id: i64) -> Participant {
        participants::ActiveModel {
            assignment_id: Set(assignment_id),
            user_id: Set(user_id),
            handle: Set(None),
            can_submit: Set(true),
            can_review: Set(true),
            can_take_quiz: Set(true),
            topic_id: Set(None),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap()
        .into_participant()
    }

    pub async fn team(&self, assignment_id: i64, name: &str, member_ids: &[i64]) -> Team {
        let team = teams::ActiveModel {
            assignment_id: Set(assignment_id),
            name: Set(name.to_string()),
            topic_id: Set(None),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap();

        for &user_id in member_ids {
            teams_users::ActiveModel {
                team_id: Set(team.id),
                user_id: Set(user_id),
                ..Default::default()
            }
            .insert(&self.db)
            .await
            .unwrap();
        }

        team.into_team()
    }

    pub async fn team_topic(&self, team_id: i64, topic_id: i64) {
        teams::ActiveModel {
            id: Set(team_id),
            topic_id: Set(Some(topic_id)),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .unwrap();
    }

    pub async fn questionnaire(&self, name: &str, instructor_id: i64) -> i64 {
        questionnaires::ActiveModel {
            name: Set(name.to_string()),
            questionnaire_type: Set("QuizQuestionnaire".to_string()),
            instructor_id: Set(instructor_id),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap()
        .id
    }

    pub async fn response(&self, map_id: i64, round: i32, score: Option<f64>) -> i64 {
        responses::ActiveModel {
            map_id: Set(map_id),
            round: Set(round),
            is_submitted: Set(true),
            total_score: Set(score),
            additional_comment: Set(None),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap()
        .id
    }

    pub async fn mapping(
        &self,
        kind: MappingKind,
        assignment_id: i64,
        reviewed_object_id: i64,
        reviewer_id: i64,
        reviewee_id: i64,
    ) -> ResponseMap {
        let key = MappingKey::new(kind, reviewed_object_id, reviewer_id, reviewee_id);
        self.storage
            .find_or_create_mapping(&NewMapping::new(key, assignment_id))
            .await
            .unwrap()
            .0
    }
}
