use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建用户表（由外部身份服务同步）
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Email).string().null())
                    .col(ColumnDef::new(Users::Role).string().not_null())
                    .col(ColumnDef::new(Users::Status).string().not_null())
                    .col(ColumnDef::new(Users::DisplayName).string().null())
                    .col(ColumnDef::new(Users::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // 创建作业表
        manager
            .create_table(
                Table::create()
                    .table(Assignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assignments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Assignments::Name).string().not_null())
                    .col(ColumnDef::new(Assignments::CourseId).big_integer().null())
                    .col(
                        ColumnDef::new(Assignments::HasTopics)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Assignments::CanChooseTopicToReview)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Assignments::VaryingRubricsByRound)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Assignments::MaxTeamSize)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Assignments::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Assignments::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建选题表
        manager
            .create_table(
                Table::create()
                    .table(SignUpTopics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SignUpTopics::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SignUpTopics::AssignmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SignUpTopics::TopicName).string().not_null())
                    .col(
                        ColumnDef::new(SignUpTopics::MaxChoosers)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(SignUpTopics::Table, SignUpTopics::AssignmentId)
                            .to(Assignments::Table, Assignments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建作业参与者表
        manager
            .create_table(
                Table::create()
                    .table(Participants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Participants::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Participants::AssignmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Participants::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Participants::Handle).string().null())
                    .col(
                        ColumnDef::new(Participants::CanSubmit)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Participants::CanReview)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Participants::CanTakeQuiz)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Participants::TopicId).big_integer().null())
                    .col(
                        ColumnDef::new(Participants::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Participants::Table, Participants::AssignmentId)
                            .to(Assignments::Table, Assignments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Participants::Table, Participants::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建团队表
        manager
            .create_table(
                Table::create()
                    .table(Teams::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Teams::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Teams::AssignmentId).big_integer().not_null())
                    .col(ColumnDef::new(Teams::Name).string().not_null())
                    .col(ColumnDef::new(Teams::TopicId).big_integer().null())
                    .col(ColumnDef::new(Teams::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Teams::Table, Teams::AssignmentId)
                            .to(Assignments::Table, Assignments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建团队成员表
        manager
            .create_table(
                Table::create()
                    .table(TeamsUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TeamsUsers::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TeamsUsers::TeamId).big_integer().not_null())
                    .col(ColumnDef::new(TeamsUsers::UserId).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(TeamsUsers::Table, TeamsUsers::TeamId)
                            .to(Teams::Table, Teams::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(TeamsUsers::Table, TeamsUsers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建问卷表（测验问卷的 instructor_id 指向出题团队）
        manager
            .create_table(
                Table::create()
                    .table(Questionnaires::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Questionnaires::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Questionnaires::Name).string().not_null())
                    .col(
                        ColumnDef::new(Questionnaires::QuestionnaireType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Questionnaires::InstructorId)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建评审映射表（reviewee_id / reviewed_object_id 为多态引用，不加外键）
        manager
            .create_table(
                Table::create()
                    .table(ResponseMaps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ResponseMaps::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ResponseMaps::AssignmentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ResponseMaps::ReviewedObjectId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ResponseMaps::ReviewerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ResponseMaps::RevieweeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ResponseMaps::MapType).string().not_null())
                    .col(
                        ColumnDef::new(ResponseMaps::CalibrateTo)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ResponseMaps::CourseStaff)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ResponseMaps::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ResponseMaps::Table, ResponseMaps::AssignmentId)
                            .to(Assignments::Table, Assignments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ResponseMaps::Table, ResponseMaps::ReviewerId)
                            .to(Participants::Table, Participants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建评审答卷表
        manager
            .create_table(
                Table::create()
                    .table(Responses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Responses::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Responses::MapId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Responses::Round)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Responses::IsSubmitted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Responses::TotalScore).double().null())
                    .col(ColumnDef::new(Responses::AdditionalComment).text().null())
                    .col(ColumnDef::new(Responses::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Responses::UpdatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Responses::Table, Responses::MapId)
                            .to(ResponseMaps::Table, ResponseMaps::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建评审者成绩表
        manager
            .create_table(
                Table::create()
                    .table(ReviewGrades::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReviewGrades::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReviewGrades::ParticipantId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ReviewGrades::GradeForReviewer)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ReviewGrades::CommentForReviewer)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ReviewGrades::ReviewGradedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReviewGrades::ReviewerIdWhoGraded)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ReviewGrades::Table, ReviewGrades::ParticipantId)
                            .to(Participants::Table, Participants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建索引
        // 唯一约束：同一作业同一用户只有一个参与者
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uniq_participants_assignment_user")
                    .table(Participants::Table)
                    .col(Participants::AssignmentId)
                    .col(Participants::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uniq_teams_users_team_user")
                    .table(TeamsUsers::Table)
                    .col(TeamsUsers::TeamId)
                    .col(TeamsUsers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 唯一约束：同一 (对象, 评审者, 被评审者, 类型) 只有一个映射
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uniq_response_maps_key")
                    .table(ResponseMaps::Table)
                    .col(ResponseMaps::ReviewedObjectId)
                    .col(ResponseMaps::ReviewerId)
                    .col(ResponseMaps::RevieweeId)
                    .col(ResponseMaps::MapType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_response_maps_assignment_id")
                    .table(ResponseMaps::Table)
                    .col(ResponseMaps::AssignmentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_response_maps_reviewee_id")
                    .table(ResponseMaps::Table)
                    .col(ResponseMaps::RevieweeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_responses_map_id")
                    .table(Responses::Table)
                    .col(Responses::MapId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_teams_assignment_id")
                    .table(Teams::Table)
                    .col(Teams::AssignmentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 按照创建的相反顺序删除
        manager
            .drop_table(Table::drop().table(ReviewGrades::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Responses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ResponseMaps::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Questionnaires::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TeamsUsers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Teams::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Participants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SignUpTopics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Assignments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    Username,
    Email,
    Role,
    Status,
    DisplayName,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Assignments {
    #[sea_orm(iden = "assignments")]
    Table,
    Id,
    Name,
    CourseId,
    HasTopics,
    CanChooseTopicToReview,
    VaryingRubricsByRound,
    MaxTeamSize,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SignUpTopics {
    #[sea_orm(iden = "sign_up_topics")]
    Table,
    Id,
    AssignmentId,
    TopicName,
    MaxChoosers,
}

#[derive(DeriveIden)]
enum Participants {
    #[sea_orm(iden = "participants")]
    Table,
    Id,
    AssignmentId,
    UserId,
    Handle,
    CanSubmit,
    CanReview,
    CanTakeQuiz,
    TopicId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Teams {
    #[sea_orm(iden = "teams")]
    Table,
    Id,
    AssignmentId,
    Name,
    TopicId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TeamsUsers {
    #[sea_orm(iden = "teams_users")]
    Table,
    Id,
    TeamId,
    UserId,
}

#[derive(DeriveIden)]
enum Questionnaires {
    #[sea_orm(iden = "questionnaires")]
    Table,
    Id,
    Name,
    QuestionnaireType,
    InstructorId,
}

#[derive(DeriveIden)]
enum ResponseMaps {
    #[sea_orm(iden = "response_maps")]
    Table,
    Id,
    AssignmentId,
    ReviewedObjectId,
    ReviewerId,
    RevieweeId,
    MapType,
    CalibrateTo,
    CourseStaff,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Responses {
    #[sea_orm(iden = "responses")]
    Table,
    Id,
    MapId,
    Round,
    IsSubmitted,
    TotalScore,
    AdditionalComment,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ReviewGrades {
    #[sea_orm(iden = "review_grades")]
    Table,
    Id,
    ParticipantId,
    GradeForReviewer,
    CommentForReviewer,
    ReviewGradedAt,
    ReviewerIdWhoGraded,
}
