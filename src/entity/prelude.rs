//! 预导入模块，方便使用

pub use super::assignments::{
    ActiveModel as AssignmentActiveModel, Entity as Assignments, Model as AssignmentModel,
};
pub use super::participants::{
    ActiveModel as ParticipantActiveModel, Entity as Participants, Model as ParticipantModel,
};
pub use super::questionnaires::{
    ActiveModel as QuestionnaireActiveModel, Entity as Questionnaires,
    Model as QuestionnaireModel,
};
pub use super::response_maps::{
    ActiveModel as ResponseMapActiveModel, Entity as ResponseMaps, Model as ResponseMapModel,
};
pub use super::responses::{
    ActiveModel as ResponseActiveModel, Entity as Responses, Model as ResponseModel,
};
pub use super::sign_up_topics::{
    ActiveModel as SignUpTopicActiveModel, Entity as SignUpTopics, Model as SignUpTopicModel,
};
pub use super::teams::{ActiveModel as TeamActiveModel, Entity as Teams, Model as TeamModel};
pub use super::teams_users::{
    ActiveModel as TeamUserActiveModel, Entity as TeamsUsers, Model as TeamUserModel,
};
pub use super::users::{ActiveModel as UserActiveModel, Entity as Users, Model as UserModel};
