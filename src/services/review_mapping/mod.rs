pub mod calibration;
pub mod deletion;
pub mod distribution;
pub mod dynamic;
pub mod listing;
pub mod registry;
pub mod reports;
pub mod reviewers;
pub mod strategy;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, http::header};
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};
use ts_rs::TS;

use crate::config::AppConfig;
use crate::errors::{ReviewSystemError, Result};
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, ErrorCode,
    review_grades::requests::SaveReviewGradeRequest,
    review_mapping::{
        requests::{
            AddCalibrationRequest, AddInstructorAsReviewerRequest, AddMetareviewerRequest,
            AddReviewerRequest, AddUserToAssignmentRequest, AssignDynamicRequest,
            AssignMetareviewerRequest, AssignQuizRequest, AutomaticMappingRequest,
            DeleteAllMetareviewersQuery, DeleteOutstandingReviewersRequest, ListMappingsQuery,
            ResponseReportQuery, StaggeredMappingRequest, StartSelfReviewRequest,
        },
        responses::{Flash, Navigation},
    },
    users::entities::User,
};
use crate::storage::Storage;

/// 将领域错误转换为带错误提示的跳转，基础设施错误原样返回
pub(crate) fn recover(
    result: Result<Navigation>,
    fallback: impl FnOnce() -> String,
) -> Result<Navigation> {
    match result {
        Err(e) if e.is_domain() => {
            warn!("Review mapping request rejected: {}", e);
            Ok(Navigation::to(fallback()).with_flash(Flash::error(e.message())))
        }
        other => other,
    }
}

fn navigation_response(result: Result<Navigation>) -> HttpResponse {
    match result {
        Ok(nav) => {
            let message = nav.message().to_string();
            if nav.is_error() {
                HttpResponse::Ok().json(ApiResponse::error(
                    ErrorCode::MappingRejected,
                    nav,
                    message,
                ))
            } else {
                HttpResponse::Ok().json(ApiResponse::success(nav, message))
            }
        }
        Err(e) => error_response(e),
    }
}

fn data_response<T: Serialize + TS>(result: Result<T>, message: &str) -> HttpResponse {
    match result {
        Ok(data) => HttpResponse::Ok().json(ApiResponse::success(data, message)),
        Err(e) => error_response(e),
    }
}

fn error_response(e: ReviewSystemError) -> HttpResponse {
    match e {
        ReviewSystemError::NotFound(msg) => {
            HttpResponse::NotFound().json(ApiResponse::error_empty(ErrorCode::NotFound, msg))
        }
        ReviewSystemError::AlreadyExists(msg) | ReviewSystemError::AlreadyTaken(msg) => {
            HttpResponse::Conflict().json(ApiResponse::error_empty(ErrorCode::MappingConflict, msg))
        }
        ReviewSystemError::InvalidConfiguration(msg) => HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::MappingConfigInvalid, msg)),
        e if e.is_domain() => HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::MappingRejected, e.message())),
        e => {
            error!("Review mapping operation failed: {}", e);
            HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::InternalServerError,
                "Internal server error",
            ))
        }
    }
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(ApiResponse::error_empty(
        ErrorCode::Unauthorized,
        "Unauthorized: missing user information",
    ))
}

fn forbidden() -> HttpResponse {
    HttpResponse::Forbidden().json(ApiResponse::error_empty(
        ErrorCode::Forbidden,
        "You are not allowed to act for another user.",
    ))
}

// 学生只能以自己的身份操作，教职人员不受限制
fn acts_for(user: &User, user_id: i64) -> bool {
    user.role.is_staff() || user.id == user_id
}

pub struct ReviewMappingService {
    storage: Option<Arc<dyn Storage>>,
}

impl ReviewMappingService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        if let Some(storage) = &self.storage {
            storage.clone()
        } else {
            request
                .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
                .expect("Storage not found in app data")
                .get_ref()
                .clone()
        }
    }

    // 添加校准评审
    pub async fn add_calibration(
        &self,
        body: AddCalibrationRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let Some(user_id) = RequireJWT::extract_user_id(request) else {
            return Ok(unauthorized());
        };
        let storage = self.get_storage(request);
        let result = calibration::add_calibration(
            storage.as_ref(),
            &AppConfig::get().review,
            body.assignment_id,
            body.team_id,
            user_id,
        )
        .await;
        Ok(navigation_response(result))
    }

    // 以教师身份评审
    pub async fn add_instructor_as_reviewer(
        &self,
        body: AddInstructorAsReviewerRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let Some(user_id) = RequireJWT::extract_user_id(request) else {
            return Ok(unauthorized());
        };
        let storage = self.get_storage(request);
        let result = calibration::add_instructor_as_reviewer(
            storage.as_ref(),
            &AppConfig::get().review,
            body.assignment_id,
            body.team_id,
            user_id,
        )
        .await;
        Ok(navigation_response(result))
    }

    // 手动添加评审者
    pub async fn add_reviewer(
        &self,
        body: AddReviewerRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let storage = self.get_storage(request);
        let result =
            reviewers::add_reviewer(storage.as_ref(), &AppConfig::get().review, body).await;
        Ok(navigation_response(result))
    }

    // 将用户加入作业
    pub async fn add_user_to_assignment(
        &self,
        body: AddUserToAssignmentRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let storage = self.get_storage(request);
        let result =
            reviewers::add_user_to_assignment(storage.as_ref(), &AppConfig::get().review, body)
                .await;
        Ok(navigation_response(result))
    }

    // 添加元评审者
    pub async fn add_metareviewer(
        &self,
        body: AddMetareviewerRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let storage = self.get_storage(request);
        let result =
            reviewers::add_metareviewer(storage.as_ref(), &AppConfig::get().review, body).await;
        Ok(navigation_response(result))
    }

    // 动态分配评审
    pub async fn assign_dynamic(
        &self,
        body: AssignDynamicRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let Some(user) = RequireJWT::extract_user_claims(request) else {
            return Ok(unauthorized());
        };
        if !acts_for(&user, body.reviewer_id) {
            return Ok(forbidden());
        }

        let storage = self.get_storage(request);
        let mut rng = StdRng::from_os_rng();
        let result = dynamic::assign_dynamic(storage.as_ref(), body, &mut rng).await;
        Ok(navigation_response(result))
    }

    // 动态分配测验
    pub async fn assign_quiz_dynamic(
        &self,
        body: AssignQuizRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let Some(user) = RequireJWT::extract_user_claims(request) else {
            return Ok(unauthorized());
        };
        let storage = self.get_storage(request);

        if !user.role.is_staff() {
            match storage.get_participant_by_id(body.participant_id).await {
                Ok(Some(participant)) if participant.user_id == user.id => {}
                Ok(_) => return Ok(forbidden()),
                Err(e) => return Ok(error_response(e)),
            }
        }

        let result = dynamic::assign_quiz_dynamic(storage.as_ref(), body).await;
        Ok(navigation_response(result))
    }

    // 动态分配元评审
    pub async fn assign_metareviewer_dynamic(
        &self,
        body: AssignMetareviewerRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let Some(user) = RequireJWT::extract_user_claims(request) else {
            return Ok(unauthorized());
        };
        if !acts_for(&user, body.metareviewer_id) {
            return Ok(forbidden());
        }

        let storage = self.get_storage(request);
        let result = dynamic::assign_metareviewer_dynamic(storage.as_ref(), body).await;
        Ok(navigation_response(result))
    }

    // 开始自评
    pub async fn start_self_review(
        &self,
        body: StartSelfReviewRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let Some(user) = RequireJWT::extract_user_claims(request) else {
            return Ok(unauthorized());
        };
        if !acts_for(&user, body.reviewer_userid) {
            return Ok(forbidden());
        }

        let storage = self.get_storage(request);
        let result = reviewers::start_self_review(storage.as_ref(), body).await;
        Ok(navigation_response(result))
    }

    // 删除团队尚未开始的评审
    pub async fn delete_outstanding_reviewers(
        &self,
        body: DeleteOutstandingReviewersRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let storage = self.get_storage(request);
        let result = deletion::delete_outstanding_reviewers(storage.as_ref(), body).await;
        Ok(navigation_response(result))
    }

    // 删除评审下的全部元评审
    pub async fn delete_all_metareviewers(
        &self,
        query: DeleteAllMetareviewersQuery,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let storage = self.get_storage(request);
        let result =
            deletion::delete_all_metareviewers(storage.as_ref(), &AppConfig::get().review, query)
                .await;
        Ok(navigation_response(result))
    }

    // 删除评审映射，成功后返回来源页面
    pub async fn delete_reviewer(
        &self,
        map_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let referer = request
            .headers()
            .get(header::REFERER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let storage = self.get_storage(request);
        let result = deletion::delete_reviewer(storage.as_ref(), map_id, referer).await;
        Ok(navigation_response(result))
    }

    pub async fn delete_metareviewer(
        &self,
        map_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let storage = self.get_storage(request);
        let result = deletion::delete_metareviewer(storage.as_ref(), map_id).await;
        Ok(navigation_response(result))
    }

    pub async fn delete_metareview(
        &self,
        map_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let storage = self.get_storage(request);
        let result = deletion::delete_metareview(storage.as_ref(), map_id).await;
        Ok(navigation_response(result))
    }

    // 撤回答卷提交
    pub async fn unsubmit_response(
        &self,
        map_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let storage = self.get_storage(request);
        let result = deletion::unsubmit_response(storage.as_ref(), map_id).await;
        Ok(navigation_response(result))
    }

    // 映射列表
    pub async fn list_mappings(
        &self,
        query: ListMappingsQuery,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let storage = self.get_storage(request);
        let result = listing::list_mappings(storage.as_ref(), query).await;
        Ok(data_response(result, "Review mappings retrieved successfully"))
    }

    pub async fn select_reviewer(
        &self,
        contributor_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let storage = self.get_storage(request);
        let result = listing::select_reviewer(storage.as_ref(), contributor_id).await;
        Ok(data_response(result, "Contributor selected"))
    }

    pub async fn select_metareviewer(
        &self,
        map_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let storage = self.get_storage(request);
        let result = listing::select_metareviewer(storage.as_ref(), map_id).await;
        Ok(data_response(result, "Review mapping selected"))
    }

    // 自动分配评审
    pub async fn automatic_mapping(
        &self,
        body: AutomaticMappingRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let storage = self.get_storage(request);
        let mut rng = StdRng::from_os_rng();
        let result = strategy::run_automatic_mapping(storage.as_ref(), body, &mut rng).await;
        Ok(navigation_response(result))
    }

    // 交错自动分配
    pub async fn automatic_mapping_staggered(
        &self,
        body: StaggeredMappingRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let storage = self.get_storage(request);
        let result = strategy::run_staggered_mapping(storage.as_ref(), body).await;
        Ok(navigation_response(result))
    }

    // 评审报告
    pub async fn response_report(
        &self,
        query: ResponseReportQuery,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let Some(user) = RequireJWT::extract_user_claims(request) else {
            return Ok(unauthorized());
        };
        let storage = self.get_storage(request);

        match reports::response_report(storage.as_ref(), &AppConfig::get().review, query, &user)
            .await
        {
            Err(ReviewSystemError::InvalidConfiguration(msg)) => Ok(HttpResponse::BadRequest()
                .json(ApiResponse::error_empty(ErrorCode::ReportTypeUnsupported, msg))),
            result => Ok(data_response(result, "Report generated successfully")),
        }
    }

    // 保存评审者成绩
    pub async fn save_grade_and_comment(
        &self,
        body: SaveReviewGradeRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let Some(user_id) = RequireJWT::extract_user_id(request) else {
            return Ok(unauthorized());
        };
        let storage = self.get_storage(request);
        let result = reports::save_grade_and_comment(storage.as_ref(), body, user_id).await;
        Ok(navigation_response(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::response_maps::entities::MappingKind;
    use crate::storage::test_support::test_db;
    use actix_web::{HttpMessage, body::to_bytes, http::StatusCode, test::TestRequest, web};

    fn request_as(storage: Arc<dyn Storage>, user: Option<User>) -> HttpRequest {
        let req = TestRequest::default()
            .app_data(web::Data::new(storage))
            .to_http_request();
        if let Some(user) = user {
            req.extensions_mut().insert(user);
        }
        req
    }

    async fn body_json(resp: HttpResponse) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_recover_converts_domain_errors() {
        let nav = recover(
            Err(ReviewSystemError::not_found("Team 3 does not exist.")),
            || "/review_mapping/list_mappings?id=1".to_string(),
        )
        .unwrap();
        assert!(nav.is_error());
        assert_eq!(nav.message(), "Team 3 does not exist.");
        assert_eq!(nav.redirect_to, "/review_mapping/list_mappings?id=1");

        let err = recover(
            Err(ReviewSystemError::database_operation("connection reset")),
            || unreachable!(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "E003");
    }

    #[actix_web::test]
    async fn test_error_response_status() {
        assert_eq!(
            error_response(ReviewSystemError::not_found("x")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_response(ReviewSystemError::already_taken("x")).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            error_response(ReviewSystemError::database_operation("x")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn test_student_cannot_act_for_another_user() {
        let t = test_db().await;
        let alice = t.user("alice").await;
        let bob = t.user("bob").await;
        let assignment = t.assignment("a").await;
        let storage: Arc<dyn Storage> = t.storage.clone();

        let service = ReviewMappingService::new_lazy();
        let req = request_as(storage.clone(), Some(alice));
        let resp = service
            .assign_metareviewer_dynamic(
                AssignMetareviewerRequest {
                    assignment_id: assignment.id,
                    metareviewer_id: bob.id,
                },
                &req,
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = request_as(storage, None);
        let resp = service
            .assign_metareviewer_dynamic(
                AssignMetareviewerRequest {
                    assignment_id: assignment.id,
                    metareviewer_id: bob.id,
                },
                &req,
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_navigation_with_error_flash() {
        let t = test_db().await;
        let author = t.user("author").await;
        let reviewer = t.user("reviewer").await;
        let assignment = t.assignment("a").await;
        let team = t.team(assignment.id, "reviewee", &[author.id]).await;
        let reviewer_p = t.participant(assignment.id, reviewer.id).await;
        let review = t
            .mapping(MappingKind::Review, assignment.id, assignment.id, reviewer_p.id, team.id)
            .await;
        t.response(review.id, 1, None).await;
        let storage: Arc<dyn Storage> = t.storage.clone();

        let service = ReviewMappingService::new_lazy();
        let req = request_as(storage, None);
        let resp = service.delete_reviewer(review.id, &req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["code"], ErrorCode::MappingRejected as i32);
        assert_eq!(
            body["message"],
            "This review has already been done. It cannot been deleted."
        );
        assert_eq!(body["data"]["flash"]["kind"], "error");
        assert_eq!(
            body["data"]["redirect_to"],
            format!("/review_mapping/list_mappings?id={}", assignment.id)
        );
    }

    #[actix_web::test]
    async fn test_list_mappings_not_found() {
        let t = test_db().await;
        let storage: Arc<dyn Storage> = t.storage.clone();

        let service = ReviewMappingService::new_lazy();
        let req = request_as(storage, None);
        let resp = service
            .list_mappings(ListMappingsQuery { id: 42, msg: None }, &req)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
