use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::review_grades::requests::SaveReviewGradeRequest;
use crate::models::review_mapping::requests::{
    AddCalibrationRequest, AddInstructorAsReviewerRequest, AddMetareviewerRequest,
    AddReviewerRequest, AddUserToAssignmentRequest, AssignDynamicRequest,
    AssignMetareviewerRequest, AssignQuizRequest, AutomaticMappingRequest,
    DeleteAllMetareviewersQuery, DeleteOutstandingReviewersRequest, ListMappingsQuery,
    ResponseReportQuery, StaggeredMappingRequest, StartSelfReviewRequest,
};
use crate::services::ReviewMappingService;
use crate::utils::{SafeContributorIdI64, SafeIDI64};

// 懒加载的全局 ReviewMappingService 实例
static REVIEW_MAPPING_SERVICE: Lazy<ReviewMappingService> =
    Lazy::new(ReviewMappingService::new_lazy);

// 学生发起的分配

pub async fn assign_reviewer_dynamically(
    req: HttpRequest,
    body: web::Json<AssignDynamicRequest>,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE
        .assign_dynamic(body.into_inner(), &req)
        .await
}

pub async fn assign_quiz_dynamically(
    req: HttpRequest,
    body: web::Json<AssignQuizRequest>,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE
        .assign_quiz_dynamic(body.into_inner(), &req)
        .await
}

pub async fn assign_metareviewer_dynamically(
    req: HttpRequest,
    body: web::Json<AssignMetareviewerRequest>,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE
        .assign_metareviewer_dynamic(body.into_inner(), &req)
        .await
}

pub async fn start_self_review(
    req: HttpRequest,
    body: web::Json<StartSelfReviewRequest>,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE
        .start_self_review(body.into_inner(), &req)
        .await
}

// 教职人员的手动分配

pub async fn add_calibration(
    req: HttpRequest,
    body: web::Json<AddCalibrationRequest>,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE
        .add_calibration(body.into_inner(), &req)
        .await
}

pub async fn add_instructor_as_reviewer(
    req: HttpRequest,
    body: web::Json<AddInstructorAsReviewerRequest>,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE
        .add_instructor_as_reviewer(body.into_inner(), &req)
        .await
}

pub async fn add_reviewer(
    req: HttpRequest,
    body: web::Json<AddReviewerRequest>,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE
        .add_reviewer(body.into_inner(), &req)
        .await
}

pub async fn add_user_to_assignment(
    req: HttpRequest,
    query: web::Query<AddUserToAssignmentRequest>,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE
        .add_user_to_assignment(query.into_inner(), &req)
        .await
}

pub async fn add_metareviewer(
    req: HttpRequest,
    body: web::Json<AddMetareviewerRequest>,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE
        .add_metareviewer(body.into_inner(), &req)
        .await
}

// 删除与撤回

pub async fn delete_outstanding_reviewers(
    req: HttpRequest,
    body: web::Json<DeleteOutstandingReviewersRequest>,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE
        .delete_outstanding_reviewers(body.into_inner(), &req)
        .await
}

// 确认链接以 GET 访问，因此同时接受查询串
pub async fn delete_all_metareviewers(
    req: HttpRequest,
    query: web::Query<DeleteAllMetareviewersQuery>,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE
        .delete_all_metareviewers(query.into_inner(), &req)
        .await
}

pub async fn delete_reviewer(req: HttpRequest, path: SafeIDI64) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE.delete_reviewer(path.0, &req).await
}

pub async fn delete_metareviewer(req: HttpRequest, path: SafeIDI64) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE.delete_metareviewer(path.0, &req).await
}

pub async fn delete_metareview(req: HttpRequest, path: SafeIDI64) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE.delete_metareview(path.0, &req).await
}

pub async fn unsubmit_review(req: HttpRequest, path: SafeIDI64) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE.unsubmit_response(path.0, &req).await
}

// 列表与选择

pub async fn list_mappings(
    req: HttpRequest,
    query: web::Query<ListMappingsQuery>,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE
        .list_mappings(query.into_inner(), &req)
        .await
}

pub async fn select_reviewer(
    req: HttpRequest,
    path: SafeContributorIdI64,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE.select_reviewer(path.0, &req).await
}

pub async fn select_metareviewer(req: HttpRequest, path: SafeIDI64) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE.select_metareviewer(path.0, &req).await
}

// 自动分配

pub async fn automatic_review_mapping(
    req: HttpRequest,
    body: web::Json<AutomaticMappingRequest>,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE
        .automatic_mapping(body.into_inner(), &req)
        .await
}

pub async fn automatic_review_mapping_staggered(
    req: HttpRequest,
    body: web::Json<StaggeredMappingRequest>,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE
        .automatic_mapping_staggered(body.into_inner(), &req)
        .await
}

// 报告与成绩

pub async fn response_report(
    req: HttpRequest,
    query: web::Query<ResponseReportQuery>,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE
        .response_report(query.into_inner(), &req)
        .await
}

pub async fn save_grade_and_comment_for_reviewer(
    req: HttpRequest,
    body: web::Json<SaveReviewGradeRequest>,
) -> ActixResult<HttpResponse> {
    REVIEW_MAPPING_SERVICE
        .save_grade_and_comment(body.into_inner(), &req)
        .await
}

// 配置路由
pub fn configure_review_mapping_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/review_mapping")
            .wrap(middlewares::RequireJWT)
            // 学生可以访问，服务层限制只能为自己操作
            .route(
                "/assign_reviewer_dynamically",
                web::post().to(assign_reviewer_dynamically),
            )
            .route(
                "/assign_quiz_dynamically",
                web::post().to(assign_quiz_dynamically),
            )
            .route(
                "/assign_metareviewer_dynamically",
                web::post().to(assign_metareviewer_dynamically),
            )
            .route("/start_self_review", web::post().to(start_self_review))
            .service(
                web::scope("")
                    .wrap(middlewares::RequireRole::staff())
                    .route("/add_calibration", web::post().to(add_calibration))
                    .route(
                        "/add_instructor_as_reviewer",
                        web::post().to(add_instructor_as_reviewer),
                    )
                    .route("/add_reviewer", web::post().to(add_reviewer))
                    // 注册链接嵌在提示消息中，以 GET 访问
                    .route(
                        "/add_user_to_assignment",
                        web::get().to(add_user_to_assignment),
                    )
                    .route(
                        "/add_user_to_assignment",
                        web::post().to(add_user_to_assignment),
                    )
                    .route("/add_metareviewer", web::post().to(add_metareviewer))
                    .route(
                        "/delete_outstanding_reviewers",
                        web::post().to(delete_outstanding_reviewers),
                    )
                    .route(
                        "/delete_all_metareviewers",
                        web::get().to(delete_all_metareviewers),
                    )
                    .route(
                        "/delete_all_metareviewers",
                        web::post().to(delete_all_metareviewers),
                    )
                    .route("/delete_reviewer/{id}", web::post().to(delete_reviewer))
                    .route(
                        "/delete_metareviewer/{id}",
                        web::post().to(delete_metareviewer),
                    )
                    .route("/delete_metareview/{id}", web::get().to(delete_metareview))
                    .route("/delete_metareview/{id}", web::post().to(delete_metareview))
                    .route("/unsubmit_review/{id}", web::post().to(unsubmit_review))
                    .route("/list_mappings", web::get().to(list_mappings))
                    .route(
                        "/select_reviewer/{contributor_id}",
                        web::get().to(select_reviewer),
                    )
                    .route(
                        "/select_metareviewer/{id}",
                        web::get().to(select_metareviewer),
                    )
                    .route(
                        "/automatic_review_mapping",
                        web::post().to(automatic_review_mapping),
                    )
                    .route(
                        "/automatic_review_mapping_staggered",
                        web::post().to(automatic_review_mapping_staggered),
                    )
                    .route("/response_report", web::get().to(response_report))
                    .route(
                        "/save_grade_and_comment_for_reviewer",
                        web::post().to(save_grade_and_comment_for_reviewer),
                    ),
            ),
    );
}
