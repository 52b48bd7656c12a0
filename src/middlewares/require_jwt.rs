/*!
 * JWT 认证中间件
 *
 * 此中间件用于验证 JWT 令牌的有效性，确保只有经过身份验证的用户才能访问受保护的路由。
 *
 * ## 使用方法
 *
 * 1. 在路由上应用中间件：
 * ```rust,ignore
 * use actix_web::{web, App, HttpServer};
 * use crate::middlewares::require_jwt::RequireJWT;
 *
 * HttpServer::new(|| {
 *     App::new()
 *         .service(
 *             web::scope("/api")
 *                 .wrap(RequireJWT)  // 应用JWT验证中间件
 *                 .route("/protected", web::get().to(protected_handler))
 *         )
 * })
 * ```
 *
 * 2. 在处理程序中提取用户信息：
 * ```rust,ignore
 * use actix_web::{web, HttpRequest, HttpResponse, Result};
 * use crate::middlewares::require_jwt::RequireJWT;
 *
 * async fn protected_handler(req: HttpRequest) -> Result<HttpResponse> {
 *     // 提取本地用户
 *     if let Some(user) = RequireJWT::extract_user_claims(&req) {
 *         return Ok(HttpResponse::Ok().json(format!("Hello, {}!", user.username)));
 *     }
 *
 *     Ok(HttpResponse::Unauthorized().finish())
 * }
 * ```
 *
 * ## 认证流程
 *
 * 1. 客户端在请求头中包含外部身份服务签发的 `Authorization: Bearer <JWT_TOKEN>`
 * 2. 中间件验证签名与有效期
 * 3. 按 token 查询用户缓存；未命中时按 `username` 声明查找本地用户，首次出现时根据声明创建
 * 4. 用户信息存入请求扩展，继续处理请求
 * 5. 如果令牌无效、缺失或用户不可用，返回401未授权错误
 *
 * ## 配置
 *
 * 确保在环境变量中设置了 `JWT_SECRET`（与身份服务共享的 HS256 密钥）。
 * 用户缓存的容量与过期时间取自 `cache` 配置段。
 */

use crate::config::AppConfig;
use crate::models::users::entities::{self, UserRole, UserStatus};
use crate::models::users::requests::CreateUserRequest;
use crate::models::ErrorCode;
use crate::storage::Storage;
use crate::utils::jwt::JwtUtils;
use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use moka::future::Cache;
use once_cell::sync::Lazy;
use std::{rc::Rc, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use super::create_error_response;

/// 已验证 token 对应的本地用户
static USER_CACHE: Lazy<Cache<String, entities::User>> = Lazy::new(|| {
    let config = AppConfig::get();
    Cache::builder()
        .time_to_live(Duration::from_secs(config.cache.default_ttl))
        .max_capacity(config.cache.max_capacity)
        .build()
});

#[derive(Clone)]
pub struct RequireJWT;

// 辅助函数：按声明查找或创建本地用户
pub(crate) async fn resolve_user(
    storage: &dyn Storage,
    claims: &crate::utils::jwt::Claims,
) -> Result<entities::User, String> {
    let existing = storage
        .get_user_by_username(&claims.username)
        .await
        .map_err(|_| "Failed to retrieve user from storage".to_string())?;

    let user = match existing {
        Some(user) => user,
        None => {
            let role = claims.role.parse::<UserRole>().unwrap_or_else(|_| {
                warn!(
                    "Unknown role '{}' in token for {}, falling back to student",
                    claims.role, claims.username
                );
                UserRole::Student
            });
            let user = storage
                .create_user(CreateUserRequest {
                    username: claims.username.clone(),
                    email: claims.email.clone(),
                    role,
                    display_name: claims.name.clone(),
                })
                .await
                .map_err(|_| "Failed to provision user".to_string())?;
            info!("Provisioned local user {} ({})", user.username, user.id);
            user
        }
    };

    if user.status != UserStatus::Active {
        return Err("User is not active".to_string());
    }

    Ok(user)
}

// 辅助函数：提取并验证 JWT access token
async fn extract_and_validate_jwt(req: &ServiceRequest) -> Result<entities::User, String> {
    let token = JwtUtils::extract_bearer(req.request())
        .ok_or_else(|| "Missing or invalid Authorization header".to_string())?;

    let claims = JwtUtils::verify_token(&token).map_err(|err| {
        info!("JWT token validation failed: {}", err);
        "Invalid JWT token".to_string()
    })?;

    if let Some(user) = USER_CACHE.get(&token).await {
        return Ok(user);
    }

    let storage = req
        .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
        .ok_or_else(|| "Storage not configured".to_string())?
        .get_ref()
        .clone();

    let user = resolve_user(storage.as_ref(), &claims).await?;
    USER_CACHE.insert(token, user.clone()).await;

    Ok(user)
}

impl<S, B> Transform<S, ServiceRequest> for RequireJWT
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireJWTMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireJWTMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireJWTMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireJWTMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        Box::pin(async move {
            // 处理 OPTIONS 请求
            if req.method() == actix_web::http::Method::OPTIONS {
                return Ok(req.into_response(
                    create_error_response(StatusCode::NO_CONTENT, ErrorCode::Success, "")
                        .map_into_right_body(),
                ));
            }

            // 验证 JWT token
            match extract_and_validate_jwt(&req).await {
                Ok(user) => {
                    debug!("JWT authentication successful for ID: {}", user.id);
                    req.extensions_mut().insert(user);
                    let res = srv.call(req).await?.map_into_left_body();
                    Ok(res)
                }
                Err(err) => {
                    info!(
                        "JWT authentication failed for request to {}: {}",
                        req.path(),
                        err
                    );
                    Ok(req.into_response(
                        create_error_response(
                            StatusCode::UNAUTHORIZED,
                            ErrorCode::Unauthorized,
                            &format!("Unauthorized: {err}"),
                        )
                        .map_into_right_body(),
                    ))
                }
            }
        })
    }
}

// 辅助函数：从请求中提取用户信息
impl RequireJWT {
    /// 从请求扩展中提取用户信息
    /// 此函数应该在应用了RequireJWT中间件的路由处理程序中使用
    pub fn extract_user_claims(req: &actix_web::HttpRequest) -> Option<entities::User> {
        req.extensions().get::<entities::User>().cloned()
    }

    /// 从请求扩展中提取用户ID
    pub fn extract_user_id(req: &actix_web::HttpRequest) -> Option<i64> {
        req.extensions().get::<entities::User>().map(|user| user.id)
    }

    /// 从请求扩展中提取用户角色
    pub fn extract_user_role(req: &actix_web::HttpRequest) -> Option<UserRole> {
        req.extensions()
            .get::<entities::User>()
            .map(|user| user.role.clone())
    }
}
