//! 安全的路径参数提取器
//!
//! 路径参数解析失败时返回统一格式的 400 响应，而不是 actix 默认的纯文本错误。

use actix_web::{FromRequest, HttpRequest, HttpResponse, dev::Payload, error::InternalError};
use futures_util::future::{Ready, ready};

use crate::models::{ApiResponse, ErrorCode};

macro_rules! define_safe_i64_extractor {
    ($name:ident, $param:literal) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name(pub i64);

        impl FromRequest for $name {
            type Error = actix_web::Error;
            type Future = Ready<Result<Self, Self::Error>>;

            fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
                ready(parse_positive_i64(req, $param).map($name))
            }
        }
    };
}

fn parse_positive_i64(req: &HttpRequest, param: &str) -> Result<i64, actix_web::Error> {
    let raw = req.match_info().get(param).unwrap_or_default();
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => {
            let response = HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::BadRequest,
                format!("Invalid path parameter '{param}': {raw}"),
            ));
            Err(InternalError::from_response(format!("invalid {param}"), response).into())
        }
    }
}

define_safe_i64_extractor!(SafeIDI64, "id");
define_safe_i64_extractor!(SafeContributorIdI64, "contributor_id");
