use crate::config::AppConfig;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

// JWT Claims 结构体（由外部身份服务签发）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // Subject (身份服务中的用户 ID)
    pub username: String, // 用户名，本地用户镜像以此为键
    pub role: String,     // 用户角色
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize, // Expiration time (时间戳)
    pub iat: usize, // Issued at (签发时间)
}

pub struct JwtUtils;

impl JwtUtils {
    // 验证 Access Token
    pub fn verify_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let config = AppConfig::get();
        Self::verify_with_secret(token, &config.jwt.secret, config.jwt.leeway)
    }

    pub fn verify_with_secret(
        token: &str,
        secret: &str,
        leeway: u64,
    ) -> Result<Claims, jsonwebtoken::errors::Error> {
        let decoding_key = DecodingKey::from_secret(secret.as_ref());
        let mut validation = Validation::default();
        validation.leeway = leeway;

        decode::<Claims>(token, &decoding_key, &validation).map(|token_data| token_data.claims)
    }

    /// 从 Authorization 头中提取 Bearer token
    pub fn extract_bearer(req: &actix_web::HttpRequest) -> Option<String> {
        req.headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &str, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "42".to_string(),
            username: "instructor6".to_string(),
            role: "instructor".to_string(),
            email: None,
            name: Some("Instructor Six".to_string()),
            exp: (now + exp_offset) as usize,
            iat: now as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_valid_token() {
        let claims = JwtUtils::verify_with_secret(&token("s3cret", 600), "s3cret", 0).unwrap();
        assert_eq!(claims.username, "instructor6");
        assert_eq!(claims.role, "instructor");
    }

    #[test]
    fn test_reject_wrong_secret_and_expired() {
        assert!(JwtUtils::verify_with_secret(&token("s3cret", 600), "other", 0).is_err());
        assert!(JwtUtils::verify_with_secret(&token("s3cret", -600), "s3cret", 0).is_err());
    }

    #[test]
    fn test_extract_bearer() {
        let req = actix_web::test::TestRequest::default()
            .insert_header(("Authorization", "Bearer abc.def"))
            .to_http_request();
        assert_eq!(JwtUtils::extract_bearer(&req).as_deref(), Some("abc.def"));

        let req = actix_web::test::TestRequest::default().to_http_request();
        assert!(JwtUtils::extract_bearer(&req).is_none());
    }
}
