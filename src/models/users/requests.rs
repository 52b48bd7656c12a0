use super::entities::UserRole;
use serde::Deserialize;

// 本地用户镜像创建请求（由令牌声明生成）
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub display_name: Option<String>,
}
