//! 统一错误处理模块
//!
//! 使用宏自动生成错误类型，支持错误代码和类型名称。
//! 领域错误（NotFound / InvariantViolation 等）在服务层被转换为
//! 提示消息 + 跳转目标，不会以 500 的形式暴露给调用方。

use std::fmt;

/// 定义错误类型的宏
///
/// 自动生成：
/// - enum 定义
/// - code() 方法 - 返回错误代码
/// - error_type() 方法 - 返回错误类型名称
/// - message() 方法 - 返回错误详情
/// - 便捷构造函数
macro_rules! define_review_errors {
    ($(
        $variant:ident($code:literal, $type_name:literal)
    ),* $(,)?) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum ReviewSystemError {
            $($variant(String),)*
        }

        impl ReviewSystemError {
            /// 获取错误代码
            pub fn code(&self) -> &'static str {
                match self {
                    $(ReviewSystemError::$variant(_) => $code,)*
                }
            }

            /// 获取错误类型名称
            pub fn error_type(&self) -> &'static str {
                match self {
                    $(ReviewSystemError::$variant(_) => $type_name,)*
                }
            }

            /// 获取错误详情
            pub fn message(&self) -> &str {
                match self {
                    $(ReviewSystemError::$variant(msg) => msg,)*
                }
            }
        }

        // 生成便捷构造函数
        paste::paste! {
            impl ReviewSystemError {
                $(
                    pub fn [<$variant:snake>]<T: Into<String>>(msg: T) -> Self {
                        ReviewSystemError::$variant(msg.into())
                    }
                )*
            }
        }
    };
}

define_review_errors! {
    DatabaseConfig("E001", "Database Configuration Error"),
    DatabaseConnection("E002", "Database Connection Error"),
    DatabaseOperation("E003", "Database Operation Error"),
    Serialization("E004", "Serialization Error"),
    Validation("E005", "Validation Error"),
    Authentication("E006", "Authentication Error"),
    Authorization("E007", "Authorization Error"),
    NotFound("E101", "Resource Not Found"),
    AlreadyExists("E102", "Resource Already Exists"),
    InvariantViolation("E103", "Invariant Violation"),
    InvalidConfiguration("E104", "Invalid Configuration"),
    NoTopicSelected("E105", "No Topic Selected"),
    AlreadyTaken("E106", "Already Taken"),
}

impl ReviewSystemError {
    /// 是否为领域错误（可在请求边界转换为提示消息）
    pub fn is_domain(&self) -> bool {
        self.code().starts_with("E1")
    }

    /// 格式化为彩色输出（用于开发环境）
    #[cfg(debug_assertions)]
    pub fn format_colored(&self) -> String {
        format!(
            "\x1b[1;31m[ERROR]\x1b[0m \x1b[33m{}\x1b[0m \x1b[31m{}\x1b[0m\n  {}",
            self.code(),
            self.error_type(),
            self.message()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ReviewSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ReviewSystemError {}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for ReviewSystemError {
    fn from(err: sea_orm::DbErr) -> Self {
        ReviewSystemError::DatabaseOperation(err.to_string())
    }
}

impl From<serde_json::Error> for ReviewSystemError {
    fn from(err: serde_json::Error) -> Self {
        ReviewSystemError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReviewSystemError>;
