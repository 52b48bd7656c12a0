pub mod assignments;
pub mod common;
pub mod participants;
pub mod questionnaires;
pub mod reports;
pub mod response_maps;
pub mod responses;
pub mod review_grades;
pub mod review_mapping;
pub mod teams;
pub mod users;

pub use common::ApiResponse;

// 程序启动时间
#[derive(Debug, Clone)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

/// 业务错误码
///
/// 0 为成功，1xxx 为通用错误，3xxx 为评审映射，4xxx 为报告。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    // 通用错误
    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    InternalServerError = 1005,

    // 评审映射
    MappingRejected = 3000,
    MappingConflict = 3001,
    MappingConfigInvalid = 3002,

    // 报告
    ReportTypeUnsupported = 4000,
}
