//! 跳转目标与确认链接的构造

use serde::Serialize;

/// 以表单编码拼接查询串，空格编码为 `+`
pub fn with_query<T: Serialize + ?Sized>(path: &str, params: &T) -> String {
    match serde_urlencoded::to_string(params) {
        Ok(query) if !query.is_empty() => format!("{path}?{query}"),
        _ => path.to_string(),
    }
}

pub fn list_mappings(assignment_id: i64) -> String {
    with_query("/review_mapping/list_mappings", &[("id", assignment_id)])
}

/// 带 msg 参数的映射列表，msg 为空时保留 `msg=`
pub fn list_mappings_with_msg(assignment_id: i64, msg: &str) -> String {
    with_query(
        "/review_mapping/list_mappings",
        &[("id", assignment_id.to_string()), ("msg", msg.to_string())],
    )
}

pub fn student_review_list(participant_id: i64) -> String {
    with_query("/student_review/list", &[("id", participant_id)])
}

pub fn student_task_list() -> String {
    "/student_task/list".to_string()
}

pub fn student_quizzes(participant_id: i64) -> String {
    with_query("/student_quizzes", &[("id", participant_id)])
}

pub fn response_report(assignment_id: i64) -> String {
    with_query("/review_mapping/response_report", &[("id", assignment_id)])
}

pub fn new_response(mapping_id: i64) -> String {
    with_query("/response/new", &[("id", mapping_id)])
}

pub fn new_calibration_response(assignment_id: i64, mapping_id: i64) -> String {
    with_query(
        "/response/new",
        &[
            ("assignment_id", assignment_id.to_string()),
            ("id", mapping_id.to_string()),
            ("return", "assignment_edit".to_string()),
        ],
    )
}

pub fn submitted_content_edit(participant_id: i64, msg: Option<&str>) -> String {
    let path = format!("/submitted_content/{participant_id}/edit");
    match msg {
        Some(msg) => with_query(&path, &[("msg", msg)]),
        None => path,
    }
}

/// 绝对地址，用于嵌入提示消息中的链接
pub fn absolute(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_mappings_targets() {
        assert_eq!(list_mappings(1), "/review_mapping/list_mappings?id=1");
        assert_eq!(
            list_mappings_with_msg(1, ""),
            "/review_mapping/list_mappings?id=1&msg="
        );
        assert_eq!(
            list_mappings_with_msg(3, "a b"),
            "/review_mapping/list_mappings?id=3&msg=a+b"
        );
    }

    #[test]
    fn test_self_review_message_encoding() {
        assert_eq!(
            submitted_content_edit(1, Some("Self review already assigned!")),
            "/submitted_content/1/edit?msg=Self+review+already+assigned%21"
        );
        assert_eq!(submitted_content_edit(7, None), "/submitted_content/7/edit");
    }

    #[test]
    fn test_response_targets() {
        assert_eq!(
            new_calibration_response(1, 1),
            "/response/new?assignment_id=1&id=1&return=assignment_edit"
        );
        assert_eq!(new_response(5), "/response/new?id=5");
        assert_eq!(
            absolute("http://test.host/", "/review_mapping/x"),
            "http://test.host/review_mapping/x"
        );
    }
}
