use super::entities::MappingKind;

/// 映射列表查询条件（用于存储层），未设置的字段不参与过滤
#[derive(Debug, Clone, Default)]
pub struct MappingQuery {
    pub assignment_id: Option<i64>,
    pub reviewed_object_id: Option<i64>,
    pub reviewer_id: Option<i64>,
    pub reviewee_id: Option<i64>,
    pub kinds: Vec<MappingKind>,
    pub course_staff: Option<bool>,
}

impl MappingQuery {
    pub fn of_kind(kind: MappingKind) -> Self {
        Self {
            kinds: vec![kind],
            ..Default::default()
        }
    }

    pub fn assignment(mut self, assignment_id: i64) -> Self {
        self.assignment_id = Some(assignment_id);
        self
    }

    pub fn reviewed_object(mut self, reviewed_object_id: i64) -> Self {
        self.reviewed_object_id = Some(reviewed_object_id);
        self
    }

    pub fn reviewer(mut self, reviewer_id: i64) -> Self {
        self.reviewer_id = Some(reviewer_id);
        self
    }

    pub fn reviewee(mut self, reviewee_id: i64) -> Self {
        self.reviewee_id = Some(reviewee_id);
        self
    }

    pub fn course_staff(mut self, course_staff: bool) -> Self {
        self.course_staff = Some(course_staff);
        self
    }
}
