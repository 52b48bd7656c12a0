use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 报告类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "report.ts")]
pub enum ReportType {
    ReviewResponseMap,
    FeedbackResponseMap,
    TeammateReviewResponseMap,
    Calibration,
    SummaryByRevieweeAndCriteria,
    SummaryByCriteria,
    PlagiarismCheckerReport,
}

impl ReportType {
    /// 由外部汇总服务生成的报告
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            ReportType::SummaryByRevieweeAndCriteria
                | ReportType::SummaryByCriteria
                | ReportType::PlagiarismCheckerReport
        )
    }
}

impl std::str::FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ReviewResponseMap" => Ok(ReportType::ReviewResponseMap),
            "FeedbackResponseMap" => Ok(ReportType::FeedbackResponseMap),
            "TeammateReviewResponseMap" => Ok(ReportType::TeammateReviewResponseMap),
            "Calibration" => Ok(ReportType::Calibration),
            "SummaryByRevieweeAndCriteria" => Ok(ReportType::SummaryByRevieweeAndCriteria),
            "SummaryByCriteria" => Ok(ReportType::SummaryByCriteria),
            "PlagiarismCheckerReport" => Ok(ReportType::PlagiarismCheckerReport),
            _ => Err(format!("Unsupported report type: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_tags() {
        assert_eq!(
            "FeedbackResponseMap".parse::<ReportType>().unwrap(),
            ReportType::FeedbackResponseMap
        );
        assert!("SummaryByCriteria".parse::<ReportType>().unwrap().is_external());
        assert!(!"Calibration".parse::<ReportType>().unwrap().is_external());
        assert!("Bogus".parse::<ReportType>().is_err());
    }
}
