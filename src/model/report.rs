use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output formats the server-side report renderer supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Pdf,
    Html,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Html => "html",
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "markdown",
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ReportFormat::Pdf),
            "html" => Ok(ReportFormat::Html),
            "json" => Ok(ReportFormat::Json),
            "markdown" => Ok(ReportFormat::Markdown),
            other => Err(format!("unknown report format '{}'", other)),
        }
    }
}

/// Response to a report-generation request. The rendered document lives
/// behind `report_url` (absolute, or relative to the API base).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedReport {
    pub report_url: String,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_roundtrip() {
        for format in [
            ReportFormat::Pdf,
            ReportFormat::Html,
            ReportFormat::Json,
            ReportFormat::Markdown,
        ] {
            let json = serde_json::to_string(&format).unwrap();
            assert_eq!(json, format!("\"{}\"", format.as_str()));
            let parsed: ReportFormat = format.as_str().parse().unwrap();
            assert_eq!(parsed, format);
        }
        assert!("docx".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_generated_report_tolerates_missing_timestamp() {
        let report: GeneratedReport =
            serde_json::from_str(r#"{"report_url":"/reports/abc.pdf"}"#).unwrap();
        assert_eq!(report.report_url, "/reports/abc.pdf");
        assert!(report.generated_at.is_none());
    }
}
