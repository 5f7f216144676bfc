//! Downloadable text artifact for a run

use crate::config::PulseConfig;
use crate::error::Result;
use crate::pipeline::RunOutcome;
use chrono::{DateTime, Local};
use pulse_utils::sanitize_filename_component;
use std::path::{Path, PathBuf};
use tracing::info;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// File name and bytes of the export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Build the artifact for `text`, stamping the name with `now`
    pub fn new(keyword_line: &str, text: &str, now: DateTime<Local>, write_bom: bool) -> Self {
        let filename = format!(
            "ptt_{}_{}.txt",
            sanitize_filename_component(keyword_line),
            now.format("%Y%m%d_%H%M%S")
        );

        let mut bytes = Vec::with_capacity(text.len() + UTF8_BOM.len());
        if write_bom {
            bytes.extend_from_slice(UTF8_BOM);
        }
        bytes.extend_from_slice(text.as_bytes());

        Self { filename, bytes }
    }

    pub fn from_outcome(outcome: &RunOutcome, config: &PulseConfig, now: DateTime<Local>) -> Self {
        Self::new(&config.keyword_line(), &outcome.scraped_text, now, config.write_bom)
    }

    /// Write into `dir`, returning the full path
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.filename);
        tokio::fs::write(&path, &self.bytes).await?;
        info!(path = %path.display(), bytes = self.bytes.len(), "export written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    #[test]
    fn test_filename_is_sanitized_and_stamped() {
        let artifact = ExportArtifact::new("台積電 a/b:c", "x", now(), false);
        assert_eq!(artifact.filename, "ptt_台積電_a_b_c_20240506_070809.txt");
    }

    #[test]
    fn test_bom_is_optional() {
        let plain = ExportArtifact::new("2330", "漲", now(), false);
        assert_eq!(plain.bytes, "漲".as_bytes());

        let with_bom = ExportArtifact::new("2330", "漲", now(), true);
        assert_eq!(&with_bom.bytes[..3], UTF8_BOM);
        assert_eq!(&with_bom.bytes[3..], "漲".as_bytes());
    }

    #[test]
    fn test_from_outcome_uses_config() {
        let config = PulseConfig::builder().keywords("台積電  2330").write_bom(true).build().unwrap();
        let outcome = RunOutcome {
            scraped_text: "body".to_string(),
            ..RunOutcome::default()
        };
        let artifact = ExportArtifact::from_outcome(&outcome, &config, now());
        assert!(artifact.filename.starts_with("ptt_台積電_2330_"));
        assert!(artifact.bytes.ends_with(b"body"));
        assert!(artifact.bytes.starts_with(UTF8_BOM));
    }

    #[tokio::test]
    async fn test_write_to_creates_dir() {
        let dir = std::env::temp_dir().join(format!("pulse-export-{}", std::process::id()));
        let artifact = ExportArtifact::new("2330", "內容", now(), false);

        let path = artifact.write_to(&dir.join("nested")).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), "內容".as_bytes());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
