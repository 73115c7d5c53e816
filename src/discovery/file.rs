//! Static input file lister.
//!
//! The file is usually a one-column CSV written by a spreadsheet or by an
//! earlier cluster discovery run, so parsing is forgiving.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::survey::error::SurveyError;
use crate::survey::traits::DeviceLister;

const STRAY_DELIMITERS: &[char] = &[',', ';', '|', '"', '\'', '\t'];

/// Addresses from a newline-delimited file, in file order.
pub struct FileLister {
    path: PathBuf,
}

impl FileLister {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DeviceLister for FileLister {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    async fn list_addresses(&self) -> Result<Vec<String>, SurveyError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SurveyError::InputMissing(self.path.display().to_string()));
            }
            Err(e) => return Err(SurveyError::Io(e)),
        };
        Ok(parse_address_list(&raw))
    }
}

/// One address per line. Blank lines and `#` comments are skipped, stray
/// delimiters are stripped, only the first token counts, and repeats are
/// dropped keeping the first occurrence.
pub fn parse_address_list(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.lines()
        .map(|line| line.trim_start_matches('\u{feff}').trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            line.replace(STRAY_DELIMITERS, " ")
                .split_whitespace()
                .next()
                .map(str::to_string)
        })
        .filter(|address| seen.insert(address.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_list_keeps_order() {
        assert_eq!(
            parse_address_list("10.0.0.1\n10.0.0.2\n10.0.0.3\n"),
            vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]
        );
    }

    #[test]
    fn stray_delimiters_and_whitespace_are_tolerated() {
        let raw = "\u{feff}10.0.0.1,\r\n  \"10.0.0.2\"  \n10.0.0.3;;\n\t10.0.0.4|\n10.0.0.5,SEP001122334455\n";
        assert_eq!(
            parse_address_list(raw),
            vec!["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5"]
        );
    }

    #[test]
    fn blanks_comments_and_duplicates_are_skipped() {
        let raw = "# lobby phones\n\n10.0.0.1\n   \n10.0.0.1\n,,,\n10.0.0.2\n";
        assert_eq!(parse_address_list(raw), vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[tokio::test]
    async fn missing_file_is_input_missing() {
        let dir = tempfile::tempdir().unwrap();
        let lister = FileLister::new(dir.path().join("ip_input.csv"));

        let err = lister.list_addresses().await.unwrap_err();
        assert!(matches!(err, SurveyError::InputMissing(_)));
    }

    #[tokio::test]
    async fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ip_input.csv");
        std::fs::write(&path, "10.0.0.1\r\n10.0.0.2\r\n").unwrap();

        let lister = FileLister::new(&path);
        assert_eq!(lister.list_addresses().await.unwrap(), vec!["10.0.0.1", "10.0.0.2"]);
        assert!(lister.describe().starts_with("file "));
    }
}
