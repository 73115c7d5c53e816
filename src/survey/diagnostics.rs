//! Diagnostic extractor for the status-message and debug-display pages.
//!
//! Two stages, each usable on its own:
//! 1. [`log_entries`] flattens the page's `status` values into a list and
//!    reverses it, so index 0 is the newest entry (phones list oldest first).
//! 2. [`extract`] filters those entries for one [`DiagnosticKind`], matches
//!    them against the firmware-specific line formats and joins the first
//!    `count` hits.

use std::sync::LazyLock;

use regex::Regex;

use super::types::Endpoint;
use super::xml::XmlValue;

/// Number of entries returned when the caller has no preference.
pub const DEFAULT_COUNT: usize = 1;

/// Separator between matched lines in the joined output.
pub const LINE_SEPARATOR: &str = "\r\n";

/// 78xx/88xx status line, e.g. `[8:52:30am 10/01/19] ITL installed`.
/// The 8821 puts a space before AM/PM: `[5:48:09 AM 10/11/19]`.
static STATUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(
            r"(?i)\d{1,2}:\d{1,2}:\d{1,2}\s*\w{2},?\s*(?P<stamp>\d{2}/\d{2}/\d{2})\]\s*(?P<text>.+)",
        )
        .unwrap(),
        // 79xx, time only: `1:33:26a TFTP Error : SEPB8BEBF9D2061.cnf.xml.sgn`
        Regex::new(r"(?i)(?P<stamp>\d{1,2}:\d{1,2}:\d{1,2}\w)\s*(?P<text>.+)$").unwrap(),
    ]
});

/// Debug display lines carrying the out-of-service reason.
static DEBUG_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // `[8:54:12am 08/20/19] DeviceTLInfo ... ReasonForOutOfServiceText=...`
        Regex::new(
            r"(?i)\d{1,2}:\d{1,2}:\d{1,2}\s*\w{2},?\s*(?P<stamp>\d{2}/\d{2}/\d{2}).+ReasonForOutOfServiceText=(?P<text>\w+)",
        )
        .unwrap(),
        // 79xx: `12:02:55a 25: Name=SEPB8BEBF227D79 Load= 9.4(2SR3.1S) Last=Initialized`
        Regex::new(r"(?i)(?P<stamp>\d{1,2}:\d{1,2}:\d{1,2}\w).+Last=(?P<text>.+)$").unwrap(),
    ]
});

static ERROR_FILTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(no trust list|error|config\s?mismatch|tftp timeout)").unwrap()
});

static TRUST_FILTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"ITL|Trust").unwrap());

/// What to pull out of a device log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Most recent error lines from the status messages page.
    StatusErrors,
    /// Most recent ITL / trust list lines from the status messages page.
    TrustList,
    /// Most recent out-of-service reasons from the debug display page.
    OutOfServiceReason,
}

impl DiagnosticKind {
    /// Page this kind of extraction reads.
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::StatusErrors | Self::TrustList => Endpoint::StatusMessages,
            Self::OutOfServiceReason => Endpoint::DebugDisplay,
        }
    }

    fn accepts(&self, line: &str) -> bool {
        match self {
            Self::StatusErrors => ERROR_FILTER.is_match(line),
            Self::TrustList => TRUST_FILTER.is_match(line),
            Self::OutOfServiceReason => true,
        }
    }

    fn patterns(&self) -> &'static [Regex] {
        match self {
            Self::StatusErrors | Self::TrustList => &STATUS_PATTERNS,
            Self::OutOfServiceReason => &DEBUG_PATTERNS,
        }
    }
}

/// Stage 1: the `status` entries of a DeviceLog container, newest first.
///
/// A page with one entry carries a single value instead of a list; both
/// shapes, and a missing or empty container, are accepted.
pub fn log_entries(device_log: &XmlValue) -> Vec<String> {
    let mut entries: Vec<String> = device_log
        .get_all("status")
        .into_iter()
        .filter_map(XmlValue::as_text)
        .map(str::to_string)
        .collect();
    entries.reverse();
    entries
}

/// Stage 2a: entries that pass the kind's line filter, order preserved.
pub fn select_entries(entries: &[String], kind: DiagnosticKind) -> Vec<&str> {
    entries
        .iter()
        .map(String::as_str)
        .filter(|line| kind.accepts(line))
        .collect()
}

/// Stage 2b: match candidate lines against `patterns` until `count` hits.
///
/// The first pattern that matches a line wins; lines no pattern matches are
/// skipped.
pub fn match_lines(lines: &[&str], patterns: &[Regex], count: usize) -> Vec<String> {
    let mut matches = Vec::new();
    if count == 0 {
        return matches;
    }

    for line in lines {
        let line = line.replace(['\r', '\n'], " ");
        let hit = patterns.iter().find_map(|rgx| {
            rgx.captures(&line).map(|caps| {
                format!(
                    "{} {}",
                    caps.name("stamp").map_or("", |m| m.as_str()),
                    caps.name("text").map_or("", |m| m.as_str()),
                )
            })
        });

        if let Some(hit) = hit {
            matches.push(hit);
            if matches.len() >= count {
                break;
            }
        }
    }
    matches
}

/// Stage 2: filter, match and join. Fewer hits than `count` is not an error.
pub fn extract(entries: &[String], kind: DiagnosticKind, count: usize) -> String {
    let candidates = select_entries(entries, kind);
    match_lines(&candidates, kind.patterns(), count).join(LINE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::xml::parse_document;

    fn device_log(xml: &str) -> XmlValue {
        parse_document(xml).unwrap().container("DeviceLog").cloned().unwrap()
    }

    fn strings(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn entries_are_reversed_newest_first() {
        let log = device_log(
            "<DeviceLog><status>first</status><status>second</status><status>third</status></DeviceLog>",
        );
        assert_eq!(log_entries(&log), vec!["third", "second", "first"]);
    }

    #[test]
    fn single_entry_is_normalized_to_list() {
        let log = device_log("<DeviceLog><status>only one</status></DeviceLog>");
        assert_eq!(log_entries(&log), vec!["only one"]);
    }

    #[test]
    fn empty_log_yields_no_entries() {
        let log = device_log("<DeviceLog/>");
        assert!(log_entries(&log).is_empty());
    }

    #[test]
    fn trust_filter_after_reversal_keeps_newest_first() {
        let mut entries = strings(&["ITL installed", "error: config mismatch", "ITL removed"]);
        entries.reverse();

        let selected = select_entries(&entries, DiagnosticKind::TrustList);
        assert_eq!(selected, vec!["ITL removed", "ITL installed"]);
    }

    #[test]
    fn trust_extraction_returns_two_most_recent() {
        let log = device_log(
            "<DeviceLog>\
             <status>[8:52:30am 10/01/19] ITL installed</status>\
             <status>[8:53:01am 10/01/19] error: config mismatch</status>\
             <status>[8:55:12am 10/02/19] ITL removed</status>\
             </DeviceLog>",
        );
        let entries = log_entries(&log);

        let out = extract(&entries, DiagnosticKind::TrustList, 2);
        assert_eq!(out, "10/02/19 ITL removed\r\n10/01/19 ITL installed");
    }

    #[test]
    fn error_filter_is_case_insensitive() {
        let entries = strings(&[
            "[9:00:00am 10/03/19] TFTP Timeout : SEP001.cnf.xml",
            "[8:59:00am 10/03/19] Trust List Updated",
            "[8:58:00am 10/03/19] No Trust List installed",
        ]);

        let out = extract(&entries, DiagnosticKind::StatusErrors, 5);
        assert_eq!(
            out,
            "10/03/19 TFTP Timeout : SEP001.cnf.xml\r\n10/03/19 No Trust List installed"
        );
    }

    #[test]
    fn count_larger_than_matches_returns_what_exists() {
        let entries = strings(&["[8:52:30am 10/01/19] ITL installed", "Unrelated"]);
        let out = extract(&entries, DiagnosticKind::TrustList, 5);
        assert_eq!(out, "10/01/19 ITL installed");
    }

    #[test]
    fn default_count_returns_single_line() {
        let entries = strings(&[
            "[8:55:12am 10/02/19] ITL removed",
            "[8:52:30am 10/01/19] ITL installed",
        ]);
        let out = extract(&entries, DiagnosticKind::TrustList, DEFAULT_COUNT);
        assert_eq!(out, "10/02/19 ITL removed");
    }

    #[test]
    fn no_matches_yields_empty_string() {
        let entries = strings(&["Registered to CUCM"]);
        assert_eq!(extract(&entries, DiagnosticKind::StatusErrors, 3), "");
        assert_eq!(extract(&[], DiagnosticKind::TrustList, 1), "");
    }

    #[test]
    fn time_only_format_of_older_phones() {
        let entries = strings(&["1:33:26a TFTP Error : SEPB8BEBF9D2061.cnf.xml.sgn"]);
        let out = extract(&entries, DiagnosticKind::StatusErrors, 1);
        assert_eq!(out, "1:33:26a TFTP Error : SEPB8BEBF9D2061.cnf.xml.sgn");
    }

    #[test]
    fn space_before_meridiem_is_accepted() {
        let entries = strings(&["[5:48:09 AM 10/11/19] Trust List Update Failed"]);
        let out = extract(&entries, DiagnosticKind::TrustList, 1);
        assert_eq!(out, "10/11/19 Trust List Update Failed");
    }

    #[test]
    fn out_of_service_reason_from_debug_display() {
        let entries = strings(&[
            "12:02:55a 25: Name=SEPB8BEBF227D79 Load= 9.4(2SR3.1S) Last=Initialized",
            "[8:54:12am 08/20/19] DeviceTLInfo: ReasonForOutOfServiceText=CM-closed-TCP",
        ]);

        let out = extract(&entries, DiagnosticKind::OutOfServiceReason, 2);
        assert_eq!(out, "12:02:55a Initialized\r\n08/20/19 CM");
    }

    #[test]
    fn embedded_linefeeds_are_collapsed() {
        let entries = strings(&["[8:52:30am 10/01/19] ITL\ninstalled"]);
        let out = extract(&entries, DiagnosticKind::TrustList, 1);
        assert_eq!(out, "10/01/19 ITL installed");
    }

    #[test]
    fn unmatched_lines_are_skipped_not_counted() {
        let entries = strings(&["ITL without timestamp", "[8:52:30am 10/01/19] ITL installed"]);
        let out = extract(&entries, DiagnosticKind::TrustList, 1);
        assert_eq!(out, "10/01/19 ITL installed");
    }
}
