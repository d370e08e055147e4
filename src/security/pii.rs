//! PII scrubbing for study summaries.
//!
//! The attested backend is contractually required to return pre-redacted
//! summaries. This module is the client-side backstop: every string that
//! survives summary normalization is passed through these patterns and
//! matches are replaced with placeholder tokens.
//!
//! Detected:
//! - Email addresses
//! - Phone numbers
//! - IP addresses
//! - URLs
//! - SSNs
//! - Credit card numbers
//! - Medical record numbers
//! - Calendar dates (dates of birth, admission dates)

use lazy_static::lazy_static;
use regex::Regex;

use crate::logging::structured::LogContext;

lazy_static! {
    /// Email pattern
    static ref EMAIL_PATTERN: Regex = Regex::new(
        r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"
    ).unwrap();

    /// URL pattern
    static ref URL_PATTERN: Regex = Regex::new(
        r"https?://[^\s<>]+"
    ).unwrap();

    /// Medical record number, e.g. "MRN: 00123456"
    static ref MRN_PATTERN: Regex = Regex::new(
        r"(?i)\b(?:mrn|medical\s+record(?:\s+(?:no|number))?)[\s:#.-]*\d{4,}\b"
    ).unwrap();

    /// ISO and US calendar dates
    static ref DATE_PATTERN: Regex = Regex::new(
        r"\b(?:\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{2,4})\b"
    ).unwrap();

    /// SSN pattern
    static ref SSN_PATTERN: Regex = Regex::new(
        r"\b\d{3}-\d{2}-\d{4}\b"
    ).unwrap();

    /// Credit card pattern (basic)
    static ref CC_PATTERN: Regex = Regex::new(
        r"\b(?:\d{4}[-\s]?){3}\d{4}\b"
    ).unwrap();

    /// Phone number patterns (various formats)
    static ref PHONE_PATTERN: Regex = Regex::new(
        r"(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}"
    ).unwrap();

    /// IP address pattern (IPv4)
    static ref IP_PATTERN: Regex = Regex::new(
        r"\b(?:\d{1,3}\.){3}\d{1,3}\b"
    ).unwrap();
}

/// PII scrubbing result.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PiiScrubResult {
    pub emails_found: usize,
    pub urls_found: usize,
    pub mrns_found: usize,
    pub dates_found: usize,
    pub ssns_found: usize,
    pub ccs_found: usize,
    pub phones_found: usize,
    pub ips_found: usize,
    pub fields_modified: usize,
}

impl PiiScrubResult {
    pub fn total_entities(&self) -> usize {
        self.emails_found
            + self.urls_found
            + self.mrns_found
            + self.dates_found
            + self.ssns_found
            + self.ccs_found
            + self.phones_found
            + self.ips_found
    }
}

/// Scrub one named summary field, counting it as modified when any
/// placeholder was substituted.
pub fn scrub_field(
    field: &str,
    value: &str,
    ctx: &LogContext,
    result: &mut PiiScrubResult,
) -> String {
    let before = result.total_entities();
    let scrubbed = scrub_string(value, result);
    let found = result.total_entities() - before;

    if found > 0 {
        result.fields_modified += 1;
        log::warn!(
            "{} SUMMARY_PII_SCRUBBED field={} entities={}",
            ctx,
            field,
            found
        );
    }

    scrubbed
}

/// Returns true when `s` contains anything the scrubber would replace.
pub fn contains_pii(s: &str) -> bool {
    let mut result = PiiScrubResult::default();
    scrub_string(s, &mut result);
    result.total_entities() > 0
}

/// Scrub PII from a string.
///
/// Patterns are applied most-specific first so that, for example, an SSN
/// is not half-consumed by the phone pattern.
pub fn scrub_string(s: &str, result: &mut PiiScrubResult) -> String {
    let mut scrubbed = s.to_string();

    scrubbed = replace_counted(&EMAIL_PATTERN, &scrubbed, "[EMAIL]", &mut result.emails_found);
    scrubbed = replace_counted(&URL_PATTERN, &scrubbed, "[URL]", &mut result.urls_found);
    scrubbed = replace_counted(&MRN_PATTERN, &scrubbed, "[MRN]", &mut result.mrns_found);
    scrubbed = replace_counted(&DATE_PATTERN, &scrubbed, "[DATE]", &mut result.dates_found);
    scrubbed = replace_counted(&SSN_PATTERN, &scrubbed, "[SSN]", &mut result.ssns_found);
    scrubbed = replace_counted(&CC_PATTERN, &scrubbed, "[CREDIT_CARD]", &mut result.ccs_found);
    scrubbed = replace_counted(&PHONE_PATTERN, &scrubbed, "[PHONE]", &mut result.phones_found);
    scrubbed = replace_counted(&IP_PATTERN, &scrubbed, "[IP_ADDRESS]", &mut result.ips_found);

    scrubbed
}

fn replace_counted(pattern: &Regex, input: &str, placeholder: &str, counter: &mut usize) -> String {
    let count = pattern.find_iter(input).count();
    if count == 0 {
        return input.to_string();
    }
    *counter += count;
    pattern.replace_all(input, placeholder).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_email_scrubbing() {
        let mut result = PiiScrubResult::default();
        let scrubbed = scrub_string("Contact jane.doe@clinic.org for data", &mut result);
        assert_eq!(scrubbed, "Contact [EMAIL] for data");
        assert_eq!(result.emails_found, 1);
    }

    #[test]
    fn test_phone_scrubbing() {
        let mut result = PiiScrubResult::default();
        let scrubbed = scrub_string("Call 555-123-4567 now", &mut result);
        assert_eq!(scrubbed, "Call [PHONE] now");
        assert_eq!(result.phones_found, 1);
    }

    #[test]
    fn test_ssn_not_split_by_phone_pattern() {
        let mut result = PiiScrubResult::default();
        let scrubbed = scrub_string("ssn 123-45-6789", &mut result);
        assert_eq!(scrubbed, "ssn [SSN]");
        assert_eq!(result.ssns_found, 1);
        assert_eq!(result.phones_found, 0);
    }

    #[test]
    fn test_mrn_and_date_scrubbing() {
        let mut result = PiiScrubResult::default();
        let scrubbed = scrub_string("MRN: 00482913, born 1971-04-12", &mut result);
        assert_eq!(scrubbed, "[MRN], born [DATE]");
        assert_eq!(result.mrns_found, 1);
        assert_eq!(result.dates_found, 1);
    }

    #[test]
    fn test_biomarker_ranges_untouched() {
        let mut result = PiiScrubResult::default();
        for range in ["4.0-5.6", "70-99 mg/dL", "40-49", "<200"] {
            assert_eq!(scrub_string(range, &mut result), range);
        }
        assert_eq!(result.total_entities(), 0);
    }

    #[test]
    fn test_scrub_field_counts_modified() {
        let ctx = LogContext::new("run-pii");
        let mut result = PiiScrubResult::default();

        let clean = scrub_field("condition_category", "cardiology", &ctx, &mut result);
        assert_eq!(clean, "cardiology");
        assert_eq!(result.fields_modified, 0);

        let dirty = scrub_field("facility_tag", "see http://hospital.example/x", &ctx, &mut result);
        assert_eq!(dirty, "see [URL]");
        assert_eq!(result.fields_modified, 1);
    }

    #[test]
    fn test_contains_pii() {
        assert!(contains_pii("reach me at 192.168.1.100"));
        assert!(!contains_pii("oncology"));
    }

    proptest! {
        #[test]
        fn prop_scrubbed_output_has_no_pii(
            prefix in "[a-z ]{0,20}",
            user in "[a-z]{1,10}",
            suffix in "[a-z ]{0,20}",
        ) {
            let input = format!("{prefix}{user}@example.com{suffix}");
            let mut result = PiiScrubResult::default();
            let scrubbed = scrub_string(&input, &mut result);
            prop_assert!(!contains_pii(&scrubbed));
            prop_assert!(result.emails_found >= 1);
        }
    }
}
