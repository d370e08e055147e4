//! Normalization of real-backend responses into [`AttestedResult`].
//!
//! The backend is trusted to redact, but the client still enforces the
//! summary shape: only allow-listed keys survive, every surviving string
//! goes through the PII scrubber, and exact ages are coarsened to a decade
//! bucket.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::logging::structured::LogContext;
use crate::security::pii::{scrub_field, PiiScrubResult};

use super::error::ProcessorError;
use super::json_path::{resolve_first, scalar_to_string};
use super::mode::ExecutionMode;
use super::types::{AttestedResult, StudySummary};

const ATTESTATION_PATHS: &[&str] = &[
    "attestation",
    "attestation_token",
    "result.attestation",
    "result.attestation_token",
];

const SUMMARY_PATHS: &[&str] = &["summary", "result.summary", "metadata"];

const REPORTED_HASH_PATHS: &[&str] = &[
    "content_hash",
    "dataset_hash",
    "result.content_hash",
    "result.dataset_hash",
];

const AGE_KEYS: &[&str] = &["age_bucket", "age_range", "age"];
const CONDITION_KEYS: &[&str] = &["condition_category", "condition"];
const BIOMARKER_KEYS: &[&str] = &["biomarker_ranges", "biomarkers"];
const FACILITY_KEYS: &[&str] = &["facility_tag", "facility"];

lazy_static! {
    /// Already-coarse buckets: "40-49", "40 - 49", "90+".
    static ref AGE_BUCKET_PATTERN: Regex = Regex::new(r"^\d{1,3}\s*-\s*\d{1,3}$|^\d{1,3}\+$").unwrap();

    static ref FIRST_NUMBER_PATTERN: Regex = Regex::new(r"\d+").unwrap();
}

/// Placeholder when the backend omitted a required summary field.
pub const UNKNOWN: &str = "unknown";

/// Longest string kept for any summary value.
const MAX_VALUE_LEN: usize = 64;

/// Build an [`AttestedResult`] from a parsed backend response.
///
/// `fingerprint` is the locally computed digest of the submitted bytes.
/// Malformed responses are reported as `Network` errors so that `auto`
/// mode can still fall back.
pub fn normalize_response(
    response: &Value,
    fingerprint: &str,
    fallback_available: bool,
    ctx: &LogContext,
) -> Result<AttestedResult, ProcessorError> {
    if !response.is_object() {
        return Err(ProcessorError::network(
            "malformed response: expected JSON object",
            fallback_available,
        ));
    }

    let attestation_token = resolve_first(response, ATTESTATION_PATHS)
        .and_then(scalar_to_string)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ProcessorError::network(
                "malformed response: missing attestation",
                fallback_available,
            )
        })?;

    if let Some(reported) = resolve_first(response, REPORTED_HASH_PATHS).and_then(scalar_to_string)
    {
        let reported = reported.trim_start_matches("0x").to_ascii_lowercase();
        if reported != fingerprint {
            log::warn!(
                "{} BACKEND_HASH_MISMATCH local={} reported={}",
                ctx,
                fingerprint,
                reported
            );
        }
    }

    let summary = match resolve_first(response, SUMMARY_PATHS) {
        Some(raw) => normalize_summary(raw, ctx),
        None => {
            log::warn!("{} SUMMARY_MISSING using_placeholders=true", ctx);
            empty_summary()
        }
    };

    Ok(AttestedResult {
        content_fingerprint: fingerprint.to_string(),
        summary,
        attestation_token,
        mode_used: ExecutionMode::Real,
        used_fallback: false,
    })
}

fn empty_summary() -> StudySummary {
    StudySummary {
        age_bucket: UNKNOWN.to_string(),
        condition_category: UNKNOWN.to_string(),
        biomarker_ranges: BTreeMap::new(),
        facility_tag: None,
    }
}

/// Reduce an arbitrary summary object to [`StudySummary`].
pub fn normalize_summary(raw: &Value, ctx: &LogContext) -> StudySummary {
    let Some(obj) = raw.as_object() else {
        log::warn!("{} SUMMARY_NOT_OBJECT using_placeholders=true", ctx);
        return empty_summary();
    };

    let known: Vec<&str> = AGE_KEYS
        .iter()
        .chain(CONDITION_KEYS)
        .chain(BIOMARKER_KEYS)
        .chain(FACILITY_KEYS)
        .copied()
        .collect();
    let dropped = obj.keys().filter(|k| !known.contains(&k.as_str())).count();
    if dropped > 0 {
        log::warn!("{} SUMMARY_FIELDS_DROPPED count={}", ctx, dropped);
    }

    let mut pii = PiiScrubResult::default();

    let age_bucket = first_scalar(obj, AGE_KEYS)
        .map(|s| coarsen_age(&s))
        .map(|s| scrub_field("age_bucket", &s, ctx, &mut pii))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let condition_category = first_scalar(obj, CONDITION_KEYS)
        .map(|s| scrub_field("condition_category", &s, ctx, &mut pii))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let mut biomarker_ranges = BTreeMap::new();
    if let Some(Value::Object(markers)) = BIOMARKER_KEYS.iter().find_map(|k| obj.get(*k)) {
        for (name, range) in markers {
            let Some(range) = scalar_to_string(range) else {
                continue;
            };
            let name = scrub_field("biomarker_name", &clamp(name), ctx, &mut pii);
            let range = scrub_field("biomarker_range", &clamp(&range), ctx, &mut pii);
            biomarker_ranges.insert(name, range);
        }
    }

    let facility_tag = first_scalar(obj, FACILITY_KEYS)
        .map(|s| scrub_field("facility_tag", &s, ctx, &mut pii))
        .filter(|s| !s.is_empty());

    if pii.total_entities() > 0 {
        log::warn!(
            "{} SUMMARY_REDACTED entities={} fields_modified={}",
            ctx,
            pii.total_entities(),
            pii.fields_modified
        );
    }

    StudySummary {
        age_bucket,
        condition_category,
        biomarker_ranges,
        facility_tag,
    }
}

fn first_scalar(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| obj.get(*k))
        .and_then(scalar_to_string)
        .map(|s| clamp(&s))
        .filter(|s| !s.is_empty())
}

fn clamp(s: &str) -> String {
    s.chars().take(MAX_VALUE_LEN).collect()
}

/// Turn an exact age into a decade bucket; leave buckets alone.
///
/// The first integer in the value is taken as the age, so "47 years",
/// "47.5" and "age 47" all land in "40-49". Values with no digits pass
/// through unchanged.
pub fn coarsen_age(age: &str) -> String {
    let trimmed = age.trim();
    if AGE_BUCKET_PATTERN.is_match(trimmed) {
        return trimmed.to_string();
    }

    let years = FIRST_NUMBER_PATTERN
        .find(trimmed)
        .and_then(|m| m.as_str().parse::<u32>().ok());

    match years {
        Some(years) if years >= 90 => "90+".to_string(),
        Some(years) => {
            let low = years / 10 * 10;
            format!("{}-{}", low, low + 9)
        }
        None if trimmed.chars().any(|c| c.is_ascii_digit()) => UNKNOWN.to_string(),
        None => trimmed.to_string(),
    }
}
