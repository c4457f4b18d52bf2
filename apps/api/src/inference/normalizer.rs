//! Feature normalization. Turns a loosely-typed request body into the exact
//! feature vector a bundle's estimator was trained on.
//!
//! Pipeline:
//! 1. Profile-specific derivations (candidate priority only).
//! 2. Rare-category collapsing to `"other"`.
//! 3. Ordinal mapping; unseen categories become `-1`.
//! 4. Coercion of the remaining values to numbers; malformed values become `0`.
//! 5. Alignment to the bundle's training column order.
//! 6. Optional scaling; a scaler failure falls back to the unscaled vector.
//!
//! Malformed individual fields never fail normalization.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::inference::bundle::ModelBundle;

/// Raw per-request feature record.
pub type FeatureRecord = Map<String, Value>;

pub const OTHER_CATEGORY: &str = "other";
pub const ORDINAL_FALLBACK: f64 = -1.0;
pub const MISSING_DEFAULT: f64 = 0.0;

pub const YEARS_EXP_MIN: &str = "years_exp_min";
pub const YEARS_EXP_MAX: &str = "years_exp_max";
pub const SKILLS_COVERAGE_BAND: &str = "skills_coverage_band";
pub const REFERRAL_FLAG: &str = "referral_flag";
pub const ENGLISH_LEVEL: &str = "english_level";
pub const LOCATION_LOCAL: &str = "location_match_local";
pub const LOCATION_RELOCATE: &str = "location_match_relocate";
pub const LOCATION_REMOTE: &str = "location_match_remoteok";
pub const LOCATION_UNKNOWN: &str = "location_match_unknown";

const DEFAULT_SKILLS_COVERAGE: u8 = 1;
const DEFAULT_ENGLISH_LEVEL: u8 = 3;
const CEFR_LEVELS: [&str; 6] = ["A1", "A2", "B1", "B2", "C1", "C2"];

/// Which derivations run before the generic encoding steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureProfile {
    /// Request keys are used as feature names directly.
    Tabular,
    /// Candidate attributes are derived into banded priority features.
    CandidatePriority,
}

/// Feature values in the bundle's column order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub columns: Vec<String>,
    pub values: Vec<f64>,
    pub scaled: bool,
}

impl FeatureVector {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }
}

/// Normalizes `raw` against `bundle`. Pure: the same input and bundle always
/// produce the same vector.
pub fn normalize(raw: &FeatureRecord, bundle: &ModelBundle, profile: FeatureProfile) -> FeatureVector {
    let record = match profile {
        FeatureProfile::Tabular => raw.clone(),
        FeatureProfile::CandidatePriority => derive_candidate_features(raw, &bundle.feature_columns),
    };
    let record = collapse_rare_categories(record, bundle);

    let values: Vec<f64> = bundle
        .feature_columns
        .iter()
        .map(|column| encode_value(column, record.get(column), bundle))
        .collect();

    let mut vector = FeatureVector {
        columns: bundle.feature_columns.clone(),
        values,
        scaled: false,
    };

    if let Some(scaler) = &bundle.scaler {
        match scaler.transform(&vector.values) {
            Ok(scaled) => {
                vector.values = scaled;
                vector.scaled = true;
            }
            Err(e) => warn!("Scaling failed, using unscaled features: {e}"),
        }
    }

    vector
}

// ────────────────────────────────────────────────────────────────────────────
// Generic encoding
// ────────────────────────────────────────────────────────────────────────────

fn collapse_rare_categories(mut record: FeatureRecord, bundle: &ModelBundle) -> FeatureRecord {
    for (column, rare) in &bundle.rare_categories {
        if let Some(value) = record.get_mut(column) {
            if category_key(value).is_some_and(|key| rare.contains(&key)) {
                *value = Value::String(OTHER_CATEGORY.to_string());
            }
        }
    }
    record
}

fn encode_value(column: &str, value: Option<&Value>, bundle: &ModelBundle) -> f64 {
    let value = match value {
        None | Some(Value::Null) => return MISSING_DEFAULT,
        Some(v) => v,
    };

    if let Some(mapping) = bundle.ordinal_maps.get(column) {
        return category_key(value)
            .and_then(|key| mapping.get(&key).copied())
            .unwrap_or(ORDINAL_FALLBACK);
    }

    match coerce_number(value) {
        Some(n) => n,
        None => {
            debug!("Feature '{column}' has non-numeric value {value}, using default");
            MISSING_DEFAULT
        }
    }
}

/// The string a category value is looked up by.
fn category_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numbers as-is, booleans as 1/0, numeric strings parsed. Non-finite results
/// are treated as malformed.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(" "),
        other => other.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Candidate-priority derivations
// ────────────────────────────────────────────────────────────────────────────

/// Maps years of experience to a `(min, max)` band. Boundary values fall into
/// the lower band.
pub fn experience_band(years: f64) -> (u8, u8) {
    if years <= 1.0 {
        (0, 1)
    } else if years <= 3.0 {
        (1, 3)
    } else if years <= 6.0 {
        (3, 6)
    } else {
        (6, 99)
    }
}

pub fn skills_coverage(text: &str) -> u8 {
    let text = text.to_lowercase();
    if text.contains("high") {
        2
    } else if text.contains("medium") {
        1
    } else {
        0
    }
}

pub fn referral_flag(text: &str) -> u8 {
    u8::from(matches!(text.trim().to_lowercase().as_str(), "true" | "yes" | "1"))
}

/// CEFR level A1..C2 as 1..6. Unknown levels map to B1.
pub fn english_level(text: &str) -> u8 {
    let upper = text.trim().to_uppercase();
    CEFR_LEVELS
        .iter()
        .position(|level| *level == upper)
        .map(|i| i as u8 + 1)
        .unwrap_or(DEFAULT_ENGLISH_LEVEL)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationMatch {
    Local,
    Relocate,
    RemoteOk,
    Unknown,
}

impl LocationMatch {
    /// Case-insensitive substring match; the first of local, relocate, remote wins.
    pub fn classify(location: &str) -> Self {
        let location = location.to_lowercase();
        if location.contains("local") {
            LocationMatch::Local
        } else if location.contains("relocat") {
            LocationMatch::Relocate
        } else if location.contains("remote") {
            LocationMatch::RemoteOk
        } else {
            LocationMatch::Unknown
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            LocationMatch::Local => LOCATION_LOCAL,
            LocationMatch::Relocate => LOCATION_RELOCATE,
            LocationMatch::RemoteOk => LOCATION_REMOTE,
            LocationMatch::Unknown => LOCATION_UNKNOWN,
        }
    }
}

const LOCATION_COLUMNS: [&str; 4] = [LOCATION_LOCAL, LOCATION_RELOCATE, LOCATION_REMOTE, LOCATION_UNKNOWN];

/// Builds the priority feature record: defaults first, then whatever the
/// request supplies. Other request keys are carried through untouched.
fn derive_candidate_features(raw: &FeatureRecord, expected: &[String]) -> FeatureRecord {
    let mut record = raw.clone();
    let mut set = |key: &str, v: u8| {
        record.insert(key.to_string(), Value::from(v));
    };

    let (min, max) = raw
        .get("years_experience")
        .and_then(coerce_number)
        .map(experience_band)
        .unwrap_or((0, 0));
    set(YEARS_EXP_MIN, min);
    set(YEARS_EXP_MAX, max);

    set(
        SKILLS_COVERAGE_BAND,
        raw.get("skills")
            .map(|v| skills_coverage(&value_text(v)))
            .unwrap_or(DEFAULT_SKILLS_COVERAGE),
    );
    set(
        REFERRAL_FLAG,
        raw.get("referral").map(|v| referral_flag(&value_text(v))).unwrap_or(0),
    );
    set(
        ENGLISH_LEVEL,
        raw.get("english_level")
            .map(|v| english_level(&value_text(v)))
            .unwrap_or(DEFAULT_ENGLISH_LEVEL),
    );

    let location = raw.get("location").map(value_text).unwrap_or_default();
    let mut matched = LocationMatch::classify(&location);
    // Bundles trained without an unknown column treat unknown locations as local.
    if matched == LocationMatch::Unknown && !expected.iter().any(|c| c == LOCATION_UNKNOWN) {
        matched = LocationMatch::Local;
    }
    for column in LOCATION_COLUMNS {
        set(column, u8::from(column == matched.column()));
    }

    record
}
