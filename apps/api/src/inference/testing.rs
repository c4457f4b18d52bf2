//! Small, hand-built bundles shared by the inference tests.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::inference::bundle::ModelBundle;

/// Priority bundle in the legacy layout (`feature_names`, `priority_map`).
///
/// One tree: referred candidates land in a High leaf `[1, 2, 7]`; otherwise
/// candidates with `years_exp_min <= 2` are Low `[6, 3, 1]` and the rest
/// Medium `[1, 6, 3]`.
pub fn priority_bundle_json() -> String {
    json!({
        "model": {
            "type": "random_forest_classifier",
            "n_features": 8,
            "classes": [0, 1, 2],
            "trees": [{
                "children_left":  [1, 2, -1, -1, -1],
                "children_right": [4, 3, -1, -1, -1],
                "feature":        [3, 0, -2, -2, -2],
                "threshold":      [0.5, 2.0, -2.0, -2.0, -2.0],
                "value": [[8.0, 11.0, 11.0], [7.0, 9.0, 4.0], [6.0, 3.0, 1.0], [1.0, 6.0, 3.0], [1.0, 2.0, 7.0]]
            }]
        },
        "feature_names": [
            "years_exp_min", "years_exp_max", "skills_coverage_band", "referral_flag",
            "english_level", "location_match_local", "location_match_relocate",
            "location_match_remoteok"
        ],
        "priority_map": {"0": "Low", "1": "Medium", "2": "High"}
    })
    .to_string()
}

/// Salary bundle: `70000 + 5000*years + 2000*role + 3000*degree`, with `pm`
/// and `qa` collapsed into the `other` role.
pub fn salary_bundle_json() -> String {
    json!({
        "model": {
            "type": "linear_regression",
            "coefficients": [5000.0, 2000.0, 3000.0],
            "intercept": 70000.0
        },
        "model_columns": ["years_experience", "role", "degree"],
        "ordinal_maps": {
            "role": {"backend": 0, "frontend": 1, "data": 2, "other": 3},
            "degree": {"bsc": 0, "msc": 1, "phd": 2}
        },
        "rare_categories": {"role": ["pm", "qa"]}
    })
    .to_string()
}

/// Resume-advance bundle over an 8-dim embedding. The network is a single
/// sigmoid unit reading only the skill-overlap feature with weight 4 and bias -2.
pub fn advance_bundle_json() -> String {
    let embedding_dim = 8;
    let job_families = ["Backend", "Frontend", "Data"];
    let seniorities = ["Junior", "Mid", "Senior"];
    let input = 2 * embedding_dim + job_families.len() + seniorities.len() + 2 + 1;
    let overlap_index = input - 2;
    let mut weights = vec![0.0; input];
    weights[overlap_index] = 4.0;

    json!({
        "embedding_dim": embedding_dim,
        "job_families": job_families,
        "seniorities": seniorities,
        "network": {
            "layers": [
                {"weights": [weights], "bias": [-2.0], "activation": "sigmoid"}
            ]
        }
    })
    .to_string()
}

pub fn priority_bundle() -> ModelBundle {
    ModelBundle::from_json(&priority_bundle_json(), Path::new("priority.json")).unwrap()
}

pub fn salary_bundle() -> ModelBundle {
    ModelBundle::from_json(&salary_bundle_json(), Path::new("salary.json")).unwrap()
}

pub fn write_bundle(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

pub fn object(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap()
}
