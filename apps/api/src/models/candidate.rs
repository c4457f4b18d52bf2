use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Typed view over a stored candidate document. Unknown fields are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub current_role: Option<String>,
    #[serde(default)]
    pub years_experience: Option<f64>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub resume_text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Candidate {
    /// Stored resume text, or a short summary assembled from the profile fields.
    pub fn resume_text(&self) -> String {
        if let Some(text) = self.resume_text.as_deref().filter(|t| !t.trim().is_empty()) {
            return text.to_string();
        }
        let mut parts = Vec::new();
        if let Some(role) = &self.current_role {
            parts.push(role.clone());
        }
        if let Some(years) = self.years_experience {
            parts.push(format!("{} years experience", years.round() as i64));
        }
        if !self.skills.is_empty() {
            parts.push(format!("Skills: {}", self.skills.join(", ")));
        }
        if let Some(degree) = &self.degree {
            parts.push(degree.clone());
        }
        parts.join(". ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loose_document_deserializes() {
        let c: Candidate = serde_json::from_value(json!({
            "candidate_id": "CAND001",
            "years_experience": 4.5,
            "skills": ["Python", "AWS"],
            "referral": "yes"
        }))
        .unwrap();
        assert_eq!(c.skills.len(), 2);
        assert_eq!(c.extra["referral"], "yes");
    }

    #[test]
    fn test_resume_text_falls_back_to_profile() {
        let c: Candidate = serde_json::from_value(json!({
            "candidate_id": "CAND002",
            "current_role": "Backend Engineer",
            "years_experience": 6,
            "skills": ["Python", "AWS"]
        }))
        .unwrap();
        assert_eq!(
            c.resume_text(),
            "Backend Engineer. 6 years experience. Skills: Python, AWS"
        );
    }
}
