//! How much of a job's required skill list a candidate covers.

use serde::Serialize;

use crate::models::candidate::Candidate;
use crate::models::job::Job;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobFit {
    pub candidate_id: String,
    pub job_id: String,
    /// 0 – 100
    pub fit_score: u32,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
}

/// Case-insensitive exact skill match. A job with no required skills scores 0.
pub fn check_job_fit(candidate: &Candidate, job: &Job) -> JobFit {
    let have: Vec<String> = candidate.skills.iter().map(|s| s.trim().to_lowercase()).collect();

    let (matched_skills, missing_skills): (Vec<String>, Vec<String>) = job
        .required_skills
        .iter()
        .cloned()
        .partition(|skill| have.contains(&skill.trim().to_lowercase()));

    let fit_score = if job.required_skills.is_empty() {
        0
    } else {
        ((matched_skills.len() as f64 / job.required_skills.len() as f64) * 100.0).round() as u32
    };

    JobFit {
        candidate_id: candidate.candidate_id.clone(),
        job_id: job.job_id.clone(),
        fit_score,
        matched_skills,
        missing_skills,
    }
}
