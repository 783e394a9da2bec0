// CV ↔ job matching endpoints (non-streaming).
// analyze: weighted matching score. jobscan: ATS-style skill coverage report.

pub mod analyze;
pub mod handlers;
pub mod jobscan;
pub mod models;
pub mod prompts;

/// Trims, drops blanks and removes case-insensitive duplicates, keeping
/// the first spelling of each skill.
pub fn dedup_skills(skills: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_skills_keeps_first_spelling() {
        let skills = dedup_skills(["Rust", " rust", "Go", "", "GO"].map(String::from));
        assert_eq!(skills, vec!["Rust", "Go"]);
    }
}
