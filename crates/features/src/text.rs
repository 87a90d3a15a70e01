//! Text normalization helpers for skills, titles and company names.

use std::collections::{BTreeSet, HashSet};

/// Title words that signal a senior employee.
pub const SENIORITY_KEYWORDS: &[&str] = &[
    "senior", "sr", "lead", "principal", "staff", "manager", "director", "head", "vp",
];

/// Company-name keywords that mark a technology-adjacent employer.
pub const TECH_KEYWORDS: &[&str] = &["tech", "software", "digital"];

const TITLE_FILLER: &[&str] = &["of", "and", "the", "for", "at", "in", "to", "an"];

/// Normalize text for comparison: lowercase, punctuation stripped,
/// whitespace collapsed.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a single skill name. Keeps symbols like `c++` or `c#` intact.
pub fn normalize_skill(skill: &str) -> String {
    skill
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalized, de-duplicated skills in first-seen order. Blank entries are dropped.
pub fn skill_set(skills: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    skills
        .iter()
        .map(|s| normalize_skill(s))
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Number of `candidate` skills also present in `employee`.
///
/// Both inputs are expected to come from `skill_set`.
pub fn skill_overlap(candidate: &[String], employee: &[String]) -> usize {
    let employee: HashSet<&str> = employee.iter().map(String::as_str).collect();
    candidate
        .iter()
        .filter(|s| employee.contains(s.as_str()))
        .count()
}

/// Jaccard ratio `|A ∩ B| / |A ∪ B|` of two skill sets, 0.0 when both are empty.
pub fn jaccard(a: &[String], b: &[String]) -> f64 {
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Meaningful tokens of a job title.
pub fn title_tokens(title: &str) -> BTreeSet<String> {
    normalize_text(title)
        .split_whitespace()
        .filter(|t| t.len() >= 2 && !TITLE_FILLER.contains(t))
        .map(str::to_string)
        .collect()
}

/// Whether a title implies seniority (senior, lead, manager, director, ...).
pub fn implies_seniority(title: &str) -> bool {
    title_tokens(title)
        .iter()
        .any(|t| SENIORITY_KEYWORDS.contains(&t.as_str()))
}

/// Whether a company name looks technology-adjacent.
pub fn is_tech_adjacent(company: &str) -> bool {
    let lower = company.to_lowercase();
    TECH_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Case-insensitive equality on trimmed, non-empty text.
pub fn same_text(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    !a.is_empty() && a.to_lowercase() == b.to_lowercase()
}

/// Case-insensitive substring test.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}
