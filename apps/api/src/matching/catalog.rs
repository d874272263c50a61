//! Skill catalog — the fixed vocabulary the matcher recognises.
//!
//! Read-only for the lifetime of the process. Order matters for the alias
//! rules: they are applied one after another, so a rewrite can feed the next.

/// Alias → canonical rewrite rules, applied in this order.
pub const SKILL_ALIASES: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("nodejs", "node"),
    ("ml", "machine learning"),
    ("ai", "artificial intelligence"),
    ("postgres", "postgresql"),
    ("reactjs", "react"),
    ("expressjs", "express"),
];

/// Canonical skills detected in normalized text.
pub const SKILLS: &[&str] = &[
    "python",
    "java",
    "c++",
    "sql",
    "html",
    "css",
    "javascript",
    "react",
    "node",
    "express",
    "mongodb",
    "flask",
    "aws",
    "docker",
    "machine learning",
    "nlp",
];

/// Keywords signalling role shape or seniority.
pub const ROLE_KEYWORDS: &[&str] = &[
    "intern",
    "developer",
    "engineer",
    "software",
    "backend",
    "frontend",
    "full stack",
];

#[derive(Debug, Clone, Copy)]
pub struct SkillCatalog {
    pub skills: &'static [&'static str],
    pub aliases: &'static [(&'static str, &'static str)],
    pub role_keywords: &'static [&'static str],
}

impl SkillCatalog {
    pub const fn builtin() -> Self {
        Self {
            skills: SKILLS,
            aliases: SKILL_ALIASES,
            role_keywords: ROLE_KEYWORDS,
        }
    }
}

impl Default for SkillCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_has_no_duplicate_skills() {
        let mut skills = SKILLS.to_vec();
        skills.sort_unstable();
        skills.dedup();
        assert_eq!(skills.len(), SKILLS.len());
    }

    #[test]
    fn test_alias_keys_are_lowercase_alphanumeric() {
        for (alias, _) in SKILL_ALIASES {
            assert!(alias
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }
}
