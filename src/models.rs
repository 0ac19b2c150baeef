use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Auth,
    Payments,
    Database,
    Deploy,
    Email,
    Api,
    Storage,
    Monitoring,
    Ai,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Self::Auth,
        Self::Payments,
        Self::Database,
        Self::Deploy,
        Self::Email,
        Self::Api,
        Self::Storage,
        Self::Monitoring,
        Self::Ai,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Payments => "payments",
            Self::Database => "database",
            Self::Deploy => "deploy",
            Self::Email => "email",
            Self::Api => "api",
            Self::Storage => "storage",
            Self::Monitoring => "monitoring",
            Self::Ai => "ai",
        }
    }

    pub fn parse(raw: &str) -> Option<Category> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Stable,
    Beta,
    Experimental,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternIndexEntry {
    pub id: String,
    pub category: Category,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternIndex {
    pub version: String,
    pub updated_at: String,
    pub patterns: Vec<PatternIndexEntry>,
}

impl PatternIndex {
    pub fn entry(&self, id: &str) -> Option<&PatternIndexEntry> {
        self.patterns.iter().find(|entry| entry.id == id)
    }

    /// Display name for `id`, or the id itself when the index has no entry.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.entry(id).map(|entry| entry.name.as_str()).unwrap_or(id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvVar {
    pub key: String,
    pub required: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_to_find: Option<String>,
    /// True when declared through the legacy flat `env` list.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub legacy: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatternFile {
    pub path: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalSetup {
    pub provider: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EdgeCase {
    pub symptom: String,
    pub solution: String,
}

/// Normalized pattern document. Also the shape stored in the cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pattern {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_estimate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enables: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PatternFile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_setup: Vec<ExternalSetup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edge_cases: Vec<EdgeCase>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<String>,
}

const SRC_DIR_PREFIXES: [&str; 5] = ["lib/", "utils/", "components/", "hooks/", "app/"];

impl Pattern {
    /// Copy of this pattern with file paths moved under `src/` for projects
    /// that keep sources there.
    pub fn with_src_dir(&self) -> Pattern {
        let mut adjusted = self.clone();
        for file in &mut adjusted.files {
            file.path = adjust_path_for_src_dir(&file.path);
        }
        adjusted
    }
}

fn adjust_path_for_src_dir(path: &str) -> String {
    if SRC_DIR_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
    {
        format!("src/{path}")
    } else {
        path.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub status: Status,
}

impl From<&PatternIndexEntry> for SearchHit {
    fn from(entry: &PatternIndexEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            description: entry.description.clone(),
            category: entry.category,
            difficulty: entry.difficulty,
            status: entry.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub patterns: Vec<SearchHit>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResult {
    pub pattern: Pattern,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SequenceStep {
    pub order: usize,
    pub id: String,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceResult {
    pub sequence: Vec<SequenceStep>,
    pub total_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    VersionMismatch,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompatibilityIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<String>,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub compatible: bool,
    pub issues: Vec<CompatibilityIssue>,
    pub missing: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetupStep {
    pub provider: String,
    pub title: String,
    pub url: String,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvVarInfo {
    pub key: String,
    pub where_to_find: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupResult {
    pub pattern_id: String,
    pub pattern_name: String,
    pub setup_steps: Vec<SetupStep>,
    pub env_vars_needed: Vec<EnvVarInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pattern() -> Pattern {
        Pattern {
            id: "supabase-client-nextjs".to_string(),
            name: "Supabase Client".to_string(),
            description: String::new(),
            category: Category::Auth,
            tags: Vec::new(),
            difficulty: Difficulty::Beginner,
            status: Status::Stable,
            time_estimate: None,
            install: None,
            requires: Vec::new(),
            enables: Vec::new(),
            env: Vec::new(),
            files: vec![
                PatternFile {
                    path: "lib/supabase/server.ts".to_string(),
                    code: "export {}".to_string(),
                    description: None,
                },
                PatternFile {
                    path: "middleware.ts".to_string(),
                    code: "export {}".to_string(),
                    description: None,
                },
                PatternFile {
                    path: "app/auth/callback/route.ts".to_string(),
                    code: "export {}".to_string(),
                    description: None,
                },
            ],
            external_setup: Vec::new(),
            edge_cases: Vec::new(),
            validation: Vec::new(),
        }
    }

    #[test]
    fn src_dir_rewrites_known_prefixes_only() {
        let original = sample_pattern();
        let adjusted = original.with_src_dir();

        let paths: Vec<&str> = adjusted.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "src/lib/supabase/server.ts",
                "middleware.ts",
                "src/app/auth/callback/route.ts"
            ]
        );
        assert_eq!(original.files[0].path, "lib/supabase/server.ts");
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let index = PatternIndex {
            version: "1".to_string(),
            updated_at: "2025-01-01".to_string(),
            patterns: vec![PatternIndexEntry {
                id: "stripe-checkout-session".to_string(),
                category: Category::Payments,
                name: "Stripe Checkout".to_string(),
                description: String::new(),
                tags: Vec::new(),
                difficulty: Difficulty::Intermediate,
                status: Status::Stable,
            }],
        };

        assert_eq!(index.display_name("stripe-checkout-session"), "Stripe Checkout");
        assert_eq!(index.display_name("unknown-pattern"), "unknown-pattern");
    }

    #[test]
    fn category_serializes_lowercase() {
        let value = serde_json::to_value(Category::Monitoring).expect("serialize");
        assert_eq!(value, serde_json::json!("monitoring"));
        assert_eq!(Category::ALL.len(), 9);
    }
}
