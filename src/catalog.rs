use std::{collections::HashSet, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    errors::CatalogError,
    models::{
        Category, Difficulty, EdgeCase, EnvVar, ExternalSetup, Pattern, PatternFile,
        PatternIndex, PatternIndexEntry, Status,
    },
};

pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/nyko-ai/patterns/main";

const USER_AGENT: &str = concat!("nyko-mcp/", env!("CARGO_PKG_VERSION"));

/// Read-only pattern store.
#[async_trait]
pub trait PatternSource: Send + Sync {
    async fn fetch_index(&self) -> Result<PatternIndex, CatalogError>;

    /// Fetch one pattern. The returned id and category are always the
    /// requested ones, whatever the document claims.
    async fn fetch_pattern(&self, id: &str, category: Category) -> Result<Pattern, CatalogError>;
}

pub fn find_category(index: &PatternIndex, id: &str) -> Option<Category> {
    index.entry(id).map(|entry| entry.category)
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: String,
    http: reqwest::Client,
}

impl CatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn index_url(&self) -> String {
        format!("{}/patterns/_index.json", self.base_url)
    }

    fn pattern_url(&self, id: &str, category: Category) -> String {
        format!("{}/patterns/{}/{}.yaml", self.base_url, category, id)
    }

    async fn get_text(&self, url: &str) -> Result<Result<String, StatusCode>, CatalogError> {
        debug!(url, "Fetching catalog document");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| CatalogError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Ok(Err(status));
        }

        let body = response
            .text()
            .await
            .map_err(|source| CatalogError::Request {
                url: url.to_string(),
                source,
            })?;
        Ok(Ok(body))
    }
}

#[async_trait]
impl PatternSource for CatalogClient {
    async fn fetch_index(&self) -> Result<PatternIndex, CatalogError> {
        let url = self.index_url();
        match self.get_text(&url).await? {
            Ok(body) => parse_index(&body, &url),
            Err(status) => Err(CatalogError::CatalogUnavailable {
                url,
                status: status.as_u16(),
            }),
        }
    }

    async fn fetch_pattern(&self, id: &str, category: Category) -> Result<Pattern, CatalogError> {
        let url = self.pattern_url(id, category);
        match self.get_text(&url).await? {
            Ok(body) => parse_pattern_document(&body, id, category, &url),
            Err(StatusCode::NOT_FOUND) => Err(CatalogError::PatternNotFound(id.to_string())),
            Err(status) => Err(CatalogError::CatalogUnavailable {
                url,
                status: status.as_u16(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawIndexEntry {
    id: String,
    category: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawIndex {
    version: String,
    updated_at: String,
    patterns: Vec<RawIndexEntry>,
}

/// Parse the catalog index. Entries in a category this server does not
/// know are skipped; unknown difficulty or status values get defaults.
pub fn parse_index(body: &str, url: &str) -> Result<PatternIndex, CatalogError> {
    let raw: RawIndex =
        serde_json::from_str(body).map_err(|err| CatalogError::MalformedDocument {
            url: url.to_string(),
            message: err.to_string(),
        })?;

    let duplicate = {
        let mut ids = HashSet::new();
        raw.patterns
            .iter()
            .find(|entry| !ids.insert(entry.id.as_str()))
            .map(|entry| entry.id.clone())
    };
    if let Some(dup) = duplicate {
        return Err(CatalogError::MalformedDocument {
            url: url.to_string(),
            message: format!("duplicate pattern id {dup}"),
        });
    }

    let patterns = raw
        .patterns
        .into_iter()
        .filter_map(|entry| {
            let Some(category) = Category::parse(&entry.category) else {
                warn!(
                    id = %entry.id,
                    category = %entry.category,
                    "Skipping index entry with unknown category"
                );
                return None;
            };
            Some(PatternIndexEntry {
                name: entry.name.unwrap_or_else(|| entry.id.clone()),
                id: entry.id,
                category,
                description: entry.description,
                tags: entry.tags,
                difficulty: parse_difficulty(entry.difficulty.as_deref()),
                status: parse_status(entry.status.as_deref()),
            })
        })
        .collect();

    Ok(PatternIndex {
        version: raw.version,
        updated_at: raw.updated_at,
        patterns,
    })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScalarText {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl ScalarText {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Integer(n) => n.to_string(),
            Self::Float(n) => n.to_string(),
            Self::Flag(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimeEstimateField {
    Text(String),
    Minutes(u64),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InstallField {
    Command(String),
    Commands(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct RawEnvVar {
    key: String,
    #[serde(default)]
    required: Option<bool>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    example: Option<ScalarText>,
    #[serde(default)]
    where_to_find: Option<String>,
}

impl RawEnvVar {
    fn normalize(self, required: Option<bool>, legacy: bool) -> EnvVar {
        EnvVar {
            key: self.key,
            required: required.or(self.required).unwrap_or(true),
            description: self.description.unwrap_or_default(),
            example: self.example.map(ScalarText::into_text),
            where_to_find: self.where_to_find,
            legacy,
        }
    }
}

/// The two layouts seen for the `env_vars` key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnvVarsBlock {
    Flat(Vec<RawEnvVar>),
    Grouped {
        #[serde(default)]
        required: Vec<RawEnvVar>,
        #[serde(default)]
        optional: Vec<RawEnvVar>,
    },
}

#[derive(Debug, Deserialize)]
struct RawFile {
    path: String,
    #[serde(default, alias = "content")]
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawExternalSetup {
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    steps: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ValidationField {
    Text(String),
    Detailed {
        #[serde(alias = "description")]
        step: String,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PatternDocument {
    name: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
    difficulty: Option<String>,
    status: Option<String>,
    time_estimate: Option<TimeEstimateField>,
    install: Option<InstallField>,
    requires: Vec<String>,
    enables: Vec<String>,
    env_vars: Option<EnvVarsBlock>,
    env: Vec<RawEnvVar>,
    files: Vec<RawFile>,
    external_setup: Vec<RawExternalSetup>,
    edge_cases: Vec<EdgeCase>,
    validation: Vec<ValidationField>,
}

fn parse_difficulty(raw: Option<&str>) -> Difficulty {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("beginner") => Difficulty::Beginner,
        Some("advanced") => Difficulty::Advanced,
        _ => Difficulty::Intermediate,
    }
}

fn parse_status(raw: Option<&str>) -> Status {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("beta") => Status::Beta,
        Some("experimental") => Status::Experimental,
        _ => Status::Stable,
    }
}

/// Parse a YAML pattern document into the normalized `Pattern` shape,
/// stamping it with the requested `id` and `category`.
pub fn parse_pattern_document(
    body: &str,
    id: &str,
    category: Category,
    url: &str,
) -> Result<Pattern, CatalogError> {
    let doc: PatternDocument =
        serde_yaml::from_str(body).map_err(|err| CatalogError::MalformedDocument {
            url: url.to_string(),
            message: err.to_string(),
        })?;

    let mut env = Vec::new();
    match doc.env_vars {
        Some(EnvVarsBlock::Grouped { required, optional }) => {
            env.extend(required.into_iter().map(|v| v.normalize(Some(true), false)));
            env.extend(optional.into_iter().map(|v| v.normalize(Some(false), false)));
        }
        Some(EnvVarsBlock::Flat(vars)) => {
            env.extend(vars.into_iter().map(|v| v.normalize(None, false)));
        }
        None => {}
    }
    env.extend(doc.env.into_iter().map(|v| v.normalize(None, true)));

    let time_estimate = doc.time_estimate.map(|field| match field {
        TimeEstimateField::Text(text) => text,
        TimeEstimateField::Minutes(minutes) => format!("{minutes} min"),
    });

    let install = doc.install.map(|field| match field {
        InstallField::Command(command) => command,
        InstallField::Commands(commands) => commands.join("\n"),
    });

    Ok(Pattern {
        id: id.to_string(),
        name: doc.name.unwrap_or_else(|| id.to_string()),
        description: doc.description.unwrap_or_default(),
        category,
        tags: doc.tags,
        difficulty: parse_difficulty(doc.difficulty.as_deref()),
        status: parse_status(doc.status.as_deref()),
        time_estimate,
        install,
        requires: doc.requires,
        enables: doc.enables,
        env,
        files: doc
            .files
            .into_iter()
            .map(|file| PatternFile {
                path: file.path,
                code: file.code,
                description: file.description,
            })
            .collect(),
        external_setup: doc
            .external_setup
            .into_iter()
            .map(|setup| ExternalSetup {
                provider: setup
                    .service
                    .or(setup.provider)
                    .unwrap_or_else(|| "Unknown".to_string()),
                steps: setup.steps,
                url: setup.url.filter(|url| !url.is_empty()),
            })
            .collect(),
        edge_cases: doc.edge_cases,
        validation: doc
            .validation
            .into_iter()
            .map(|step| match step {
                ValidationField::Text(text) => text,
                ValidationField::Detailed { step } => step,
            })
            .collect(),
    })
}
