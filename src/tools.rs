use std::collections::{HashMap, HashSet};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    compat,
    errors::ToolError,
    matcher,
    models::{Category, GetResult, SearchHit, SearchResult, SequenceResult},
    sequencer, setup, AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Search,
    Get,
    Sequence,
    Check,
    Setup,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Self::Search,
        Self::Get,
        Self::Sequence,
        Self::Check,
        Self::Setup,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Search => "nyko_search",
            Self::Get => "nyko_get",
            Self::Sequence => "nyko_sequence",
            Self::Check => "nyko_check",
            Self::Setup => "nyko_setup",
        }
    }

    /// Resolve a tool by its wire name. `nyko_setup` only resolves when
    /// enabled.
    pub fn resolve(name: &str, setup_enabled: bool) -> Option<Tool> {
        Self::ALL
            .into_iter()
            .filter(|tool| setup_enabled || *tool != Self::Setup)
            .find(|tool| tool.name() == name)
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Search => "Search for implementation patterns by keyword. Use when user wants to implement a feature like 'google auth', 'stripe payments', etc.",
            Self::Get => "Get complete implementation details for a pattern including all code, files, env vars, and setup steps.",
            Self::Sequence => "Get ordered sequence of patterns to implement a complete feature. Use when user wants something that needs multiple patterns.",
            Self::Check => "Check if a pattern is compatible with current project dependencies.",
            Self::Setup => "Get the external service setup steps and environment variables a pattern needs.",
        }
    }

    fn input_schema(&self) -> Value {
        match self {
            Self::Search => json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for (e.g., 'google oauth', 'stripe checkout')"
                    },
                    "category": {
                        "type": "string",
                        "enum": Category::ALL.iter().map(Category::as_str).collect::<Vec<_>>(),
                        "description": "Optional category filter"
                    }
                },
                "required": ["query"]
            }),
            Self::Get => json!({
                "type": "object",
                "properties": {
                    "pattern_id": {
                        "type": "string",
                        "description": "Pattern ID from search results (e.g., 'supabase-google-oauth')"
                    },
                    "has_src_dir": {
                        "type": "boolean",
                        "description": "Whether the project uses a src/ directory",
                        "default": false
                    }
                },
                "required": ["pattern_id"]
            }),
            Self::Sequence => json!({
                "type": "object",
                "properties": {
                    "goal": {
                        "type": "string",
                        "description": "What the user wants to achieve (e.g., 'complete auth system with google and protected routes')"
                    },
                    "already_implemented": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Pattern IDs already in the project",
                        "default": []
                    }
                },
                "required": ["goal"]
            }),
            Self::Check => json!({
                "type": "object",
                "properties": {
                    "pattern_id": {
                        "type": "string",
                        "description": "Pattern ID to check"
                    },
                    "dependencies": {
                        "type": "object",
                        "description": "Current package.json dependencies object"
                    }
                },
                "required": ["pattern_id", "dependencies"]
            }),
            Self::Setup => json!({
                "type": "object",
                "properties": {
                    "pattern_id": {
                        "type": "string",
                        "description": "Pattern ID to prepare external services for"
                    }
                },
                "required": ["pattern_id"]
            }),
        }
    }

    pub fn definition(&self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description(),
            "inputSchema": self.input_schema(),
        })
    }
}

pub fn tool_definitions(setup_enabled: bool) -> Vec<Value> {
    Tool::ALL
        .iter()
        .filter(|tool| setup_enabled || **tool != Tool::Setup)
        .map(Tool::definition)
        .collect()
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    category: Option<Category>,
}

#[derive(Debug, Deserialize)]
struct GetArgs {
    pattern_id: String,
    #[serde(default)]
    has_src_dir: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct SequenceArgs {
    goal: String,
    #[serde(default)]
    already_implemented: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CheckArgs {
    pattern_id: String,
    dependencies: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SetupArgs {
    pattern_id: String,
}

fn parse_args<T: DeserializeOwned>(tool: Tool, args: &Value) -> Result<T, ToolError> {
    serde_json::from_value(args.clone())
        .map_err(|err| ToolError::invalid_arguments(tool.name(), err.to_string()))
}

fn require_text(tool: Tool, field: &str, value: &str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        return Err(ToolError::invalid_arguments(
            tool.name(),
            format!("{field} must not be empty"),
        ));
    }
    Ok(())
}

fn to_payload<T: Serialize>(value: &T) -> Result<Value, ToolError> {
    Ok(serde_json::to_value(value)?)
}

pub async fn run_tool(state: &AppState, tool: Tool, args: &Value) -> Result<Value, ToolError> {
    match tool {
        Tool::Search => handle_search(state, parse_args(tool, args)?).await,
        Tool::Get => handle_get(state, parse_args(tool, args)?).await,
        Tool::Sequence => handle_sequence(state, parse_args(tool, args)?).await,
        Tool::Check => handle_check(state, parse_args(tool, args)?).await,
        Tool::Setup => handle_setup(state, parse_args(tool, args)?).await,
    }
}

async fn handle_search(state: &AppState, args: SearchArgs) -> Result<Value, ToolError> {
    require_text(Tool::Search, "query", &args.query)?;
    let index = state.catalog.load_index().await?;

    let patterns = matcher::search(&args.query, args.category, &index)
        .into_iter()
        .map(SearchHit::from)
        .collect::<Vec<_>>();

    to_payload(&SearchResult {
        total: patterns.len(),
        patterns,
    })
}

async fn handle_get(state: &AppState, args: GetArgs) -> Result<Value, ToolError> {
    let pattern = state.catalog.load_pattern(&args.pattern_id).await?;
    let pattern = if args.has_src_dir.unwrap_or(false) {
        pattern.with_src_dir()
    } else {
        pattern
    };

    to_payload(&GetResult { pattern })
}

async fn handle_sequence(state: &AppState, args: SequenceArgs) -> Result<Value, ToolError> {
    require_text(Tool::Sequence, "goal", &args.goal)?;
    let implemented: HashSet<String> = args
        .already_implemented
        .unwrap_or_default()
        .into_iter()
        .collect();
    let index = state.catalog.load_index().await?;

    let targets = matcher::find_relevant(&args.goal, &index, &state.knowledge);
    let sequence = sequencer::build_sequence(&targets, &implemented, &index, &state.knowledge)?;
    let minutes = sequencer::total_minutes(&sequence, &state.knowledge);

    to_payload(&SequenceResult {
        sequence,
        total_time: sequencer::format_time_estimate(minutes),
    })
}

async fn handle_check(state: &AppState, args: CheckArgs) -> Result<Value, ToolError> {
    let index = state.catalog.load_index().await?;
    let result = compat::check(
        &args.pattern_id,
        &args.dependencies,
        &index,
        &state.knowledge,
    )?;
    to_payload(&result)
}

async fn handle_setup(state: &AppState, args: SetupArgs) -> Result<Value, ToolError> {
    let pattern = state.catalog.load_pattern(&args.pattern_id).await?;
    to_payload(&setup::extract_setup(&pattern))
}
