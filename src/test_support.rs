use std::sync::Arc;

use crate::{
    cache::{tests::StaticSource, CacheCoordinator, MemoryCache, DEFAULT_TTL},
    config::Config,
    knowledge::KnowledgeBase,
    models::{
        Category, Difficulty, EnvVar, ExternalSetup, Pattern, PatternFile, PatternIndex,
        PatternIndexEntry, Status,
    },
    AppState,
};

fn entry(id: &str, name: &str, description: &str, tags: &[&str]) -> PatternIndexEntry {
    PatternIndexEntry {
        id: id.to_string(),
        category: Category::Auth,
        name: name.to_string(),
        description: description.to_string(),
        tags: tags.iter().map(ToString::to_string).collect(),
        difficulty: Difficulty::Beginner,
        status: Status::Stable,
    }
}

pub(crate) fn auth_index() -> PatternIndex {
    PatternIndex {
        version: "1.0.0".to_string(),
        updated_at: "2025-01-15".to_string(),
        patterns: vec![
            entry(
                "supabase-client-nextjs",
                "Supabase Client Setup",
                "Browser and server Supabase clients for Next.js App Router",
                &["supabase", "client", "ssr"],
            ),
            entry(
                "supabase-google-oauth",
                "Google OAuth",
                "Sign in with Google through Supabase Auth",
                &["google", "oauth", "supabase"],
            ),
            entry(
                "supabase-protected-routes",
                "Protected Routes",
                "Middleware that redirects anonymous visitors",
                &["middleware", "supabase"],
            ),
        ],
    }
}

fn env_var(key: &str, required: bool, where_to_find: Option<&str>) -> EnvVar {
    EnvVar {
        key: key.to_string(),
        required,
        description: String::new(),
        example: None,
        where_to_find: where_to_find.map(ToString::to_string),
        legacy: false,
    }
}

fn pattern(entry: &PatternIndexEntry) -> Pattern {
    Pattern {
        id: entry.id.clone(),
        name: entry.name.clone(),
        description: entry.description.clone(),
        category: entry.category,
        tags: entry.tags.clone(),
        difficulty: entry.difficulty,
        status: entry.status,
        time_estimate: None,
        install: None,
        requires: Vec::new(),
        enables: Vec::new(),
        env: Vec::new(),
        files: Vec::new(),
        external_setup: Vec::new(),
        edge_cases: Vec::new(),
        validation: Vec::new(),
    }
}

pub(crate) fn auth_patterns(index: &PatternIndex) -> Vec<Pattern> {
    index
        .patterns
        .iter()
        .map(|entry| {
            let mut p = pattern(entry);
            if entry.id == "supabase-google-oauth" {
                p.files = vec![PatternFile {
                    path: "app/auth/callback/route.ts".to_string(),
                    code: "export async function GET() {}".to_string(),
                    description: None,
                }];
                p.env = vec![
                    env_var(
                        "GOOGLE_CLIENT_ID",
                        true,
                        Some("Google Cloud Console > Credentials"),
                    ),
                    env_var("GOOGLE_HOSTED_DOMAIN", false, None),
                ];
                p.external_setup = vec![ExternalSetup {
                    provider: "Google Cloud Console".to_string(),
                    steps: vec!["Create an OAuth client".to_string()],
                    url: Some("https://console.cloud.google.com".to_string()),
                }];
            }
            p
        })
        .collect()
}

pub(crate) fn test_state(enable_setup_tool: bool) -> AppState {
    let mut config = Config::from_lookup(|_| None);
    config.enable_setup_tool = enable_setup_tool;

    let index = auth_index();
    let patterns = auth_patterns(&index);
    let source = Arc::new(StaticSource::new(index, patterns));
    let catalog = CacheCoordinator::new(
        source,
        Some(Arc::new(MemoryCache::with_capacity(16))),
        DEFAULT_TTL,
    );

    AppState {
        config,
        catalog,
        knowledge: Arc::new(KnowledgeBase::builtin()),
    }
}
