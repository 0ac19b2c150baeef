use std::collections::HashSet;

use crate::models::{EnvVar, EnvVarInfo, Pattern, SetupResult, SetupStep};

const FALLBACK_WHERE_TO_FIND: &str = "Check pattern documentation";

pub fn extract_setup(pattern: &Pattern) -> SetupResult {
    let setup_steps = pattern
        .external_setup
        .iter()
        .map(|setup| SetupStep {
            provider: normalize_provider_name(&setup.provider),
            title: setup_title(&setup.provider),
            url: setup.url.clone().unwrap_or_default(),
            steps: setup.steps.clone(),
        })
        .collect();

    let mut seen = HashSet::new();
    let env_vars_needed = pattern
        .env
        .iter()
        .filter(|var| var.required || var.legacy)
        .filter(|var| seen.insert(var.key.clone()))
        .map(env_var_info)
        .collect();

    SetupResult {
        pattern_id: pattern.id.clone(),
        pattern_name: pattern.name.clone(),
        setup_steps,
        env_vars_needed,
    }
}

fn env_var_info(var: &EnvVar) -> EnvVarInfo {
    let where_to_find = [var.where_to_find.as_deref(), Some(var.description.as_str())]
        .into_iter()
        .flatten()
        .find(|text| !text.trim().is_empty())
        .unwrap_or(FALLBACK_WHERE_TO_FIND)
        .to_string();

    EnvVarInfo {
        key: var.key.clone(),
        where_to_find,
    }
}

pub fn normalize_provider_name(name: &str) -> String {
    match name {
        "Google Cloud Console" | "Google Cloud" => "google_cloud".to_string(),
        "Supabase" => "supabase".to_string(),
        "Stripe" => "stripe".to_string(),
        "GitHub" => "github".to_string(),
        "Vercel" => "vercel".to_string(),
        "AWS" => "aws".to_string(),
        "Cloudflare" => "cloudflare".to_string(),
        other => other
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_"),
    }
}

fn setup_title(provider: &str) -> String {
    match provider {
        "Google Cloud Console" | "Google Cloud" => "Create OAuth Credentials".to_string(),
        "Supabase" => "Configure Supabase Dashboard".to_string(),
        "Stripe" => "Configure Stripe Dashboard".to_string(),
        "GitHub" => "Configure GitHub Settings".to_string(),
        "Vercel" => "Configure Vercel Project".to_string(),
        other => format!("Configure {other}"),
    }
}
