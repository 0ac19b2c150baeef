//! Built-in lookup tables for sequencing and compatibility checks.
//!
//! Loaded once at startup and shared read-only through `AppState`.

use std::collections::HashMap;

const DEFAULT_MINUTES: u32 = 10;
const DEFAULT_REASON: &str = "Feature implementation";

/// Goal keywords that select a fixed set of patterns.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub keywords: Vec<String>,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    requirements: HashMap<String, Vec<(String, String)>>,
    time_estimates: HashMap<String, u32>,
    dependencies: HashMap<String, Vec<String>>,
    reasons: HashMap<String, String>,
    rules: Vec<KeywordRule>,
}

impl KnowledgeBase {
    pub fn builtin() -> Self {
        let next_supabase = [
            ("next", ">=14.0.0"),
            ("@supabase/supabase-js", ">=2.49.0"),
            ("@supabase/ssr", ">=0.5.0"),
        ];
        let next_stripe = [("next", ">=14.0.0"), ("stripe", ">=14.0.0")];

        let mut kb = Self::default();

        for id in [
            "supabase-client-nextjs",
            "supabase-google-oauth",
            "supabase-github-oauth",
            "supabase-magic-link",
            "supabase-protected-routes",
            "supabase-signout",
        ] {
            kb = kb.with_requirements(id, &next_supabase);
        }
        for id in [
            "stripe-checkout-session",
            "stripe-webhook-handler",
            "stripe-customer-portal",
        ] {
            kb = kb.with_requirements(id, &next_stripe);
        }
        for id in [
            "supabase-rls-policies",
            "docker-compose-dev",
            "github-actions-vercel",
        ] {
            kb = kb.with_requirements(id, &[]);
        }
        kb = kb.with_requirements(
            "rate-limiting-upstash",
            &[
                ("next", ">=14.0.0"),
                ("@upstash/ratelimit", ">=2.0.0"),
                ("@upstash/redis", ">=1.34.0"),
            ],
        );

        let graph: [(&str, &[&str]); 9] = [
            ("supabase-google-oauth", &["supabase-client-nextjs"]),
            ("supabase-github-oauth", &["supabase-client-nextjs"]),
            ("supabase-magic-link", &["supabase-client-nextjs"]),
            ("supabase-protected-routes", &["supabase-client-nextjs"]),
            ("supabase-signout", &["supabase-client-nextjs"]),
            ("stripe-checkout-session", &[]),
            ("stripe-webhook-handler", &[]),
            ("stripe-customer-portal", &["stripe-checkout-session"]),
            ("supabase-rls-policies", &["supabase-client-nextjs"]),
        ];
        for (id, deps) in graph {
            kb = kb.with_dependencies(id, deps);
        }

        for (id, minutes, reason) in [
            ("supabase-client-nextjs", 10, "Base Supabase setup"),
            ("supabase-google-oauth", 20, "Google authentication"),
            ("supabase-github-oauth", 15, "GitHub authentication"),
            ("supabase-magic-link", 15, "Passwordless email login"),
            ("supabase-protected-routes", 10, "Route protection"),
            ("supabase-signout", 5, "Sign out functionality"),
            ("stripe-checkout-session", 20, "Payment checkout"),
            ("stripe-webhook-handler", 15, "Payment event handling"),
            ("stripe-customer-portal", 10, "Subscription management"),
            ("supabase-rls-policies", 15, "Database security"),
            ("docker-compose-dev", 10, "Local development environment"),
            ("github-actions-vercel", 10, "CI/CD deployment"),
            ("rate-limiting-upstash", 15, "API rate limiting"),
        ] {
            kb.time_estimates.insert(id.to_string(), minutes);
            kb.reasons.insert(id.to_string(), reason.to_string());
        }

        let rules: [(&[&str], &[&str]); 14] = [
            (
                &["google", "oauth", "google auth"],
                &["supabase-google-oauth"],
            ),
            (&["github", "github auth"], &["supabase-github-oauth"]),
            (
                &["magic link", "passwordless", "email auth"],
                &["supabase-magic-link"],
            ),
            (
                &["protected", "routes", "middleware", "auth guard"],
                &["supabase-protected-routes"],
            ),
            (&["sign out", "logout", "signout"], &["supabase-signout"]),
            (
                &["stripe", "checkout", "payment"],
                &["stripe-checkout-session"],
            ),
            (&["webhook", "stripe webhook"], &["stripe-webhook-handler"]),
            (
                &["portal", "billing", "subscription manage"],
                &["stripe-customer-portal"],
            ),
            (
                &["rls", "row level", "security policies"],
                &["supabase-rls-policies"],
            ),
            (&["docker", "compose", "local dev"], &["docker-compose-dev"]),
            (
                &["github actions", "vercel", "ci/cd", "deploy"],
                &["github-actions-vercel"],
            ),
            (
                &["rate limit", "upstash", "throttle"],
                &["rate-limiting-upstash"],
            ),
            (
                &["auth", "authentication", "complete auth", "full auth"],
                &[
                    "supabase-client-nextjs",
                    "supabase-google-oauth",
                    "supabase-protected-routes",
                ],
            ),
            (
                &["payments", "complete payments", "full payments"],
                &[
                    "stripe-checkout-session",
                    "stripe-webhook-handler",
                    "stripe-customer-portal",
                ],
            ),
        ];
        for (keywords, patterns) in rules {
            kb = kb.with_rule(keywords, patterns);
        }

        kb
    }

    pub fn with_requirements(mut self, id: &str, packages: &[(&str, &str)]) -> Self {
        self.requirements.insert(
            id.to_string(),
            packages
                .iter()
                .map(|(pkg, version)| (pkg.to_string(), version.to_string()))
                .collect(),
        );
        self
    }

    pub fn with_dependencies(mut self, id: &str, deps: &[&str]) -> Self {
        self.dependencies.insert(
            id.to_string(),
            deps.iter().map(ToString::to_string).collect(),
        );
        self
    }

    pub fn with_rule(mut self, keywords: &[&str], patterns: &[&str]) -> Self {
        self.rules.push(KeywordRule {
            keywords: keywords.iter().map(ToString::to_string).collect(),
            patterns: patterns.iter().map(ToString::to_string).collect(),
        });
        self
    }

    /// Package requirements in declaration order; empty for unknown patterns.
    pub fn requirements(&self, id: &str) -> &[(String, String)] {
        self.requirements.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dependencies(&self, id: &str) -> &[String] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn minutes(&self, id: &str) -> u32 {
        self.time_estimates
            .get(id)
            .copied()
            .unwrap_or(DEFAULT_MINUTES)
    }

    pub fn reason(&self, id: &str) -> &str {
        self.reasons
            .get(id)
            .map(String::as_str)
            .unwrap_or(DEFAULT_REASON)
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }
}
