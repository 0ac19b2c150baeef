use std::collections::HashSet;

use crate::{
    errors::SequenceError,
    knowledge::KnowledgeBase,
    models::{PatternIndex, SequenceStep},
};

struct SequenceBuilder<'a> {
    implemented: &'a HashSet<String>,
    index: &'a PatternIndex,
    kb: &'a KnowledgeBase,
    added: HashSet<String>,
    visiting: Vec<String>,
    steps: Vec<SequenceStep>,
}

impl SequenceBuilder<'_> {
    fn skip(&self, id: &str) -> bool {
        self.added.contains(id) || self.implemented.contains(id)
    }

    fn add_with_deps(&mut self, id: &str, reason: String) -> Result<(), SequenceError> {
        if self.skip(id) {
            return Ok(());
        }
        if self.visiting.iter().any(|v| v == id) {
            let mut chain = self.visiting.clone();
            chain.push(id.to_string());
            return Err(SequenceError::DependencyCycle { chain });
        }

        self.visiting.push(id.to_string());
        let kb = self.kb;
        for dep in kb.dependencies(id) {
            if !self.skip(dep) {
                let reason = format!("Required for {}", self.index.display_name(id));
                self.add_with_deps(dep, reason)?;
            }
        }
        self.visiting.pop();

        self.steps.push(SequenceStep {
            order: self.steps.len() + 1,
            id: id.to_string(),
            name: self.index.display_name(id).to_string(),
            reason,
        });
        self.added.insert(id.to_string());
        Ok(())
    }
}

/// Install order for `targets`: prerequisites first, each id at most once,
/// anything in `implemented` left out.
pub fn build_sequence(
    targets: &[String],
    implemented: &HashSet<String>,
    index: &PatternIndex,
    kb: &KnowledgeBase,
) -> Result<Vec<SequenceStep>, SequenceError> {
    let mut builder = SequenceBuilder {
        implemented,
        index,
        kb,
        added: HashSet::new(),
        visiting: Vec::new(),
        steps: Vec::new(),
    };

    for id in targets {
        builder.add_with_deps(id, kb.reason(id).to_string())?;
    }

    Ok(builder.steps)
}

pub fn total_minutes(steps: &[SequenceStep], kb: &KnowledgeBase) -> u32 {
    steps.iter().map(|step| kb.minutes(&step.id)).sum()
}

pub fn format_time_estimate(minutes: u32) -> String {
    match minutes {
        0..=10 => "~10 min".to_string(),
        11..=15 => "10-15 min".to_string(),
        16..=30 => "20-30 min".to_string(),
        31..=45 => "30-45 min".to_string(),
        46..=60 => "45-60 min".to_string(),
        _ => format!("{} min", (minutes + 7) / 15 * 15),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Difficulty, PatternIndexEntry, Status};

    fn index() -> PatternIndex {
        let entry = |id: &str, category: Category, name: &str| PatternIndexEntry {
            id: id.to_string(),
            category,
            name: name.to_string(),
            description: String::new(),
            tags: Vec::new(),
            difficulty: Difficulty::Intermediate,
            status: Status::Stable,
        };
        PatternIndex {
            version: "1.0.0".to_string(),
            updated_at: "2025-01-15".to_string(),
            patterns: vec![
                entry("supabase-client-nextjs", Category::Auth, "Supabase Client"),
                entry("supabase-google-oauth", Category::Auth, "Google OAuth"),
                entry("stripe-checkout-session", Category::Payments, "Stripe Checkout"),
                entry("stripe-customer-portal", Category::Payments, "Customer Portal"),
            ],
        }
    }

    fn ids(targets: &[&str]) -> Vec<String> {
        targets.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn prerequisites_come_first() {
        let kb = KnowledgeBase::builtin();
        let steps = build_sequence(
            &ids(&["stripe-customer-portal"]),
            &HashSet::new(),
            &index(),
            &kb,
        )
        .expect("sequence");

        assert_eq!(
            steps,
            vec![
                SequenceStep {
                    order: 1,
                    id: "stripe-checkout-session".to_string(),
                    name: "Stripe Checkout".to_string(),
                    reason: "Required for Customer Portal".to_string(),
                },
                SequenceStep {
                    order: 2,
                    id: "stripe-customer-portal".to_string(),
                    name: "Customer Portal".to_string(),
                    reason: "Subscription management".to_string(),
                },
            ]
        );
    }

    #[test]
    fn implemented_patterns_are_skipped() {
        let kb = KnowledgeBase::builtin();
        let targets = ids(&["supabase-google-oauth", "stripe-customer-portal"]);
        let first = build_sequence(&targets, &HashSet::new(), &index(), &kb).expect("sequence");
        assert_eq!(first.len(), 4);

        let implemented: HashSet<String> = first.iter().map(|s| s.id.clone()).collect();
        let second = build_sequence(&targets, &implemented, &index(), &kb).expect("sequence");
        assert!(second.is_empty());

        let partial: HashSet<String> = ["supabase-client-nextjs".to_string()].into();
        let third = build_sequence(&targets, &partial, &index(), &kb).expect("sequence");
        assert_eq!(third[0].id, "supabase-google-oauth");
        assert_eq!(third[0].order, 1);
    }

    #[test]
    fn shared_prerequisite_emitted_once() {
        let kb = KnowledgeBase::builtin();
        let targets = ids(&[
            "supabase-google-oauth",
            "supabase-protected-routes",
            "supabase-client-nextjs",
        ]);
        let steps = build_sequence(&targets, &HashSet::new(), &index(), &kb).expect("sequence");
        let order: Vec<&str> = steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "supabase-client-nextjs",
                "supabase-google-oauth",
                "supabase-protected-routes"
            ]
        );
        assert_eq!(steps[2].name, "supabase-protected-routes");
    }

    #[test]
    fn cycles_are_reported() {
        let kb = KnowledgeBase::default()
            .with_dependencies("a", &["b"])
            .with_dependencies("b", &["c"])
            .with_dependencies("c", &["a"]);
        let err = build_sequence(&ids(&["a"]), &HashSet::new(), &index(), &kb)
            .expect_err("cycle must fail");
        assert_eq!(err.to_string(), "Dependency cycle detected: a -> b -> c -> a");

        let self_ref = KnowledgeBase::default().with_dependencies("x", &["x"]);
        assert!(build_sequence(&ids(&["x"]), &HashSet::new(), &index(), &self_ref).is_err());
    }

    #[test]
    fn time_buckets() {
        assert_eq!(format_time_estimate(0), "~10 min");
        assert_eq!(format_time_estimate(10), "~10 min");
        assert_eq!(format_time_estimate(15), "10-15 min");
        assert_eq!(format_time_estimate(25), "20-30 min");
        assert_eq!(format_time_estimate(40), "30-45 min");
        assert_eq!(format_time_estimate(60), "45-60 min");
        assert_eq!(format_time_estimate(67), "60 min");
        assert_eq!(format_time_estimate(68), "75 min");
        assert_eq!(format_time_estimate(125), "120 min");
    }

    #[test]
    fn unknown_ids_default_to_ten_minutes() {
        let kb = KnowledgeBase::builtin();
        let steps = build_sequence(&ids(&["custom-thing"]), &HashSet::new(), &index(), &kb)
            .expect("sequence");
        assert_eq!(steps[0].reason, "Feature implementation");
        assert_eq!(total_minutes(&steps, &kb), 10);
    }
}
