use std::collections::HashSet;

use crate::{
    knowledge::KnowledgeBase,
    models::{Category, PatternIndex, PatternIndexEntry},
};

fn search_terms(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(ToString::to_string)
        .collect()
}

fn score_entry(entry: &PatternIndexEntry, terms: &[String]) -> u32 {
    let searchable = [
        entry.name.as_str(),
        entry.description.as_str(),
        entry.tags.join(" ").as_str(),
        entry.id.as_str(),
        entry.category.as_str(),
    ]
    .join(" ")
    .to_lowercase();
    let id = entry.id.to_lowercase();

    let mut score = 0;
    for term in terms {
        if !searchable.contains(term.as_str()) {
            continue;
        }
        score += 1;
        if entry.tags.iter().any(|tag| tag.to_lowercase() == *term) {
            score += 2;
        }
        if id.contains(term.as_str()) {
            score += 1;
        }
    }
    score
}

/// Entries matching `query`, best first. Equal scores keep index order.
pub fn search<'a>(
    query: &str,
    category: Option<Category>,
    index: &'a PatternIndex,
) -> Vec<&'a PatternIndexEntry> {
    let terms = search_terms(query);

    let mut scored = index
        .patterns
        .iter()
        .filter(|entry| category.map_or(true, |c| entry.category == c))
        .map(|entry| (score_entry(entry, &terms), entry))
        .filter(|(score, _)| *score > 0)
        .collect::<Vec<_>>();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, entry)| entry).collect()
}

/// Pattern ids relevant to a free-text goal. Keyword rules win; when none
/// fire, any entry whose name, description or tags contain a goal term is
/// selected. Result order is first-insertion order.
pub fn find_relevant(goal: &str, index: &PatternIndex, kb: &KnowledgeBase) -> Vec<String> {
    let goal_lower = goal.to_lowercase();
    let mut seen = HashSet::new();
    let mut selected = Vec::new();

    for rule in kb.rules() {
        if rule
            .keywords
            .iter()
            .any(|keyword| goal_lower.contains(keyword.as_str()))
        {
            for id in &rule.patterns {
                if seen.insert(id.clone()) {
                    selected.push(id.clone());
                }
            }
        }
    }

    if !selected.is_empty() {
        return selected;
    }

    let terms = search_terms(goal);
    for entry in &index.patterns {
        let searchable = format!(
            "{} {} {}",
            entry.name,
            entry.description,
            entry.tags.join(" ")
        )
        .to_lowercase();
        if terms.iter().any(|term| searchable.contains(term.as_str()))
            && seen.insert(entry.id.clone())
        {
            selected.push(entry.id.clone());
        }
    }

    selected
}
