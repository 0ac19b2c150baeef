use std::collections::HashMap;

use crate::{
    errors::CatalogError,
    knowledge::KnowledgeBase,
    models::{CheckResult, CompatibilityIssue, IssueKind, PatternIndex, Severity},
    version::{is_compatible, strip_operators},
};

pub fn check(
    pattern_id: &str,
    dependencies: &HashMap<String, String>,
    index: &PatternIndex,
    kb: &KnowledgeBase,
) -> Result<CheckResult, CatalogError> {
    if index.entry(pattern_id).is_none() {
        return Err(CatalogError::PatternNotFound(pattern_id.to_string()));
    }

    let requirements = kb.requirements(pattern_id);
    let mut issues = Vec::new();
    let mut missing = Vec::new();

    for (package, required) in requirements {
        let Some(current) = dependencies
            .get(package)
            .filter(|version| !version.trim().is_empty())
        else {
            missing.push(package.clone());
            continue;
        };

        if !is_compatible(current, required) {
            issues.push(CompatibilityIssue {
                kind: IssueKind::VersionMismatch,
                package: package.clone(),
                current: Some(current.clone()),
                required: Some(required.clone()),
                severity: Severity::Error,
            });
        }
    }

    let install_command = (!missing.is_empty()).then(|| {
        let installs = requirements
            .iter()
            .filter(|(package, _)| missing.contains(package))
            .map(|(package, required)| install_spec(package, required))
            .collect::<Vec<_>>();
        format!("npm install {}", installs.join(" "))
    });

    Ok(CheckResult {
        compatible: issues.is_empty() && missing.is_empty(),
        issues,
        missing,
        install_command,
    })
}

fn install_spec(package: &str, required: &str) -> String {
    let min_version = strip_operators(required);
    if min_version.is_empty() {
        format!("{package}@latest")
    } else {
        format!("{package}@^{min_version}")
    }
}
