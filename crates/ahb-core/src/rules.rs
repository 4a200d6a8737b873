//! Required-files rules and their resolution against a branch identity.
//!
//! A rule file maps stage names (`draft`, `review`, `release`, …) to path
//! templates relative to the documentation root. Templates use `{placeholder}`
//! tokens filled from the [`BranchIdentity`]; backward-compatible aliases
//! (`device`, `variant`, …) are accepted so legacy rule files keep working.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{BranchIdentity, Category, Violation, ViolationKind};
use crate::repo::{join_repo_path, RepoReader};

/// Errors from loading or expanding required-files rules.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("invalid rule file for {category}: {reason}")]
    InvalidRuleFile { category: Category, reason: String },

    #[error("unknown placeholder '{{{name}}}' in template '{template}'")]
    UnknownPlaceholder { name: String, template: String },

    #[error("failed to read rule file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rule file {path} is not valid JSON")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// How unknown template placeholders are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderMode {
    /// Unknown placeholders expand to the empty string.
    #[default]
    Lenient,
    /// Unknown placeholders are an error.
    Strict,
}

/// Directory layout the built-in rule files are written for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeLayout {
    /// `<category>/<blueprint_id>/<library_id>/<release_id>/<YYYY.MM.DD>/…`
    #[default]
    LibraryTree,
    /// `<category>/<device>/<library>/<variant>/v<YYYY.MM.DD>/…`
    Legacy,
}

/// Required path templates of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRequirement {
    pub stage: String,
    pub templates: Vec<String>,
}

/// Ordered stage → templates mapping for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRequirementRules {
    category: Category,
    stages: Vec<StageRequirement>,
}

impl StageRequirementRules {
    /// Parse a rule file. Stage order follows the document order.
    pub fn from_json(category: Category, text: &str, origin: &str) -> Result<Self, RulesError> {
        let value: Value = serde_json::from_str(text).map_err(|source| RulesError::Json {
            path: origin.to_string(),
            source,
        })?;

        let Value::Object(map) = value else {
            return Err(RulesError::InvalidRuleFile {
                category,
                reason: "expected an object mapping stage names to path lists".to_string(),
            });
        };

        let mut stages = Vec::with_capacity(map.len());
        for (stage, templates) in map {
            let Value::Array(items) = templates else {
                return Err(RulesError::InvalidRuleFile {
                    category,
                    reason: format!("stage '{}' must map to an array of paths", stage),
                });
            };
            let mut paths = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => paths.push(s),
                    other => {
                        return Err(RulesError::InvalidRuleFile {
                            category,
                            reason: format!(
                                "stage '{}' contains a non-string entry: {}",
                                stage, other
                            ),
                        })
                    }
                }
            }
            stages.push(StageRequirement {
                stage,
                templates: paths,
            });
        }

        Ok(Self { category, stages })
    }

    /// Rule files compiled into the crate.
    pub fn builtin(category: Category, layout: TreeLayout) -> Result<Self, RulesError> {
        let source = match (layout, category) {
            (TreeLayout::LibraryTree, Category::Controllers) => {
                include_str!("../rules/controllers.json")
            }
            (TreeLayout::LibraryTree, Category::Hooks) => include_str!("../rules/hooks.json"),
            (TreeLayout::LibraryTree, Category::Automations) => {
                include_str!("../rules/automations.json")
            }
            (TreeLayout::Legacy, Category::Controllers) => {
                include_str!("../rules/legacy/controllers.json")
            }
            (TreeLayout::Legacy, Category::Hooks) => include_str!("../rules/legacy/hooks.json"),
            (TreeLayout::Legacy, Category::Automations) => {
                include_str!("../rules/legacy/automations.json")
            }
        };
        Self::from_json(category, source, &format!("<builtin>/{}.json", category))
    }

    /// Load `<rules_dir>/<category>.json`, or the built-in rules when no
    /// directory is configured.
    pub fn load(
        category: Category,
        rules_dir: Option<&Path>,
        layout: TreeLayout,
    ) -> Result<Self, RulesError> {
        let Some(dir) = rules_dir else {
            return Self::builtin(category, layout);
        };
        let path = dir.join(format!("{}.json", category));
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(&path).map_err(|source| RulesError::Io {
            path: origin.clone(),
            source,
        })?;
        let rules = Self::from_json(category, &text, &origin)?;
        info!(path = %origin, stages = rules.stages.len(), "Loaded required-files rules");
        Ok(rules)
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn stages(&self) -> &[StageRequirement] {
        &self.stages
    }
}

/// Value of a template placeholder, including documented aliases.
pub fn placeholder_value(name: &str, identity: &BranchIdentity) -> Option<String> {
    let value = match name {
        "category" => identity.category().as_str(),
        "blueprint_id" | "blueprint" | "device" => identity.blueprint_id(),
        "library_id" | "library" => identity.library_id(),
        "release_id" | "release" | "variant" => identity.release_id(),
        "version" | "date" => identity.version_date(),
        "version_segment" => identity.version_segment(),
        "author" => identity.author(),
        "user" => identity.author_user(),
        _ => return None,
    };
    Some(value.to_string())
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Expand every `{placeholder}` in `template`.
///
/// Braces that do not enclose a placeholder name are kept literally.
pub fn expand_template(
    template: &str,
    identity: &BranchIdentity,
    mode: PlaceholderMode,
) -> Result<String, RulesError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return Ok(out);
        };

        let name = &after[..close];
        if !is_placeholder_name(name) {
            out.push('{');
            rest = after;
            continue;
        }

        match placeholder_value(name, identity) {
            Some(value) => out.push_str(&value),
            None => match mode {
                PlaceholderMode::Lenient => {
                    warn!(placeholder = %name, template = %template, "Unknown placeholder expands to empty string");
                }
                PlaceholderMode::Strict => {
                    return Err(RulesError::UnknownPlaceholder {
                        name: name.to_string(),
                        template: template.to_string(),
                    })
                }
            },
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Expanded paths of one stage that do not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingStage {
    pub stage: String,
    pub paths: Vec<String>,
}

/// Missing required files grouped by stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingFiles {
    /// Stages with at least one missing file, in rule-file order.
    pub stages: Vec<MissingStage>,
}

impl MissingFiles {
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Total number of missing files across stages.
    pub fn total(&self) -> usize {
        self.stages.iter().map(|s| s.paths.len()).sum()
    }

    /// One `MissingRequiredFile` violation per missing path.
    pub fn to_violations(&self) -> Vec<Violation> {
        self.stages
            .iter()
            .flat_map(|stage| {
                stage.paths.iter().map(move |path| {
                    Violation::for_file(
                        ViolationKind::MissingRequiredFile,
                        path.clone(),
                        format!("required by stage '{}'", stage.stage),
                    )
                })
            })
            .collect()
    }
}

/// Expand every stage's templates and report which files are absent.
///
/// Missing paths are reported relative to the repository root
/// (`<docs_root>/<expanded template>`), in template order per stage.
///
/// # Errors
///
/// `RulesError::UnknownPlaceholder` in strict mode.
pub fn resolve_missing(
    identity: &BranchIdentity,
    rules: &StageRequirementRules,
    repo: &dyn RepoReader,
    docs_root: &str,
    mode: PlaceholderMode,
) -> Result<MissingFiles, RulesError> {
    let mut missing = MissingFiles::default();

    for requirement in rules.stages() {
        let mut absent = Vec::new();
        for template in &requirement.templates {
            let expanded = expand_template(template, identity, mode)?;
            let path = join_repo_path(&[docs_root, &expanded]);
            if repo.is_file(&path) {
                debug!(stage = %requirement.stage, file = %path, "Required file present");
            } else {
                absent.push(path);
            }
        }
        if !absent.is_empty() {
            missing.stages.push(MissingStage {
                stage: requirement.stage.clone(),
                paths: absent,
            });
        }
    }

    info!(
        category = %rules.category(),
        missing = missing.total(),
        "Resolved required files"
    );
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{parse_branch, BranchParse};
    use crate::fakes::MemoryRepo;

    fn identity(name: &str) -> BranchIdentity {
        match parse_branch(name).unwrap() {
            BranchParse::Managed(id) => id,
            other => panic!("expected managed branch, got {other:?}"),
        }
    }

    fn contrib() -> BranchIdentity {
        identity("ahb_contrib/hooks/light_hook/zha-lib/default/2024.06.01/author-alice")
    }

    #[test]
    fn test_expand_all_placeholders() {
        let id = contrib();
        let out = expand_template(
            "{category}/{blueprint_id}/{library_id}/{release_id}/{version}/{user}",
            &id,
            PlaceholderMode::Strict,
        )
        .unwrap();
        assert_eq!(out, "hooks/light_hook/zha-lib/default/2024.06.01/alice");
    }

    #[test]
    fn test_aliases_match_canonical_names() {
        let id = contrib();
        let canonical = expand_template("{blueprint_id}/{release_id}", &id, PlaceholderMode::Strict).unwrap();
        let alias = expand_template("{device}/{variant}", &id, PlaceholderMode::Strict).unwrap();
        assert_eq!(canonical, alias);
    }

    #[test]
    fn test_version_segment_keeps_legacy_prefix() {
        let id = identity("ahb/controllers/ikea_e1743/z2m/default/v2023.11.05/author-carol");
        let out = expand_template("{version_segment}|{version}", &id, PlaceholderMode::Strict).unwrap();
        assert_eq!(out, "v2023.11.05|2023.11.05");
    }

    #[test]
    fn test_unknown_placeholder_lenient_is_empty() {
        let id = contrib();
        let out = expand_template("{category}/{nope}/x.json", &id, PlaceholderMode::Lenient).unwrap();
        assert_eq!(out, "hooks//x.json");
    }

    #[test]
    fn test_unknown_placeholder_strict_errors() {
        let id = contrib();
        let err = expand_template("{nope}/x.json", &id, PlaceholderMode::Strict).unwrap_err();
        match err {
            RulesError::UnknownPlaceholder { name, .. } => assert_eq!(name, "nope"),
            other => panic!("expected UnknownPlaceholder, got {other:?}"),
        }
    }

    #[test]
    fn test_literal_braces_preserved() {
        let id = contrib();
        assert_eq!(
            expand_template("a/{ b }/{unterminated", &id, PlaceholderMode::Strict).unwrap(),
            "a/{ b }/{unterminated"
        );
    }

    #[test]
    fn test_rule_file_preserves_stage_order() {
        let rules = StageRequirementRules::from_json(
            Category::Hooks,
            r#"{"release": ["r.json"], "draft": ["d.json"], "review": []}"#,
            "test",
        )
        .unwrap();
        let names: Vec<_> = rules.stages().iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(names, vec!["release", "draft", "review"]);
    }

    #[test]
    fn test_rule_file_rejects_non_string_entries() {
        let err = StageRequirementRules::from_json(Category::Hooks, r#"{"draft": [1]}"#, "test")
            .unwrap_err();
        assert!(matches!(err, RulesError::InvalidRuleFile { .. }));
        let err = StageRequirementRules::from_json(Category::Hooks, r#"["a"]"#, "test").unwrap_err();
        assert!(matches!(err, RulesError::InvalidRuleFile { .. }));
    }

    #[test]
    fn test_builtin_rules_parse_for_every_category_and_layout() {
        for category in Category::ALL {
            for layout in [TreeLayout::LibraryTree, TreeLayout::Legacy] {
                let rules = StageRequirementRules::builtin(category, layout).unwrap();
                assert!(!rules.stages().is_empty());
                assert_eq!(rules.category(), category);
            }
        }
    }

    #[test]
    fn test_builtin_rules_have_no_unknown_placeholders() {
        let id = contrib();
        for category in Category::ALL {
            for layout in [TreeLayout::LibraryTree, TreeLayout::Legacy] {
                let rules = StageRequirementRules::builtin(category, layout).unwrap();
                for stage in rules.stages() {
                    for template in &stage.templates {
                        expand_template(template, &id, PlaceholderMode::Strict).unwrap();
                    }
                }
            }
        }
    }

    #[test]
    fn test_resolve_reports_every_missing_file_grouped_by_stage() {
        let id = contrib();
        let rules = StageRequirementRules::from_json(
            Category::Hooks,
            r#"{
                "draft": ["{category}/{blueprint_id}/blueprint.json"],
                "review": [
                    "{category}/{blueprint_id}/{library_id}/library.json",
                    "{category}/{blueprint_id}/{library_id}/{release_id}/release.json"
                ]
            }"#,
            "test",
        )
        .unwrap();
        let repo = MemoryRepo::new().with_file("docs/hooks/light_hook/blueprint.json", "{}");

        let missing = resolve_missing(&id, &rules, &repo, "docs", PlaceholderMode::Lenient).unwrap();
        assert_eq!(missing.stages.len(), 1);
        assert_eq!(missing.stages[0].stage, "review");
        assert_eq!(
            missing.stages[0].paths,
            vec![
                "docs/hooks/light_hook/zha-lib/library.json".to_string(),
                "docs/hooks/light_hook/zha-lib/default/release.json".to_string(),
            ]
        );
        assert_eq!(missing.total(), 2);
        let violations = missing.to_violations();
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.kind == ViolationKind::MissingRequiredFile));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let id = contrib();
        let rules = StageRequirementRules::builtin(Category::Hooks, TreeLayout::LibraryTree).unwrap();
        let repo = MemoryRepo::new();
        let a = resolve_missing(&id, &rules, &repo, "docs", PlaceholderMode::Lenient).unwrap();
        let b = resolve_missing(&id, &rules, &repo, "docs", PlaceholderMode::Lenient).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.stages.len(), rules.stages().len());
    }

    #[test]
    fn test_all_present_passes() {
        let id = contrib();
        let rules = StageRequirementRules::from_json(
            Category::Hooks,
            r#"{"draft": ["{category}/{blueprint_id}/blueprint.json"]}"#,
            "test",
        )
        .unwrap();
        let repo = MemoryRepo::new().with_file("hooks/light_hook/blueprint.json", "{}");
        let missing = resolve_missing(&id, &rules, &repo, "", PlaceholderMode::Strict).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hooks.json"), r#"{"only": ["x.json"]}"#).unwrap();
        let rules = StageRequirementRules::load(Category::Hooks, Some(dir.path()), TreeLayout::LibraryTree).unwrap();
        assert_eq!(rules.stages().len(), 1);
        assert_eq!(rules.stages()[0].stage, "only");

        let err = StageRequirementRules::load(Category::Controllers, Some(dir.path()), TreeLayout::LibraryTree)
            .unwrap_err();
        assert!(matches!(err, RulesError::Io { .. }));
    }
}
