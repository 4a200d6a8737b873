//! Cross-file integrity guardrails.
//!
//! Each guardrail looks at one changed file at a time and checks that what the
//! file declares agrees with where it lives in the library tree:
//!
//! 1. `DeviceIdentity`: `device.json` declares the device folder's name.
//! 2. `MetadataIdVersion`: version `metadata.json` declares its folder's version
//!    (and, outside controllers, the blueprint folder's id).
//! 3. `ControllerFilename`: controller YAML is named after the device and
//!    declares the same internal id.
//! 4. `VersionDiscipline`: only the newest version folder may be edited.
//! 5. `BreakingChange`: a breaking version documents the break in its changelog.
//! 6. `TriggerActionShape`: controller `triggers`/`actions` are string lists.
//!
//! All violations are collected; none of the guardrails stop the others.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::{normalize_version, Category, ChangedFileSet, Violation, ViolationKind};
use crate::repo::{RepoError, RepoReader};

const DEVICE_FILE: &str = "device.json";
const METADATA_FILE: &str = "metadata.json";
const CHANGELOG_FILE: &str = "changelog.json";

/// A single integrity guardrail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guardrail {
    DeviceIdentity,
    MetadataIdVersion,
    ControllerFilename,
    VersionDiscipline,
    BreakingChange,
    TriggerActionShape,
}

impl Guardrail {
    pub const ALL: [Guardrail; 6] = [
        Self::DeviceIdentity,
        Self::MetadataIdVersion,
        Self::ControllerFilename,
        Self::VersionDiscipline,
        Self::BreakingChange,
        Self::TriggerActionShape,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::DeviceIdentity => "device_identity",
            Self::MetadataIdVersion => "metadata_id_version",
            Self::ControllerFilename => "controller_filename",
            Self::VersionDiscipline => "version_discipline",
            Self::BreakingChange => "breaking_change",
            Self::TriggerActionShape => "trigger_action_shape",
        }
    }

    fn reads_content(&self) -> bool {
        !matches!(self, Self::VersionDiscipline)
    }
}

/// The guardrails enabled for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailSet {
    pub guardrails: Vec<Guardrail>,
}

impl GuardrailSet {
    /// Every guardrail (Library Tree v2.0 rules).
    pub fn all() -> Self {
        Self {
            guardrails: Guardrail::ALL.to_vec(),
        }
    }

    /// Legacy tree rules: no version discipline, no breaking-change check.
    pub fn legacy() -> Self {
        Self {
            guardrails: vec![
                Guardrail::DeviceIdentity,
                Guardrail::MetadataIdVersion,
                Guardrail::ControllerFilename,
                Guardrail::TriggerActionShape,
            ],
        }
    }

    pub fn contains(&self, guardrail: Guardrail) -> bool {
        self.guardrails.contains(&guardrail)
    }
}

/// Where a changed file sits in the library tree.
struct TreePosition<'a> {
    path: &'a str,
    dirs: Vec<&'a str>,
    basename: &'a str,
    category: Option<(usize, Category)>,
}

impl<'a> TreePosition<'a> {
    fn new(path: &'a str) -> Option<Self> {
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let basename = segments.pop()?;
        let category = segments
            .iter()
            .enumerate()
            .find_map(|(i, s)| s.parse::<Category>().ok().map(|c| (i, c)));
        Some(Self {
            path,
            dirs: segments,
            basename,
            category,
        })
    }

    fn is_controller(&self) -> bool {
        matches!(self.category, Some((_, Category::Controllers)))
    }

    /// The folder right after the category segment: the blueprint / device id.
    fn identity_folder(&self) -> Option<&'a str> {
        let (idx, _) = self.category?;
        self.dirs.get(idx + 1).copied()
    }

    /// Index (into `dirs`) of the innermost version folder.
    fn version_index(&self) -> Option<usize> {
        self.dirs
            .iter()
            .rposition(|d| normalize_version(d).is_some())
    }

    fn parent(&self) -> Option<&'a str> {
        self.dirs.last().copied()
    }

    fn is_version_metadata(&self) -> bool {
        self.basename == METADATA_FILE
            && self
                .parent()
                .map(|p| normalize_version(p).is_some())
                .unwrap_or(false)
    }

    fn is_controller_yaml(&self) -> bool {
        self.is_controller() && (self.basename.ends_with(".yaml") || self.basename.ends_with(".yml"))
    }

    fn applies(&self, guardrail: Guardrail) -> bool {
        match guardrail {
            Guardrail::DeviceIdentity => self.is_controller() && self.basename == DEVICE_FILE,
            Guardrail::MetadataIdVersion | Guardrail::BreakingChange => self.is_version_metadata(),
            Guardrail::ControllerFilename | Guardrail::TriggerActionShape => self.is_controller_yaml(),
            Guardrail::VersionDiscipline => self.version_index().is_some(),
        }
    }

    fn join(&self, upto: usize) -> String {
        self.dirs[..upto.min(self.dirs.len())].join("/")
    }
}

/// Parsed contents of a changed file.
enum Document {
    Json(Value),
    Yaml(serde_yaml::Value),
}

fn parse_document(pos: &TreePosition<'_>, text: &str) -> Result<Document, String> {
    if pos.basename.ends_with(".json") {
        serde_json::from_str(text)
            .map(Document::Json)
            .map_err(|e| format!("not valid JSON: {}", e))
    } else {
        serde_yaml::from_str(text)
            .map(Document::Yaml)
            .map_err(|e| format!("not valid YAML: {}", e))
    }
}

/// Run the enabled guardrails over every changed file.
pub fn check_integrity(
    repo: &dyn RepoReader,
    files: &ChangedFileSet,
    guardrails: &GuardrailSet,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for path in files.iter() {
        let Some(pos) = TreePosition::new(path) else {
            continue;
        };
        let applicable: Vec<Guardrail> = guardrails
            .guardrails
            .iter()
            .copied()
            .filter(|g| pos.applies(*g))
            .collect();
        if applicable.is_empty() {
            continue;
        }

        if applicable.contains(&Guardrail::VersionDiscipline) {
            violations.extend(check_version_discipline(repo, &pos));
        }

        if !applicable.iter().any(Guardrail::reads_content) {
            continue;
        }

        let text = match repo.read_to_string(path) {
            Ok(text) => text,
            Err(RepoError::NotFound(_)) => {
                debug!(file = %path, "Skipping content guardrails for deleted file");
                continue;
            }
            Err(e) => {
                violations.push(Violation::for_file(
                    ViolationKind::SchemaViolation,
                    path,
                    format!("could not read file: {}", e.describe()),
                ));
                continue;
            }
        };
        let document = match parse_document(&pos, &text) {
            Ok(doc) => doc,
            Err(message) => {
                violations.push(Violation::for_file(
                    ViolationKind::SchemaViolation,
                    path,
                    message,
                ));
                continue;
            }
        };

        for guardrail in applicable {
            let found = match (guardrail, &document) {
                (Guardrail::DeviceIdentity, Document::Json(doc)) => check_device_identity(&pos, doc),
                (Guardrail::MetadataIdVersion, Document::Json(doc)) => {
                    check_metadata_id_version(&pos, doc)
                }
                (Guardrail::BreakingChange, Document::Json(doc)) => {
                    check_breaking_change(repo, &pos, doc)
                }
                (Guardrail::ControllerFilename, Document::Yaml(doc)) => {
                    check_controller_filename(&pos, doc)
                }
                (Guardrail::TriggerActionShape, Document::Yaml(doc)) => {
                    check_trigger_action_shape(&pos, doc)
                }
                _ => Vec::new(),
            };
            violations.extend(found);
        }
    }

    info!(
        files = files.len(),
        violations = violations.len(),
        "Integrity guardrails evaluated"
    );
    violations
}

fn check_device_identity(pos: &TreePosition<'_>, doc: &Value) -> Vec<Violation> {
    let Some(expected) = pos.identity_folder() else {
        return Vec::new();
    };
    match doc.get("device_id").and_then(Value::as_str) {
        Some(declared) if declared == expected => Vec::new(),
        Some(declared) => vec![Violation::for_file(
            ViolationKind::IdentityMismatch,
            pos.path,
            format!(
                "device_id '{}' does not match device folder '{}'",
                declared, expected
            ),
        )],
        None => vec![Violation::for_file(
            ViolationKind::IdentityMismatch,
            pos.path,
            format!("missing string device_id; expected '{}'", expected),
        )],
    }
}

fn check_metadata_id_version(pos: &TreePosition<'_>, doc: &Value) -> Vec<Violation> {
    let mut violations = Vec::new();
    let Some(folder) = pos.parent() else {
        return violations;
    };
    let folder_version = normalize_version(folder).unwrap_or(folder);

    match doc.get("version").and_then(Value::as_str) {
        Some(declared) if declared == folder || declared == folder_version => {}
        Some(declared) => violations.push(Violation::for_file(
            ViolationKind::VersionMismatch,
            pos.path,
            format!(
                "version '{}' does not match version folder '{}'",
                declared, folder
            ),
        )),
        None => violations.push(Violation::for_file(
            ViolationKind::VersionMismatch,
            pos.path,
            format!("missing string version; expected '{}'", folder_version),
        )),
    }

    // Controller identity is carried by device.json instead.
    if pos.is_controller() {
        return violations;
    }
    if let Some(expected) = pos.identity_folder() {
        match doc.get("id").and_then(Value::as_str) {
            Some(declared) if declared == expected => {}
            Some(declared) => violations.push(Violation::for_file(
                ViolationKind::IdentityMismatch,
                pos.path,
                format!("id '{}' does not match blueprint folder '{}'", declared, expected),
            )),
            None => violations.push(Violation::for_file(
                ViolationKind::IdentityMismatch,
                pos.path,
                format!("missing string id; expected '{}'", expected),
            )),
        }
    }
    violations
}

fn check_controller_filename(pos: &TreePosition<'_>, doc: &serde_yaml::Value) -> Vec<Violation> {
    let Some(device) = pos.identity_folder() else {
        return Vec::new();
    };
    let mut violations = Vec::new();

    let stem = pos
        .basename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(pos.basename);
    if stem != device {
        violations.push(Violation::for_file(
            ViolationKind::IdentityMismatch,
            pos.path,
            format!("file name '{}' does not match device id '{}'", stem, device),
        ));
    }

    let internal = ["id", "name"]
        .iter()
        .find_map(|key| doc.get(*key).map(|v| (*key, v)));
    if let Some((key, value)) = internal {
        match value.as_str() {
            Some(declared) if declared == device => {}
            Some(declared) => violations.push(Violation::for_file(
                ViolationKind::IdentityMismatch,
                pos.path,
                format!("{} '{}' does not match device id '{}'", key, declared, device),
            )),
            None => violations.push(Violation::for_file(
                ViolationKind::IdentityMismatch,
                pos.path,
                format!("{} must be the string '{}'", key, device),
            )),
        }
    }
    violations
}

fn check_trigger_action_shape(pos: &TreePosition<'_>, doc: &serde_yaml::Value) -> Vec<Violation> {
    let mut violations = Vec::new();
    for key in ["triggers", "actions"] {
        let Some(value) = doc.get(key) else {
            continue;
        };
        let ok = value
            .as_sequence()
            .map(|items| items.iter().all(|item| item.is_string()))
            .unwrap_or(false);
        if !ok {
            violations.push(Violation::for_file(
                ViolationKind::SchemaViolation,
                pos.path,
                format!("'{}' must be a list of strings", key),
            ));
        }
    }
    violations
}

fn check_version_discipline(repo: &dyn RepoReader, pos: &TreePosition<'_>) -> Vec<Violation> {
    let Some(idx) = pos.version_index() else {
        return Vec::new();
    };
    let edited_folder = pos.dirs[idx];
    let Some(edited) = normalize_version(edited_folder) else {
        return Vec::new();
    };
    let id_dir = pos.join(idx);

    let mut versions: Vec<String> = match repo.list_dirs(&id_dir) {
        Ok(dirs) => dirs
            .iter()
            .filter_map(|d| normalize_version(d))
            .map(str::to_string)
            .collect(),
        Err(RepoError::NotFound(_)) => Vec::new(),
        Err(e) => {
            return vec![Violation::for_file(
                ViolationKind::OutOfOrderVersionEdit,
                pos.path,
                format!("could not list versions under '{}': {}", id_dir, e.describe()),
            )]
        }
    };
    versions.push(edited.to_string());
    // Fixed-width, zero-padded dates sort chronologically as strings.
    versions.sort();

    match versions.last() {
        Some(latest) if latest.as_str() != edited => vec![Violation::for_file(
            ViolationKind::OutOfOrderVersionEdit,
            pos.path,
            format!(
                "version '{}' is not the latest under '{}'; only '{}' may be modified",
                edited_folder, id_dir, latest
            ),
        )],
        _ => Vec::new(),
    }
}

fn check_breaking_change(repo: &dyn RepoReader, pos: &TreePosition<'_>, doc: &Value) -> Vec<Violation> {
    if doc.get("breaking").and_then(Value::as_bool) != Some(true) {
        return Vec::new();
    }
    let changelog = format!("{}/{}", pos.join(pos.dirs.len()), CHANGELOG_FILE);

    let undocumented = |reason: String| {
        vec![Violation::for_file(
            ViolationKind::UndocumentedBreakingChange,
            pos.path,
            reason,
        )]
    };

    let text = match repo.read_to_string(&changelog) {
        Ok(text) => text,
        Err(RepoError::NotFound(_)) => {
            return undocumented(format!(
                "version declares breaking: true but {} is missing",
                changelog
            ))
        }
        Err(e) => return undocumented(format!("could not read {}: {}", changelog, e.describe())),
    };
    let entries: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => return undocumented(format!("{} is not valid JSON: {}", changelog, e)),
    };

    let documented = entries
        .get("changes")
        .and_then(Value::as_array)
        .map(|changes| {
            changes
                .iter()
                .any(|c| c.get("breaking").and_then(Value::as_bool) == Some(true))
        })
        .unwrap_or(false);

    if documented {
        Vec::new()
    } else {
        undocumented(format!(
            "version declares breaking: true but {} has no change with breaking: true",
            changelog
        ))
    }
}
