//! JSON Schema validation of changed blueprint documents.
//!
//! Each changed file is classified into a [`DocumentKind`] by name or
//! position, then validated against the matching schema from a
//! [`SchemaRegistry`]. Markdown pages are validated through their YAML front
//! matter only. All errors for all files are collected before returning.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{normalize_version, Category, ChangedFileSet, Violation, ViolationKind};
use crate::repo::{RepoError, RepoReader};

/// Logical document kinds with a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Blueprint,
    Library,
    Release,
    Version,
    Changelog,
    Device,
    DocPage,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 7] = [
        Self::Blueprint,
        Self::Library,
        Self::Release,
        Self::Version,
        Self::Changelog,
        Self::Device,
        Self::DocPage,
    ];

    /// Short name; schema files are named `<name>.schema.json`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blueprint => "blueprint",
            Self::Library => "library",
            Self::Release => "release",
            Self::Version => "version",
            Self::Changelog => "changelog",
            Self::Device => "device",
            Self::DocPage => "docs",
        }
    }

    pub fn schema_file_name(&self) -> String {
        format!("{}.schema.json", self.name())
    }

    fn builtin_source(&self) -> &'static str {
        match self {
            Self::Blueprint => include_str!("../schemas/blueprint.schema.json"),
            Self::Library => include_str!("../schemas/library.schema.json"),
            Self::Release => include_str!("../schemas/release.schema.json"),
            Self::Version => include_str!("../schemas/version.schema.json"),
            Self::Changelog => include_str!("../schemas/changelog.schema.json"),
            Self::Device => include_str!("../schemas/device.schema.json"),
            Self::DocPage => include_str!("../schemas/docs.schema.json"),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised while building a [`SchemaRegistry`].
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{kind} schema has no string $id")]
    MissingSchemaId { kind: DocumentKind },

    #[error("{kind} schema does not compile: {message}")]
    InvalidSchema { kind: DocumentKind, message: String },

    #[error("failed to read schema {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema {} is not valid JSON", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

struct CompiledSchema {
    id: String,
    validator: jsonschema::Validator,
}

/// Compiled schemas keyed by document kind.
///
/// Built once per run and passed explicitly to every validation call.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<DocumentKind, CompiledSchema>,
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.schemas.iter().map(|(k, s)| (k, &s.id)))
            .finish()
    }
}

impl SchemaRegistry {
    /// A registry with no schemas; every document kind is skipped.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The schemas shipped with this crate.
    pub fn builtin() -> Result<Self, SchemaError> {
        let mut registry = Self::empty();
        for kind in DocumentKind::ALL {
            let path = PathBuf::from(format!("<builtin>/{}", kind.schema_file_name()));
            let schema: Value = serde_json::from_str(kind.builtin_source())
                .map_err(|source| SchemaError::Json { path, source })?;
            registry.insert(kind, &schema)?;
        }
        Ok(registry)
    }

    /// Load `<kind>.schema.json` files from `dir`.
    ///
    /// A kind without a schema file is not validated.
    pub fn load_dir(dir: &Path) -> Result<Self, SchemaError> {
        let mut registry = Self::empty();
        for kind in DocumentKind::ALL {
            let path = dir.join(kind.schema_file_name());
            if !path.is_file() {
                debug!(kind = %kind, path = %path.display(), "No schema file for kind");
                continue;
            }
            let raw = std::fs::read_to_string(&path).map_err(|source| SchemaError::Io {
                path: path.clone(),
                source,
            })?;
            let schema: Value = serde_json::from_str(&raw)
                .map_err(|source| SchemaError::Json { path: path.clone(), source })?;
            registry.insert(kind, &schema)?;
        }
        info!(dir = %dir.display(), schemas = registry.len(), "Loaded schema registry");
        Ok(registry)
    }

    /// Build a registry from in-memory schema documents.
    pub fn from_documents<I>(documents: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (DocumentKind, Value)>,
    {
        let mut registry = Self::empty();
        for (kind, schema) in documents {
            registry.insert(kind, &schema)?;
        }
        Ok(registry)
    }

    /// Compile and register a schema for `kind`, replacing any previous one.
    pub fn insert(&mut self, kind: DocumentKind, schema: &Value) -> Result<(), SchemaError> {
        let id = schema
            .get("$id")
            .and_then(Value::as_str)
            .ok_or(SchemaError::MissingSchemaId { kind })?
            .to_string();

        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .build(schema)
            .map_err(|e| SchemaError::InvalidSchema {
                kind,
                message: e.to_string(),
            })?;

        self.schemas.insert(kind, CompiledSchema { id, validator });
        Ok(())
    }

    /// `$id` of the registered schema for `kind`.
    pub fn schema_id(&self, kind: DocumentKind) -> Option<&str> {
        self.schemas.get(&kind).map(|s| s.id.as_str())
    }

    pub fn contains(&self, kind: DocumentKind) -> bool {
        self.schemas.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Validate `instance` against the schema for `kind`.
    ///
    /// Returns every error as `"<instance path>: <message>"`. A kind without a
    /// registered schema yields no errors.
    pub fn validate(&self, kind: DocumentKind, instance: &Value) -> Vec<String> {
        let Some(schema) = self.schemas.get(&kind) else {
            return Vec::new();
        };
        schema
            .validator
            .iter_errors(instance)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    format!("/: {}", e)
                } else {
                    format!("{}: {}", path, e)
                }
            })
            .collect()
    }
}

/// Whether a folder name is a dated version folder (`YYYY.MM.DD`, optional `v`).
pub fn is_version_folder(name: &str) -> bool {
    normalize_version(name).is_some()
}

/// Classify a repository path into a document kind.
///
/// Exact basenames (`device.json`, `blueprint.json`, …) are recognised
/// anywhere; `metadata.json` is a version document only when its parent is a
/// version folder. When `category` is given, the positional `metadata.json`
/// and markdown patterns also require a `<category>` segment in the path.
pub fn classify(path: &str, category: Option<Category>) -> Option<DocumentKind> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let (basename, dirs) = segments.split_last()?;
    let under_category = category
        .map(|c| dirs.iter().any(|d| *d == c.as_str()))
        .unwrap_or(true);

    match *basename {
        "device.json" => Some(DocumentKind::Device),
        "blueprint.json" => Some(DocumentKind::Blueprint),
        "library.json" => Some(DocumentKind::Library),
        "release.json" => Some(DocumentKind::Release),
        "changelog.json" => Some(DocumentKind::Changelog),
        "metadata.json" => dirs
            .last()
            .filter(|parent| is_version_folder(parent) && under_category)
            .map(|_| DocumentKind::Version),
        name if (name.ends_with(".md") || name.ends_with(".mdx")) && under_category => {
            Some(DocumentKind::DocPage)
        }
        _ => None,
    }
}

/// Extract the YAML front-matter block of a markdown document.
///
/// The block must open on the first line with `---` and close with a line
/// containing only `---`. Returns `None` when there is no complete block.
pub fn extract_front_matter(text: &str) -> Option<&str> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }

    let start = first.len();
    let mut offset = start;
    for line in lines {
        if line.trim_end() == "---" {
            return text.get(start..offset);
        }
        offset += line.len();
    }
    None
}

/// Parse a document of `kind` into the JSON value that gets validated.
///
/// `Ok(None)` means the document has nothing to validate (markdown without
/// front matter).
pub fn parse_document(kind: DocumentKind, text: &str) -> Result<Option<Value>, String> {
    match kind {
        DocumentKind::DocPage => match extract_front_matter(text) {
            Some(block) => serde_yaml::from_str::<Value>(block)
                .map(Some)
                .map_err(|e| format!("front matter is not valid YAML: {}", e)),
            None => Ok(None),
        },
        _ => serde_json::from_str::<Value>(text)
            .map(Some)
            .map_err(|e| format!("not valid JSON: {}", e)),
    }
}

/// Validate every recognised changed file against its schema.
///
/// Unrecognised and deleted files are skipped. Violations accumulate across
/// all files (fail-late).
pub fn validate_changed_files(
    registry: &SchemaRegistry,
    repo: &dyn RepoReader,
    files: &ChangedFileSet,
    category: Option<Category>,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for path in files.iter() {
        let Some(kind) = classify(path, category) else {
            debug!(file = %path, "Skipping file with no document kind");
            continue;
        };
        if !registry.contains(kind) {
            debug!(file = %path, kind = %kind, "No schema registered for kind");
            continue;
        }

        let text = match repo.read_to_string(path) {
            Ok(text) => text,
            Err(RepoError::NotFound(_)) => {
                debug!(file = %path, "Skipping deleted file");
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

        let document = match parse_document(kind, &text) {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                debug!(file = %path, "No front matter to validate");
                continue;
            }
            Err(message) => {
                violations.push(Violation::for_file(
                    ViolationKind::SchemaViolation,
                    path,
                    message,
                ));
                continue;
            }
        };

        let errors = registry.validate(kind, &document);
        debug!(file = %path, kind = %kind, errors = errors.len(), "Validated document");
        for error in errors {
            violations.push(Violation::for_file(
                ViolationKind::SchemaViolation,
                path,
                format!("{} schema: {}", kind, error),
            ));
        }
    }

    violations
}
