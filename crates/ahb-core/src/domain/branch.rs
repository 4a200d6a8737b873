//! Branch identifier parsing.
//!
//! A managed branch name carries the full identity of a contribution:
//!
//! ```text
//! <prefix>/<category>/<blueprint_id>/<library_id>/<release_id>/<YYYY.MM.DD>/author-<user>
//! ```
//!
//! `ahb_contrib/` branches belong to contributors, `ahb_maintain/` branches to
//! maintainers. The legacy `ahb/` prefix (with a `v`-prefixed version) is still
//! accepted and treated as a contributor branch. Any other branch is not
//! applicable and is skipped.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::BranchError;

/// Number of `/`-separated segments in a managed branch name.
pub const BRANCH_SEGMENTS: usize = 7;

/// Literal prefix of the author segment.
pub const AUTHOR_PREFIX: &str = "author-";

const BLUEPRINT_ID_RULE: &str = "expected lowercase letters, digits and underscores";
const LIBRARY_ID_RULE: &str = "expected letters, digits, dashes and underscores";

fn blueprint_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9_]+$").expect("valid blueprint id pattern"))
}

fn library_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid library id pattern"))
}

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^v?(\d{4}\.\d{2}\.\d{2})$").expect("valid version pattern"))
}

/// Normalize a version folder or segment name (`v2024.01.01` or `2024.01.01`)
/// to `YYYY.MM.DD`. Returns `None` when the name is not a version.
pub fn normalize_version(name: &str) -> Option<&str> {
    version_re()
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Contributor role encoded in the branch prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Contributor,
    Maintainer,
}

/// Blueprint category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Controllers,
    Hooks,
    Automations,
}

impl Category {
    pub const ALL: [Category; 3] = [Self::Controllers, Self::Hooks, Self::Automations];

    /// Folder / segment name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Controllers => "controllers",
            Self::Hooks => "hooks",
            Self::Automations => "automations",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = BranchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| BranchError::InvalidCategory {
                value: s.to_string(),
            })
    }
}

/// Managed branch prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchPrefix {
    /// `ahb_contrib/…`
    Contrib,
    /// `ahb_maintain/…`
    Maintain,
    /// `ahb/…` (legacy tree)
    Legacy,
}

impl BranchPrefix {
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "ahb_contrib" => Some(Self::Contrib),
            "ahb_maintain" => Some(Self::Maintain),
            "ahb" => Some(Self::Legacy),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contrib => "ahb_contrib",
            Self::Maintain => "ahb_maintain",
            Self::Legacy => "ahb",
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Maintain => Role::Maintainer,
            Self::Contrib | Self::Legacy => Role::Contributor,
        }
    }
}

/// Typed identity parsed from a managed branch name.
///
/// Only [`parse_branch`] constructs this type, so every instance satisfies the
/// lexical rules of its segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchIdentity {
    prefix: BranchPrefix,
    role: Role,
    category: Category,
    blueprint_id: String,
    library_id: String,
    release_id: String,
    version_date: String,
    version_segment: String,
    author: String,
}

impl BranchIdentity {
    pub fn prefix(&self) -> BranchPrefix {
        self.prefix
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn blueprint_id(&self) -> &str {
        &self.blueprint_id
    }

    pub fn library_id(&self) -> &str {
        &self.library_id
    }

    pub fn release_id(&self) -> &str {
        &self.release_id
    }

    /// Version date normalized to `YYYY.MM.DD`.
    pub fn version_date(&self) -> &str {
        &self.version_date
    }

    /// Version segment exactly as it appeared in the branch name.
    pub fn version_segment(&self) -> &str {
        &self.version_segment
    }

    /// Full author segment, including the `author-` prefix.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Author user name without the `author-` prefix.
    pub fn author_user(&self) -> &str {
        self.author.strip_prefix(AUTHOR_PREFIX).unwrap_or(&self.author)
    }

    /// Directory prefix a contributor is allowed to touch:
    /// `<docs_root>/<category>/<blueprint_id>/`.
    pub fn blueprint_prefix(&self, docs_root: &str) -> String {
        let root = docs_root.trim_end_matches('/');
        if root.is_empty() {
            format!("{}/{}/", self.category, self.blueprint_id)
        } else {
            format!("{}/{}/{}/", root, self.category, self.blueprint_id)
        }
    }
}

/// Outcome of parsing a branch name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchParse {
    /// Branch follows a managed prefix and all segments are valid.
    Managed(BranchIdentity),
    /// Branch is not managed by the validator; the run trivially passes.
    Skip { reason: String },
}

/// Parse a branch name into a [`BranchIdentity`].
///
/// # Errors
///
/// Fails on the first invalid segment:
/// - `InvalidBranchFormat`: managed prefix but not exactly 7 segments.
/// - `InvalidCategory`: category is not controllers/hooks/automations.
/// - `InvalidIdentifierSegment`: blueprint, library or release id is malformed.
/// - `InvalidVersion`: version is not `YYYY.MM.DD` (optionally `v`-prefixed).
/// - `InvalidAuthor`: author does not start with `author-`.
pub fn parse_branch(name: &str) -> Result<BranchParse, BranchError> {
    let segments: Vec<&str> = name.split('/').collect();

    let prefix = match segments.first().and_then(|s| BranchPrefix::from_segment(s)) {
        Some(prefix) => prefix,
        None => {
            return Ok(BranchParse::Skip {
                reason: format!("branch '{}' is not an AHB contribution branch", name),
            })
        }
    };

    let Ok(&[_, category, blueprint_id, library_id, release_id, version, author]) =
        <&[&str; BRANCH_SEGMENTS]>::try_from(segments.as_slice())
    else {
        return Err(BranchError::InvalidBranchFormat {
            branch: name.to_string(),
            prefix: prefix.as_str().to_string(),
            found: segments.len(),
        });
    };

    let category: Category = category.parse()?;

    if !blueprint_id_re().is_match(blueprint_id) {
        return Err(BranchError::InvalidIdentifierSegment {
            segment: "blueprint_id",
            value: blueprint_id.to_string(),
            rule: BLUEPRINT_ID_RULE,
        });
    }
    for (segment, value) in [("library_id", library_id), ("release_id", release_id)] {
        if !library_id_re().is_match(value) {
            return Err(BranchError::InvalidIdentifierSegment {
                segment,
                value: value.to_string(),
                rule: LIBRARY_ID_RULE,
            });
        }
    }

    let version_date = normalize_version(version)
        .ok_or_else(|| BranchError::InvalidVersion {
            value: version.to_string(),
        })?
        .to_string();

    match author.strip_prefix(AUTHOR_PREFIX) {
        Some(user) if !user.is_empty() => {}
        _ => {
            return Err(BranchError::InvalidAuthor {
                value: author.to_string(),
            })
        }
    }

    Ok(BranchParse::Managed(BranchIdentity {
        prefix,
        role: prefix.role(),
        category,
        blueprint_id: blueprint_id.to_string(),
        library_id: library_id.to_string(),
        release_id: release_id.to_string(),
        version_date,
        version_segment: version.to_string(),
        author: author.to_string(),
    }))
}
