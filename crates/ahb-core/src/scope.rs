//! Contributor scope enforcement.
//!
//! A contributor branch may only touch files under its own blueprint folder,
//! `<docs_root>/<category>/<blueprint_id>/`. Maintainer branches are unrestricted.

use tracing::{debug, warn};

use crate::domain::{BranchIdentity, ChangedFileSet, Role, Violation, ViolationKind};

/// Check that every changed file stays inside the branch's blueprint folder.
///
/// Stops at the first offending file.
pub fn enforce_scope(
    identity: &BranchIdentity,
    files: &ChangedFileSet,
    docs_root: &str,
) -> Result<(), Violation> {
    if identity.role() == Role::Maintainer {
        debug!("Maintainer branch; scope not restricted");
        return Ok(());
    }

    let allowed = identity.blueprint_prefix(docs_root);
    if let Some(path) = files.iter().find(|p| !p.starts_with(allowed.as_str())) {
        warn!(file = %path, allowed = %allowed, "File outside contributor scope");
        return Err(Violation::for_file(
            ViolationKind::OutOfScopeFile,
            path,
            format!("contributors may only modify files under {}", allowed),
        ));
    }

    debug!(files = files.len(), allowed = %allowed, "All files within scope");
    Ok(())
}
