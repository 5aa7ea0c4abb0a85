//! Idempotent application of filesystem resources and rendered configs.

use std::collections::BTreeMap;
use std::fs::{self, Permissions};
use std::io;
use std::os::unix::fs::{PermissionsExt, chown};

use camino::{Utf8Path, Utf8PathBuf};
use nix::unistd::{Group, User};
use thiserror::Error;
use tracing::debug;

const APPLIER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::applier");

/// Target ownership for an applied resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    /// Owning OS user name.
    pub user: String,
    /// Owning OS group name.
    pub group: String,
}

impl Ownership {
    /// Builds an ownership pair from user and group names.
    pub fn new(user: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: group.into(),
        }
    }
}

/// Idempotently drives filesystem paths and rendered files to a target
/// state.
///
/// Every method is a full overwrite of the target, never a merge, and fails
/// fatally on the first I/O or permission error.
#[cfg_attr(test, mockall::automock)]
pub trait ResourceApplier {
    /// Ensures each directory exists with the given ownership and mode.
    ///
    /// With `recursive_access`, ownership and mode are also applied to any
    /// parent directories this call had to create, so the leaf stays
    /// traversable from the nearest pre-existing ancestor.
    fn ensure_path(
        &self,
        paths: &[Utf8PathBuf],
        ownership: &Ownership,
        mode: u32,
        recursive_access: bool,
    ) -> Result<(), ApplyError>;

    /// Writes `content` to `path` and applies ownership.
    fn render_template(
        &self,
        path: &Utf8Path,
        content: &str,
        ownership: &Ownership,
    ) -> Result<(), ApplyError>;

    /// Renders `entries` as a structured site-configuration file named
    /// `name` inside `dir` and applies ownership.
    fn render_structured_config(
        &self,
        name: &str,
        dir: &Utf8Path,
        entries: &BTreeMap<String, String>,
        ownership: &Ownership,
    ) -> Result<(), ApplyError>;
}

/// Applier backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResourceApplier;

impl SystemResourceApplier {
    /// Builds a new system applier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn write_owned_file(
        path: &Utf8Path,
        content: &str,
        ids: OwnershipIds,
    ) -> Result<(), ApplyError> {
        fs::write(path, content).map_err(|source| ApplyError::WriteFile {
            path: path.to_path_buf(),
            source,
        })?;
        apply_ownership(path, ids)?;
        debug!(
            target: APPLIER_TARGET,
            file = %path,
            bytes = content.len(),
            "rendered configuration file"
        );
        Ok(())
    }
}

impl ResourceApplier for SystemResourceApplier {
    fn ensure_path(
        &self,
        paths: &[Utf8PathBuf],
        ownership: &Ownership,
        mode: u32,
        recursive_access: bool,
    ) -> Result<(), ApplyError> {
        let ids = resolve_ownership(ownership)?;
        for path in paths {
            let missing = missing_components(path);
            fs::create_dir_all(path).map_err(|source| ApplyError::CreateDirectory {
                path: path.clone(),
                source,
            })?;
            let targets: &[Utf8PathBuf] = if recursive_access && !missing.is_empty() {
                // `missing` always ends with the leaf itself.
                &missing
            } else {
                std::slice::from_ref(path)
            };
            for target in targets {
                fs::set_permissions(target, Permissions::from_mode(mode)).map_err(|source| {
                    ApplyError::SetMode {
                        path: target.clone(),
                        source,
                    }
                })?;
                apply_ownership(target, ids)?;
            }
            debug!(target: APPLIER_TARGET, dir = %path, mode = %format_args!("{mode:o}"), "ensured directory");
        }
        Ok(())
    }

    fn render_template(
        &self,
        path: &Utf8Path,
        content: &str,
        ownership: &Ownership,
    ) -> Result<(), ApplyError> {
        let ids = resolve_ownership(ownership)?;
        Self::write_owned_file(path, content, ids)
    }

    fn render_structured_config(
        &self,
        name: &str,
        dir: &Utf8Path,
        entries: &BTreeMap<String, String>,
        ownership: &Ownership,
    ) -> Result<(), ApplyError> {
        let ids = resolve_ownership(ownership)?;
        let rendered = render_site_xml(entries);
        Self::write_owned_file(&dir.join(name), &rendered, ids)
    }
}

#[derive(Debug, Clone, Copy)]
struct OwnershipIds {
    uid: u32,
    gid: u32,
}

fn resolve_ownership(ownership: &Ownership) -> Result<OwnershipIds, ApplyError> {
    let user = User::from_name(&ownership.user)
        .map_err(|source| ApplyError::LookupUser {
            name: ownership.user.clone(),
            source,
        })?
        .ok_or_else(|| ApplyError::UnknownUser {
            name: ownership.user.clone(),
        })?;
    let group = Group::from_name(&ownership.group)
        .map_err(|source| ApplyError::LookupGroup {
            name: ownership.group.clone(),
            source,
        })?
        .ok_or_else(|| ApplyError::UnknownGroup {
            name: ownership.group.clone(),
        })?;
    Ok(OwnershipIds {
        uid: user.uid.as_raw(),
        gid: group.gid.as_raw(),
    })
}

fn apply_ownership(path: &Utf8Path, ids: OwnershipIds) -> Result<(), ApplyError> {
    chown(path, Some(ids.uid), Some(ids.gid)).map_err(|source| ApplyError::SetOwnership {
        path: path.to_path_buf(),
        source,
    })
}

/// Ancestors of `path` (including the leaf) that do not yet exist, outermost
/// first.
fn missing_components(path: &Utf8Path) -> Vec<Utf8PathBuf> {
    let mut missing: Vec<Utf8PathBuf> = path
        .ancestors()
        .take_while(|ancestor| !ancestor.as_std_path().exists())
        .map(Utf8Path::to_path_buf)
        .collect();
    missing.reverse();
    missing
}

/// Renders a Hadoop-style property file from a key/value map.
fn render_site_xml(entries: &BTreeMap<String, String>) -> String {
    let mut rendered = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<configuration>\n");
    for (name, value) in entries {
        rendered.push_str("  <property>\n    <name>");
        rendered.push_str(&escape_xml(name));
        rendered.push_str("</name>\n    <value>");
        rendered.push_str(&escape_xml(value));
        rendered.push_str("</value>\n  </property>\n");
    }
    rendered.push_str("</configuration>\n");
    rendered
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for character in raw.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Errors raised while applying filesystem resources.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// A directory could not be created.
    #[error("failed to create directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A mode change failed.
    #[error("failed to set mode on '{path}': {source}")]
    SetMode {
        /// Path whose mode could not be changed.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// An ownership change failed.
    #[error("failed to set ownership on '{path}': {source}")]
    SetOwnership {
        /// Path whose ownership could not be changed.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing a rendered file failed.
    #[error("failed to write '{path}': {source}")]
    WriteFile {
        /// File that could not be written.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The user database lookup itself failed.
    #[error("failed to look up user '{name}': {source}")]
    LookupUser {
        /// User name that could not be resolved.
        name: String,
        /// Underlying OS error.
        #[source]
        source: nix::Error,
    },
    /// The group database lookup itself failed.
    #[error("failed to look up group '{name}': {source}")]
    LookupGroup {
        /// Group name that could not be resolved.
        name: String,
        /// Underlying OS error.
        #[source]
        source: nix::Error,
    },
    /// The configured user does not exist.
    #[error("unknown user '{name}'")]
    UnknownUser {
        /// Missing user name.
        name: String,
    },
    /// The configured group does not exist.
    #[error("unknown group '{name}'")]
    UnknownGroup {
        /// Missing group name.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::{getegid, geteuid};
    use tempfile::TempDir;

    fn current_ownership() -> Ownership {
        let user = User::from_uid(geteuid())
            .expect("current user lookup should succeed")
            .expect("current user should exist");
        let group = Group::from_gid(getegid())
            .expect("current group lookup should succeed")
            .expect("current group should exist");
        Ownership::new(user.name, group.name)
    }

    fn utf8(path: std::path::PathBuf) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path).expect("temp path should be UTF-8")
    }

    #[test]
    fn ensure_path_creates_nested_directories() {
        let workspace = TempDir::new().expect("temp dir");
        let leaf = utf8(workspace.path().join("var/run/notebook"));
        let applier = SystemResourceApplier::new();
        applier
            .ensure_path(&[leaf.clone()], &current_ownership(), 0o755, true)
            .expect("nested directories should be created");
        assert!(leaf.as_std_path().is_dir());
        let mode = fs::metadata(&leaf).expect("metadata").permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }

    #[test]
    fn ensure_path_is_idempotent() {
        let workspace = TempDir::new().expect("temp dir");
        let leaf = utf8(workspace.path().join("logs"));
        let applier = SystemResourceApplier::new();
        let ownership = current_ownership();
        applier
            .ensure_path(&[leaf.clone()], &ownership, 0o755, false)
            .expect("first ensure should succeed");
        applier
            .ensure_path(&[leaf], &ownership, 0o755, false)
            .expect("second ensure should succeed");
    }

    #[test]
    fn ensure_path_rejects_unknown_user() {
        let workspace = TempDir::new().expect("temp dir");
        let leaf = utf8(workspace.path().join("dir"));
        let applier = SystemResourceApplier::new();
        let ownership = Ownership::new("plume-no-such-user", "plume-no-such-group");
        let error = applier
            .ensure_path(&[leaf], &ownership, 0o755, false)
            .expect_err("unknown user should be rejected");
        assert!(matches!(error, ApplyError::UnknownUser { .. }));
    }

    #[test]
    fn site_xml_renders_sorted_escaped_properties() {
        let mut entries = BTreeMap::new();
        entries.insert("b.key".to_owned(), "x < y & z".to_owned());
        entries.insert("a.key".to_owned(), "plain".to_owned());
        let rendered = render_site_xml(&entries);
        let a_index = rendered.find("a.key").expect("a.key should render");
        let b_index = rendered.find("b.key").expect("b.key should render");
        assert!(a_index < b_index, "entries should render in key order");
        assert!(rendered.contains("x &lt; y &amp; z"));
        assert!(rendered.starts_with("<?xml"));
        assert!(rendered.ends_with("</configuration>\n"));
    }

    #[test]
    fn render_template_overwrites_previous_content() {
        let workspace = TempDir::new().expect("temp dir");
        let path = utf8(workspace.path().join("notebook-env.sh"));
        let applier = SystemResourceApplier::new();
        let ownership = current_ownership();
        applier
            .render_template(&path, "export A=1\n", &ownership)
            .expect("first render should succeed");
        applier
            .render_template(&path, "export A=2\n", &ownership)
            .expect("second render should succeed");
        let content = fs::read_to_string(&path).expect("rendered file should be readable");
        assert_eq!(content, "export A=2\n");
    }
}
