//! Unique-match discovery of on-disk artefacts named by a pattern.
//!
//! The PID file and the engine dependency jar are both located by a
//! `{prefix}*{suffix}` file name pattern. Discovery is explicit about
//! multiplicity: zero matches is a normal negative result, while two or more
//! matches is an error rather than an arbitrary pick.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// A uniquely discovered artefact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredArtifact {
    /// Full path of the artefact.
    pub path: Utf8PathBuf,
    /// File name component of the artefact.
    pub file_name: String,
}

/// Finds the single entry of `dir` whose file name starts with `prefix` and
/// ends with `suffix`.
///
/// Returns `Ok(None)` when the directory is absent or holds no match.
pub fn find_unique(
    dir: &Utf8Path,
    prefix: &str,
    suffix: &str,
) -> Result<Option<DiscoveredArtifact>, DiscoveryError> {
    let entries = match dir.read_dir_utf8() {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(DiscoveryError::Scan {
                dir: dir.to_path_buf(),
                source,
            });
        }
    };
    let mut matches: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DiscoveryError::Scan {
            dir: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        if name.starts_with(prefix) && name.ends_with(suffix) {
            matches.push(name.to_owned());
        }
    }
    match matches.len() {
        0 => Ok(None),
        1 => {
            let file_name = matches.remove(0);
            Ok(Some(DiscoveredArtifact {
                path: dir.join(&file_name),
                file_name,
            }))
        }
        _ => {
            matches.sort();
            Err(DiscoveryError::Ambiguous {
                dir: dir.to_path_buf(),
                pattern: format!("{prefix}*{suffix}"),
                matches,
            })
        }
    }
}

/// Errors raised during artefact discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The directory could not be scanned.
    #[error("failed to scan '{dir}': {source}")]
    Scan {
        /// Directory that could not be scanned.
        dir: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// More than one entry matched the pattern.
    #[error("pattern '{pattern}' matched {} entries in '{dir}': {matches:?}", matches.len())]
    Ambiguous {
        /// Directory that was scanned.
        dir: Utf8PathBuf,
        /// Pattern that matched multiply.
        pattern: String,
        /// The matching file names, sorted.
        matches: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("temp path should be UTF-8")
    }

    #[test]
    fn absent_directory_yields_none() {
        let dir = TempDir::new().expect("temp dir");
        let missing = utf8_dir(&dir).join("nope");
        let found = find_unique(&missing, "notebook-", ".pid").expect("scan should succeed");
        assert_eq!(found, None);
    }

    #[test]
    fn empty_directory_yields_none() {
        let dir = TempDir::new().expect("temp dir");
        let found = find_unique(&utf8_dir(&dir), "notebook-", ".pid").expect("scan should succeed");
        assert_eq!(found, None);
    }

    #[test]
    fn single_match_is_returned_with_its_name() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("notebook-notebook-host1.pid"), "42\n").expect("write");
        fs::write(dir.path().join("unrelated.txt"), "x").expect("write");
        let found = find_unique(&utf8_dir(&dir), "notebook-", ".pid")
            .expect("scan should succeed")
            .expect("single match should be found");
        assert_eq!(found.file_name, "notebook-notebook-host1.pid");
        assert!(found.path.as_str().ends_with("notebook-notebook-host1.pid"));
    }

    #[test]
    fn multiple_matches_are_ambiguous() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("notebook-a.pid"), "1").expect("write");
        fs::write(dir.path().join("notebook-b.pid"), "2").expect("write");
        let error = find_unique(&utf8_dir(&dir), "notebook-", ".pid")
            .expect_err("two matches should be ambiguous");
        match error {
            DiscoveryError::Ambiguous { matches, .. } => {
                assert_eq!(matches, vec!["notebook-a.pid", "notebook-b.pid"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
