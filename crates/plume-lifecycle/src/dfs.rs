//! Batched provisioning of distributed-filesystem paths.
//!
//! Resources are queued with [`DistributedFs::ensure`] and committed in one
//! pass by [`DistributedFs::execute`], mirroring how the hosting platform
//! batches its own distributed-filesystem mutations. Creating a path that
//! already exists is a no-op, not an error.

use camino::Utf8PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::runner::{CommandError, ProcessRunner, RunAs};

const DFS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dfs");

/// A distributed-filesystem resource in its target state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DfsResource {
    /// A directory owned by the service user.
    Directory {
        /// Absolute path on the distributed filesystem.
        path: Utf8PathBuf,
        /// Owning user.
        owner: String,
        /// Whether ownership is applied recursively.
        recursive_chown: bool,
        /// Whether the directory mode is applied recursively.
        recursive_chmod: bool,
    },
    /// A file uploaded from the local filesystem.
    File {
        /// Absolute target path on the distributed filesystem.
        path: Utf8PathBuf,
        /// Local source file.
        source: Utf8PathBuf,
        /// Owning user.
        owner: String,
        /// Owning group.
        group: String,
        /// Octal mode applied to the uploaded file.
        mode: u32,
        /// Whether an existing target is overwritten.
        replace_existing: bool,
    },
}

impl DfsResource {
    /// Builds a recursively owned directory resource.
    pub fn directory(path: impl Into<Utf8PathBuf>, owner: impl Into<String>) -> Self {
        Self::Directory {
            path: path.into(),
            owner: owner.into(),
            recursive_chown: true,
            recursive_chmod: true,
        }
    }
}

/// Collaborator provisioning paths on the distributed filesystem.
///
/// `ensure` only queues; nothing touches the cluster until `execute` commits
/// the batch.
#[cfg_attr(test, mockall::automock)]
pub trait DistributedFs {
    /// Queues a resource for the next `execute` call.
    fn ensure(&mut self, resource: DfsResource) -> Result<(), DfsError>;

    /// Commits every queued resource, draining the batch.
    fn execute(&mut self) -> Result<(), DfsError>;
}

/// Distributed filesystem driven through the `hdfs dfs` command line.
#[derive(Debug, Default)]
pub struct ShellDistributedFs<R> {
    runner: R,
    queue: Vec<DfsResource>,
}

impl<R: ProcessRunner> ShellDistributedFs<R> {
    /// Builds a shell-backed distributed filesystem client.
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            queue: Vec::new(),
        }
    }

    fn commit(&self, resource: &DfsResource) -> Result<(), DfsError> {
        match resource {
            DfsResource::Directory {
                path,
                owner,
                recursive_chown,
                recursive_chmod,
            } => {
                self.runner.run(&format!("hdfs dfs -mkdir -p {path}"), &RunAs::Agent)?;
                let chown_flag = if *recursive_chown { "-R " } else { "" };
                self.runner
                    .run(&format!("hdfs dfs -chown {chown_flag}{owner} {path}"), &RunAs::Agent)?;
                if *recursive_chmod {
                    self.runner
                        .run(&format!("hdfs dfs -chmod -R 755 {path}"), &RunAs::Agent)?;
                }
            }
            DfsResource::File {
                path,
                source,
                owner,
                group,
                mode,
                replace_existing,
            } => {
                let force_flag = if *replace_existing { "-f " } else { "" };
                self.runner
                    .run(&format!("hdfs dfs -put {force_flag}{source} {path}"), &RunAs::Agent)?;
                self.runner
                    .run(&format!("hdfs dfs -chown {owner}:{group} {path}"), &RunAs::Agent)?;
                self.runner
                    .run(&format!("hdfs dfs -chmod {mode:o} {path}"), &RunAs::Agent)?;
            }
        }
        Ok(())
    }
}

impl<R: ProcessRunner> DistributedFs for ShellDistributedFs<R> {
    fn ensure(&mut self, resource: DfsResource) -> Result<(), DfsError> {
        debug!(target: DFS_TARGET, ?resource, "queued distributed-fs resource");
        self.queue.push(resource);
        Ok(())
    }

    fn execute(&mut self) -> Result<(), DfsError> {
        let batch = std::mem::take(&mut self.queue);
        debug!(target: DFS_TARGET, resources = batch.len(), "committing distributed-fs batch");
        for resource in &batch {
            self.commit(resource)?;
        }
        Ok(())
    }
}

/// Errors raised while provisioning distributed-filesystem resources.
#[derive(Debug, Error)]
pub enum DfsError {
    /// A delegated filesystem command failed.
    #[error("distributed filesystem command failed: {0}")]
    Command(#[from] CommandError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::MockProcessRunner;
    use std::sync::{Arc, Mutex};

    fn recording_runner() -> (MockProcessRunner, Arc<Mutex<Vec<String>>>) {
        let commands: Arc<Mutex<Vec<String>>> = Arc::default();
        let recorded = Arc::clone(&commands);
        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(move |command, _| {
            recorded
                .lock()
                .expect("command log should be lockable")
                .push(command.to_owned());
            Ok(())
        });
        (runner, commands)
    }

    #[test]
    fn execute_drains_the_queue_in_order() {
        let (runner, commands) = recording_runner();
        let mut dfs = ShellDistributedFs::new(runner);
        dfs.ensure(DfsResource::directory("/user/notebook", "notebook"))
            .expect("queueing should succeed");
        dfs.ensure(DfsResource::File {
            path: "/apps/engine/jars/dep.jar".into(),
            source: "/usr/lib/notebook/dep.jar".into(),
            owner: "notebook".into(),
            group: "notebook".into(),
            mode: 0o444,
            replace_existing: true,
        })
        .expect("queueing should succeed");
        dfs.execute().expect("batch should commit");

        {
            let log = commands.lock().expect("command log should be lockable");
            assert_eq!(
                log.as_slice(),
                [
                    "hdfs dfs -mkdir -p /user/notebook",
                    "hdfs dfs -chown -R notebook /user/notebook",
                    "hdfs dfs -chmod -R 755 /user/notebook",
                    "hdfs dfs -put -f /usr/lib/notebook/dep.jar /apps/engine/jars/dep.jar",
                    "hdfs dfs -chown notebook:notebook /apps/engine/jars/dep.jar",
                    "hdfs dfs -chmod 444 /apps/engine/jars/dep.jar",
                ]
            );
        }
        dfs.execute().expect("empty batch should commit");
        let log = commands.lock().expect("command log should be lockable");
        assert_eq!(log.len(), 6, "second execute should be a no-op");
    }
}
