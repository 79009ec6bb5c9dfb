use crate::error::{PipelineError, Result};
use crate::storage::PartitionStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};
use uuid::Uuid;

const STAGING: &str = "staging";
const RETIRED: &str = "retired";

/// Partitions as directories under a root folder.
///
/// A new partition is written into a hidden staging directory first and then
/// swapped in with renames, so the previous output stays readable until the
/// new file is complete. The whole stage-and-swap runs as one blocking task:
/// dropping the caller's future never stops it halfway.
pub struct LocalStorage {
    root: PathBuf,
    // one writer per partition at a time
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn partition_dir(&self, partition: &str) -> PathBuf {
        self.root.join(partition)
    }

    fn partition_lock(&self, partition: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(partition.to_string()).or_default().clone()
    }
}

/// One pending partition replacement, owned so it can move to a blocking
/// thread.
struct Replacement {
    root: PathBuf,
    partition: String,
    file_name: String,
    data: Vec<u8>,
}

impl Replacement {
    fn target(&self) -> PathBuf {
        self.root.join(&self.partition)
    }

    fn scratch_prefix(&self, kind: &str) -> String {
        format!(".{}.{}-", self.partition, kind)
    }

    fn scratch_dir(&self, kind: &str) -> PathBuf {
        self.root
            .join(format!("{}{}", self.scratch_prefix(kind), Uuid::new_v4()))
    }

    fn run(&self) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        self.recover()?;

        let staging = self.scratch_dir(STAGING);
        let outcome = self
            .write_staging(&staging)
            .and_then(|()| self.swap_in(&staging));
        if let Err(e) = outcome {
            if staging.exists() {
                let _ = fs::remove_dir_all(&staging);
            }
            return Err(e);
        }

        Ok(self.target().join(&self.file_name))
    }

    /// Clears what an interrupted earlier replacement left behind. A retired
    /// copy goes back into place if the live partition is missing.
    fn recover(&self) -> io::Result<()> {
        let staging_prefix = self.scratch_prefix(STAGING);
        let retired_prefix = self.scratch_prefix(RETIRED);
        let target = self.target();

        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if name.starts_with(&staging_prefix) {
                warn!("Removing abandoned staging directory {}", path.display());
                fs::remove_dir_all(&path)?;
            } else if name.starts_with(&retired_prefix) {
                if target.exists() {
                    warn!("Removing abandoned retired directory {}", path.display());
                    fs::remove_dir_all(&path)?;
                } else {
                    warn!(
                        "Restoring partition {} from {}",
                        target.display(),
                        path.display()
                    );
                    fs::rename(&path, &target)?;
                }
            }
        }
        Ok(())
    }

    fn write_staging(&self, staging: &Path) -> io::Result<()> {
        fs::create_dir_all(staging)?;
        let mut file = fs::File::create(staging.join(&self.file_name))?;
        file.write_all(&self.data)?;
        file.sync_all()
    }

    fn swap_in(&self, staging: &Path) -> io::Result<()> {
        let target = self.target();
        if !target.exists() {
            return fs::rename(staging, &target);
        }

        let retired = self.scratch_dir(RETIRED);
        fs::rename(&target, &retired)?;

        if let Err(e) = fs::rename(staging, &target) {
            // put the previous partition back before reporting
            if let Err(restore) = fs::rename(&retired, &target) {
                warn!(
                    "Could not restore previous partition {} from {}: {}",
                    target.display(),
                    retired.display(),
                    restore
                );
            }
            return Err(e);
        }

        if let Err(e) = fs::remove_dir_all(&retired) {
            warn!("Could not remove retired partition {}: {}", retired.display(), e);
        }
        Ok(())
    }
}

#[async_trait]
impl PartitionStore for LocalStorage {
    async fn replace_partition(&self, partition: &str, file_name: &str, data: &[u8]) -> Result<String> {
        let job = Replacement {
            root: self.root.clone(),
            partition: partition.to_string(),
            file_name: file_name.to_string(),
            data: data.to_vec(),
        };
        let lock = self.partition_lock(partition);

        let outcome = tokio::task::spawn_blocking(move || {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            job.run()
        })
        .await?;

        let location = outcome.map_err(|e| PipelineError::output(partition, e))?;
        debug!("Replaced partition {}", location.display());
        Ok(location.display().to_string())
    }

    fn describe(&self) -> String {
        format!("local directory {}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const FILE: &str = "part-00000.json";

    fn hidden_entries(root: &Path) -> Vec<String> {
        std::fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with('.'))
            .collect()
    }

    #[tokio::test]
    async fn test_replace_creates_partition() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let location = storage
            .replace_partition("immigrant", FILE, b"{\"a\":1}\n")
            .await
            .unwrap();

        assert!(location.ends_with(FILE));
        let body = std::fs::read_to_string(dir.path().join("immigrant").join(FILE)).unwrap();
        assert_eq!(body, "{\"a\":1}\n");
    }

    #[tokio::test]
    async fn test_replace_leaves_no_old_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage
            .replace_partition("arrival_info", FILE, b"1\n2\n3\n")
            .await
            .unwrap();
        std::fs::write(dir.path().join("arrival_info/stale.json"), "old").unwrap();

        storage
            .replace_partition("arrival_info", FILE, b"4\n")
            .await
            .unwrap();

        let files: Vec<String> = std::fs::read_dir(dir.path().join("arrival_info"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(files, vec![FILE.to_string()]);

        let body = std::fs::read_to_string(dir.path().join("arrival_info").join(FILE)).unwrap();
        assert_eq!(body, "4\n");
        assert!(hidden_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_cancelled_overwrites_never_lose_the_partition() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()));
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            storage
                .replace_partition("immigrant", FILE, b"seed\n")
                .await
                .unwrap();

            for i in 0..400u64 {
                let body = format!("run {}\n", i);
                let _ = tokio::time::timeout(
                    Duration::from_micros(i * 5),
                    storage.replace_partition("immigrant", FILE, body.as_bytes()),
                )
                .await;
            }
        });
        // dropping the runtime waits for blocking writes already in flight
        drop(runtime);

        let body = std::fs::read_to_string(dir.path().join("immigrant").join(FILE))
            .expect("partition survives cancelled overwrites");
        assert!(body == "seed\n" || body.starts_with("run "));
        assert!(hidden_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_leftovers_from_interrupted_runs_are_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join(".immigrant.staging-old")).unwrap();
        std::fs::create_dir_all(root.join(".immigrant.retired-old")).unwrap();
        std::fs::write(root.join(".immigrant.retired-old").join(FILE), "previous\n").unwrap();
        // another partition's scratch space is not ours to touch
        std::fs::create_dir_all(root.join(".immigrant_stats.staging-old")).unwrap();

        let storage = LocalStorage::new(root);
        storage
            .replace_partition("immigrant", FILE, b"new\n")
            .await
            .unwrap();

        let body = std::fs::read_to_string(root.join("immigrant").join(FILE)).unwrap();
        assert_eq!(body, "new\n");
        assert_eq!(
            hidden_entries(root),
            vec![".immigrant_stats.staging-old".to_string()]
        );
    }
}
