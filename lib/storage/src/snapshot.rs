// Gzip-compressed JSON snapshots of a dataset
use crate::dataset::Dataset;
use anyhow::{anyhow, Context, Result};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const EXTENSION: &str = "snapshot";

/// Snapshot description for listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDescription {
    pub name: String,
    pub creation_time: Option<String>,
    pub size: u64,
    pub checksum: String,
}

/// On-disk snapshot payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
    pub created_at: DateTime<Utc>,
    /// Tensor schema the dataset was exported under
    pub tensor_dimensions: Vec<String>,
    pub dataset: Dataset,
}

pub struct SnapshotManager {
    snapshot_dir: PathBuf,
}

fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_dir: P) -> Result<Self> {
        let snapshot_dir = snapshot_dir.as_ref().to_path_buf();
        fs::create_dir_all(&snapshot_dir)
            .with_context(|| format!("Failed to create snapshot dir {}", snapshot_dir.display()))?;
        Ok(Self { snapshot_dir })
    }

    pub fn snapshot_dir(&self) -> &Path {
        &self.snapshot_dir
    }

    /// Snapshot filename with a millisecond timestamp
    fn generate_snapshot_name(prefix: &str, now: &DateTime<Utc>) -> String {
        format!("{}-{}.{}", prefix, now.format("%Y-%m-%d-%H-%M-%S-%3f"), EXTENSION)
    }

    fn describe(
        name: String,
        bytes: &[u8],
        created_at: Option<DateTime<Utc>>,
    ) -> SnapshotDescription {
        SnapshotDescription {
            name,
            creation_time: created_at.map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
            size: bytes.len() as u64,
            checksum: checksum(bytes),
        }
    }

    /// Write a snapshot. The file appears complete or not at all.
    pub fn create_snapshot(
        &self,
        prefix: &str,
        tensor_dimensions: &[String],
        dataset: &Dataset,
    ) -> Result<SnapshotDescription> {
        let created_at = Utc::now();
        let data = SnapshotData {
            created_at,
            tensor_dimensions: tensor_dimensions.to_vec(),
            dataset: dataset.clone(),
        };

        let json = serde_json::to_vec(&data).context("Failed to serialize snapshot")?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        let bytes = encoder.finish()?;

        let name = Self::generate_snapshot_name(prefix, &created_at);
        let path = self.snapshot_dir.join(&name);
        AtomicFile::new(&path, OverwriteBehavior::DisallowOverwrite)
            .write(|f| f.write_all(&bytes))
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;

        let description = Self::describe(name, &bytes, Some(created_at));
        info!(
            snapshot = %description.name,
            size = description.size,
            atoms = dataset.atoms.len(),
            relationships = dataset.relationships.len(),
            "created snapshot"
        );
        Ok(description)
    }

    /// All snapshots, newest first
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotDescription>> {
        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&self.snapshot_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                let bytes = fs::read(&path)?;
                let created_at = fs::metadata(&path)?
                    .modified()
                    .ok()
                    .map(DateTime::<Utc>::from);
                snapshots.push(Self::describe(name.to_string(), &bytes, created_at));
            }
        }

        // Names embed the timestamp
        snapshots.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(snapshots)
    }

    pub fn load_snapshot(&self, name: &str) -> Result<SnapshotData> {
        self.load_snapshot_from_path(&self.snapshot_path(name)?)
    }

    /// Load a snapshot only if its file matches `expected_checksum`
    pub fn load_verified(&self, name: &str, expected_checksum: &str) -> Result<SnapshotData> {
        let path = self.snapshot_path(name)?;
        let bytes = fs::read(&path)?;
        let actual = checksum(&bytes);
        if actual != expected_checksum {
            return Err(anyhow!(
                "Checksum mismatch: expected {}, got {}",
                expected_checksum,
                actual
            ));
        }
        Self::decode(&bytes).with_context(|| format!("Invalid snapshot {}", path.display()))
    }

    pub fn load_snapshot_from_path(&self, path: &Path) -> Result<SnapshotData> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Self::decode(&bytes).with_context(|| format!("Invalid snapshot {}", path.display()))
    }

    fn decode(bytes: &[u8]) -> Result<SnapshotData> {
        let mut decoder = GzDecoder::new(bytes);
        let mut json = Vec::new();
        decoder.read_to_end(&mut json)?;
        Ok(serde_json::from_slice(&json)?)
    }

    pub fn delete_snapshot(&self, name: &str) -> Result<bool> {
        let path = self.snapshot_dir.join(name);
        if path.exists() {
            fs::remove_file(&path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn snapshot_path(&self, name: &str) -> Result<PathBuf> {
        let path = self.snapshot_dir.join(name);
        if !path.exists() {
            return Err(anyhow!("Snapshot '{}' not found", name));
        }
        Ok(path)
    }
}
