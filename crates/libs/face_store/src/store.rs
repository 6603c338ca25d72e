use chrono::{DateTime, NaiveDate, Utc};
use color_eyre::eyre::{Result, eyre};
use common_types::nice_id;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::info;

const SAMPLE_ID_LENGTH: usize = 12;

/// One persisted identity record. Samples are append-only: the embedding and
/// crop are never mutated after creation, only the person name can change.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KnownFaceSample {
    pub id: String,
    /// Not unique, a person usually has many samples.
    pub person_name: String,
    pub embedding: Vec<f32>,
    /// Crop image file name inside the store's crops directory.
    pub crop_file: String,
    pub date_added: DateTime<Utc>,
    /// Date the source photo was taken, when known. Distinct from `date_added`.
    pub sample_date: Option<NaiveDate>,
}

/// Immutable view of the store contents, taken once per page scan so that
/// concurrent lookups all observe the same samples.
#[derive(Debug, Clone)]
pub struct StoreSnapshot(Arc<Vec<KnownFaceSample>>);

impl StoreSnapshot {
    /// Builds a snapshot directly from samples, useful for matcher tests.
    #[must_use]
    pub fn from_samples(samples: Arc<Vec<KnownFaceSample>>) -> Self {
        Self(samples)
    }

    #[must_use]
    pub fn samples(&self) -> &[KnownFaceSample] {
        &self.0
    }
}

/// File-backed collection of known face samples. Mutations go through
/// `&mut self` so there is a single writer; readers use [`StoreSnapshot`].
pub struct FaceStore {
    file: PathBuf,
    crops_dir: PathBuf,
    samples: Vec<KnownFaceSample>,
}

impl FaceStore {
    /// Loads the store from `file`, starting empty if the file does not exist
    /// yet. Crop images live in a `crops` directory next to the store file.
    pub async fn load(file: impl Into<PathBuf>) -> Result<Self> {
        let file = file.into();
        let crops_dir = file
            .parent()
            .map_or_else(|| PathBuf::from("crops"), |p| p.join("crops"));
        fs::create_dir_all(&crops_dir).await?;

        let samples = if file.exists() {
            let bytes = fs::read(&file).await?;
            serde_json::from_slice(&bytes)?
        } else {
            Vec::new()
        };

        Ok(Self {
            file,
            crops_dir,
            samples,
        })
    }

    /// Appends a new sample for `person_name`, writing the crop image to disk.
    /// Returns the generated sample id.
    pub async fn add_sample(
        &mut self,
        person_name: &str,
        embedding: Vec<f32>,
        crop: &[u8],
        sample_date: Option<NaiveDate>,
    ) -> Result<String> {
        if person_name.trim().is_empty() {
            return Err(eyre!("Person name cannot be empty"));
        }
        if let Some(existing) = self.samples.first()
            && existing.embedding.len() != embedding.len()
        {
            return Err(eyre!(
                "Embedding length {} does not match stored length {}",
                embedding.len(),
                existing.embedding.len()
            ));
        }

        let id = nice_id(SAMPLE_ID_LENGTH);
        let crop_file = format!("{id}.jpg");
        fs::write(self.crops_dir.join(&crop_file), crop).await?;

        self.samples.push(KnownFaceSample {
            id: id.clone(),
            person_name: person_name.trim().to_string(),
            embedding,
            crop_file,
            date_added: Utc::now(),
            sample_date,
        });
        self.save().await?;
        Ok(id)
    }

    /// Renames every sample of `old_name`, returning how many were touched.
    pub async fn rename_person(&mut self, old_name: &str, new_name: &str) -> Result<usize> {
        if new_name.trim().is_empty() {
            return Err(eyre!("Person name cannot be empty"));
        }
        let mut renamed = 0;
        for sample in &mut self.samples {
            if sample.person_name == old_name {
                sample.person_name = new_name.trim().to_string();
                renamed += 1;
            }
        }
        if renamed > 0 {
            self.save().await?;
            info!("Renamed {renamed} samples from {old_name} to {new_name}");
        }
        Ok(renamed)
    }

    /// Deletes one sample by id, along with its crop file. Returns whether a
    /// sample was found.
    pub async fn remove_sample(&mut self, id: &str) -> Result<bool> {
        let Some(index) = self.samples.iter().position(|s| s.id == id) else {
            return Ok(false);
        };
        let sample = self.samples.remove(index);
        let crop_path = self.crops_dir.join(&sample.crop_file);
        if crop_path.exists() {
            fs::remove_file(crop_path).await?;
        }
        self.save().await?;
        Ok(true)
    }

    /// Distinct person names, sorted.
    #[must_use]
    pub fn persons(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .samples
            .iter()
            .map(|s| s.person_name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn crops_dir(&self) -> &Path {
        &self.crops_dir
    }

    /// Takes an immutable snapshot of the current samples.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot(Arc::new(self.samples.clone()))
    }

    async fn save(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.samples)?;
        fs::write(&self.file, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_in(dir: &Path) -> FaceStore {
        FaceStore::load(dir.join("faces.json"))
            .await
            .expect("load store")
    }

    #[tokio::test]
    async fn add_persists_and_reloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store_in(dir.path()).await;
        store
            .add_sample("Alice", vec![0.1, 0.2], b"jpeg", None)
            .await
            .expect("add");

        let reloaded = store_in(dir.path()).await;
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.persons(), vec!["Alice"]);
    }

    #[tokio::test]
    async fn labeling_is_append_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store_in(dir.path()).await;
        store
            .add_sample("Alice", vec![0.1, 0.2], b"a", None)
            .await
            .expect("add");
        store
            .add_sample("Alice", vec![0.1, 0.2], b"a", None)
            .await
            .expect("add");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn rename_touches_all_samples_of_person() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store_in(dir.path()).await;
        store
            .add_sample("Alice", vec![0.0], b"a", None)
            .await
            .expect("add");
        store
            .add_sample("Alice", vec![0.1], b"b", None)
            .await
            .expect("add");
        store
            .add_sample("Bob", vec![0.2], b"c", None)
            .await
            .expect("add");

        let renamed = store.rename_person("Alice", "Alicia").await.expect("rename");
        assert_eq!(renamed, 2);
        assert_eq!(store.persons(), vec!["Alicia", "Bob"]);
    }

    #[tokio::test]
    async fn remove_deletes_crop_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store_in(dir.path()).await;
        let id = store
            .add_sample("Alice", vec![0.0], b"jpeg", None)
            .await
            .expect("add");
        let crop_path = store.crops_dir().join(format!("{id}.jpg"));
        assert!(crop_path.exists());

        assert!(store.remove_sample(&id).await.expect("remove"));
        assert!(!crop_path.exists());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn snapshot_is_isolated_from_later_writes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store_in(dir.path()).await;
        store
            .add_sample("Alice", vec![0.0], b"a", None)
            .await
            .expect("add");

        let snapshot = store.snapshot();
        store
            .add_sample("Bob", vec![0.5], b"b", None)
            .await
            .expect("add");

        assert_eq!(snapshot.samples().len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn mismatched_embedding_length_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store_in(dir.path()).await;
        store
            .add_sample("Alice", vec![0.0, 0.1], b"a", None)
            .await
            .expect("add");
        let result = store.add_sample("Bob", vec![0.0], b"b", None).await;
        assert!(result.is_err());
    }
}
