// src/storage/mod.rs
use crate::extractors::model::ExtractionResult;
use crate::utils::error::StorageError;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

const RESULT_FILE: &str = "materials.json";
const METADATA_FILE: &str = "materials_meta.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Stored(PathBuf),
    /// The stored fingerprint already matches; nothing was written.
    Unchanged(PathBuf),
}

/// File-backed store of one extraction result per environment.
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    /// `/base_dir/<environment_id>/`. Ids that are not already safe file names
    /// are reduced to `[A-Za-z0-9_-]` and suffixed with a short hash of the raw
    /// id, so distinct ids never share a directory.
    pub fn environment_dir(&self, environment_id: &str) -> Result<PathBuf, StorageError> {
        if environment_id.trim().is_empty() {
            return Err(StorageError::EmptyEnvironmentId);
        }
        let safe: String = environment_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        if safe == environment_id {
            return Ok(self.base_dir.join(safe));
        }
        let digest = Sha256::digest(environment_id.as_bytes());
        let suffix: String = digest.iter().take(4).map(|b| format!("{:02x}", b)).collect();
        Ok(self.base_dir.join(format!("{}~{}", safe, suffix)))
    }

    /// Fingerprint of the result currently stored for `environment_id`.
    pub fn stored_fingerprint(&self, environment_id: &str) -> Result<Option<String>, StorageError> {
        let path = self.environment_dir(environment_id)?.join(METADATA_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let metadata: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        Ok(metadata["fingerprint"].as_str().map(str::to_string))
    }

    /// Saves the result and its metadata unless the stored fingerprint is identical.
    pub fn save_result(&self, environment_id: &str, result: &ExtractionResult) -> Result<SaveOutcome, StorageError> {
        let fingerprint = result.fingerprint.as_ref().ok_or(StorageError::MissingFingerprint)?;
        let target_dir = self.environment_dir(environment_id)?;
        let file_path = target_dir.join(RESULT_FILE);

        if self.stored_fingerprint(environment_id)?.as_deref() == Some(fingerprint.as_str()) {
            tracing::info!("Environment {} already holds fingerprint {}, skipping write", environment_id, fingerprint);
            return Ok(SaveOutcome::Unchanged(file_path));
        }

        fs::create_dir_all(&target_dir)?;

        let body = serde_json::to_string_pretty(result)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, body)?;
        tracing::info!("Saved extraction to {}", file_path.display());

        self.save_metadata(environment_id, result, &target_dir)?;
        Ok(SaveOutcome::Stored(file_path))
    }

    fn save_metadata(&self, environment_id: &str, result: &ExtractionResult, target_dir: &Path) -> Result<PathBuf, StorageError> {
        let file_path = target_dir.join(METADATA_FILE);

        let section_counts: serde_json::Map<String, serde_json::Value> = result
            .sections
            .iter()
            .map(|(section, records)| (section.to_string(), records.len().into()))
            .collect();

        let metadata = serde_json::json!({
            "environment_id": environment_id,
            "fingerprint": result.fingerprint,
            "linha_detectada": result.linha_detectada,
            "nome_ambiente": result.nome_ambiente,
            "section_counts": section_counts,
            "valor_total": result.valor_total,
            "low_confidence": result.low_confidence,
            "warning_count": result.warnings.len(),
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, metadata_str)?;

        tracing::info!("Saved metadata to {}", file_path.display());
        Ok(file_path)
    }
}
