//! Model directory layout and checksummed save/load of the artifact set.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::language::vietnamese::VietnameseAnalyzer;
use crate::error::{Result, VietcatError};
use crate::ml::categorizer::serializer::{
    ArtifactInfo, inspect_artifact, read_classifier, read_vectorizer, write_classifier,
    write_vectorizer,
};
use crate::ml::categorizer::svm::LinearSvm;
use crate::ml::categorizer::tfidf::TfIdfVectorizer;
use crate::ml::categorizer::trainer::{ArtifactChecksums, ModelMetadata, TrainedModel};
use crate::ml::categorizer::types::CategoryCatalog;
use crate::storage::{FileStorage, Storage, StorageConfig, StorageInput, StorageOutput};

pub const VECTORIZER_FILE: &str = "vectorizer.bin";
pub const CLASSIFIER_FILE: &str = "classifier.bin";
pub const METADATA_FILE: &str = "metadata.json";
pub const CATALOG_FILE: &str = "catalog.json";

/// A model loaded from storage. Immutable once built.
#[derive(Debug)]
pub struct LoadedModel {
    pub vectorizer: TfIdfVectorizer,
    pub classifier: LinearSvm,
    pub catalog: CategoryCatalog,
    pub metadata: ModelMetadata,
}

/// Header information of every binary artifact plus the metadata record.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInspection {
    pub metadata: ModelMetadata,
    pub vectorizer: ArtifactInfo,
    pub classifier: ArtifactInfo,
    pub categories: usize,
}

/// Reads and writes the artifact set of one model.
///
/// A model consists of `vectorizer.bin`, `classifier.bin`, `metadata.json`
/// and `catalog.json`. Saving writes every artifact to a temporary name
/// first and renames only after all writes succeeded. `metadata.json`
/// carries the checksums that tie the set together.
pub struct ModelStore {
    storage: Arc<dyn Storage>,
    analyzer: Arc<dyn Analyzer>,
}

impl std::fmt::Debug for ModelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelStore")
            .field("storage", &self.storage)
            .field("analyzer", &self.analyzer.name())
            .finish()
    }
}

impl ModelStore {
    /// Create a store over `storage` using the built-in Vietnamese analyzer.
    pub fn new(storage: Arc<dyn Storage>) -> Result<Self> {
        Ok(ModelStore {
            storage,
            analyzer: Arc::new(VietnameseAnalyzer::new()?),
        })
    }

    /// Use a custom analyzer when loading vectorizers.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Create a store over a directory, creating it if needed.
    pub fn create_dir<P: AsRef<Path>>(path: P) -> Result<Self> {
        let storage = FileStorage::new(path, StorageConfig::default())?;
        Self::new(Arc::new(storage))
    }

    /// Open the store of an existing model directory.
    pub fn open_dir<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let storage = FileStorage::open_existing(path, StorageConfig::default()).map_err(|_| {
            VietcatError::model(format!("Model directory {} does not exist", path.display()))
        })?;
        Self::new(Arc::new(storage))
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Persist a freshly trained model. Returns the metadata as written.
    pub fn save_trained(&self, model: &TrainedModel) -> Result<ModelMetadata> {
        self.save(
            &model.vectorizer,
            &model.classifier,
            &model.catalog,
            &model.metadata,
        )
    }

    /// Persist a model and return the metadata record as written.
    ///
    /// Every artifact is staged under a temporary name, then renamed into
    /// place with `metadata.json` last. The metadata records the checksum of
    /// the other three artifacts, so a save that fails between two renames
    /// leaves a set that [`ModelStore::load`] rejects. Staged files that were
    /// never renamed are deleted.
    pub fn save(
        &self,
        vectorizer: &TfIdfVectorizer,
        classifier: &LinearSvm,
        catalog: &CategoryCatalog,
        metadata: &ModelMetadata,
    ) -> Result<ModelMetadata> {
        if classifier.n_features() != vectorizer.vocabulary_size() {
            return Err(VietcatError::invalid_argument(format!(
                "Classifier expects {} features but the vectorizer produces {}",
                classifier.n_features(),
                vectorizer.vocabulary_size()
            )));
        }
        if let Some(mismatch) = describe_mismatch(metadata, vectorizer, classifier, catalog) {
            return Err(VietcatError::invalid_argument(mismatch));
        }

        let mut staged: Vec<(String, &'static str)> = Vec::with_capacity(4);
        let written = match self.stage_all(&mut staged, vectorizer, classifier, catalog, metadata) {
            Ok(written) => written,
            Err(e) => {
                self.discard(&staged);
                return Err(e);
            }
        };

        for (i, (temp_name, final_name)) in staged.iter().enumerate() {
            if let Err(e) = self.storage.rename_file(temp_name, final_name) {
                log::error!("Failed to move {temp_name} to {final_name}: {e}");
                self.discard(&staged[i..]);
                return Err(e);
            }
        }

        log::info!(
            "Saved model: {} terms, {} classes",
            vectorizer.vocabulary_size(),
            classifier.n_classes()
        );
        Ok(written)
    }

    fn stage_all(
        &self,
        staged: &mut Vec<(String, &'static str)>,
        vectorizer: &TfIdfVectorizer,
        classifier: &LinearSvm,
        catalog: &CategoryCatalog,
        metadata: &ModelMetadata,
    ) -> Result<ModelMetadata> {
        let (temp_name, output) = self.storage.create_temp_output(VECTORIZER_FILE)?;
        staged.push((temp_name, VECTORIZER_FILE));
        let vectorizer_checksum = write_vectorizer(output, vectorizer)?;

        let (temp_name, output) = self.storage.create_temp_output(CLASSIFIER_FILE)?;
        staged.push((temp_name, CLASSIFIER_FILE));
        let classifier_checksum = write_classifier(output, classifier, vectorizer_checksum)?;

        let catalog_json = catalog.to_json()?;
        let (temp_name, output) = self.storage.create_temp_output(CATALOG_FILE)?;
        staged.push((temp_name, CATALOG_FILE));
        write_json(output, &catalog_json)?;

        let written = ModelMetadata {
            artifacts: ArtifactChecksums {
                vectorizer: vectorizer_checksum,
                classifier: classifier_checksum,
                catalog: crc32fast::hash(&catalog_json),
            },
            ..metadata.clone()
        };
        let (temp_name, output) = self.storage.create_temp_output(METADATA_FILE)?;
        staged.push((temp_name, METADATA_FILE));
        write_json(output, &serde_json::to_vec_pretty(&written)?)?;

        Ok(written)
    }

    fn discard(&self, staged: &[(String, &'static str)]) {
        for (temp_name, _) in staged {
            if let Err(e) = self.storage.delete_file(temp_name) {
                log::warn!("Failed to remove temporary file {temp_name}: {e}");
            }
        }
    }

    fn open(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        self.storage
            .open_input(name)
            .map_err(|e| VietcatError::model(format!("Missing model artifact {name}: {e}")))
    }

    fn read_bytes(&self, name: &str) -> Result<Vec<u8>> {
        let mut input = self.open(name)?;
        let mut data = Vec::new();
        input
            .read_to_end(&mut data)
            .map_err(|e| VietcatError::model(format!("Cannot read {name}: {e}")))?;
        input.close()?;
        Ok(data)
    }

    /// Load and cross-check the whole artifact set.
    ///
    /// Any missing, corrupt or mismatched artifact fails with a model error.
    /// This includes artifacts whose checksums differ from the ones recorded
    /// in `metadata.json`.
    pub fn load(&self) -> Result<LoadedModel> {
        let (vectorizer, vectorizer_checksum) =
            read_vectorizer(self.open(VECTORIZER_FILE)?, self.analyzer.clone())
                .map_err(|e| in_artifact(VECTORIZER_FILE, e))?;
        let artifact =
            read_classifier(self.open(CLASSIFIER_FILE)?).map_err(|e| in_artifact(CLASSIFIER_FILE, e))?;

        if artifact.vectorizer_checksum != vectorizer_checksum {
            return Err(VietcatError::model(format!(
                "{CLASSIFIER_FILE} was trained with a different vectorizer \
                 (expected checksum {:08x}, found {vectorizer_checksum:08x})",
                artifact.vectorizer_checksum
            )));
        }
        if artifact.classifier.n_features() != vectorizer.vocabulary_size() {
            return Err(VietcatError::model(format!(
                "{CLASSIFIER_FILE} expects {} features but the vocabulary has {} terms",
                artifact.classifier.n_features(),
                vectorizer.vocabulary_size()
            )));
        }

        let metadata = self.load_metadata()?;
        let catalog_json = self.read_bytes(CATALOG_FILE)?;
        let catalog = parse_catalog(&catalog_json)?;

        let found = ArtifactChecksums {
            vectorizer: vectorizer_checksum,
            classifier: artifact.checksum,
            catalog: crc32fast::hash(&catalog_json),
        };
        if metadata.artifacts != found {
            let recorded = metadata.artifacts;
            return Err(VietcatError::model(format!(
                "{METADATA_FILE} does not describe the stored artifacts \
                 (recorded {:08x}/{:08x}/{:08x}, found {:08x}/{:08x}/{:08x})",
                recorded.vectorizer,
                recorded.classifier,
                recorded.catalog,
                found.vectorizer,
                found.classifier,
                found.catalog
            )));
        }
        if let Some(mismatch) =
            describe_mismatch(&metadata, &vectorizer, &artifact.classifier, &catalog)
        {
            return Err(VietcatError::model(mismatch));
        }

        log::info!(
            "Loaded model v{}: {} terms, {} classes, trained {}",
            metadata.version,
            vectorizer.vocabulary_size(),
            artifact.classifier.n_classes(),
            metadata.trained_date
        );

        Ok(LoadedModel {
            vectorizer,
            classifier: artifact.classifier,
            catalog,
            metadata,
        })
    }

    /// Load `metadata.json`.
    pub fn load_metadata(&self) -> Result<ModelMetadata> {
        let data = self.read_bytes(METADATA_FILE)?;
        serde_json::from_slice(&data)
            .map_err(|e| VietcatError::model(format!("Invalid {METADATA_FILE}: {e}")))
    }

    /// Load `catalog.json`.
    pub fn load_catalog(&self) -> Result<CategoryCatalog> {
        parse_catalog(&self.read_bytes(CATALOG_FILE)?)
    }

    /// Describe the stored artifacts without building a model.
    pub fn inspect(&self) -> Result<ModelInspection> {
        let vectorizer =
            inspect_artifact(self.open(VECTORIZER_FILE)?).map_err(|e| in_artifact(VECTORIZER_FILE, e))?;
        let classifier =
            inspect_artifact(self.open(CLASSIFIER_FILE)?).map_err(|e| in_artifact(CLASSIFIER_FILE, e))?;

        Ok(ModelInspection {
            metadata: self.load_metadata()?,
            vectorizer,
            classifier,
            categories: self.load_catalog()?.len(),
        })
    }
}

fn write_json(mut output: Box<dyn StorageOutput>, data: &[u8]) -> Result<()> {
    output.write_all(data)?;
    output.flush_and_sync()?;
    output.close()
}

fn parse_catalog(data: &[u8]) -> Result<CategoryCatalog> {
    CategoryCatalog::from_json(data).map_err(|e| in_artifact(CATALOG_FILE, e))
}

/// Check that the metadata record and the catalog agree with the binaries.
fn describe_mismatch(
    metadata: &ModelMetadata,
    vectorizer: &TfIdfVectorizer,
    classifier: &LinearSvm,
    catalog: &CategoryCatalog,
) -> Option<String> {
    if metadata.vocabulary_size != vectorizer.vocabulary_size() {
        return Some(format!(
            "{METADATA_FILE} lists {} terms but the vectorizer has {}",
            metadata.vocabulary_size,
            vectorizer.vocabulary_size()
        ));
    }
    if metadata.categories != classifier.n_classes() {
        return Some(format!(
            "{METADATA_FILE} lists {} categories but the classifier has {}",
            metadata.categories,
            classifier.n_classes()
        ));
    }
    classifier
        .classes()
        .iter()
        .find(|&&id| !catalog.contains(id))
        .map(|id| format!("Category {id} of {CLASSIFIER_FILE} is missing from {CATALOG_FILE}"))
}

fn in_artifact(name: &str, error: VietcatError) -> VietcatError {
    match error {
        VietcatError::Model(msg) => VietcatError::model(format!("{name}: {msg}")),
        other => VietcatError::model(format!("{name}: {other}")),
    }
}
