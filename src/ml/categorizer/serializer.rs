//! Versioned binary encoding of the vectorizer and classifier.
//!
//! Both artifacts share one layout:
//!
//! ```text
//! magic    4 bytes  "VCTF" (vectorizer) | "VCSV" (classifier)
//! version  u16 LE
//! payload  ...
//! crc32    u32 LE   CRC-32 of every preceding byte
//! ```
//!
//! Floats are stored as raw little-endian IEEE-754 bits, so a save/load
//! round trip reproduces predictions bit for bit.

use std::sync::Arc;

use serde::Serialize;

use crate::analysis::analyzer::Analyzer;
use crate::error::{Result, VietcatError};
use crate::ml::categorizer::svm::{LinearSvm, SvmParams};
use crate::ml::categorizer::tfidf::TfIdfVectorizer;
use crate::storage::{StorageInput, StorageOutput, StructReader, StructWriter};

/// Current artifact format version.
pub const FORMAT_VERSION: u16 = 1;

/// Kind of binary model artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Vectorizer,
    Classifier,
}

impl ArtifactKind {
    pub fn magic(&self) -> &'static [u8; 4] {
        match self {
            ArtifactKind::Vectorizer => b"VCTF",
            ArtifactKind::Classifier => b"VCSV",
        }
    }

    pub fn from_magic(magic: &[u8]) -> Option<Self> {
        match magic {
            b"VCTF" => Some(ArtifactKind::Vectorizer),
            b"VCSV" => Some(ArtifactKind::Classifier),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Vectorizer => write!(f, "vectorizer"),
            ArtifactKind::Classifier => write!(f, "classifier"),
        }
    }
}

/// Header facts about an artifact, as shown by `vietcat inspect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactInfo {
    pub kind: ArtifactKind,
    pub version: u16,
    pub size: u64,
    pub checksum: u32,
}

/// A decoded classifier artifact.
#[derive(Debug, Clone)]
pub struct ClassifierArtifact {
    pub classifier: LinearSvm,
    /// Checksum of the vectorizer artifact the classifier was trained with.
    pub vectorizer_checksum: u32,
    /// Checksum of this artifact.
    pub checksum: u32,
}

fn write_header<W: StorageOutput>(writer: &mut StructWriter<W>, kind: ArtifactKind) -> Result<()> {
    writer.write_raw(kind.magic())?;
    writer.write_u16(FORMAT_VERSION)
}

fn read_header<R: StorageInput>(reader: &mut StructReader<R>) -> Result<(ArtifactKind, u16)> {
    let magic = reader.read_raw(4)?;
    let kind = ArtifactKind::from_magic(&magic).ok_or_else(|| {
        VietcatError::model(format!("Unknown artifact magic {:?}", String::from_utf8_lossy(&magic)))
    })?;

    let version = reader.read_u16()?;
    if version != FORMAT_VERSION {
        return Err(VietcatError::model(format!(
            "Unsupported {kind} format version {version} (expected {FORMAT_VERSION})"
        )));
    }
    Ok((kind, version))
}

fn expect_kind<R: StorageInput>(reader: &mut StructReader<R>, expected: ArtifactKind) -> Result<()> {
    let (kind, _) = read_header(reader)?;
    if kind != expected {
        return Err(VietcatError::model(format!(
            "Expected a {expected} artifact, found a {kind} artifact"
        )));
    }
    Ok(())
}

/// Read a u64 element count and check that `count * min_bytes` fits in
/// the remaining payload.
fn read_count<R: StorageInput>(reader: &mut StructReader<R>, min_bytes: u64) -> Result<usize> {
    let count = reader.read_u64()?;
    let needed = count
        .checked_mul(min_bytes)
        .ok_or_else(|| VietcatError::model(format!("Element count overflows: {count}")))?;
    if needed > reader.remaining() {
        return Err(VietcatError::model(format!(
            "Element count {count} exceeds remaining data"
        )));
    }
    usize::try_from(count).map_err(|_| VietcatError::model(format!("Element count too large: {count}")))
}

/// Encode a fitted vectorizer. Returns the artifact checksum.
pub fn write_vectorizer<W: StorageOutput>(output: W, vectorizer: &TfIdfVectorizer) -> Result<u32> {
    if !vectorizer.is_fitted() {
        return Err(VietcatError::invalid_argument(
            "Cannot serialize an unfitted vectorizer",
        ));
    }

    let mut writer = StructWriter::new(output);
    write_header(&mut writer, ArtifactKind::Vectorizer)?;

    writer.write_string(vectorizer.analyzer().name())?;
    writer.write_u64(vectorizer.max_features() as u64)?;
    writer.write_u64(vectorizer.n_documents() as u64)?;
    writer.write_u64(vectorizer.vocabulary_size() as u64)?;
    for (term, &idf) in vectorizer.terms().iter().zip(vectorizer.idf()) {
        writer.write_string(term)?;
        writer.write_f64(idf)?;
    }

    writer.finish()
}

/// Decode a vectorizer, attaching `analyzer` for tokenization.
///
/// The analyzer must carry the name recorded in the artifact. Returns the
/// vectorizer and the artifact checksum.
pub fn read_vectorizer<R: StorageInput>(
    input: R,
    analyzer: Arc<dyn Analyzer>,
) -> Result<(TfIdfVectorizer, u32)> {
    let mut reader = StructReader::new(input)?;
    expect_kind(&mut reader, ArtifactKind::Vectorizer)?;

    let analyzer_name = reader.read_string()?;
    if analyzer_name != analyzer.name() {
        return Err(VietcatError::model(format!(
            "Vectorizer was built with analyzer '{analyzer_name}', got '{}'",
            analyzer.name()
        )));
    }

    let max_features = to_usize(reader.read_u64()?)?;
    let n_documents = to_usize(reader.read_u64()?)?;
    // Each entry is at least a one-byte length prefix and an f64.
    let vocabulary_size = read_count(&mut reader, 9)?;

    let mut terms = Vec::with_capacity(vocabulary_size);
    let mut idf = Vec::with_capacity(vocabulary_size);
    for _ in 0..vocabulary_size {
        terms.push(reader.read_string()?);
        idf.push(reader.read_f64()?);
    }

    let checksum = reader.verify_checksum()?;
    reader.close()?;

    let vectorizer = TfIdfVectorizer::from_parts(analyzer, max_features, n_documents, terms, idf)?;
    Ok((vectorizer, checksum))
}

/// Encode a trained classifier, recording the checksum of its vectorizer.
/// Returns the artifact checksum.
pub fn write_classifier<W: StorageOutput>(
    output: W,
    classifier: &LinearSvm,
    vectorizer_checksum: u32,
) -> Result<u32> {
    if !classifier.is_fitted() {
        return Err(VietcatError::invalid_argument(
            "Cannot serialize an untrained classifier",
        ));
    }

    let mut writer = StructWriter::new(output);
    write_header(&mut writer, ArtifactKind::Classifier)?;

    let params = classifier.params();
    writer.write_u32(vectorizer_checksum)?;
    writer.write_u64(classifier.n_features() as u64)?;
    writer.write_u64(classifier.n_classes() as u64)?;
    writer.write_f64(params.c)?;
    writer.write_u64(params.max_iterations as u64)?;
    writer.write_f64(params.initial_learning_rate)?;
    writer.write_f64(params.decay_rate)?;

    for ((&label, &bias), weights) in classifier
        .classes()
        .iter()
        .zip(classifier.biases())
        .zip(classifier.weights())
    {
        writer.write_i64(label)?;
        writer.write_f64(bias)?;
        for &weight in weights {
            writer.write_f64(weight)?;
        }
    }

    writer.finish()
}

/// Decode a classifier artifact.
pub fn read_classifier<R: StorageInput>(input: R) -> Result<ClassifierArtifact> {
    let mut reader = StructReader::new(input)?;
    expect_kind(&mut reader, ArtifactKind::Classifier)?;

    let vectorizer_checksum = reader.read_u32()?;
    let n_features = to_usize(reader.read_u64()?)?;
    let row_bytes = (n_features as u64)
        .checked_mul(8)
        .and_then(|b| b.checked_add(16))
        .ok_or_else(|| VietcatError::model(format!("Feature count overflows: {n_features}")))?;
    // Each row: label (i64), bias (f64), then the weights.
    let n_classes = reader.read_u64()?;
    let params = SvmParams {
        c: reader.read_f64()?,
        max_iterations: to_usize(reader.read_u64()?)?,
        initial_learning_rate: reader.read_f64()?,
        decay_rate: reader.read_f64()?,
    };

    let needed = n_classes
        .checked_mul(row_bytes)
        .ok_or_else(|| VietcatError::model(format!("Class count overflows: {n_classes}")))?;
    if needed != reader.remaining() {
        return Err(VietcatError::model(format!(
            "Classifier payload holds {} bytes, expected {needed} for {n_classes} classes of {n_features} features",
            reader.remaining()
        )));
    }
    let n_classes = to_usize(n_classes)?;

    let mut classes = Vec::with_capacity(n_classes);
    let mut biases = Vec::with_capacity(n_classes);
    let mut weights = Vec::with_capacity(n_classes);
    for _ in 0..n_classes {
        classes.push(reader.read_i64()?);
        biases.push(reader.read_f64()?);
        let mut row = Vec::with_capacity(n_features);
        for _ in 0..n_features {
            row.push(reader.read_f64()?);
        }
        weights.push(row);
    }

    let checksum = reader.verify_checksum()?;
    reader.close()?;

    let classifier = LinearSvm::from_parts(params, classes, weights, biases)?;
    Ok(ClassifierArtifact {
        classifier,
        vectorizer_checksum,
        checksum,
    })
}

/// Read an artifact's header and verify its checksum without decoding it.
pub fn inspect_artifact<R: StorageInput>(input: R) -> Result<ArtifactInfo> {
    let size = input.size()?;
    let mut reader = StructReader::new(input)?;
    let (kind, version) = read_header(&mut reader)?;

    let rest = usize::try_from(reader.remaining())
        .map_err(|_| VietcatError::model("Artifact too large"))?;
    reader.read_raw(rest)?;
    let checksum = reader.verify_checksum()?;
    reader.close()?;

    Ok(ArtifactInfo {
        kind,
        version,
        size,
        checksum,
    })
}

fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| VietcatError::model(format!("Value too large: {value}")))
}
