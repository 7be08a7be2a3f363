//! TF-IDF vectorizer for text feature extraction.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::error::{Result, VietcatError};

/// Default upper bound on the vocabulary size.
pub const DEFAULT_MAX_FEATURES: usize = 2000;

/// TF-IDF vectorizer for text feature extraction.
///
/// The vocabulary keeps the `max_features` terms with the highest corpus-wide
/// term frequency; ties are broken by ascending lexicographic order so the
/// same corpus always yields the same vocabulary. Once fitted the vocabulary
/// and IDF table are never modified.
pub struct TfIdfVectorizer {
    /// Vocabulary: term -> index mapping.
    vocabulary: HashMap<String, usize>,
    /// Terms in index order.
    terms: Vec<String>,
    /// Inverse document frequency for each term, in index order.
    idf: Vec<f64>,
    /// Total number of documents seen during training.
    n_documents: usize,
    /// Upper bound on the vocabulary size.
    max_features: usize,
    /// Analyzer for tokenization.
    analyzer: Arc<dyn Analyzer>,
}

impl std::fmt::Debug for TfIdfVectorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfIdfVectorizer")
            .field("vocabulary_size", &self.vocabulary.len())
            .field("max_features", &self.max_features)
            .field("n_documents", &self.n_documents)
            .field("analyzer", &self.analyzer.name())
            .finish()
    }
}

impl TfIdfVectorizer {
    /// Create a new, unfitted vectorizer.
    pub fn new(analyzer: Arc<dyn Analyzer>, max_features: usize) -> Self {
        Self {
            vocabulary: HashMap::new(),
            terms: Vec::new(),
            idf: Vec::new(),
            n_documents: 0,
            max_features,
            analyzer,
        }
    }

    /// Rebuild a fitted vectorizer from persisted state.
    ///
    /// `terms` and `idf` must be in index order.
    pub fn from_parts(
        analyzer: Arc<dyn Analyzer>,
        max_features: usize,
        n_documents: usize,
        terms: Vec<String>,
        idf: Vec<f64>,
    ) -> Result<Self> {
        if terms.len() != idf.len() {
            return Err(VietcatError::model(format!(
                "Vocabulary has {} terms but {} IDF values",
                terms.len(),
                idf.len()
            )));
        }
        if terms.is_empty() {
            return Err(VietcatError::model("Vocabulary is empty"));
        }
        if terms.len() > max_features {
            return Err(VietcatError::model(format!(
                "Vocabulary size {} exceeds max_features {max_features}",
                terms.len()
            )));
        }

        let mut vocabulary = HashMap::with_capacity(terms.len());
        for (idx, term) in terms.iter().enumerate() {
            if vocabulary.insert(term.clone(), idx).is_some() {
                return Err(VietcatError::model(format!(
                    "Duplicate vocabulary term '{term}'"
                )));
            }
        }

        Ok(Self {
            vocabulary,
            terms,
            idf,
            n_documents,
            max_features,
            analyzer,
        })
    }

    /// Fit the vectorizer on training documents.
    pub fn fit(&mut self, documents: &[String]) -> Result<()> {
        if self.is_fitted() {
            return Err(VietcatError::training("Vectorizer is already fitted"));
        }
        if self.max_features == 0 {
            return Err(VietcatError::invalid_config(
                "max_features must be greater than zero",
            ));
        }
        if documents.is_empty() {
            return Err(VietcatError::training(
                "Cannot fit vectorizer on an empty document set",
            ));
        }

        let mut term_frequency: HashMap<String, usize> = HashMap::new();
        let mut document_frequency: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let tokens = self.tokenize(doc)?;
            let unique_tokens: HashSet<&String> = tokens.iter().collect();
            for token in unique_tokens {
                *document_frequency.entry(token.clone()).or_insert(0) += 1;
            }
            for token in tokens {
                *term_frequency.entry(token).or_insert(0) += 1;
            }
        }

        if term_frequency.is_empty() {
            return Err(VietcatError::training(
                "Corpus produced no terms after normalization",
            ));
        }

        let mut ranked: Vec<(String, usize)> = term_frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(self.max_features);

        let n_documents = documents.len() as f64;
        let mut vocabulary = HashMap::with_capacity(ranked.len());
        let mut terms = Vec::with_capacity(ranked.len());
        let mut idf = Vec::with_capacity(ranked.len());
        for (idx, (term, _)) in ranked.into_iter().enumerate() {
            let df = document_frequency.get(&term).copied().unwrap_or(0);
            // IDF = ln(N / (df + 1)). Zero when df = N - 1, negative when
            // the term is in every document.
            idf.push((n_documents / (df as f64 + 1.0)).ln());
            vocabulary.insert(term.clone(), idx);
            terms.push(term);
        }

        log::debug!(
            "Fitted TF-IDF vocabulary: {} terms from {} documents",
            terms.len(),
            documents.len()
        );

        self.vocabulary = vocabulary;
        self.terms = terms;
        self.idf = idf;
        self.n_documents = documents.len();

        Ok(())
    }

    /// Transform a document into an L2-normalized TF-IDF feature vector.
    ///
    /// Documents without in-vocabulary terms map to the zero vector. So do
    /// documents whose only terms occur in `N - 1` training documents, since
    /// those terms have an IDF of zero.
    pub fn transform(&self, document: &str) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(VietcatError::invalid_argument(
                "Vectorizer must be fitted before transform",
            ));
        }

        let tokens = self.tokenize(document)?;
        let mut features = vec![0.0; self.vocabulary.len()];

        // Count term frequencies
        for token in &tokens {
            if let Some(&idx) = self.vocabulary.get(token) {
                features[idx] += 1.0;
            }
        }

        // Normalize by document length, then apply IDF
        let doc_length = tokens.len() as f64;
        if doc_length > 0.0 {
            for (idx, value) in features.iter_mut().enumerate() {
                *value = *value / doc_length * self.idf[idx];
            }
        }

        l2_normalize(&mut features);
        Ok(features)
    }

    /// Fit on `documents`, then transform each of them in order.
    pub fn fit_transform(&mut self, documents: &[String]) -> Result<Vec<Vec<f64>>> {
        self.fit(documents)?;
        documents.iter().map(|doc| self.transform(doc)).collect()
    }

    /// Tokenize a document using the configured analyzer.
    pub fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.analyzer.analyze(text)?.map(|token| token.text).collect())
    }

    /// Get the size of the vocabulary.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.vocabulary.is_empty()
    }

    /// Index of a term in the feature vector.
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// IDF of a vocabulary term.
    pub fn idf_of(&self, term: &str) -> Option<f64> {
        self.index_of(term).map(|idx| self.idf[idx])
    }

    /// Vocabulary terms in index order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// IDF values in index order.
    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn n_documents(&self) -> usize {
        self.n_documents
    }

    pub fn max_features(&self) -> usize {
        self.max_features
    }

    pub fn analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.analyzer
    }
}

/// Scale `vector` to unit Euclidean length. Zero vectors are left unchanged.
pub fn l2_normalize(vector: &mut [f64]) {
    let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::language::vietnamese::VietnameseAnalyzer;

    fn vectorizer(max_features: usize) -> TfIdfVectorizer {
        TfIdfVectorizer::new(Arc::new(VietnameseAnalyzer::new().unwrap()), max_features)
    }

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_tfidf_vectorizer() {
        let documents = docs(&["Phở bò tái", "Cơm tấm sườn", "Grab bike về nhà"]);

        let mut vectorizer = vectorizer(DEFAULT_MAX_FEATURES);
        vectorizer.fit(&documents).unwrap();
        assert_eq!(vectorizer.vocabulary_size(), 10);
        assert_eq!(vectorizer.n_documents(), 3);

        let features = vectorizer.transform("phở bò").unwrap();
        assert_eq!(features.len(), vectorizer.vocabulary_size());
    }

    #[test]
    fn test_idf_formula() {
        let documents = docs(&["pho bo", "pho ga", "com tam", "bun bo"]);
        let mut vectorizer = vectorizer(10);
        vectorizer.fit(&documents).unwrap();

        // "pho" appears in 2 of 4 documents.
        let expected = (4.0f64 / 3.0).ln();
        assert!((vectorizer.idf_of("pho").unwrap() - expected).abs() < 1e-12);
        // "tam" appears in 1 of 4 documents.
        let expected = (4.0f64 / 2.0).ln();
        assert!((vectorizer.idf_of("tam").unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_repeated_term_counts_once_per_document() {
        let documents = docs(&["pho pho pho", "com"]);
        let mut vectorizer = vectorizer(10);
        vectorizer.fit(&documents).unwrap();

        let expected = (2.0f64 / 2.0).ln();
        assert!((vectorizer.idf_of("pho").unwrap() - expected).abs() < 1e-12);
        // Highest term frequency takes index 0.
        assert_eq!(vectorizer.index_of("pho"), Some(0));
    }

    #[test]
    fn test_vocabulary_bounded_and_tie_broken_lexicographically() {
        let documents = docs(&["xang xang dien", "nuoc dien", "gas"]);
        let mut vectorizer = vectorizer(3);
        vectorizer.fit(&documents).unwrap();

        // xang: 2, dien: 2, gas: 1, nuoc: 1 -> keep dien, xang, gas.
        assert_eq!(vectorizer.vocabulary_size(), 3);
        assert_eq!(vectorizer.terms(), &["dien", "xang", "gas"]);
        assert_eq!(vectorizer.index_of("nuoc"), None);
    }

    #[test]
    fn test_vocabulary_size_is_min_of_bound_and_distinct_terms() {
        let documents = docs(&["pho bo", "com tam", "grab bike", "xe buyt"]);
        let mut vectorizer = vectorizer(100);
        vectorizer.fit(&documents).unwrap();
        assert_eq!(vectorizer.vocabulary_size(), 8);
    }

    #[test]
    fn test_transform_is_unit_length() {
        let documents = docs(&["pho bo", "com tam", "grab bike", "xe buyt"]);
        let mut vectorizer = vectorizer(10);
        vectorizer.fit(&documents).unwrap();

        let features = vectorizer.transform("đi ăn phở bò").unwrap();
        let norm: f64 = features.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_terms_give_zero_vector() {
        let documents = docs(&["pho bo", "com tam", "grab bike"]);
        let mut vectorizer = vectorizer(10);
        vectorizer.fit(&documents).unwrap();

        let features = vectorizer.transform("karaoke").unwrap();
        assert!(features.iter().all(|&v| v == 0.0));

        let features = vectorizer.transform(",.!?").unwrap();
        assert!(features.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_common_terms_have_non_positive_idf() {
        let documents = docs(&["pho bo", "pho ga", "grab bo"]);
        let mut common = vectorizer(10);
        common.fit(&documents).unwrap();

        assert_eq!(common.terms(), &["bo", "pho", "ga", "grab"]);
        assert_eq!(common.idf_of("bo"), Some(0.0));
        assert_eq!(common.idf_of("pho"), Some(0.0));
        let rare = (3.0f64 / 2.0).ln();
        assert!((common.idf_of("ga").unwrap() - rare).abs() < 1e-12);
        assert!((common.idf_of("grab").unwrap() - rare).abs() < 1e-12);

        // Known terms, but every weight is zero.
        let features = common.transform("pho bo").unwrap();
        assert!(features.iter().all(|&v| v == 0.0));

        // A term present in every document gets a negative weight.
        let mut everywhere = vectorizer(10);
        everywhere.fit(&docs(&["pho bo", "pho ga"])).unwrap();
        assert!(everywhere.idf_of("pho").unwrap() < 0.0);
        let features = everywhere.transform("pho").unwrap();
        assert!((features[everywhere.index_of("pho").unwrap()] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_transform_matches_transform() {
        let documents = docs(&["pho bo", "com tam", "grab bike"]);
        let mut vectorizer = vectorizer(10);
        let matrix = vectorizer.fit_transform(&documents).unwrap();

        assert_eq!(matrix.len(), 3);
        for (doc, row) in documents.iter().zip(&matrix) {
            assert_eq!(&vectorizer.transform(doc).unwrap(), row);
        }
    }

    #[test]
    fn test_degenerate_fits() {
        let mut empty = vectorizer(10);
        assert!(matches!(
            empty.fit(&[]).unwrap_err(),
            VietcatError::Training(_)
        ));

        let mut stop_words_only = vectorizer(10);
        assert!(matches!(
            stop_words_only.fit(&docs(&["và của", "!!!"])).unwrap_err(),
            VietcatError::Training(_)
        ));

        let mut zero_bound = vectorizer(0);
        assert!(matches!(
            zero_bound.fit(&docs(&["pho"])).unwrap_err(),
            VietcatError::Config(_)
        ));
    }

    #[test]
    fn test_vocabulary_is_write_once() {
        let mut vectorizer = vectorizer(10);
        vectorizer.fit(&docs(&["pho bo"])).unwrap();
        assert!(vectorizer.fit(&docs(&["com tam"])).is_err());
        assert_eq!(vectorizer.index_of("com"), None);
    }

    #[test]
    fn test_transform_before_fit() {
        let vectorizer = vectorizer(10);
        assert!(vectorizer.transform("pho").is_err());
    }

    #[test]
    fn test_from_parts_validation() {
        let analyzer: Arc<dyn Analyzer> = Arc::new(VietnameseAnalyzer::new().unwrap());

        let ok = TfIdfVectorizer::from_parts(
            analyzer.clone(),
            10,
            4,
            vec!["pho".to_string(), "bo".to_string()],
            vec![0.5, 0.7],
        )
        .unwrap();
        assert_eq!(ok.index_of("bo"), Some(1));

        assert!(
            TfIdfVectorizer::from_parts(analyzer.clone(), 10, 4, vec!["pho".to_string()], vec![])
                .is_err()
        );
        assert!(
            TfIdfVectorizer::from_parts(
                analyzer.clone(),
                10,
                4,
                vec!["pho".to_string(), "pho".to_string()],
                vec![0.1, 0.2],
            )
            .is_err()
        );
        assert!(
            TfIdfVectorizer::from_parts(
                analyzer,
                1,
                4,
                vec!["pho".to_string(), "bo".to_string()],
                vec![0.1, 0.2],
            )
            .is_err()
        );
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.6, 0.8]);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }
}
