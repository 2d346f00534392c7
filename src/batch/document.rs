//! JSON document annotation.
//!
//! Accepts the inbound request shape
//!
//! ```json
//! [ { "tokens": [ { "id": 1, "lemma": "schedule" }, ... ] }, ... ]
//! ```
//!
//! or a flat array of token objects, and adds an `"ipa"` field to each token
//! that has a transcription.  Field names are taken from [`BatchConfig`].
//! Anything that is not a token (items without a `tokens` array, tokens
//! without a string text field) is passed through unchanged.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::BatchConfig;

use super::processor::{BatchError, BatchProcessor, Token};

/// Field added to annotated tokens.
pub const IPA_FIELD: &str = "ipa";

const TOKENS_FIELD: &str = "tokens";

/// Position of a token inside the document: top-level item, then index in
/// its `tokens` array (`None` for a flat token array).
type TokenPath = (usize, Option<usize>);

/// Annotated document plus the batch error summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedDocument {
    pub result: Value,
    pub ipa_errors: Option<Vec<BatchError>>,
}

#[derive(Clone)]
pub struct DocumentAnnotator {
    processor: BatchProcessor,
    fields: BatchConfig,
}

impl DocumentAnnotator {
    pub fn new(processor: BatchProcessor, fields: BatchConfig) -> Self {
        Self { processor, fields }
    }

    /// Annotate every token of `document`.  `language` applies to tokens
    /// that carry no language field of their own.
    pub async fn annotate(&self, mut document: Value, language: &str) -> AnnotatedDocument {
        let (paths, tokens) = self.collect_tokens(&document, language);
        if tokens.is_empty() {
            return AnnotatedDocument {
                result: document,
                ipa_errors: None,
            };
        }
        log::debug!("annotating {} tokens", tokens.len());

        let outcome = self.processor.process(&tokens).await;

        for (path, result) in paths.into_iter().zip(outcome.results) {
            let Some(ipa) = result.ipa else { continue };
            if let Some(token) = token_at_mut(&mut document, path) {
                token.insert(IPA_FIELD.to_string(), Value::String(ipa));
            }
        }

        AnnotatedDocument {
            result: document,
            ipa_errors: outcome.errors,
        }
    }

    fn collect_tokens(&self, document: &Value, language: &str) -> (Vec<TokenPath>, Vec<Token>) {
        let mut paths = Vec::new();
        let mut tokens = Vec::new();
        let Some(items) = document.as_array() else {
            return (paths, tokens);
        };

        for (i, item) in items.iter().enumerate() {
            let Some(object) = item.as_object() else { continue };

            match object.get(TOKENS_FIELD) {
                Some(Value::Array(nested)) => {
                    for (j, entry) in nested.iter().enumerate() {
                        let Some(entry) = entry.as_object() else { continue };
                        if let Some(token) = self.read_token(entry, language, || format!("{i}.{j}")) {
                            paths.push((i, Some(j)));
                            tokens.push(token);
                        }
                    }
                }
                Some(_) => {}
                None => {
                    if let Some(token) = self.read_token(object, language, || i.to_string()) {
                        paths.push((i, None));
                        tokens.push(token);
                    }
                }
            }
        }

        (paths, tokens)
    }

    fn read_token(
        &self,
        object: &Map<String, Value>,
        language: &str,
        position: impl FnOnce() -> String,
    ) -> Option<Token> {
        let text = object.get(&self.fields.token_text_field)?.as_str()?;

        let language = object
            .get(&self.fields.token_language_field)
            .and_then(Value::as_str)
            .unwrap_or(language);

        let id = match object.get(&self.fields.token_id_field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => position(),
        };

        Some(Token::new(id, text, language))
    }
}

fn token_at_mut(document: &mut Value, (item, nested): TokenPath) -> Option<&mut Map<String, Value>> {
    let item = document.get_mut(item)?;
    let token = match nested {
        Some(j) => item.get_mut(TOKENS_FIELD)?.get_mut(j)?,
        None => item,
    };
    token.as_object_mut()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::dataset::{DatasetCache, DatasetSource, FsStore, MockFetcher};
    use crate::error::ErrorKind;
    use crate::lexicon::{IpaLookupService, VarietyResolver};
    use crate::table::{Granularity, VarietyDescriptor, VarietyTable};
    use serde_json::json;
    use tempfile::{tempdir, TempDir};

    fn make_annotator(dir: &TempDir, fields: BatchConfig) -> DocumentAnnotator {
        let table = VarietyTable::from_entries([
            (
                "en",
                vec![
                    VarietyDescriptor::new("eng", "latn", Granularity::Broad).with_variant("uk"),
                    VarietyDescriptor::new("eng", "latn", Granularity::Broad).with_variant("us"),
                ],
            ),
            (
                "fr",
                vec![VarietyDescriptor::new("fra", "latn", Granularity::Broad)],
            ),
        ])
        .unwrap();
        let fetcher = MockFetcher::new()
            .with_dataset("eng_latn_uk_broad.tsv", "schedule\tʃɛdjuːl\nthe\tðə\n")
            .with_dataset("eng_latn_us_broad.tsv", "schedule\tskɛdʒuːl\nthe\tðə\n")
            .with_dataset("fra_latn_broad.tsv", "chat\tʃa\n");
        let cache = DatasetCache::new(
            DatasetSource::new("http://datasets.test"),
            Arc::new(fetcher),
            Arc::new(FsStore::open(dir.path()).unwrap()),
        );
        let resolver = VarietyResolver::new(Arc::new(table), Arc::new(cache));
        let processor = BatchProcessor::new(IpaLookupService::new(resolver, "//"));
        DocumentAnnotator::new(processor, fields)
    }

    #[tokio::test]
    async fn annotates_nested_tokens() {
        let dir = tempdir().expect("temp dir");
        let annotator = make_annotator(&dir, BatchConfig::default());
        let document = json!([
            { "sentence": 1, "tokens": [
                { "id": 1, "lemma": "The" },
                { "id": 2, "lemma": "schedule" },
                { "id": 3, "lemma": "qwxz" },
            ]},
        ]);

        let annotated = annotator.annotate(document, "en").await;

        assert_eq!(
            annotated.result,
            json!([
                { "sentence": 1, "tokens": [
                    { "id": 1, "lemma": "The", "ipa": "ðə" },
                    { "id": 2, "lemma": "schedule", "ipa": "ʃɛdjuːl//skɛdʒuːl" },
                    { "id": 3, "lemma": "qwxz" },
                ]},
            ])
        );
        assert!(annotated.ipa_errors.is_none());
    }

    #[tokio::test]
    async fn annotates_flat_token_array() {
        let dir = tempdir().expect("temp dir");
        let annotator = make_annotator(&dir, BatchConfig::default());

        let annotated = annotator
            .annotate(json!([{ "lemma": "the" }, { "lemma": "chat", "lang": "fr" }]), "en")
            .await;

        assert_eq!(
            annotated.result,
            json!([
                { "lemma": "the", "ipa": "ðə" },
                { "lemma": "chat", "lang": "fr", "ipa": "ʃa" },
            ])
        );
    }

    /// Errors name the token by its id field, or by position when it has none.
    #[tokio::test]
    async fn unknown_language_is_summarised() {
        let dir = tempdir().expect("temp dir");
        let annotator = make_annotator(&dir, BatchConfig::default());
        let document = json!([{ "tokens": [
            { "id": "t1", "lemma": "the" },
            { "lemma": "word", "lang": "xx" },
        ]}]);

        let annotated = annotator.annotate(document, "en").await;

        let errors = annotated.ipa_errors.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].token_id, "0.1");
        assert_eq!(errors[0].kind, ErrorKind::UnknownLanguage);
        assert_eq!(annotated.result[0]["tokens"][0]["ipa"], "ðə");
        assert!(annotated.result[0]["tokens"][1].get("ipa").is_none());
    }

    #[tokio::test]
    async fn non_token_content_passes_through() {
        let dir = tempdir().expect("temp dir");
        let annotator = make_annotator(&dir, BatchConfig::default());
        let document = json!([
            "plain string",
            { "tokens": "not an array" },
            { "tokens": [ 42, { "lemma": 7 }, { "form": "the" } ] },
        ]);

        let annotated = annotator.annotate(document.clone(), "en").await;

        assert_eq!(annotated.result, document);
        assert!(annotated.ipa_errors.is_none());
    }

    #[tokio::test]
    async fn non_array_document_is_returned_unchanged() {
        let dir = tempdir().expect("temp dir");
        let annotator = make_annotator(&dir, BatchConfig::default());
        let document = json!({ "tokens": [{ "lemma": "the" }] });

        let annotated = annotator.annotate(document.clone(), "en").await;

        assert_eq!(annotated.result, document);
    }

    #[tokio::test]
    async fn configurable_field_names() {
        let dir = tempdir().expect("temp dir");
        let fields = BatchConfig {
            token_text_field: "form".into(),
            token_language_field: "language".into(),
            token_id_field: "n".into(),
        };
        let annotator = make_annotator(&dir, fields);
        let document = json!([{ "tokens": [
            { "n": 1, "form": "chat", "language": "fr", "lemma": "ignored" },
        ]}]);

        let annotated = annotator.annotate(document, "en").await;

        assert_eq!(annotated.result[0]["tokens"][0]["ipa"], "ʃa");
    }

    #[tokio::test]
    async fn output_serialises_with_null_errors() {
        let dir = tempdir().expect("temp dir");
        let annotator = make_annotator(&dir, BatchConfig::default());

        let annotated = annotator.annotate(json!([]), "en").await;
        let json = serde_json::to_value(&annotated).unwrap();

        assert_eq!(json, json!({ "result": [], "ipa_errors": null }));
    }
}
