//! Ollama-based providers for embeddings, extraction and classification
//!
//! Wraps the shared OllamaClient to implement the provider traits.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::generation::{extract_json_object, OllamaClient, PromptBuilder};
use crate::knowledge::KnowledgeChunk;
use crate::types::{ClassificationResult, DocumentType, FieldValue, StructuredData};

use super::classification::ClassificationProvider;
use super::embedding::EmbeddingProvider;
use super::extraction::ExtractionProvider;

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    dimensions: usize,
    model: String,
}

impl OllamaEmbedder {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, dimensions: usize, model: String) -> Self {
        Self {
            client,
            dimensions,
            model,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.client.embed(text).await?;
        if embedding.len() != self.dimensions {
            return Err(Error::embedding(format!(
                "Model '{}' returned {} dimensions, configured for {}",
                self.model,
                embedding.len(),
                self.dimensions
            )));
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Structured field extraction through an Ollama model
pub struct OllamaExtractor {
    client: Arc<OllamaClient>,
}

impl OllamaExtractor {
    pub fn from_client(client: Arc<OllamaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExtractionProvider for OllamaExtractor {
    async fn extract(&self, raw_text: &str, document_type: DocumentType) -> Result<StructuredData> {
        let prompt = PromptBuilder::build_extraction_prompt(raw_text, document_type);
        let response = self
            .client
            .generate_json(&prompt)
            .await
            .map_err(|e| Error::extraction(format!("Extraction model call failed: {}", e)))?;

        parse_extraction(&response)
    }
}

/// Parse the extraction model's JSON answer
fn parse_extraction(response: &str) -> Result<StructuredData> {
    let json = extract_json_object(response)
        .ok_or_else(|| Error::extraction("Model response contained no JSON object"))?;
    let value: Value = serde_json::from_str(json)
        .map_err(|e| Error::extraction(format!("Model returned malformed JSON: {}", e)))?;

    if value.get("error").is_some_and(|flag| flag.as_bool() == Some(true)) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("model refused the document");
        return Err(Error::extraction(message.to_string()));
    }

    let data: StructuredData = serde_json::from_value(value)
        .map_err(|e| Error::extraction(format!("Model output does not match the schema: {}", e)))?;

    if data.is_empty() {
        return Err(Error::extraction("No structured data found in the document"));
    }
    Ok(data)
}

/// Tariff classification through an Ollama model
pub struct OllamaClassifier {
    client: Arc<OllamaClient>,
}

impl OllamaClassifier {
    pub fn from_client(client: Arc<OllamaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClassificationProvider for OllamaClassifier {
    async fn classify(
        &self,
        description: &str,
        context: &[KnowledgeChunk],
    ) -> Result<ClassificationResult> {
        let prompt = PromptBuilder::build_classification_prompt(description, context);
        let response = self
            .client
            .generate_json(&prompt)
            .await
            .map_err(|e| Error::classification(format!("Classification model call failed: {}", e)))?;

        parse_classification(&response)
    }
}

#[derive(Deserialize)]
struct RawClassification {
    #[serde(default)]
    hs_code: Option<FieldValue>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    confidence: Option<FieldValue>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    evidence_text: Option<String>,
}

/// Parse the classification model's JSON answer
///
/// Missing or non-numeric confidence becomes NaN and is rejected downstream.
fn parse_classification(response: &str) -> Result<ClassificationResult> {
    let json = extract_json_object(response)
        .ok_or_else(|| Error::classification("Model response contained no JSON object"))?;
    let raw: RawClassification = serde_json::from_str(json)
        .map_err(|e| Error::classification(format!("Model returned malformed JSON: {}", e)))?;

    let hs_code = match raw.hs_code {
        Some(FieldValue::Text(code)) => code.trim().to_string(),
        Some(FieldValue::Number(n)) => {
            return Err(Error::classification(format!(
                "Model returned HS code {} as a number; codes must be quoted",
                n
            )))
        }
        None => String::new(),
    };

    Ok(ClassificationResult {
        hs_code,
        description: raw.description.unwrap_or_default(),
        confidence: raw
            .confidence
            .and_then(|c| c.as_number())
            .unwrap_or(f64::NAN),
        reasoning: raw.reasoning.unwrap_or_default(),
        evidence_text: raw.evidence_text.unwrap_or_default(),
        sources: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extraction() {
        let data = parse_extraction(
            r#"{"invoice_id": "INV-7", "total_amount": "40.00", "incoterm": "FOB",
                "line_items": [{"description": "Widgets", "quantity": 10, "unit_price": 4}]}"#,
        )
        .unwrap();

        assert_eq!(data.invoice_id.as_deref(), Some("INV-7"));
        assert_eq!(data.total_amount.and_then(|t| t.as_number()), Some(40.0));
        assert_eq!(data.line_items.len(), 1);
    }

    #[test]
    fn test_parse_extraction_error_flag() {
        let err = parse_extraction(r#"{"error": true, "message": "not an invoice"}"#).unwrap_err();
        assert!(matches!(err, Error::Extraction(ref m) if m == "not an invoice"));
    }

    #[test]
    fn test_parse_extraction_rejects_empty_and_garbage() {
        assert!(matches!(parse_extraction("{}"), Err(Error::Extraction(_))));
        assert!(matches!(parse_extraction("sorry, no"), Err(Error::Extraction(_))));
        assert!(matches!(parse_extraction("{\"line_items\": 3}"), Err(Error::Extraction(_))));
    }

    #[test]
    fn test_parse_classification() {
        let result = parse_classification(
            r#"Here you go: {"hs_code": "8517.13", "description": "Smartphones",
                "confidence": "0.97", "reasoning": "mobile phone",
                "evidence_text": "8517.13 Smartphones"}"#,
        )
        .unwrap();

        assert_eq!(result.hs_code, "8517.13");
        assert_eq!(result.confidence, 0.97);
        assert!(result.sources.is_empty());
    }

    #[test]
    fn test_parse_classification_missing_confidence_is_nan() {
        let result = parse_classification(r#"{"hs_code": "6403"}"#).unwrap();
        assert_eq!(result.hs_code, "6403");
        assert!(result.confidence.is_nan());
    }

    #[test]
    fn test_parse_classification_rejects_numeric_code() {
        let err = parse_classification(r#"{"hs_code": 8517.10, "confidence": 0.9}"#).unwrap_err();
        assert!(matches!(err, Error::Classification(_)));
        assert!(err.to_string().contains("8517.1"));
    }
}
