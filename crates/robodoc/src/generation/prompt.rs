//! Prompt templates for field extraction and tariff classification

use crate::knowledge::KnowledgeChunk;
use crate::types::DocumentType;

/// Longest raw text sent to the extraction model, in bytes
const MAX_DOCUMENT_CHARS: usize = 24_000;

/// Prompt builder for the generative oracles
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the structured-extraction prompt for a document
    pub fn build_extraction_prompt(raw_text: &str, document_type: DocumentType) -> String {
        format!(
            r#"You extract structured data from trade documents. The document below is a {doc_type}.

Return ONLY a JSON object with these keys (omit a key or use null when the value is not present in the document):
- invoice_id (string)
- invoice_date (string, ISO 8601 when possible)
- due_date (string)
- seller_name, seller_address, seller_tax_id (strings)
- buyer_name, buyer_address, buyer_tax_id (strings)
- incoterm (string, three-letter Incoterms code such as FOB or CIF)
- currency (string, ISO 4217 code)
- subtotal, tax_amount, total_amount (numbers)
- country_of_origin (string)
- line_items (array of objects with description (string), quantity (number), unit_price (number), total_price (number))

RULES:
1. Copy values exactly as they appear; do not invent data
2. Numbers must be plain JSON numbers without currency symbols or thousands separators
3. If the text is not a trade document, return {{"error": true, "message": "<reason>"}}

DOCUMENT TEXT:
{text}

JSON:"#,
            doc_type = document_type.display_name(),
            text = truncate(raw_text, MAX_DOCUMENT_CHARS),
        )
    }

    /// Build the tariff classification prompt
    ///
    /// Context chunks are listed in retrieval order, most similar first.
    pub fn build_classification_prompt(description: &str, context: &[KnowledgeChunk]) -> String {
        format!(
            r#"You are a customs tariff classification expert. Propose the Harmonized System (HS) code for the product below using ONLY the tariff schedule excerpts provided.

TARIFF SCHEDULE EXCERPTS (most relevant first):
{context}

PRODUCT DESCRIPTION:
{description}

Return ONLY a JSON object with these keys:
- hs_code (string, the most specific code supported by the excerpts)
- description (string, the tariff heading text for that code)
- confidence (number between 0 and 1)
- reasoning (string, why the product falls under this heading)
- evidence_text (string, the excerpt text that supports the code, copied verbatim)

If no excerpt fits the product, still answer with your best code and a low confidence.

JSON:"#,
            context = Self::build_context(context),
            description = description,
        )
    }

    /// Number the context chunks for the prompt
    pub fn build_context(context: &[KnowledgeChunk]) -> String {
        context
            .iter()
            .enumerate()
            .map(|(i, chunk)| format!("[{}] {}", i + 1, chunk.text))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }
}

/// Extract the outermost JSON object from a model response
///
/// Models occasionally wrap JSON in prose or code fences.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(ordinal: usize, text: &str) -> KnowledgeChunk {
        KnowledgeChunk {
            ordinal,
            text: text.to_string(),
            embedding: vec![0.0; 4],
        }
    }

    #[test]
    fn test_classification_prompt_keeps_retrieval_order() {
        let context = vec![
            chunk(7, "8517.13 Smartphones"),
            chunk(2, "8504.40 Static converters"),
        ];
        let prompt = PromptBuilder::build_classification_prompt("Mobile phones", &context);

        let first = prompt.find("[1] 8517.13").unwrap();
        let second = prompt.find("[2] 8504.40").unwrap();
        assert!(first < second);
        assert!(prompt.contains("Mobile phones"));
    }

    #[test]
    fn test_extraction_prompt_names_document_type() {
        let prompt = PromptBuilder::build_extraction_prompt("INVOICE 1", DocumentType::CommercialInvoice);
        assert!(prompt.contains("Commercial Invoice"));
        assert!(prompt.contains("INVOICE 1"));
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(
            extract_json_object("```json\n{\"a\": {\"b\": 1}}\n```"),
            Some("{\"a\": {\"b\": 1}}")
        );
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "ééé";
        assert_eq!(truncate(text, 3), "é");
        assert_eq!(truncate(text, 10), text);
    }
}
