//! Structured invoice data returned by the extraction oracle

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A numeric field as extracted: models return numbers or text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric value if the field is a finite number or text that parses as one
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// One invoice line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<FieldValue>,
}

impl LineItem {
    pub fn new(description: &str, quantity: f64, unit_price: f64) -> Self {
        Self {
            description: Some(description.to_string()),
            quantity: Some(FieldValue::Number(quantity)),
            unit_price: Some(FieldValue::Number(unit_price)),
            total_price: Some(FieldValue::Number(quantity * unit_price)),
        }
    }
}

/// Fields extracted from a trade document
///
/// Named fields cover the commercial invoice schema; anything else the
/// oracle returns is kept in `extra` and passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_tax_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_tax_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incoterm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_of_origin: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
    /// Fields outside the invoice schema
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StructuredData {
    /// True when the oracle produced nothing usable
    pub fn is_empty(&self) -> bool {
        let texts = [
            &self.invoice_id,
            &self.invoice_date,
            &self.due_date,
            &self.seller_name,
            &self.seller_address,
            &self.seller_tax_id,
            &self.buyer_name,
            &self.buyer_address,
            &self.buyer_tax_id,
            &self.incoterm,
            &self.currency,
            &self.country_of_origin,
        ];
        let no_text = texts
            .iter()
            .all(|t| t.as_deref().map_or(true, |s| s.trim().is_empty()));
        let no_amounts = self.subtotal.is_none()
            && self.tax_amount.is_none()
            && self.total_amount.is_none();
        let no_extra = self.extra.values().all(|v| match v {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::Object(o) => o.is_empty(),
            _ => false,
        });

        no_text && no_amounts && self.line_items.is_empty() && no_extra
    }

    /// Product description used as the classification query
    ///
    /// Built from the non-empty line-item descriptions. Without those, the
    /// non-empty text fields outside the invoice schema are joined, followed
    /// by the country of origin and the party names.
    pub fn product_description(&self) -> String {
        let from_items: Vec<&str> = self
            .line_items
            .iter()
            .filter_map(|item| item.description.as_deref())
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .collect();

        if !from_items.is_empty() {
            return from_items.join("; ");
        }

        let named = [&self.country_of_origin, &self.seller_name, &self.buyer_name];
        self.extra
            .values()
            .filter_map(Value::as_str)
            .chain(named.into_iter().filter_map(|field| field.as_deref()))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
