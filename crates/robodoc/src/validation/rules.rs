//! Pre-flight business rules for extracted document data

use crate::types::{DocumentType, FieldValue, LineItem, PreflightReport, StructuredData};

/// Incoterms 2020
pub const VALID_INCOTERMS: [&str; 11] = [
    "EXW", "FCA", "FAS", "FOB", "CFR", "CIF", "CPT", "CIP", "DAP", "DPU", "DDP",
];

/// Float noise allowed on top of the configured tolerance
const FLOAT_EPSILON: f64 = 1e-9;

/// Validates structured data against document-type-specific rules
///
/// Every rule runs; violations accumulate. Validation never fails, it
/// reports.
#[derive(Debug, Clone)]
pub struct RuleValidator {
    /// Absolute tolerance for amount reconciliation
    tolerance: f64,
}

impl Default for RuleValidator {
    fn default() -> Self {
        Self::new(0.01)
    }
}

impl RuleValidator {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Run the rules for `document_type` against `data`
    pub fn validate(&self, data: &StructuredData, document_type: DocumentType) -> PreflightReport {
        match document_type {
            DocumentType::CommercialInvoice => self.validate_commercial_invoice(data),
            _ => PreflightReport::passed(),
        }
    }

    fn validate_commercial_invoice(&self, data: &StructuredData) -> PreflightReport {
        let mut report = PreflightReport::passed();

        check_invoice_id(data, &mut report);
        let total = check_total_amount(data, &mut report);
        check_incoterm(data, &mut report);
        check_line_items_present(data, &mut report);

        if let Some(total) = total {
            if !data.line_items.is_empty() {
                self.audit_line_items(&data.line_items, total, &mut report);
            }
        }

        if data.currency.as_deref().map_or(true, |c| c.trim().is_empty()) {
            report.warn("Currency is not specified");
        }

        report
    }

    /// Sum of quantity × unit price must match the invoice total
    fn audit_line_items(&self, items: &[LineItem], total: f64, report: &mut PreflightReport) {
        let mut computed = 0.0;

        for (index, item) in items.iter().enumerate() {
            let quantity = item.quantity.as_ref().and_then(FieldValue::as_number);
            let unit_price = item.unit_price.as_ref().and_then(FieldValue::as_number);

            let (quantity, unit_price) = match (quantity, unit_price) {
                (Some(q), Some(p)) => (q, p),
                _ => {
                    report.fail(format!(
                        "Line item {} has a missing or non-numeric quantity or unit_price; math audit skipped",
                        index + 1
                    ));
                    return;
                }
            };

            let line_total = quantity * unit_price;
            if let Some(stated) = item.total_price.as_ref().and_then(FieldValue::as_number) {
                if !self.within_tolerance(stated, line_total) {
                    report.warn(format!(
                        "Line item {} total_price {:.2} differs from quantity x unit_price {:.2}",
                        index + 1,
                        stated,
                        line_total
                    ));
                }
            }
            computed += line_total;
        }

        if !self.within_tolerance(computed, total) {
            report.fail(format!(
                "Math audit failed: line items sum to {:.2} but total_amount is {:.2} (difference {:.2})",
                computed,
                total,
                (computed - total).abs()
            ));
        }
    }

    fn within_tolerance(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.tolerance + FLOAT_EPSILON
    }
}

fn check_invoice_id(data: &StructuredData, report: &mut PreflightReport) {
    if data.invoice_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
        report.fail("Missing mandatory field: invoice_id");
    }
}

/// Returns the total when it is numeric, whatever its sign
fn check_total_amount(data: &StructuredData, report: &mut PreflightReport) -> Option<f64> {
    let Some(value) = data.total_amount.as_ref() else {
        report.fail("Missing mandatory field: total_amount");
        return None;
    };

    match value.as_number() {
        Some(total) if total > 0.0 => Some(total),
        Some(total) => {
            report.fail(format!("total_amount must be greater than zero (got {:.2})", total));
            Some(total)
        }
        None => {
            report.fail(format!("total_amount is not numeric: {:?}", value));
            None
        }
    }
}

fn check_incoterm(data: &StructuredData, report: &mut PreflightReport) {
    match data.incoterm.as_deref().map(str::trim) {
        None | Some("") => report.fail("Missing mandatory field: incoterm"),
        Some(code) => {
            let upper = code.to_uppercase();
            if !VALID_INCOTERMS.contains(&upper.as_str()) {
                report.fail(format!(
                    "Invalid incoterm '{}' (expected one of {})",
                    code,
                    VALID_INCOTERMS.join(", ")
                ));
            }
        }
    }
}

fn check_line_items_present(data: &StructuredData, report: &mut PreflightReport) {
    if data.total_amount.is_some() && data.line_items.is_empty() {
        report.fail("Invoice has a total_amount but no line items");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn valid_invoice() -> StructuredData {
        StructuredData {
            invoice_id: Some("INV-2024-001".to_string()),
            total_amount: Some(FieldValue::Number(40.0)),
            incoterm: Some("FOB".to_string()),
            currency: Some("USD".to_string()),
            line_items: vec![
                LineItem::new("Mobile phones", 10.0, 2.5),
                LineItem::new("Phone chargers", 5.0, 3.0),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_invoice_passes() {
        let report = RuleValidator::default().validate(&valid_invoice(), DocumentType::CommercialInvoice);
        assert!(report.checks_passed);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_missing_invoice_id() {
        let mut data = valid_invoice();
        data.invoice_id = None;
        let report = RuleValidator::default().validate(&data, DocumentType::CommercialInvoice);
        assert!(!report.checks_passed);
        assert!(report.errors.iter().any(|e| e.contains("invoice_id")));

        data.invoice_id = Some("   ".to_string());
        let report = RuleValidator::default().validate(&data, DocumentType::CommercialInvoice);
        assert!(!report.checks_passed);
        assert!(report.errors.iter().any(|e| e.contains("invoice_id")));
    }

    #[test]
    fn test_math_audit() {
        let mut data = valid_invoice();
        data.total_amount = Some(FieldValue::Number(41.0));
        let report = RuleValidator::default().validate(&data, DocumentType::CommercialInvoice);
        assert!(!report.checks_passed);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("40.00"));
        assert!(report.errors[0].contains("41.00"));

        data.total_amount = Some(FieldValue::Number(40.0));
        let report = RuleValidator::default().validate(&data, DocumentType::CommercialInvoice);
        assert!(report.checks_passed);
    }

    #[test]
    fn test_math_audit_tolerance_boundary() {
        let mut data = valid_invoice();
        data.total_amount = Some(FieldValue::Number(40.01));
        let report = RuleValidator::default().validate(&data, DocumentType::CommercialInvoice);
        assert!(report.checks_passed, "{:?}", report.errors);

        data.total_amount = Some(FieldValue::Number(40.02));
        let report = RuleValidator::default().validate(&data, DocumentType::CommercialInvoice);
        assert!(!report.checks_passed);
    }

    #[test]
    fn test_negative_total() {
        let mut data = valid_invoice();
        data.total_amount = Some(FieldValue::Number(-40.0));
        let report = RuleValidator::default().validate(&data, DocumentType::CommercialInvoice);
        assert!(!report.checks_passed);
        assert!(report.errors.iter().any(|e| e.contains("greater than zero")));
    }

    #[test]
    fn test_incoterm_rules() {
        let mut data = valid_invoice();
        data.incoterm = Some("cif".to_string());
        assert!(RuleValidator::default()
            .validate(&data, DocumentType::CommercialInvoice)
            .checks_passed);

        data.incoterm = Some("XYZ".to_string());
        let report = RuleValidator::default().validate(&data, DocumentType::CommercialInvoice);
        assert!(report.errors.iter().any(|e| e.contains("Invalid incoterm 'XYZ'")));

        data.incoterm = None;
        let report = RuleValidator::default().validate(&data, DocumentType::CommercialInvoice);
        assert!(report.errors.iter().any(|e| e.contains("incoterm")));
    }

    #[test]
    fn test_total_without_line_items() {
        let mut data = valid_invoice();
        data.line_items.clear();
        let report = RuleValidator::default().validate(&data, DocumentType::CommercialInvoice);
        assert!(!report.checks_passed);
        assert_eq!(report.errors, vec!["Invoice has a total_amount but no line items".to_string()]);
    }

    #[test]
    fn test_malformed_line_item_skips_audit_but_not_other_rules() {
        let mut data = valid_invoice();
        data.invoice_id = None;
        data.total_amount = Some(FieldValue::Number(999.0));
        data.line_items[0].quantity = Some(FieldValue::from("ten"));

        let report = RuleValidator::default().validate(&data, DocumentType::CommercialInvoice);
        assert!(!report.checks_passed);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().any(|e| e.contains("invoice_id")));
        assert!(report.errors.iter().any(|e| e.contains("Line item 1")));
        assert!(!report.errors.iter().any(|e| e.contains("Math audit failed")));
    }

    #[test]
    fn test_violations_accumulate() {
        let data = StructuredData {
            total_amount: Some(FieldValue::Number(0.0)),
            ..Default::default()
        };
        let report = RuleValidator::default().validate(&data, DocumentType::CommercialInvoice);
        // invoice_id, non-positive total, incoterm, no line items
        assert_eq!(report.errors.len(), 4);
    }

    #[test]
    fn test_line_total_mismatch_is_a_warning() {
        let mut data = valid_invoice();
        data.line_items[0].total_price = Some(FieldValue::Number(30.0));
        let report = RuleValidator::default().validate(&data, DocumentType::CommercialInvoice);
        assert!(report.checks_passed);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_other_document_types_pass() {
        let report = RuleValidator::default().validate(&StructuredData::default(), DocumentType::PackingList);
        assert!(report.checks_passed);
        assert!(report.errors.is_empty());
    }

    proptest! {
        #[test]
        fn prop_consistent_invoices_pass(items in prop::collection::vec((1u32..1000, 1u32..100_000), 1..20)) {
            let line_items: Vec<LineItem> = items
                .iter()
                .map(|(qty, cents)| LineItem::new("Goods", *qty as f64, *cents as f64 / 100.0))
                .collect();
            let total: f64 = items
                .iter()
                .map(|(qty, cents)| *qty as f64 * (*cents as f64 / 100.0))
                .sum();

            let data = StructuredData {
                invoice_id: Some("INV-P".to_string()),
                total_amount: Some(FieldValue::Number(total)),
                incoterm: Some("DAP".to_string()),
                currency: Some("EUR".to_string()),
                line_items,
                ..Default::default()
            };

            let report = RuleValidator::default().validate(&data, DocumentType::CommercialInvoice);
            prop_assert!(report.checks_passed);
            prop_assert!(report.errors.is_empty());
        }

        #[test]
        fn prop_missing_invoice_id_always_fails(total in -1000.0f64..1000.0, incoterm in "[A-Z]{3}") {
            let data = StructuredData {
                total_amount: Some(FieldValue::Number(total)),
                incoterm: Some(incoterm),
                ..Default::default()
            };
            let report = RuleValidator::default().validate(&data, DocumentType::CommercialInvoice);
            prop_assert!(!report.checks_passed);
            prop_assert!(report.errors.iter().any(|e| e.contains("invoice_id")));
        }
    }
}
