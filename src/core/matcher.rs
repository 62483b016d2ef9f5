use crate::core::normalize::normalize;
use crate::domain::model::{DataQualityWarning, Field, FieldMapping, Placeholder};
use std::collections::HashSet;

/// Placeholder resolved against the recipient's looked-up address, never
/// against a CSV field. Compared case-insensitively.
pub const EMAIL_PLACEHOLDER: &str = "email";

/// Header names recognized as the recipient identifier column, in priority
/// order of appearance in the CSV.
const IDENTIFIER_PATTERNS: [&str; 7] = [
    "emplid",
    "employee id",
    "employeeid",
    "emp id",
    "empid",
    "employee number",
    "emp number",
];

/// Result of reconciling template placeholders with record fields.
/// Deterministic: the same inputs always produce the same mapping and
/// ordering.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub mapping: FieldMapping,
    /// Placeholders with no equal normalized field, in template order.
    pub unmatched_placeholders: Vec<Placeholder>,
    /// Fields no placeholder references, in CSV column order.
    pub unmatched_fields: Vec<Field>,
    /// Duplicate normalized keys and similar quality conditions.
    pub warnings: Vec<DataQualityWarning>,
}

pub fn is_email_placeholder(cleaned_name: &str) -> bool {
    cleaned_name.eq_ignore_ascii_case(EMAIL_PLACEHOLDER)
}

/// Maps each placeholder to the first field (in CSV column order) whose
/// normalized key equals the placeholder's normalized cleaned name. The
/// reserved `email` placeholder is excluded from the mapping entirely.
pub fn match_placeholders(placeholders: &[Placeholder], fields: &[Field]) -> MatchOutcome {
    let mut outcome = MatchOutcome::default();

    // Two distinct headers normalizing to the same key is a data-quality
    // condition, not a fatal error; the first column wins.
    let mut seen_keys: HashSet<&str> = HashSet::new();
    for field in fields {
        if !seen_keys.insert(field.normalized_key.as_str()) {
            outcome.warnings.push(DataQualityWarning::DuplicateFieldName {
                original_name: field.original_name.clone(),
                normalized_key: field.normalized_key.clone(),
            });
        }
    }

    for placeholder in placeholders {
        if is_email_placeholder(&placeholder.cleaned_name) {
            continue;
        }

        let wanted = normalize(&placeholder.cleaned_name);
        let matched = fields.iter().find(|f| f.normalized_key == wanted);

        match matched {
            Some(field) => {
                tracing::debug!(
                    "Mapped placeholder '{}' to field '{}'",
                    placeholder.cleaned_name,
                    field.normalized_key
                );
                outcome
                    .mapping
                    .push(&placeholder.cleaned_name, Some(field.normalized_key.clone()));
            }
            None => {
                outcome.mapping.push(&placeholder.cleaned_name, None);
                outcome.unmatched_placeholders.push(placeholder.clone());
                outcome.warnings.push(DataQualityWarning::UnmatchedPlaceholder {
                    name: placeholder.cleaned_name.clone(),
                });
            }
        }
    }

    let referenced: HashSet<&str> = outcome.mapping.matched_keys().collect();
    for field in fields {
        if !referenced.contains(field.normalized_key.as_str()) {
            outcome.unmatched_fields.push(field.clone());
            outcome.warnings.push(DataQualityWarning::UnmatchedField {
                normalized_key: field.normalized_key.clone(),
            });
        }
    }

    outcome
}

/// Picks the default identifier field: the first field (in CSV column order)
/// whose normalized key equals a normalized identifier pattern. `None` means
/// the caller must select one explicitly before assembly may proceed.
pub fn detect_identifier_field(fields: &[Field]) -> Option<&Field> {
    let patterns: Vec<String> = IDENTIFIER_PATTERNS.iter().map(|p| normalize(p)).collect();

    fields
        .iter()
        .find(|field| patterns.iter().any(|p| *p == field.normalized_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(original: &str) -> Field {
        Field {
            original_name: original.to_string(),
            normalized_key: normalize(original),
        }
    }

    fn placeholder(name: &str) -> Placeholder {
        Placeholder {
            raw_name: name.to_string(),
            cleaned_name: name.to_string(),
        }
    }

    #[test]
    fn test_match_excludes_email_placeholder() {
        let placeholders = vec![
            placeholder("First_Name"),
            placeholder("email"),
            placeholder("Amount Due"),
        ];
        let fields = vec![field("First Name"), field("Amount Due")];

        let outcome = match_placeholders(&placeholders, &fields);

        assert_eq!(outcome.mapping.len(), 2);
        assert_eq!(
            outcome.mapping.get("First_Name"),
            Some(Some("first_name"))
        );
        assert_eq!(outcome.mapping.get("Amount Due"), Some(Some("amount_due")));
        assert_eq!(outcome.mapping.get("email"), None);
        assert!(outcome.unmatched_placeholders.is_empty());
        assert!(outcome.unmatched_fields.is_empty());
    }

    #[test]
    fn test_match_email_placeholder_case_insensitive() {
        let placeholders = vec![placeholder("EMAIL"), placeholder("Email")];
        let fields = vec![field("emplid")];

        let outcome = match_placeholders(&placeholders, &fields);

        assert!(outcome.mapping.is_empty());
        assert!(outcome.unmatched_placeholders.is_empty());
    }

    #[test]
    fn test_unmatched_placeholder_is_recorded_both_ways() {
        let placeholders = vec![placeholder("Nickname")];
        let fields = vec![field("First Name")];

        let outcome = match_placeholders(&placeholders, &fields);

        assert_eq!(outcome.mapping.get("Nickname"), Some(None));
        assert_eq!(outcome.unmatched_placeholders.len(), 1);
        assert_eq!(outcome.unmatched_placeholders[0].cleaned_name, "Nickname");
        assert!(outcome.warnings.iter().any(|w| matches!(
            w,
            DataQualityWarning::UnmatchedPlaceholder { name } if name == "Nickname"
        )));
    }

    #[test]
    fn test_unmatched_fields_in_csv_order() {
        let placeholders = vec![placeholder("Last Name")];
        let fields = vec![field("emplid"), field("Last Name"), field("Department")];

        let outcome = match_placeholders(&placeholders, &fields);

        let keys: Vec<&str> = outcome
            .unmatched_fields
            .iter()
            .map(|f| f.normalized_key.as_str())
            .collect();
        assert_eq!(keys, vec!["emplid", "department"]);
    }

    #[test]
    fn test_duplicate_normalized_keys_warn_and_first_wins() {
        let fields = vec![field("First Name"), field("first-name")];
        let placeholders = vec![placeholder("First_Name")];

        let outcome = match_placeholders(&placeholders, &fields);

        assert_eq!(outcome.mapping.get("First_Name"), Some(Some("first_name")));
        assert!(outcome.warnings.iter().any(|w| matches!(
            w,
            DataQualityWarning::DuplicateFieldName { normalized_key, .. }
                if normalized_key == "first_name"
        )));
    }

    #[test]
    fn test_match_is_deterministic() {
        let placeholders = vec![
            placeholder("First_Name"),
            placeholder("Nickname"),
            placeholder("Amount Due"),
        ];
        let fields = vec![field("First Name"), field("Amount Due"), field("emplid")];

        let first = match_placeholders(&placeholders, &fields);
        let second = match_placeholders(&placeholders, &fields);

        assert_eq!(first.mapping, second.mapping);
        assert_eq!(first.unmatched_placeholders, second.unmatched_placeholders);
        assert_eq!(first.unmatched_fields, second.unmatched_fields);
        assert_eq!(first.warnings, second.warnings);
    }

    #[test]
    fn test_detect_identifier_field_patterns() {
        for header in [
            "emplid",
            "Employee ID",
            "EMPLOYEEID",
            "Emp Id",
            "EmpID",
            "Employee Number",
            "emp-number",
        ] {
            let fields = vec![field("First Name"), field(header)];
            let detected = detect_identifier_field(&fields);
            assert!(detected.is_some(), "should detect {:?}", header);
            assert_eq!(detected.unwrap().original_name, header);
        }
    }

    #[test]
    fn test_detect_identifier_field_first_in_csv_order() {
        let fields = vec![field("Emp ID"), field("Employee Number")];
        assert_eq!(
            detect_identifier_field(&fields).unwrap().normalized_key,
            "emp_id"
        );
    }

    #[test]
    fn test_detect_identifier_field_none() {
        let fields = vec![field("First Name"), field("Department")];
        assert!(detect_identifier_field(&fields).is_none());
    }
}
