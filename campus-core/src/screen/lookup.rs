use crate::resource::RecordId;
use std::collections::HashMap;

/// Shown when a foreign id is missing or not (yet) in the sibling collection.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub id: RecordId,
    pub label: String,
}

/// Sibling collections keyed by the referencing field name.
///
/// Used both for display joins and for select options. A field with no
/// entry is still loading (or failed); lookups against it degrade to
/// [`UNKNOWN_LABEL`] instead of blocking.
#[derive(Debug, Clone, Default)]
pub struct ForeignLookup {
    tables: HashMap<&'static str, Vec<SelectOption>>,
}

impl ForeignLookup {
    pub fn insert(&mut self, field: &'static str, options: Vec<SelectOption>) {
        self.tables.insert(field, options);
    }

    pub fn label(&self, field: &str, id: Option<RecordId>) -> &str {
        id.and_then(|id| {
            self.tables
                .get(field)?
                .iter()
                .find(|o| o.id == id)
                .map(|o| o.label.as_str())
        })
        .unwrap_or(UNKNOWN_LABEL)
    }

    pub fn options(&self, field: &str) -> &[SelectOption] {
        self.tables.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_loaded(&self, field: &str) -> bool {
        self.tables.contains_key(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tables_and_ids_degrade_to_unknown() {
        let mut lookup = ForeignLookup::default();
        assert_eq!(lookup.label("departement", Some(1)), UNKNOWN_LABEL);
        assert!(lookup.options("departement").is_empty());

        lookup.insert(
            "departement",
            vec![SelectOption {
                id: 1,
                label: "Mathématiques".into(),
            }],
        );
        assert!(lookup.is_loaded("departement"));
        assert_eq!(lookup.label("departement", Some(1)), "Mathématiques");
        assert_eq!(lookup.label("departement", Some(2)), UNKNOWN_LABEL);
        assert_eq!(lookup.label("departement", None), UNKNOWN_LABEL);
    }
}
