//! Export surface for a finished build: filtering and TSV serialization.

use crate::model::CodeRecord;

/// Minimum free-text filter length; shorter strings match everything.
pub const MIN_FILTER_LEN: usize = 3;

/// Filter applied to the final code list before export.
#[derive(Debug, Clone, Default)]
pub struct ExportFilter {
    /// Case-insensitive substring matched against concept id, code, term and
    /// vocabulary. Ignored when shorter than [`MIN_FILTER_LEN`].
    pub text: Option<String>,
    /// Vocabulary allow-list; `None` allows all.
    pub vocabularies: Option<Vec<String>>,
}

impl ExportFilter {
    pub fn matches(&self, record: &CodeRecord) -> bool {
        if let Some(allowed) = &self.vocabularies {
            if !allowed.iter().any(|v| v == &record.vocabulary) {
                return false;
            }
        }
        match self.text.as_deref() {
            Some(text) if text.len() >= MIN_FILTER_LEN => {
                let needle = text.to_lowercase();
                record.concept_id.to_lowercase().contains(&needle)
                    || record.code.to_lowercase().contains(&needle)
                    || record.term.to_lowercase().contains(&needle)
                    || record.vocabulary.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

/// Select and sort records for export: filter applied, then ordered by
/// `(vocabulary, code)` ascending.
pub fn select_for_export<'a>(
    records: &'a [CodeRecord],
    filter: &ExportFilter,
) -> Vec<&'a CodeRecord> {
    let mut selected: Vec<&CodeRecord> = records.iter().filter(|r| filter.matches(r)).collect();
    selected.sort_by(|a, b| a.key().cmp(&b.key()));
    selected
}

/// Serialize records as tab-separated `vocabulary<TAB>code` lines.
pub fn to_tsv(records: &[&CodeRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&record.vocabulary);
        out.push('\t');
        out.push_str(&record.code);
        out.push('\n');
    }
    out
}

/// Default export file name, derived from the root concept id.
pub fn export_file_name(root_concept_id: &str) -> String {
    format!("{root_concept_id}.tsv")
}
