use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use crate::error::{AirtrendError, AirtrendResult};

/// Load the seed search-term list.
///
/// The file is header-less CSV; the first field of each record is a term.
/// Terms are lower-cased and deduplicated in first-seen order.
pub fn load_term_list(path: &Path) -> AirtrendResult<Vec<String>> {
    let file = File::open(path).map_err(|_| AirtrendError::missing("seed term list", path))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);
    let mut seen = HashSet::new();
    let mut terms = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(term) = record.get(0) else { continue };
        let term = term.trim().to_lowercase();
        if !term.is_empty() && seen.insert(term.clone()) {
            terms.push(term);
        }
    }
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn lowercases_and_dedupes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("terms.csv");
        fs::write(&path, "Cough\nmask,extra\ncough\n\nSmog\n").unwrap();
        let terms = load_term_list(&path).unwrap();
        assert_eq!(terms, vec!["cough", "mask", "smog"]);
    }

    #[test]
    fn missing_file_is_missing_artifact() {
        let err = load_term_list(Path::new("/nonexistent/terms.csv")).unwrap_err();
        assert!(matches!(err, AirtrendError::MissingArtifact { .. }));
    }
}
