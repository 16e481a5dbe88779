//! Selection of files that qualify for printing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::{Result, WatcherError};

/// Whether `file_name` should be printed.
///
/// True iff the name ends in `.pdf` (any case), it is not in `excluded`, and
/// it contains at least one of `include_words` as a literal, case-sensitive
/// substring.
pub fn qualifies(file_name: &str, excluded: &HashSet<String>, include_words: &[String]) -> bool {
    if !file_name.to_lowercase().ends_with(".pdf") {
        return false;
    }

    if excluded.contains(file_name) {
        return false;
    }

    include_words.iter().any(|word| file_name.contains(word.as_str()))
}

/// List the regular files in `dir` that qualify, in directory listing order.
pub async fn select_candidates(
    dir: &Path,
    excluded: &HashSet<String>,
    include_words: &[String],
) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            WatcherError::DirectoryNotFound(dir.display().to_string())
        } else {
            WatcherError::Io(e)
        }
    })?;

    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        let Some(name) = entry.file_name().to_str().map(String::from) else {
            warn!("Skipping non UTF-8 file name: {}", path.display());
            continue;
        };

        if !qualifies(&name, excluded, include_words) {
            continue;
        }

        // Follows symlinks, unlike DirEntry::metadata.
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => candidates.push(path),
            Ok(_) => debug!("Skipping non-file entry: {}", path.display()),
            Err(e) => warn!("Failed to stat {}: {e}", path.display()),
        }
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_include_words;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| (*w).to_string()).collect()
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let excluded = HashSet::new();
        let include = words(&["ACME"]);

        assert!(qualifies("invoice_ACME.pdf", &excluded, &include));
        assert!(qualifies("invoice_ACME.PDF", &excluded, &include));
        assert!(qualifies("invoice_ACME.Pdf", &excluded, &include));
        assert!(!qualifies("invoice_ACME.txt", &excluded, &include));
        assert!(!qualifies("invoice_ACME.pdf.bak", &excluded, &include));
    }

    #[test]
    fn test_excluded_names_are_rejected() {
        let excluded: HashSet<String> = ["invoice_ACME.pdf".to_string()].into();
        let include = words(&["ACME"]);

        assert!(!qualifies("invoice_ACME.pdf", &excluded, &include));
        assert!(qualifies("invoice2_ACME.pdf", &excluded, &include));
    }

    #[test]
    fn test_include_words_are_case_sensitive_substrings() {
        let excluded = HashSet::new();
        let include = words(&["BETA", "GAMMA"]);

        assert!(qualifies("order_BETA.pdf", &excluded, &include));
        assert!(qualifies("xGAMMAx.pdf", &excluded, &include));
        assert!(!qualifies("order_beta.pdf", &excluded, &include));
        assert!(!qualifies("order_B*.pdf", &excluded, &words(&["B?"])));
    }

    #[test]
    fn test_untrimmed_words_keep_their_whitespace() {
        let excluded = HashSet::new();
        let include = words(&["ACME", " BETA"]);

        assert!(!qualifies("order_BETA.pdf", &excluded, &include));
        assert!(qualifies("order BETA.pdf", &excluded, &include));
    }

    #[test]
    fn test_empty_word_matches_any_pdf() {
        let excluded = HashSet::new();
        assert!(qualifies("anything.pdf", &excluded, &words(&[""])));
        assert!(!qualifies("anything.pdf", &excluded, &[]));
    }

    #[test]
    fn test_trailing_comma_does_not_match_everything() {
        let excluded = HashSet::new();
        let include = parse_include_words("ACME,");
        let nothing = parse_include_words(",");

        assert!(qualifies("invoice_ACME.pdf", &excluded, &include));
        assert!(!qualifies("unrelated_payroll.pdf", &excluded, &include));
        assert!(!qualifies("unrelated_payroll.pdf", &excluded, &nothing));
    }

    #[tokio::test]
    async fn test_select_candidates_skips_directories() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("order_BETA.pdf"), b"%PDF").unwrap();
        std::fs::write(temp_dir.path().join("report_BETA.txt"), b"text").unwrap();
        std::fs::create_dir(temp_dir.path().join("folder_BETA.pdf")).unwrap();

        let found = select_candidates(temp_dir.path(), &HashSet::new(), &words(&["BETA"]))
            .await
            .unwrap();
        assert_eq!(found, vec![temp_dir.path().join("order_BETA.pdf")]);
    }

    #[tokio::test]
    async fn test_select_candidates_missing_directory() {
        let result =
            select_candidates(Path::new("/nonexistent/path/12345"), &HashSet::new(), &[]).await;
        assert!(matches!(result, Err(WatcherError::DirectoryNotFound(_))));
    }
}
