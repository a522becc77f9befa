// =============================================================================
// Universe Loading
// =============================================================================
//
// The scan universe is a primary `code,name` CSV plus an optional supplement
// file. Rows are merged primary-first and deduplicated by code, keeping the
// first occurrence. Codes are read as strings so leading zeros survive.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::SignalError;
use crate::market_data::source::UniverseSource;
use crate::types::UniverseEntry;

#[derive(Debug, Deserialize)]
struct UniverseRow {
    code: String,
    #[serde(default)]
    name: String,
}

/// A valid A-share code is exactly six ASCII digits.
pub fn validate_symbol(code: &str) -> Result<(), SignalError> {
    if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(SignalError::MalformedUniverseEntry {
            symbol: code.to_string(),
            reason: "code must be six ASCII digits".into(),
        })
    }
}

/// Read `code,name` rows. Malformed rows are logged and skipped; only an
/// unreadable CSV is an error.
pub fn read_universe<R: Read>(reader: R) -> Result<Vec<UniverseEntry>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut out = Vec::new();
    for (line, row) in rdr.deserialize::<UniverseRow>().enumerate() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                warn!(line = line + 2, error = %e, "Skipping unreadable universe row");
                continue;
            }
        };
        if let Err(e) = validate_symbol(&row.code) {
            warn!(line = line + 2, error = %e, "Skipping universe row");
            continue;
        }
        out.push(UniverseEntry::new(row.code, row.name));
    }
    Ok(out)
}

/// Concatenate `primary` and `secondary`, keeping the first entry per code.
pub fn merge_universe(primary: Vec<UniverseEntry>, secondary: Vec<UniverseEntry>) -> Vec<UniverseEntry> {
    let mut seen = HashSet::new();
    primary
        .into_iter()
        .chain(secondary)
        .filter(|e| seen.insert(e.code.clone()))
        .collect()
}

/// Single CSV file universe.
pub struct CsvUniverse {
    path: PathBuf,
}

impl CsvUniverse {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UniverseSource for CsvUniverse {
    fn load(&self) -> Result<Vec<UniverseEntry>> {
        let file = std::fs::File::open(&self.path)
            .with_context(|| format!("Failed to open universe file {}", self.path.display()))?;
        read_universe(file).with_context(|| format!("Failed to read {}", self.path.display()))
    }
}

/// Primary universe plus an optional supplement.
///
/// A missing supplement is a warning; any other supplement failure is logged
/// and the primary list is used alone. A primary failure is fatal.
pub struct MergedUniverse {
    primary: CsvUniverse,
    supplement: Option<CsvUniverse>,
}

impl MergedUniverse {
    pub fn new(primary: impl Into<PathBuf>, supplement: Option<PathBuf>) -> Self {
        Self {
            primary: CsvUniverse::new(primary),
            supplement: supplement.map(CsvUniverse::new),
        }
    }

    fn load_supplement(&self) -> Vec<UniverseEntry> {
        let Some(sup) = &self.supplement else {
            return Vec::new();
        };
        if !sup.path().exists() {
            warn!(path = %sup.path().display(), "Supplement universe not found, skipping");
            return Vec::new();
        }
        match sup.load() {
            Ok(entries) => {
                info!(count = entries.len(), "Loaded supplement universe");
                entries
            }
            Err(e) => {
                error!(error = %e, "Failed to read supplement universe");
                Vec::new()
            }
        }
    }
}

impl UniverseSource for MergedUniverse {
    fn load(&self) -> Result<Vec<UniverseEntry>> {
        let primary = self.primary.load()?;
        let merged = merge_universe(primary, self.load_supplement());
        info!(count = merged.len(), "Universe loaded");
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_file(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{}_{}", uuid::Uuid::new_v4(), name));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn symbol_validation() {
        assert!(validate_symbol("600000").is_ok());
        assert!(validate_symbol("000001").is_ok());
        assert!(validate_symbol("60000").is_err());
        assert!(validate_symbol("60000A").is_err());
        assert!(validate_symbol("６００００0").is_err());
    }

    #[test]
    fn reads_codes_as_strings_and_skips_bad_rows() {
        let csv = "code,name\n000001,平安银行\n12345,bad\n600519,贵州茅台\n";
        let rows = read_universe(csv.as_bytes()).unwrap();
        assert_eq!(
            rows,
            vec![
                UniverseEntry::new("000001", "平安银行"),
                UniverseEntry::new("600519", "贵州茅台"),
            ]
        );
    }

    #[test]
    fn merge_keeps_first_occurrence() {
        let primary = vec![
            UniverseEntry::new("600000", "primary"),
            UniverseEntry::new("000001", "a"),
        ];
        let secondary = vec![
            UniverseEntry::new("600000", "supplement"),
            UniverseEntry::new("300750", "b"),
        ];
        let merged = merge_universe(primary, secondary);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].name, "primary");
        assert_eq!(merged[2].code, "300750");
    }

    #[test]
    fn missing_supplement_is_not_fatal() {
        let primary = tmp_file("universe.csv", "code,name\n600000,浦发银行\n");
        let universe = MergedUniverse::new(
            &primary,
            Some(std::env::temp_dir().join("does_not_exist_supplement.csv")),
        );
        let rows = universe.load().unwrap();
        assert_eq!(rows, vec![UniverseEntry::new("600000", "浦发银行")]);
        let _ = std::fs::remove_file(primary);
    }

    #[test]
    fn supplement_is_appended_after_primary() {
        let primary = tmp_file("universe.csv", "code,name\n600000,浦发银行\n");
        let sup = tmp_file("supplement.csv", "code,name\n600000,dup\n002594,比亚迪\n");
        let rows = MergedUniverse::new(&primary, Some(sup.clone())).load().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "浦发银行");
        assert_eq!(rows[1].code, "002594");
        let _ = std::fs::remove_file(primary);
        let _ = std::fs::remove_file(sup);
    }

    #[test]
    fn missing_primary_is_fatal() {
        let universe = MergedUniverse::new(std::env::temp_dir().join("no_such_universe.csv"), None);
        assert!(universe.load().is_err());
    }
}
