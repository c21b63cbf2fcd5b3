// MIT License - Copyright (c) 2026 Peter Wright
// Point catalog

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::error::{FacpError, Result};

/// Descriptive metadata for one point, as configured on site.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PointDetails {
    pub description: String,
    pub location: String,
    pub hardware_type: String,
    /// Point type as written in the points file (not the derived one)
    pub configured_type: String,
    pub custom_fields: Vec<String>,
}

/// Lookup of point metadata, consulted for every transition.
pub trait PointDirectory {
    fn describe(&self, point_id: &str) -> Option<PointDetails>;

    /// Note the latest status observed for a point. Default: ignore.
    fn record_status(&mut self, _point_id: &str, _status_code: &str, _at: DateTime<Utc>) {}
}

/// A directory that knows nothing; every lookup is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDirectory;

impl PointDirectory for NoDirectory {
    fn describe(&self, _point_id: &str) -> Option<PointDetails> {
        None
    }
}

/// An optional directory; `None` behaves like [`NoDirectory`].
impl<T: PointDirectory> PointDirectory for Option<T> {
    fn describe(&self, point_id: &str) -> Option<PointDetails> {
        self.as_ref().and_then(|d| d.describe(point_id))
    }

    fn record_status(&mut self, point_id: &str, status_code: &str, at: DateTime<Utc>) {
        if let Some(d) = self {
            d.record_status(point_id, status_code, at);
        }
    }
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    point_id: String,
    details: PointDetails,
    last_status: Option<String>,
    last_update: Option<DateTime<Utc>>,
}

/// Point metadata loaded from the site's points file.
///
/// The file is headerless CSV in a single-byte code page:
/// `point_id, hardware_type, point_type, description, location, custom...`.
/// Entries are keyed by point id with any trailing `-0` dropped.
#[derive(Debug, Clone, Default)]
pub struct PointCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl PointCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a points file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let catalog = Self::from_bytes(&bytes)?;
        info!("Loaded {} points from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Parse a points file already read into memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        // Latin-1: every byte maps to the code point of the same value.
        let text: String = bytes.iter().map(|&b| char::from(b)).collect();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut catalog = Self::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|e| FacpError::Config(format!("points file: {e}")))?;
            if record.len() < 5 {
                warn!("Skipping points row {}: expected 5 columns, got {}", index + 1, record.len());
                continue;
            }

            let point_id = record[0].to_string();
            let description = convert_description(&record[3]);
            debug!("Point {} description: {}", point_id, description);

            let entry = CatalogEntry {
                details: PointDetails {
                    description,
                    location: record[4].to_string(),
                    hardware_type: record[1].to_string(),
                    configured_type: record[2].to_string(),
                    custom_fields: record.iter().skip(5).map(str::to_string).collect(),
                },
                point_id,
                last_status: None,
                last_update: None,
            };
            catalog.entries.insert(catalog_key(&entry.point_id).to_string(), entry);
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last recorded status code and time for a point.
    pub fn last_status(&self, point_id: &str) -> Option<(&str, DateTime<Utc>)> {
        let entry = self.entry(point_id)?;
        Some((entry.last_status.as_deref()?, entry.last_update?))
    }

    fn entry(&self, point_id: &str) -> Option<&CatalogEntry> {
        self.entries
            .get(point_id)
            .or_else(|| self.entries.get(catalog_key(point_id)))
    }

    fn entry_mut(&mut self, point_id: &str) -> Option<&mut CatalogEntry> {
        let key = if self.entries.contains_key(point_id) {
            point_id
        } else {
            catalog_key(point_id)
        };
        self.entries.get_mut(key)
    }

    /// Write every entry, with its last known status, as CSV.
    pub fn export_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| FacpError::Config(format!("export {}: {e}", path.display())))?;

        for entry in self.entries.values() {
            let d = &entry.details;
            let last_status = entry.last_status.as_deref().unwrap_or("N/A");
            let last_update = entry
                .last_update
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_else(|| "N/A".to_string());

            let mut row = vec![
                entry.point_id.as_str(),
                d.hardware_type.as_str(),
                d.configured_type.as_str(),
                d.description.as_str(),
                d.location.as_str(),
                last_status,
                last_update.as_str(),
            ];
            row.extend(d.custom_fields.iter().map(String::as_str));
            writer
                .write_record(&row)
                .map_err(|e| FacpError::Config(format!("export {}: {e}", path.display())))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Export into `dir` under a timestamped `point_status_*.csv` name.
    pub fn export_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "point_status_{}.csv",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        self.export_csv(&path)?;
        info!("Exported final point status to {}", path.display());
        Ok(path)
    }
}

impl PointDirectory for PointCatalog {
    fn describe(&self, point_id: &str) -> Option<PointDetails> {
        self.entry(point_id).map(|e| e.details.clone())
    }

    fn record_status(&mut self, point_id: &str, status_code: &str, at: DateTime<Utc>) {
        match self.entry_mut(point_id) {
            Some(entry) => {
                entry.last_status = Some(status_code.to_string());
                entry.last_update = Some(at);
            }
            None => warn!("Status for unknown point: {}", point_id),
        }
    }
}

fn catalog_key(point_id: &str) -> &str {
    point_id.strip_suffix("-0").unwrap_or(point_id)
}

/// Map a panel code-page byte (already widened to a char) to Hebrew.
fn hebrew_letter(c: char) -> Option<char> {
    let letter = match c {
        '\u{a0}' => 'א',
        '\u{a1}' => 'ב',
        '\u{a2}' => 'ג',
        '\u{a3}' => 'ד',
        '\u{a4}' => 'ה',
        '\u{a5}' => 'ו',
        '\u{a6}' => 'ז',
        '\u{a7}' => 'ח',
        '\u{a8}' => 'ט',
        '\u{a9}' => 'י',
        '\u{aa}' => 'ך',
        '\u{ab}' => 'כ',
        '\u{ac}' => 'ל',
        '\u{ad}' => 'ם',
        '\u{ae}' => 'מ',
        '\u{af}' => 'ן',
        '\u{b0}' => 'נ',
        '\u{b1}' => 'ס',
        '\u{b2}' => 'ע',
        '\u{b3}' => 'ף',
        '\u{b4}' => 'פ',
        '\u{b5}' => 'ץ',
        '\u{b6}' => 'צ',
        '\u{b7}' => 'ק',
        '\u{b8}' => 'ר',
        '\u{b9}' => 'ש',
        '\u{ba}' => 'ת',
        _ => return None,
    };
    Some(letter)
}

/// Length of a leading `M<digits>-<digits>` Mapnet id, if present.
fn mapnet_prefix_len(text: &str) -> Option<usize> {
    let rest = text.strip_prefix('M')?;
    let first = rest.bytes().take_while(u8::is_ascii_digit).count();
    if first == 0 {
        return None;
    }
    let rest = rest[first..].strip_prefix('-')?;
    let second = rest.bytes().take_while(u8::is_ascii_digit).count();
    if second == 0 {
        return None;
    }
    Some(1 + first + 1 + second)
}

fn convert_and_reverse(text: &str) -> String {
    text.chars()
        .map(|c| hebrew_letter(c).unwrap_or(c))
        .rev()
        .collect()
}

/// Turn a stored description into readable text.
///
/// The panel keeps Hebrew descriptions in its own code page and in visual
/// (reversed) order. A leading Mapnet point id stays in front.
pub fn convert_description(text: &str) -> String {
    match mapnet_prefix_len(text) {
        Some(len) => {
            let (point_id, rest) = text.split_at(len);
            format!("{} {}", point_id, convert_and_reverse(rest.trim()))
        }
        None => convert_and_reverse(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn catalog(lines: &[&[u8]]) -> PointCatalog {
        let mut bytes = Vec::new();
        for line in lines {
            bytes.extend_from_slice(line);
            bytes.push(b'\n');
        }
        PointCatalog::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn test_convert_description_reverses_hebrew() {
        // Stored visually reversed: "שלום" arrives as ם ו ל ש
        let stored: String = [0xAD, 0xA5, 0xAC, 0xB9].iter().map(|&b| char::from(b)).collect();
        assert_eq!(convert_description(&stored), "שלום");
    }

    #[test]
    fn test_convert_description_keeps_mapnet_prefix() {
        let stored: String = "M1-23 "
            .chars()
            .chain([0xAD, 0xA5, 0xAC, 0xB9].iter().map(|&b| char::from(b)))
            .collect();
        assert_eq!(convert_description(&stored), "M1-23 שלום");
    }

    #[test]
    fn test_convert_description_plain_ascii_reversed() {
        assert_eq!(convert_description("ABC"), "CBA");
        assert_eq!(convert_description(""), "");
    }

    #[test]
    fn test_mapnet_prefix_len() {
        assert_eq!(mapnet_prefix_len("M1-2 x"), Some(4));
        assert_eq!(mapnet_prefix_len("M12-345"), Some(7));
        assert_eq!(mapnet_prefix_len("M-2"), None);
        assert_eq!(mapnet_prefix_len("M1-"), None);
        assert_eq!(mapnet_prefix_len("A1-2"), None);
    }

    #[test]
    fn test_load_rows() {
        let c = catalog(&[
            b"A1, SMOKE, FIRE, LOBBY, Floor 1, x1, x2",
            b"M1-2-0, MON, SUPV, TAMPER, Roof",
            b"short, row",
        ]);
        assert_eq!(c.len(), 2);

        let a1 = c.describe("A1").unwrap();
        assert_eq!(a1.description, "YBBOL");
        assert_eq!(a1.location, "Floor 1");
        assert_eq!(a1.hardware_type, "SMOKE");
        assert_eq!(a1.configured_type, "FIRE");
        assert_eq!(a1.custom_fields, vec!["x1", "x2"]);
    }

    #[test]
    fn test_describe_handles_zero_suffix() {
        let c = catalog(&[b"M1-2-0, MON, SUPV, X, Roof"]);
        assert!(c.describe("M1-2").is_some());
        assert!(c.describe("M1-2-0").is_some());
        assert!(c.describe("M1-3").is_none());
    }

    #[test]
    fn test_load_decodes_high_bytes() {
        let c = catalog(&[b"A1, SMOKE, FIRE, \xad\xa5\xac\xb9, Hall"]);
        assert_eq!(c.describe("A1").unwrap().description, "שלום");
    }

    #[test]
    fn test_record_status() {
        let mut c = catalog(&[b"A1, SMOKE, FIRE, D, L"]);
        let now = Utc::now();
        c.record_status("A1", "F1-", now);
        c.record_status("ZZ9", "T0-", now);
        assert_eq!(c.last_status("A1"), Some(("F1-", now)));
        assert_eq!(c.last_status("ZZ9"), None);
    }

    #[test]
    fn test_no_directory() {
        assert!(NoDirectory.describe("A1").is_none());

        let mut none: Option<PointCatalog> = None;
        none.record_status("A1", "F1-", Utc::now());
        assert!(none.describe("A1").is_none());

        let some = Some(catalog(&[b"A1, SMOKE, FIRE, D, L"]));
        assert_eq!(some.describe("A1").unwrap().description, "D");
    }

    #[test]
    fn test_load_and_export_files() {
        let dir = tempfile::tempdir().unwrap();
        let points = dir.path().join("points.csv");
        let mut f = fs::File::create(&points).unwrap();
        f.write_all(b"A1, SMOKE, FIRE, D1, L1, extra\nP2, RELAY, CTRL, D2, L2\n")
            .unwrap();
        drop(f);

        let mut c = PointCatalog::load(&points).unwrap();
        let at = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        c.record_status("A1", "F1-", at);

        let out = c.export_to_dir(dir.path().join("export")).unwrap();
        let name = out.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("point_status_") && name.ends_with(".csv"));

        let written = fs::read_to_string(&out).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines[0], "A1,SMOKE,FIRE,1D,L1,F1-,2026-01-02T03:04:05Z,extra");
        assert_eq!(lines[1], "P2,RELAY,CTRL,2D,L2,N/A,N/A");
    }
}
