//! Charset normalization for values read from legacy databases
//!
//! Text columns in older Firebird databases are often stored in a national
//! multi-byte encoding (EUC-KR / CP949 for Korean deployments) and reach us as
//! raw bytes. [`CharsetNormalizer`] turns those bytes into canonical text by
//! trying an explicit, ordered list of candidate encodings, and renders
//! temporal values with a fixed display convention.
//!
//! ## Decoding order
//!
//! 1. Each configured candidate, in order, with strict (non-replacing) decoding
//! 2. Strict UTF-8
//! 3. Lossy UTF-8, which always succeeds and is recorded as an encoding failure
//!
//! Trailing padding is trimmed after decoding, since fixed-width `CHAR` fields
//! are space padded by the engine.
//!
//! ## Temporal display
//!
//! A timestamp at exactly midnight renders as `YYYY-MM-DD`; any other time of
//! day renders as `YYYY-MM-DD HH:MM:SS`. The engine hands `DATE` columns back
//! as midnight timestamps, so this keeps date columns readable. Callers that
//! need the real distinction must look at the column's portable type.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use encoding_rs::{Encoding, UTF_8};
use tracing::{trace, warn};

use crate::error::{FbscopeError, Result};
use crate::value::{RawValue, Row};

/// Default legacy encoding label.
pub const DEFAULT_CHARSET: &str = "euc-kr";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Ordered list of candidate encodings tried before UTF-8.
#[derive(Debug, Clone)]
pub struct CharsetConfig {
    candidates: Vec<&'static Encoding>,
}

impl CharsetConfig {
    /// Build from WHATWG encoding labels (`"euc-kr"`, `"windows-1252"`, ...).
    ///
    /// Duplicate encodings are dropped; UTF-8 is always tried last so it does
    /// not need to be listed.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        let mut candidates: Vec<&'static Encoding> = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.as_ref().trim();
            let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
                FbscopeError::config("charsets", format!("unknown encoding label '{}'", label))
            })?;
            if !candidates.contains(&encoding) {
                candidates.push(encoding);
            }
        }
        Ok(Self { candidates })
    }

    /// Candidate encodings in priority order, excluding the UTF-8 fallback.
    pub fn candidates(&self) -> &[&'static Encoding] {
        &self.candidates
    }

    /// Encoding text columns are stored in; the first candidate, else UTF-8.
    pub fn storage_encoding(&self) -> &'static Encoding {
        self.candidates.first().copied().unwrap_or(UTF_8)
    }
}

impl Default for CharsetConfig {
    fn default() -> Self {
        Self {
            candidates: vec![encoding_rs::EUC_KR],
        }
    }
}

/// Outcome of decoding one byte sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    /// Encoding that produced `text`
    pub encoding: &'static Encoding,
    /// True when every candidate failed and lossy UTF-8 was used
    pub lossy: bool,
}

/// Converts raw field values into display values.
#[derive(Debug)]
pub struct CharsetNormalizer {
    config: CharsetConfig,
    lossy_decodes: AtomicU64,
}

impl CharsetNormalizer {
    pub fn new(config: CharsetConfig) -> Self {
        Self {
            config,
            lossy_decodes: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CharsetConfig {
        &self.config
    }

    /// Number of values that exhausted every candidate encoding.
    pub fn lossy_decodes(&self) -> u64 {
        self.lossy_decodes.load(Ordering::Relaxed)
    }

    /// Normalize a value, recursing into lists and maps.
    ///
    /// Bytes become trimmed text, temporal values become display strings, and
    /// everything else is returned unchanged, so the operation is idempotent.
    pub fn normalize(&self, value: RawValue) -> RawValue {
        match value {
            RawValue::Bytes(bytes) => {
                let decoded = self.decode(&bytes);
                RawValue::Text(decoded.text.trim_end().to_string())
            }
            RawValue::Timestamp(ts) => RawValue::Text(format_timestamp(&ts)),
            RawValue::Date(date) => RawValue::Text(date.format(DATE_FORMAT).to_string()),
            RawValue::Time(time) => RawValue::Text(time.format(TIME_FORMAT).to_string()),
            RawValue::List(items) => {
                RawValue::List(items.into_iter().map(|v| self.normalize(v)).collect())
            }
            RawValue::Map(row) => RawValue::Map(self.normalize_row(row)),
            other => other,
        }
    }

    pub fn normalize_row(&self, row: Row) -> Row {
        row.map_values(|v| self.normalize(v))
    }

    pub fn normalize_rows(&self, rows: Vec<Row>) -> Vec<Row> {
        rows.into_iter().map(|r| self.normalize_row(r)).collect()
    }

    /// Decode bytes with the first candidate that accepts them.
    pub fn decode(&self, bytes: &[u8]) -> Decoded {
        for encoding in self.config.candidates.iter().copied().chain([UTF_8]) {
            if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes)
            {
                trace!(encoding = encoding.name(), len = bytes.len(), "decoded field");
                return Decoded {
                    text: text.into_owned(),
                    encoding,
                    lossy: false,
                };
            }
        }

        self.lossy_decodes.fetch_add(1, Ordering::Relaxed);
        warn!(
            len = bytes.len(),
            candidates = self.config.candidates.len() + 1,
            "No candidate encoding accepted field bytes; using lossy UTF-8"
        );
        Decoded {
            text: String::from_utf8_lossy(bytes).into_owned(),
            encoding: UTF_8,
            lossy: true,
        }
    }
}

impl Default for CharsetNormalizer {
    fn default() -> Self {
        Self::new(CharsetConfig::default())
    }
}

/// Render a timestamp, dropping a midnight time of day.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    let time = ts.time();
    if time.hour() == 0 && time.minute() == 0 && time.second() == 0 {
        ts.format(DATE_FORMAT).to_string()
    } else {
        ts.format(DATETIME_FORMAT).to_string()
    }
}

/// True when the time carries no hour, minute, or second component.
pub fn is_midnight(time: &NaiveTime) -> bool {
    time.hour() == 0 && time.minute() == 0 && time.second() == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_midnight_renders_as_date() {
        let n = CharsetNormalizer::default();
        assert_eq!(
            n.normalize(RawValue::Timestamp(ts(2024, 3, 1, 0, 0, 0))),
            RawValue::Text("2024-03-01".into())
        );
    }

    #[test]
    fn test_time_of_day_renders_full_timestamp() {
        let n = CharsetNormalizer::default();
        assert_eq!(
            n.normalize(RawValue::Timestamp(ts(2024, 3, 1, 14, 5, 9))),
            RawValue::Text("2024-03-01 14:05:09".into())
        );
    }

    #[test]
    fn test_euc_kr_bytes_decode_and_trim() {
        let n = CharsetNormalizer::default();
        let (bytes, _, had_errors) = encoding_rs::EUC_KR.encode("홍길동");
        assert!(!had_errors);
        let mut padded = bytes.into_owned();
        padded.extend_from_slice(b"    ");

        assert_eq!(
            n.normalize(RawValue::Bytes(padded)),
            RawValue::Text("홍길동".into())
        );
        assert_eq!(n.lossy_decodes(), 0);
    }

    #[test]
    fn test_invalid_bytes_fall_back_to_lossy_utf8() {
        let n = CharsetNormalizer::new(CharsetConfig::from_labels(&["euc-kr"]).unwrap());
        // 0xFF is not a lead byte in EUC-KR and not valid UTF-8
        let decoded = n.decode(&[0x41, 0xFF]);
        assert!(decoded.lossy);
        assert_eq!(decoded.encoding, UTF_8);
        assert!(decoded.text.starts_with('A'));
        assert_eq!(n.lossy_decodes(), 1);
    }

    #[test]
    fn test_candidate_order_is_respected() {
        let n = CharsetNormalizer::new(
            CharsetConfig::from_labels(&["windows-1252", "euc-kr"]).unwrap(),
        );
        let decoded = n.decode("é".as_bytes());
        // windows-1252 accepts every byte, so it wins even for UTF-8 input
        assert_eq!(decoded.encoding, encoding_rs::WINDOWS_1252);
        assert_eq!(decoded.text, "Ã©");
    }

    #[test]
    fn test_empty_candidate_list_uses_utf8() {
        let empty: [&str; 0] = [];
        let n = CharsetNormalizer::new(CharsetConfig::from_labels(&empty).unwrap());
        let decoded = n.decode("한글".as_bytes());
        assert_eq!(decoded.encoding, UTF_8);
        assert_eq!(decoded.text, "한글");
        assert_eq!(n.config().storage_encoding(), UTF_8);
    }

    #[test]
    fn test_unknown_label_is_config_error() {
        let err = CharsetConfig::from_labels(&["klingon"]).unwrap_err();
        assert!(err.to_string().contains("klingon"));
    }

    #[test]
    fn test_recurses_into_lists_and_maps() {
        let n = CharsetNormalizer::default();
        let nested = Row::new()
            .with("NAME", b"KIM  ".to_vec())
            .with("SEEN", RawValue::Timestamp(ts(2023, 12, 31, 0, 0, 0)));
        let value = RawValue::List(vec![RawValue::Map(nested), RawValue::Integer(7)]);

        let expected = RawValue::List(vec![
            RawValue::Map(
                Row::new()
                    .with("NAME", "KIM")
                    .with("SEEN", "2023-12-31"),
            ),
            RawValue::Integer(7),
        ]);
        assert_eq!(n.normalize(value), expected);
    }

    #[test]
    fn test_text_is_left_untouched() {
        let n = CharsetNormalizer::default();
        // Already-decoded text keeps its padding; only bytes are trimmed
        let v = RawValue::Text("kept  ".into());
        assert_eq!(n.normalize(v.clone()), v);
    }

    #[test]
    fn test_idempotent_on_mixed_row() {
        let n = CharsetNormalizer::default();
        let row = Row::new()
            .with("A", b"abc ".to_vec())
            .with("B", RawValue::Timestamp(ts(2020, 1, 2, 3, 4, 5)))
            .with("C", RawValue::Float(1.5))
            .with("D", RawValue::Null);
        let once = n.normalize_row(row);
        let twice = n.normalize_row(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_is_midnight() {
        assert!(is_midnight(&NaiveTime::from_hms_opt(0, 0, 0).unwrap()));
        assert!(!is_midnight(&NaiveTime::from_hms_opt(0, 0, 1).unwrap()));
    }
}
