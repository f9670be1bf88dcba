//! Scan verdict types.

use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One named malware match reported for a scanned file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FoundMalware {
    /// File (or archive member) the match was found in.
    pub file_name: String,
    /// Malware family/signature name.
    pub malware_name: String,
}

/// Structured verdict for a single scanned file.
///
/// Produced only for files whose scan call completed and whose response
/// parsed; skipped or failed files never have one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanResult {
    /// Version of the remote scanner engine.
    pub scanner_version: String,
    /// Version of the result schema.
    pub schema_version: String,
    /// Verdict code (0 = clean by convention).
    #[serde(rename = "scanResult")]
    pub scan_result_code: i64,
    /// Unique identifier of this scan call.
    pub scan_id: String,
    /// Timestamp reported by the service.
    pub scan_timestamp: String,
    /// Path of the scanned file as submitted.
    pub file_name: String,
    /// Malware matches, in service order.
    #[serde(deserialize_with = "null_as_empty")]
    pub found_malwares: Vec<FoundMalware>,
    /// SHA-1 of the content, as computed by the service.
    #[serde(rename = "fileSHA1")]
    pub file_sha1: String,
    /// SHA-256 of the content, as computed by the service.
    #[serde(rename = "fileSHA256")]
    pub file_sha256: String,
}

/// Clean / malware classification of a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// No malware matches.
    Clean,
    /// At least one malware match.
    Malware,
}

impl ScanResult {
    /// Parse a raw JSON verdict as returned by the service.
    ///
    /// Only a JSON object is a verdict. Field defaults would otherwise let an
    /// array or scalar through as an empty, clean result.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        if value.is_object() {
            return serde_json::from_value(value);
        }
        let unexpected = match &value {
            Value::Object(_) => Unexpected::Map,
            Value::Array(_) => Unexpected::Seq,
            Value::String(s) => Unexpected::Str(s),
            Value::Number(_) => Unexpected::Other("number"),
            Value::Bool(b) => Unexpected::Bool(*b),
            Value::Null => Unexpected::Unit,
        };
        Err(de::Error::invalid_type(unexpected, &"a verdict object"))
    }

    /// Classify this result.
    pub fn verdict(&self) -> Verdict {
        if self.found_malwares.is_empty() {
            Verdict::Clean
        } else {
            Verdict::Malware
        }
    }

    /// Check if any malware was found.
    pub fn is_malware(&self) -> bool {
        self.verdict() == Verdict::Malware
    }

    /// Names of all malware matches, in order.
    pub fn malware_names(&self) -> impl Iterator<Item = &str> {
        self.found_malwares.iter().map(|m| m.malware_name.as_str())
    }
}

// The service sends `null` rather than `[]` for files without matches.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<FoundMalware>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<FoundMalware>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MALWARE_RESPONSE: &str = r#"{
        "scannerVersion": "1.0.0-59",
        "schemaVersion": "1.0.0",
        "scanResult": 1,
        "scanId": "25072030-425f-4f4d-8f4e-7c4e0f2b7f0a",
        "scanTimestamp": "2024-05-01T09:12:44.123Z",
        "fileName": "/data/b.exe",
        "foundMalwares": [
            { "fileName": "b.exe", "malwareName": "Eicar_test_file" }
        ],
        "fileSHA1": "3395856ce81f2b7382dee72602f798b642f14140",
        "fileSHA256": "275a021bbfb6489e54d471899f7db9d1663fc695ec2fe2a2c4538aabf651fd0f"
    }"#;

    #[test]
    fn test_parse_malware_verdict() {
        let result = ScanResult::from_json(MALWARE_RESPONSE).unwrap();

        assert_eq!(result.scan_result_code, 1);
        assert_eq!(result.file_name, "/data/b.exe");
        assert_eq!(result.found_malwares.len(), 1);
        assert_eq!(result.verdict(), Verdict::Malware);
        assert_eq!(result.malware_names().collect::<Vec<_>>(), vec!["Eicar_test_file"]);
        assert!(result.file_sha256.starts_with("275a02"));
    }

    #[test]
    fn test_null_found_malwares_is_clean() {
        let raw = r#"{"scanResult": 0, "fileName": "a.txt", "foundMalwares": null}"#;
        let result = ScanResult::from_json(raw).unwrap();

        assert!(result.found_malwares.is_empty());
        assert_eq!(result.verdict(), Verdict::Clean);
    }

    #[test]
    fn test_missing_fields_default() {
        let result = ScanResult::from_json(r#"{"fileName": "a.txt"}"#).unwrap();
        assert_eq!(result.scan_result_code, 0);
        assert!(!result.is_malware());
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(ScanResult::from_json("not json").is_err());
        assert!(ScanResult::from_json(r#"{"scanResult": "zero"}"#).is_err());
    }

    #[test]
    fn test_non_object_json_is_error() {
        for raw in ["[]", r#"["v", "s", 0]"#, "null", "0", r#""clean""#, "true"] {
            assert!(ScanResult::from_json(raw).is_err(), "{raw} accepted");
        }
    }
}
