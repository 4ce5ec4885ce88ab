//! Captured records and their on-disk encodings
//!
//! A [`CapturedRecord`] is one immutable observation. The set of shapes is
//! closed ([`RecordData`]); every record is validated on construction and
//! again when decoded from a destination file, so an invalid record can never
//! be buffered or read back.
//!
//! Two entry encodings are supported ([`RecordFormat`]):
//!
//! - **JSON Lines**: one compact object per line, externally tagged
//!   (`{"position":{"vector":{..},"label":".."}}`)
//! - **Binary**: `u32` little-endian length prefix followed by bincode

use crate::error::{CaptureError, CaptureResult};
use crate::messages::{LogSummary, Quaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tags accepted by [`CapturedRecord::create`]
pub const KNOWN_TAGS: &[&str] = &["position", "pose"];

/// Size of the length prefix in front of each binary entry
const FRAME_HEADER_LEN: usize = 4;

/// Encoding used for entries in a destination file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RecordFormat {
    #[default]
    #[serde(rename = "jsonl")]
    JsonLines,
    #[serde(rename = "bin")]
    Binary,
}

impl RecordFormat {
    /// File extension for destinations written in this format
    pub fn extension(&self) -> &'static str {
        match self {
            RecordFormat::JsonLines => "jsonl",
            RecordFormat::Binary => "bin",
        }
    }

    /// Format inferred from a destination file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jsonl" => Some(RecordFormat::JsonLines),
            "bin" => Some(RecordFormat::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for RecordFormat {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jsonl" | "json" => Ok(RecordFormat::JsonLines),
            "bin" | "binary" | "bincode" => Ok(RecordFormat::Binary),
            other => Err(CaptureError::Config(format!(
                "unknown record format '{}' (expected jsonl or bin)",
                other
            ))),
        }
    }
}

/// The shapes a record can take
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordData {
    /// Spatial position of a named entity
    Position { vector: Vector3, label: String },
    /// Position and orientation of a named entity
    Pose {
        position: Vector3,
        orientation: Quaternion,
        label: String,
    },
}

impl RecordData {
    fn validate(&self) -> CaptureResult<()> {
        match self {
            RecordData::Position { vector, label } => {
                check_label(label)?;
                if !vector.is_finite() {
                    return Err(CaptureError::InvalidField(format!(
                        "position vector of '{}' is not finite",
                        label
                    )));
                }
            }
            RecordData::Pose {
                position,
                orientation,
                label,
            } => {
                check_label(label)?;
                if !position.is_finite() {
                    return Err(CaptureError::InvalidField(format!(
                        "pose position of '{}' is not finite",
                        label
                    )));
                }
                if !orientation.is_finite() {
                    return Err(CaptureError::InvalidField(format!(
                        "pose orientation of '{}' is not finite",
                        label
                    )));
                }
            }
        }
        Ok(())
    }
}

fn check_label(label: &str) -> CaptureResult<()> {
    if label.trim().is_empty() {
        return Err(CaptureError::InvalidField("label must not be empty".into()));
    }
    Ok(())
}

/// One immutable observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecordData", into = "RecordData")]
pub struct CapturedRecord {
    data: RecordData,
}

impl CapturedRecord {
    /// Position of a named entity
    pub fn position(vector: impl Into<Vector3>, label: impl Into<String>) -> CaptureResult<Self> {
        Self::try_from(RecordData::Position {
            vector: vector.into(),
            label: label.into(),
        })
    }

    /// Position and orientation of a named entity
    pub fn pose(
        position: impl Into<Vector3>,
        orientation: Quaternion,
        label: impl Into<String>,
    ) -> CaptureResult<Self> {
        Self::try_from(RecordData::Pose {
            position: position.into(),
            orientation,
            label: label.into(),
        })
    }

    /// Build a record from a tag and a field object, e.g.
    /// `create("position", json!({"vector": {"x":0.0,"y":1.0,"z":2.0}, "label": "cube"}))`
    pub fn create(tag: &str, fields: serde_json::Value) -> CaptureResult<Self> {
        if !KNOWN_TAGS.contains(&tag) {
            return Err(CaptureError::InvalidField(format!(
                "unknown record tag '{}'",
                tag
            )));
        }
        if !fields.is_object() {
            return Err(CaptureError::InvalidField(format!(
                "fields for '{}' must be an object",
                tag
            )));
        }

        let mut tagged = serde_json::Map::new();
        tagged.insert(tag.to_string(), fields);
        let data: RecordData = serde_json::from_value(serde_json::Value::Object(tagged))
            .map_err(|e| CaptureError::InvalidField(format!("{}: {}", tag, e)))?;
        Self::try_from(data)
    }

    /// Discriminator naming the record's shape
    pub fn tag(&self) -> &'static str {
        match self.data {
            RecordData::Position { .. } => "position",
            RecordData::Pose { .. } => "pose",
        }
    }

    /// Name of the observed entity
    pub fn label(&self) -> &str {
        match &self.data {
            RecordData::Position { label, .. } | RecordData::Pose { label, .. } => label.as_str(),
        }
    }

    pub fn data(&self) -> &RecordData {
        &self.data
    }

    /// Encode as a single destination entry (terminator or length prefix included)
    pub fn serialize(&self, format: RecordFormat) -> CaptureResult<Vec<u8>> {
        match format {
            RecordFormat::JsonLines => {
                let mut bytes = serde_json::to_vec(self)?;
                bytes.push(b'\n');
                Ok(bytes)
            }
            RecordFormat::Binary => {
                let body = bincode::serialize(self)?;
                let len = u32::try_from(body.len()).map_err(|_| {
                    CaptureError::Serialization(format!(
                        "entry of {} bytes exceeds frame limit",
                        body.len()
                    ))
                })?;
                let mut bytes = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
                bytes.extend_from_slice(&len.to_le_bytes());
                bytes.extend_from_slice(&body);
                Ok(bytes)
            }
        }
    }

    /// Decode exactly one entry
    pub fn parse(format: RecordFormat, bytes: &[u8]) -> CaptureResult<Self> {
        let mut records = decode_all(format, bytes)?;
        if records.len() != 1 {
            return Err(CaptureError::Serialization(format!(
                "expected exactly one entry, found {}",
                records.len()
            )));
        }
        Ok(records.remove(0))
    }
}

impl TryFrom<RecordData> for CapturedRecord {
    type Error = CaptureError;

    fn try_from(data: RecordData) -> Result<Self, Self::Error> {
        data.validate()?;
        Ok(Self { data })
    }
}

impl From<CapturedRecord> for RecordData {
    fn from(record: CapturedRecord) -> Self {
        record.data
    }
}

impl LogSummary for CapturedRecord {
    fn log_summary(&self) -> String {
        match &self.data {
            RecordData::Position { vector, label } => {
                format!("position {} {}", label, vector.log_summary())
            }
            RecordData::Pose {
                position,
                orientation,
                label,
            } => format!(
                "pose {} pos:{} ori:{}",
                label,
                position.log_summary(),
                orientation.log_summary()
            ),
        }
    }
}

/// Decode every entry of a destination file, in file order
pub fn decode_all(format: RecordFormat, bytes: &[u8]) -> CaptureResult<Vec<CapturedRecord>> {
    match format {
        RecordFormat::JsonLines => {
            let mut records = Vec::new();
            for (index, line) in bytes.split(|b| *b == b'\n').enumerate() {
                if line.iter().all(|b| b.is_ascii_whitespace()) {
                    continue;
                }
                let record: CapturedRecord = serde_json::from_slice(line).map_err(|e| {
                    CaptureError::Serialization(format!("line {}: {}", index + 1, e))
                })?;
                records.push(record);
            }
            Ok(records)
        }
        RecordFormat::Binary => {
            let mut records = Vec::new();
            let mut offset = 0;
            while offset < bytes.len() {
                let header = bytes
                    .get(offset..offset + FRAME_HEADER_LEN)
                    .ok_or_else(|| truncated(offset))?;
                let mut len = [0u8; FRAME_HEADER_LEN];
                len.copy_from_slice(header);
                let len = u32::from_le_bytes(len) as usize;

                let start = offset + FRAME_HEADER_LEN;
                let body = bytes.get(start..start + len).ok_or_else(|| truncated(offset))?;
                let record: CapturedRecord = bincode::deserialize(body).map_err(|e| {
                    CaptureError::Serialization(format!("entry at byte {}: {}", offset, e))
                })?;
                records.push(record);
                offset = start + len;
            }
            Ok(records)
        }
    }
}

fn truncated(offset: usize) -> CaptureError {
    CaptureError::Serialization(format!("truncated entry at byte {}", offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn example() -> CapturedRecord {
        CapturedRecord::position([0.0, 1.0, 2.0], "ExampleObjectName").unwrap()
    }

    #[test]
    fn test_position_record() {
        let record = example();
        assert_eq!(record.tag(), "position");
        assert_eq!(record.label(), "ExampleObjectName");
        match record.data() {
            RecordData::Position { vector, .. } => assert_eq!(*vector, Vector3::new(0.0, 1.0, 2.0)),
            other => panic!("unexpected shape {:?}", other),
        }
    }

    #[test]
    fn test_empty_label_rejected() {
        let err = CapturedRecord::position(Vector3::zero(), "").unwrap_err();
        assert!(matches!(err, CaptureError::InvalidField(_)));

        let err = CapturedRecord::pose(Vector3::zero(), Quaternion::identity(), "   ").unwrap_err();
        assert!(matches!(err, CaptureError::InvalidField(_)));
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = CapturedRecord::position([f32::NAN, 0.0, 0.0], "cube").unwrap_err();
        assert!(matches!(err, CaptureError::InvalidField(_)));

        let bad = Quaternion::new(0.0, 0.0, 0.0, f32::INFINITY);
        let err = CapturedRecord::pose(Vector3::zero(), bad, "cube").unwrap_err();
        assert!(matches!(err, CaptureError::InvalidField(_)));
    }

    #[test]
    fn test_create_from_tag_and_fields() {
        let record = CapturedRecord::create(
            "position",
            json!({"vector": {"x": 0.0, "y": 1.0, "z": 2.0}, "label": "ExampleObjectName"}),
        )
        .unwrap();
        assert_eq!(record, example());

        let pose = CapturedRecord::create(
            "pose",
            json!({
                "position": {"x": 1.0, "y": 0.0, "z": 0.0},
                "orientation": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0},
                "label": "arm"
            }),
        )
        .unwrap();
        assert_eq!(pose.tag(), "pose");
    }

    #[test]
    fn test_create_rejects_bad_input() {
        // unknown tag
        assert!(matches!(
            CapturedRecord::create("velocity", json!({})),
            Err(CaptureError::InvalidField(_))
        ));
        // missing label
        assert!(matches!(
            CapturedRecord::create("position", json!({"vector": {"x": 0.0, "y": 0.0, "z": 0.0}})),
            Err(CaptureError::InvalidField(_))
        ));
        // wrong type
        assert!(matches!(
            CapturedRecord::create("position", json!({"vector": "up", "label": "cube"})),
            Err(CaptureError::InvalidField(_))
        ));
        // not an object
        assert!(matches!(
            CapturedRecord::create("position", json!([1, 2, 3])),
            Err(CaptureError::InvalidField(_))
        ));
        // empty label goes through the same validation
        assert!(matches!(
            CapturedRecord::create(
                "position",
                json!({"vector": {"x": 0.0, "y": 0.0, "z": 0.0}, "label": ""})
            ),
            Err(CaptureError::InvalidField(_))
        ));
    }

    #[test]
    fn test_json_entry_is_deterministic() {
        let bytes = example().serialize(RecordFormat::JsonLines).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "{\"position\":{\"vector\":{\"x\":0.0,\"y\":1.0,\"z\":2.0},\"label\":\"ExampleObjectName\"}}\n"
        );
        assert_eq!(
            example().serialize(RecordFormat::JsonLines).unwrap(),
            text.into_bytes()
        );
    }

    #[test]
    fn test_round_trip_both_formats() {
        let pose = CapturedRecord::pose([1.5, -2.0, 0.25], Quaternion::new(0.0, 0.7, 0.0, 0.7), "arm")
            .unwrap();
        for format in [RecordFormat::JsonLines, RecordFormat::Binary] {
            for record in [example(), pose.clone()] {
                let bytes = record.serialize(format).unwrap();
                assert_eq!(CapturedRecord::parse(format, &bytes).unwrap(), record);
            }
        }
    }

    #[test]
    fn test_decode_all_preserves_order() {
        let records: Vec<_> = (0..5)
            .map(|i| CapturedRecord::position([i as f32, 0.0, 0.0], format!("obj{}", i)).unwrap())
            .collect();

        for format in [RecordFormat::JsonLines, RecordFormat::Binary] {
            let mut bytes = Vec::new();
            for record in &records {
                bytes.extend(record.serialize(format).unwrap());
            }
            assert_eq!(decode_all(format, &bytes).unwrap(), records);
        }
    }

    #[test]
    fn test_decode_skips_blank_lines() {
        let mut bytes = b"\n  \n".to_vec();
        bytes.extend(example().serialize(RecordFormat::JsonLines).unwrap());
        bytes.extend(b"\n");
        assert_eq!(decode_all(RecordFormat::JsonLines, &bytes).unwrap(), vec![example()]);
    }

    #[test]
    fn test_decode_rejects_invalid_entries() {
        let err = decode_all(RecordFormat::JsonLines, b"{not json}\n").unwrap_err();
        assert!(matches!(err, CaptureError::Serialization(_)));

        // well formed JSON but fails record validation
        let err = decode_all(
            RecordFormat::JsonLines,
            b"{\"position\":{\"vector\":{\"x\":0.0,\"y\":0.0,\"z\":0.0},\"label\":\"\"}}\n",
        )
        .unwrap_err();
        assert!(matches!(err, CaptureError::Serialization(_)));
    }

    #[test]
    fn test_decode_rejects_truncated_frame() {
        let bytes = example().serialize(RecordFormat::Binary).unwrap();
        let err = decode_all(RecordFormat::Binary, &bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, CaptureError::Serialization(_)));

        let err = decode_all(RecordFormat::Binary, &bytes[..2]).unwrap_err();
        assert!(matches!(err, CaptureError::Serialization(_)));
    }

    #[test]
    fn test_parse_requires_single_entry() {
        let mut bytes = example().serialize(RecordFormat::JsonLines).unwrap();
        bytes.extend(example().serialize(RecordFormat::JsonLines).unwrap());
        assert!(CapturedRecord::parse(RecordFormat::JsonLines, &bytes).is_err());
        assert!(CapturedRecord::parse(RecordFormat::JsonLines, b"").is_err());
    }

    #[test]
    fn test_format_names() {
        assert_eq!("jsonl".parse::<RecordFormat>().unwrap(), RecordFormat::JsonLines);
        assert_eq!("BIN".parse::<RecordFormat>().unwrap(), RecordFormat::Binary);
        assert!("csv".parse::<RecordFormat>().is_err());
        assert_eq!(RecordFormat::from_extension("bin"), Some(RecordFormat::Binary));
        assert_eq!(RecordFormat::from_extension("txt"), None);
        assert_eq!(RecordFormat::default().to_string(), "jsonl");
    }

    #[test]
    fn test_summary() {
        assert_eq!(example().log_summary(), "position ExampleObjectName (0.00,1.00,2.00)");
    }
}
