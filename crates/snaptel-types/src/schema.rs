//! Schema model: named, ordered, typed fields plus an identity hash.
//!
//! A schema is built once when a producer registers its data shape and is
//! immutable afterwards. Field order defines the serialization layout, and the
//! hash is accumulated field by field (see [`crate::hash`]).
//!
//! The canonical text dump looks like:
//!
//! ```text
//! __version__: 4
//! __hash__: 10057800929381110492
//! __channel_name__: robot
//! float64 speed
//! uint32 counter
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SchemaError};
use crate::hash::add_field_to_hash;
use crate::types::{BasicType, Primitive};
use crate::SCHEMA_VERSION;

/// One named field of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: BasicType,
    /// Field is a sequence rather than a scalar.
    #[serde(default)]
    pub is_vector: bool,
    /// Fixed length of a vector field; 0 means variable length. Ignored for scalars.
    #[serde(default)]
    pub array_size: u32,
}

impl Field {
    /// Scalar field.
    pub fn scalar(name: impl Into<String>, ty: BasicType) -> Self {
        Field {
            name: name.into(),
            ty,
            is_vector: false,
            array_size: 0,
        }
    }

    /// Variable-length sequence.
    pub fn vector(name: impl Into<String>, ty: BasicType) -> Self {
        Field {
            name: name.into(),
            ty,
            is_vector: true,
            array_size: 0,
        }
    }

    /// Fixed-length sequence of `size` elements.
    pub fn array(name: impl Into<String>, ty: BasicType, size: u32) -> Self {
        Field {
            name: name.into(),
            ty,
            is_vector: true,
            array_size: size,
        }
    }

    /// Scalar field typed after a Rust primitive.
    pub fn of<T: Primitive>(name: impl Into<String>) -> Self {
        Field::scalar(name, T::BASIC_TYPE)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ty.name())?;
        if self.is_vector {
            if self.array_size != 0 {
                write!(f, "[{}]", self.array_size)?;
            } else {
                f.write_str("[]")?;
            }
        }
        write!(f, " {}", self.name)
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let line = line.trim();
        let (type_part, name) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| format!("missing field name in '{}'", line))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("missing field name in '{}'", line));
        }

        let Some((type_name, rest)) = type_part.split_once('[') else {
            return Ok(Field::scalar(name, BasicType::from_name(type_part)));
        };
        let size = rest
            .strip_suffix(']')
            .ok_or_else(|| format!("unterminated array suffix in '{}'", type_part))?;
        let ty = BasicType::from_name(type_name);
        if size.is_empty() {
            return Ok(Field::vector(name, ty));
        }
        let size = size
            .parse::<u32>()
            .map_err(|e| format!("invalid array size '{}': {}", size, e))?;
        Ok(Field::array(name, ty, size))
    }
}

/// Shape of the snapshots produced on one channel.
///
/// Deserializing recomputes the hash from the fields; a `hash` present in the
/// input is kept as the identity and a mismatch is logged, as for [`Schema::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SchemaRecord")]
pub struct Schema {
    channel_name: String,
    fields: Vec<Field>,
    hash: u64,
}

/// Serialized form of [`Schema`] before the hash is checked.
#[derive(Deserialize)]
struct SchemaRecord {
    channel_name: String,
    #[serde(default)]
    fields: Vec<Field>,
    #[serde(default)]
    hash: Option<u64>,
}

impl From<SchemaRecord> for Schema {
    fn from(record: SchemaRecord) -> Self {
        Schema::from_fields(record.channel_name, record.fields).with_declared_hash(record.hash)
    }
}

impl Schema {
    /// Empty schema for a channel. Its hash is 0.
    pub fn new(channel_name: impl Into<String>) -> Self {
        Schema {
            channel_name: channel_name.into(),
            fields: Vec::new(),
            hash: 0,
        }
    }

    /// Schema with the given fields, hashed in order.
    pub fn from_fields(channel_name: impl Into<String>, fields: Vec<Field>) -> Self {
        let hash = compute_hash(&fields);
        Schema {
            channel_name: channel_name.into(),
            fields,
            hash,
        }
    }

    /// Append a field, folding it into the running hash.
    pub fn push_field(&mut self, field: Field) {
        self.hash = add_field_to_hash(&field, self.hash);
        self.fields.push(field);
    }

    /// Builder form of [`Schema::push_field`].
    pub fn with_field(mut self, field: Field) -> Self {
        self.push_field(field);
        self
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Identity hash.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Hash recomputed from the current fields.
    pub fn recompute_hash(&self) -> u64 {
        compute_hash(&self.fields)
    }

    /// Parse a schema text dump.
    ///
    /// Header lines are optional. Unknown type names become [`BasicType::Other`].
    /// A `__hash__` header is kept as the schema identity even when it disagrees
    /// with the parsed fields (foreign types degrade and no longer hash the same).
    pub fn parse(text: &str) -> Result<Schema> {
        let mut channel_name = String::new();
        let mut declared_hash = None;
        let mut fields = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((key, value)) = split_header(line) {
                match key {
                    "version" => {
                        let version = value.parse::<u32>().map_err(|e| {
                            SchemaError::parse(line_no, format!("invalid version '{}': {}", value, e))
                        })?;
                        if version != SCHEMA_VERSION {
                            tracing::debug!(version, expected = SCHEMA_VERSION, "schema dump version differs");
                        }
                    }
                    "hash" => {
                        let hash = value.parse::<u64>().map_err(|e| {
                            SchemaError::parse(line_no, format!("invalid hash '{}': {}", value, e))
                        })?;
                        declared_hash = Some(hash);
                    }
                    "channel_name" => channel_name = value.to_string(),
                    other => tracing::debug!(header = other, "ignoring unknown schema header"),
                }
                continue;
            }

            let field = line
                .parse::<Field>()
                .map_err(|reason| SchemaError::parse(line_no, reason))?;
            fields.push(field);
        }

        Ok(Schema::from_fields(channel_name, fields).with_declared_hash(declared_hash))
    }

    /// Adopt a hash declared by the producer, warning when it disagrees with the fields.
    fn with_declared_hash(mut self, declared: Option<u64>) -> Self {
        if let Some(declared) = declared {
            if declared != self.hash {
                tracing::warn!(
                    channel = %self.channel_name,
                    declared,
                    computed = self.hash,
                    "schema hash does not match its fields"
                );
            }
            self.hash = declared;
        }
        self
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "__version__: {}", SCHEMA_VERSION)?;
        writeln!(f, "__hash__: {}", self.hash)?;
        writeln!(f, "__channel_name__: {}", self.channel_name)?;
        for field in &self.fields {
            writeln!(f, "{}", field)?;
        }
        Ok(())
    }
}

impl FromStr for Schema {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        Schema::parse(s)
    }
}

fn compute_hash(fields: &[Field]) -> u64 {
    fields.iter().fold(0, |hash, field| add_field_to_hash(field, hash))
}

/// `__key__: value` -> `(key, value)`.
fn split_header(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim().strip_prefix("__")?.strip_suffix("__")?;
    Some((key, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn robot_schema() -> Schema {
        Schema::new("robot")
            .with_field(Field::scalar("speed", BasicType::Float64))
            .with_field(Field::scalar("counter", BasicType::UInt32))
            .with_field(Field::array("pose", BasicType::Float32, 3))
            .with_field(Field::vector("names", BasicType::Char))
    }

    #[test]
    fn test_field_rendering() {
        assert_eq!(Field::vector("v", BasicType::Int32).to_string(), "int32[] v");
        assert_eq!(
            Field::array("v", BasicType::Int32, 5).to_string(),
            "int32[5] v"
        );
        let scalar = Field {
            name: "v".to_string(),
            ty: BasicType::Int32,
            is_vector: false,
            array_size: 5,
        };
        assert_eq!(scalar.to_string(), "int32 v");
    }

    #[test]
    fn test_field_equality_is_structural() {
        let base = Field::array("pose", BasicType::Float32, 3);
        assert_eq!(base, Field::array("pose", BasicType::Float32, 3));
        assert_ne!(base, Field::array("pose", BasicType::Float32, 4));
        assert_ne!(base, Field::array("pose", BasicType::Float64, 3));
        assert_ne!(base, Field::array("posx", BasicType::Float32, 3));
        assert_ne!(base, Field::scalar("pose", BasicType::Float32));
    }

    #[test]
    fn test_incremental_hash_matches_bulk() {
        let schema = robot_schema();
        assert_eq!(schema.hash(), 2595028862537806951);
        assert_eq!(schema.hash(), schema.recompute_hash());
        let bulk = Schema::from_fields("other_channel", schema.fields().to_vec());
        assert_eq!(bulk.hash(), schema.hash());
    }

    #[test]
    fn test_empty_schema_hash_is_zero() {
        assert_eq!(Schema::new("empty").hash(), 0);
        assert!(Schema::new("empty").is_empty());
    }

    #[test]
    fn test_schema_dump() {
        let dump = robot_schema().to_string();
        let expected = "__version__: 4\n\
                        __hash__: 2595028862537806951\n\
                        __channel_name__: robot\n\
                        float64 speed\n\
                        uint32 counter\n\
                        float32[3] pose\n\
                        char[] names\n";
        assert_eq!(dump, expected);
    }

    #[test]
    fn test_parse_round_trip() {
        let schema = robot_schema();
        let parsed = Schema::parse(&schema.to_string()).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn test_parse_without_headers() {
        let parsed: Schema = "float64 speed\n\nuint32 counter\n".parse().unwrap();
        assert_eq!(parsed.channel_name(), "");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.hash(), 10057800929381110492);
    }

    #[test]
    fn test_parse_unknown_type_degrades() {
        let parsed = Schema::parse("complex128 z\nquaternion[4] q\n").unwrap();
        assert_eq!(parsed.fields()[0], Field::scalar("z", BasicType::Other));
        assert_eq!(parsed.fields()[1], Field::array("q", BasicType::Other, 4));
    }

    #[test]
    fn test_parse_keeps_declared_hash() {
        let text = "__version__: 4\n__hash__: 42\n__channel_name__: cam\nmatrix3 m\n";
        let parsed = Schema::parse(text).unwrap();
        assert_eq!(parsed.hash(), 42);
        assert_ne!(parsed.recompute_hash(), 42);
        assert_eq!(parsed.channel_name(), "cam");
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        let err = Schema::parse("__channel_name__: x\nint32\n").unwrap_err();
        assert!(matches!(err, SchemaError::Parse { line: 2, .. }));

        let err = Schema::parse("int32[3 v\n").unwrap_err();
        assert!(matches!(err, SchemaError::Parse { line: 1, .. }));

        let err = Schema::parse("int32[x] v\n").unwrap_err();
        assert!(matches!(err, SchemaError::Parse { line: 1, .. }));

        let err = Schema::parse("__hash__: nope\n").unwrap_err();
        assert!(matches!(err, SchemaError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_field_lookup() {
        let schema = robot_schema();
        assert_eq!(schema.field("pose").map(|f| f.array_size), Some(3));
        assert!(schema.field("missing").is_none());
    }

    #[test]
    fn test_field_of_primitive() {
        assert_eq!(Field::of::<f32>("x"), Field::scalar("x", BasicType::Float32));
    }

    #[test]
    fn test_schema_serde_round_trip() {
        let schema = robot_schema();
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains(r#""type":"float32""#));
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn test_deserialize_without_hash_computes_it() {
        let json = r#"{"channel_name": "robot", "fields": [
            {"name": "speed", "type": "float64"},
            {"name": "counter", "type": "uint32"},
            {"name": "pose", "type": "float32", "is_vector": true, "array_size": 3},
            {"name": "names", "type": "char", "is_vector": true}
        ]}"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.hash(), 2595028862537806951);
        assert_eq!(schema, robot_schema());
    }

    #[test]
    fn test_deserialize_keeps_declared_hash() {
        let json = r#"{"channel_name": "gps", "hash": 42,
            "fields": [{"name": "fix", "type": "quaternion"}]}"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.hash(), 42);
        assert_eq!(schema.fields()[0].ty, BasicType::Other);
        assert_ne!(schema.recompute_hash(), 42);
    }

    #[test]
    fn test_deserialize_matching_hash_is_unchanged() {
        let schema = robot_schema();
        let json = format!(
            r#"{{"channel_name": "robot", "hash": {}, "fields": {}}}"#,
            schema.hash(),
            serde_json::to_string(schema.fields()).unwrap()
        );
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(back.hash(), back.recompute_hash());
    }
}
