//! Snapshot value carried from producers to the sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snaptel_types::Schema;

/// One immutable captured sample of a channel.
///
/// The payload layout is described by the schema identified by `schema_hash`;
/// the sink never looks inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub channel_name: String,
    pub schema_hash: u64,
    pub timestamp: DateTime<Utc>,
    /// One bit per schema field; set when the field is present in `payload`.
    pub active_mask: Vec<u8>,
    pub payload: Vec<u8>,
}

impl Snapshot {
    /// Snapshot of `schema`'s channel taken now, with every field active.
    pub fn new(schema: &Schema, payload: Vec<u8>) -> Self {
        Snapshot {
            channel_name: schema.channel_name().to_string(),
            schema_hash: schema.hash(),
            timestamp: Utc::now(),
            active_mask: full_mask(schema.len()),
            payload,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_active_mask(mut self, mask: Vec<u8>) -> Self {
        self.active_mask = mask;
        self
    }

    /// Whether field `index` is present.
    pub fn is_active(&self, index: usize) -> bool {
        self.active_mask
            .get(index / 8)
            .is_some_and(|byte| byte & (1 << (index % 8)) != 0)
    }
}

fn full_mask(fields: usize) -> Vec<u8> {
    let mut mask = vec![0xff; fields.div_ceil(8)];
    if fields % 8 != 0 {
        if let Some(last) = mask.last_mut() {
            *last = (1u8 << (fields % 8)) - 1;
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use snaptel_types::{BasicType, Field, Primitive};

    #[test]
    fn test_snapshot_from_schema() {
        let schema = Schema::new("imu")
            .with_field(Field::of::<f64>("ax"))
            .with_field(Field::of::<f64>("ay"))
            .with_field(Field::scalar("status", BasicType::UInt8));
        let mut payload = Vec::new();
        1.0f64.to_var().encode_into(&mut payload);
        2.0f64.to_var().encode_into(&mut payload);
        7u8.to_var().encode_into(&mut payload);

        let snapshot = Snapshot::new(&schema, payload);
        assert_eq!(snapshot.channel_name, "imu");
        assert_eq!(snapshot.schema_hash, schema.hash());
        assert_eq!(snapshot.payload.len(), 17);
        assert_eq!(snapshot.active_mask, vec![0b0000_0111]);
        assert!(snapshot.is_active(2));
        assert!(!snapshot.is_active(3));
    }

    #[test]
    fn test_full_mask_boundaries() {
        assert!(full_mask(0).is_empty());
        assert_eq!(full_mask(8), vec![0xff]);
        assert_eq!(full_mask(9), vec![0xff, 0x01]);
    }

    #[test]
    fn test_custom_mask() {
        let schema = Schema::new("x").with_field(Field::of::<i32>("a"));
        let snapshot = Snapshot::new(&schema, vec![0; 4]).with_active_mask(vec![0]);
        assert!(!snapshot.is_active(0));
        assert!(!snapshot.is_active(100));
    }
}
