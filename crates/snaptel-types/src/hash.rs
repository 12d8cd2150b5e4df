//! Schema identity hashing.
//!
//! Readers on other hosts compare schema hashes to decide whether stored data
//! matches an expected shape, so every constant here is fixed. Field names are
//! hashed with a seeded 64-bit multiplicative byte hash; the remaining
//! attributes hash to their integer value. Each attribute is folded into the
//! running value with `h ^= attr + 0x9e3779b9 + (h << 6) + (h >> 2)`.

use crate::schema::Field;

/// Seed for field-name hashing.
pub const NAME_HASH_SEED: u64 = 0xc70f_6907;

/// Golden-ratio constant added on every combination step.
pub const COMBINE_CONSTANT: u64 = 0x9e37_79b9;

const MUL: u64 = 0xc6a4_a793_5bd1_e995;

#[inline]
fn shift_mix(v: u64) -> u64 {
    v ^ (v >> 47)
}

/// 64-bit hash of a field name.
pub fn hash_name(name: &str) -> u64 {
    hash_bytes(name.as_bytes(), NAME_HASH_SEED)
}

fn hash_bytes(bytes: &[u8], seed: u64) -> u64 {
    let len = bytes.len() as u64;
    let mut hash = seed ^ len.wrapping_mul(MUL);

    let mut chunks = bytes.chunks_exact(8);
    for chunk in &mut chunks {
        let mut block = [0u8; 8];
        block.copy_from_slice(chunk);
        let data = shift_mix(u64::from_le_bytes(block).wrapping_mul(MUL)).wrapping_mul(MUL);
        hash ^= data;
        hash = hash.wrapping_mul(MUL);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let data = tail
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8).wrapping_add(u64::from(b)));
        hash ^= data;
        hash = hash.wrapping_mul(MUL);
    }

    hash = shift_mix(hash).wrapping_mul(MUL);
    shift_mix(hash)
}

#[inline]
fn combine(hash: u64, attr: u64) -> u64 {
    hash ^ attr
        .wrapping_add(COMBINE_CONSTANT)
        .wrapping_add(hash << 6)
        .wrapping_add(hash >> 2)
}

/// Fold one field into a running schema hash.
///
/// Applying this to every field in order, starting from 0, yields the schema hash.
/// Only the low 16 bits of `array_size` take part.
pub fn add_field_to_hash(field: &Field, hash: u64) -> u64 {
    let hash = combine(hash, hash_name(&field.name));
    let hash = combine(hash, field.ty.index());
    let hash = combine(hash, u64::from(field.is_vector));
    combine(hash, u64::from(field.array_size as u16))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BasicType;

    #[test]
    fn test_name_hash_golden_values() {
        assert_eq!(hash_name(""), 6142509188972423790);
        assert_eq!(hash_name("a"), 4993892634952068459);
        assert_eq!(hash_name("speed"), 4878149271039768326);
        assert_eq!(hash_name("position_x"), 10972202404110886337);
        assert_eq!(hash_name("a_longer_field_name_123"), 16679871993901362874);
    }

    #[test]
    fn test_running_hash_golden_values() {
        let fields = [
            Field::scalar("speed", BasicType::Float64),
            Field::scalar("counter", BasicType::UInt32),
            Field::array("pose", BasicType::Float32, 3),
            Field::vector("names", BasicType::Char),
        ];
        let expected = [
            12758264551506768901u64,
            10057800929381110492,
            16402983900365040018,
            2595028862537806951,
        ];

        let mut hash = 0;
        for (field, want) in fields.iter().zip(expected) {
            hash = add_field_to_hash(field, hash);
            assert_eq!(hash, want, "after field {}", field.name);
        }
    }

    #[test]
    fn test_order_sensitive() {
        let a = Field::scalar("a", BasicType::Int32);
        let b = Field::scalar("b", BasicType::Int32);
        let ab = add_field_to_hash(&b, add_field_to_hash(&a, 0));
        let ba = add_field_to_hash(&a, add_field_to_hash(&b, 0));
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_array_size_uses_low_16_bits() {
        let small = Field::array("v", BasicType::UInt8, 5);
        let wrapped = Field::array("v", BasicType::UInt8, 5 + 65_536);
        assert_eq!(add_field_to_hash(&small, 0), add_field_to_hash(&wrapped, 0));
    }
}
