//! Per-block-range bloom filter of every address seen in a transfer.
//!
//! Wire format follows spec.md §6: `{m: int, k: int, b: base64-bit-array}`,
//! matching the shape of the `bits-and-blooms/bloom` Go library this filter
//! must be JSON-round-trippable with. `m` defaults to 100,000 bits; `k` is
//! picked for a 1% false-positive rate using the standard `k ≈ -log2(p)`
//! approximation (independent of `m`/`n`, which keeps the filter's parameters
//! fixed regardless of how many addresses a given window turns out to hold —
//! the same assumption spec.md §3 makes when it fixes `m = 100_000`).

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tiny_keccak::{Hasher, Keccak};

pub const DEFAULT_M: u64 = 100_000;
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BloomFilter {
    m: u64,
    k: u32,
    bits: Vec<u64>,
}

impl BloomFilter {
    pub fn new(m: u64, k: u32) -> Self {
        let words = (m as usize).div_ceil(64).max(1);
        Self { m: m.max(1), k: k.max(1), bits: vec![0u64; words] }
    }

    /// The filter size/hash-count combination used for every address filter
    /// in this indexer (spec.md §6).
    pub fn for_address_window() -> Self {
        let k = optimal_k(DEFAULT_FALSE_POSITIVE_RATE);
        Self::new(DEFAULT_M, k)
    }

    pub fn m(&self) -> u64 {
        self.m
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn add(&mut self, item: &str) {
        let (h1, h2) = double_hash(item);
        for i in 0..self.k as u64 {
            let bit = self.bit_index(h1, h2, i);
            self.set_bit(bit);
        }
    }

    pub fn contains(&self, item: &str) -> bool {
        let (h1, h2) = double_hash(item);
        (0..self.k as u64).all(|i| self.get_bit(self.bit_index(h1, h2, i)))
    }

    fn bit_index(&self, h1: u64, h2: u64, i: u64) -> u64 {
        h1.wrapping_add(i.wrapping_mul(h2)) % self.m
    }

    fn set_bit(&mut self, bit: u64) {
        let (word, offset) = (bit / 64, bit % 64);
        self.bits[word as usize] |= 1u64 << offset;
    }

    fn get_bit(&self, bit: u64) -> bool {
        let (word, offset) = (bit / 64, bit % 64);
        (self.bits[word as usize] >> offset) & 1 == 1
    }
}

/// Kirsch-Mitzenmacher double hashing: two 64-bit hashes derived from one
/// Keccak256 digest, combined as `h1 + i*h2` to simulate `k` independent hash
/// functions.
fn double_hash(item: &str) -> (u64, u64) {
    let mut hasher = Keccak::v256();
    hasher.update(item.as_bytes());
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    let h1 = u64::from_be_bytes(out[0..8].try_into().unwrap());
    let h2 = u64::from_be_bytes(out[8..16].try_into().unwrap());
    (h1, h2.max(1))
}

fn optimal_k(false_positive_rate: f64) -> u32 {
    (-false_positive_rate.log2()).round().max(1.0) as u32
}

#[derive(Serialize, Deserialize)]
struct BloomFilterWire {
    m: u64,
    k: u32,
    b: String,
}

impl Serialize for BloomFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut bytes = Vec::with_capacity(self.bits.len() * 8);
        for word in &self.bits {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        let wire = BloomFilterWire {
            m: self.m,
            k: self.k,
            b: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &bytes),
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BloomFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = BloomFilterWire::deserialize(deserializer)?;
        let bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &wire.b)
            .map_err(D::Error::custom)?;
        let words = (wire.m as usize).div_ceil(64).max(1);
        if bytes.len() != words * 8 {
            return Err(D::Error::custom(format!(
                "bloom filter bit array length {} does not match m={} ({} words expected)",
                bytes.len(),
                wire.m,
                words
            )));
        }
        let bits = bytes
            .chunks_exact(8)
            .map(|chunk| u64::from_be_bytes(chunk.try_into().unwrap()))
            .collect();
        Ok(BloomFilter { m: wire.m, k: wire.k, bits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_every_added_address() {
        let mut bf = BloomFilter::for_address_window();
        let addrs = ["0xfrom", "0xto", "0xcontract"];
        for a in addrs {
            bf.add(a);
        }
        for a in addrs {
            assert!(bf.contains(a));
        }
    }

    #[test]
    fn json_round_trip_is_bit_for_bit() {
        let mut bf = BloomFilter::for_address_window();
        bf.add("0xdeadbeef");
        bf.add("0xfeedface");
        let json = serde_json::to_string(&bf).unwrap();
        let decoded: BloomFilter = serde_json::from_str(&json).unwrap();
        assert_eq!(bf, decoded);
    }

    #[test]
    fn default_k_targets_one_percent_false_positive_rate() {
        let bf = BloomFilter::for_address_window();
        assert_eq!(bf.m(), DEFAULT_M);
        // -log2(0.01) ~= 6.644, rounds to 7.
        assert_eq!(bf.k(), 7);
    }
}
