// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Binary container for [`BrainSnapshot`].

```text
[Header]  (27 bytes, little-endian)
- Magic: "HGSNAP" (6 bytes)
- Version: u32 (4 bytes)
- Flags: u8 (1 byte) - bit 0: LZ4 compressed
- Uncompressed Size: u64 (8 bytes, payload size before compression)
- Checksum: u64 (8 bytes, FNV-1a of the stored payload)
[Data]
- Bincode-serialized BrainSnapshot (optionally LZ4 compressed)
```
*/

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{Result, SnapshotError};
use crate::snapshot::BrainSnapshot;

/// Magic number for snapshot blobs
pub const MAGIC: &[u8; 6] = b"HGSNAP";

/// Current format version (increment when the payload layout changes)
pub const FORMAT_VERSION: u32 = 1;

/// Header flag: payload is LZ4 block-compressed
pub const FLAG_LZ4: u8 = 0b0000_0001;

pub const HEADER_LEN: usize = 6 + 4 + 1 + 8 + 8;

/// Parsed fixed-size header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub version: u32,
    pub flags: u8,
    pub uncompressed_size: u64,
    pub checksum: u64,
}

impl SnapshotHeader {
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_LZ4 != 0
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.push(self.flags);
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        out.extend_from_slice(&self.checksum.to_le_bytes());
    }

    /// Parse and check magic and version
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
            let shown = bytes.len().min(MAGIC.len());
            return Err(SnapshotError::BadMagic(bytes[..shown].to_vec()));
        }
        if bytes.len() < HEADER_LEN {
            return Err(SnapshotError::Truncated(bytes.len()));
        }
        let u32_at = |at: usize| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&bytes[at..at + 4]);
            u32::from_le_bytes(buf)
        };
        let u64_at = |at: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[at..at + 8]);
            u64::from_le_bytes(buf)
        };

        let version = u32_at(6);
        if version != FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: version,
                supported: FORMAT_VERSION,
            });
        }
        Ok(Self {
            version,
            flags: bytes[10],
            uncompressed_size: u64_at(11),
            checksum: u64_at(19),
        })
    }
}

/// FNV-1a over the stored payload
pub fn calculate_checksum(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    let mut hash = FNV_OFFSET;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Serialize a snapshot into a self-describing blob
///
/// `compress` is honored only when the `compression` feature is enabled.
pub fn encode(snapshot: &BrainSnapshot, compress: bool) -> Result<Vec<u8>> {
    let data = bincode::serialize(snapshot).map_err(|e| SnapshotError::Encode(e.to_string()))?;
    let uncompressed_size = data.len() as u64;

    #[cfg(feature = "compression")]
    let (payload, flags) = if compress {
        let compressed = lz4::block::compress(&data, None, false)
            .map_err(|e| SnapshotError::Compression(e.to_string()))?;
        (compressed, FLAG_LZ4)
    } else {
        (data, 0u8)
    };

    #[cfg(not(feature = "compression"))]
    let (payload, flags) = {
        if compress {
            tracing::warn!("Snapshot compression requested but the `compression` feature is disabled");
        }
        (data, 0u8)
    };

    let header = SnapshotHeader {
        version: FORMAT_VERSION,
        flags,
        uncompressed_size,
        checksum: calculate_checksum(&payload),
    };
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    header.write_to(&mut out);
    out.extend_from_slice(&payload);
    debug!(
        "Encoded snapshot: {} neurons, {} synapses, {} bytes (flags {:#04x})",
        snapshot.neurons.len(),
        snapshot.synapses.len(),
        out.len(),
        flags
    );
    Ok(out)
}

/// Parse, verify and deserialize a blob
pub fn decode(bytes: &[u8]) -> Result<BrainSnapshot> {
    let header = SnapshotHeader::parse(bytes)?;
    let payload = &bytes[HEADER_LEN..];

    let actual = calculate_checksum(payload);
    if actual != header.checksum {
        return Err(SnapshotError::ChecksumMismatch {
            expected: header.checksum,
            actual,
        });
    }

    let data = if header.is_compressed() {
        decompress(payload, header.uncompressed_size)?
    } else {
        payload.to_vec()
    };
    if data.len() as u64 != header.uncompressed_size {
        return Err(SnapshotError::SizeMismatch {
            expected: header.uncompressed_size,
            actual: data.len() as u64,
        });
    }

    bincode::deserialize(&data).map_err(|e| SnapshotError::Decode(e.to_string()))
}

#[cfg(feature = "compression")]
fn decompress(payload: &[u8], size: u64) -> Result<Vec<u8>> {
    let size = i32::try_from(size)
        .map_err(|_| SnapshotError::Compression(format!("payload of {} bytes too large", size)))?;
    lz4::block::decompress(payload, Some(size))
        .map_err(|e| SnapshotError::Compression(format!("Decompression failed: {}", e)))
}

#[cfg(not(feature = "compression"))]
fn decompress(_payload: &[u8], _size: u64) -> Result<Vec<u8>> {
    Err(SnapshotError::Compression(
        "Snapshot is compressed but the compression feature is not enabled".to_string(),
    ))
}

/// Write an encoded snapshot to a file
pub fn save_snapshot<P: AsRef<Path>>(snapshot: &BrainSnapshot, path: P, compress: bool) -> Result<()> {
    let bytes = encode(snapshot, compress)?;
    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    Ok(())
}

/// Read and decode a snapshot file
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<BrainSnapshot> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypergraph_npu_neural::{NeuronParams, PlasticityRule, SynapseParams};
    use hypergraph_npu_runtime::{RegionSpec, RegionType, Topology};
    use tempfile::NamedTempFile;

    fn snapshot() -> BrainSnapshot {
        let mut topology = Topology::new(NeuronParams::default(), SynapseParams::default());
        let region = topology
            .add_region(RegionSpec::new("r", RegionType::Special, 8))
            .unwrap();
        let ids = topology.region(region).unwrap().neurons().to_vec();
        for pair in ids.windows(2) {
            topology
                .create_synapse(pair[0], pair[1], 0.4, PlasticityRule::Oja, None)
                .unwrap();
        }
        BrainSnapshot::capture(&topology, 12, Vec::new())
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode(&snapshot(), false).unwrap();
        assert_eq!(&bytes[..6], b"HGSNAP");
        let header = SnapshotHeader::parse(&bytes).unwrap();
        assert_eq!(header.version, FORMAT_VERSION);
        assert!(!header.is_compressed());
        assert_eq!(header.uncompressed_size as usize, bytes.len() - HEADER_LEN);
    }

    #[test]
    fn test_encode_decode() {
        let original = snapshot();
        let decoded = decode(&encode(&original, false).unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_compressed_blob() {
        let original = snapshot();
        let bytes = encode(&original, true).unwrap();
        assert!(SnapshotHeader::parse(&bytes).unwrap().is_compressed());
        assert_eq!(decode(&bytes).unwrap(), original);
    }

    #[test]
    fn test_invalid_magic() {
        assert!(matches!(decode(b"WRONG!"), Err(SnapshotError::BadMagic(_))));
        assert!(matches!(decode(b"HGSNAP"), Err(SnapshotError::Truncated(6))));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = encode(&snapshot(), false).unwrap();
        bytes[6..10].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(
            decode(&bytes),
            Err(SnapshotError::UnsupportedVersion { found: 7, .. })
        ));
    }

    #[test]
    fn test_corruption_detected() {
        let mut bytes = encode(&snapshot(), false).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(
            decode(&bytes),
            Err(SnapshotError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_checksum() {
        let data1 = b"hello world";
        let data2 = b"hello world";
        let data3 = b"hello worlD";

        assert_eq!(calculate_checksum(data1), calculate_checksum(data2));
        assert_ne!(calculate_checksum(data1), calculate_checksum(data3));
    }

    #[test]
    fn test_save_load_file() {
        let original = snapshot();
        let temp_file = NamedTempFile::new().unwrap();
        save_snapshot(&original, temp_file.path(), true).unwrap();
        let loaded = load_snapshot(temp_file.path()).unwrap();
        assert_eq!(loaded, original);
    }
}
