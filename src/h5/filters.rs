//! Filter pipeline messages and chunk decoding.

use super::cursor::Bytes;
use super::format::pad8;
use crate::core::decompress;
use crate::util::{Error, Result};

pub(crate) const FILTER_DEFLATE: u16 = 1;
pub(crate) const FILTER_SHUFFLE: u16 = 2;
pub(crate) const FILTER_FLETCHER32: u16 = 3;

/// Filter flag: the filter may be skipped for a chunk.
const FLAG_OPTIONAL: u16 = 0x0001;

/// One stage of a dataset's filter pipeline.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Filter {
    pub id: u16,
    pub params: Vec<u32>,
}

/// Decode a filter pipeline message (versions 1 and 2).
pub(crate) fn decode_pipeline(data: &[u8]) -> Result<Vec<Filter>> {
    let mut cur = Bytes::new(data);
    let version = cur.u8()?;
    let count = cur.u8()? as usize;
    match version {
        1 => cur.skip(6)?,
        2 => {}
        v => return Err(Error::UnsupportedVersion(v as u16)),
    }

    let mut filters = Vec::with_capacity(count);
    for _ in 0..count {
        let id = cur.u16()?;
        let name_len = if version == 1 || id >= 256 { cur.u16()? as usize } else { 0 };
        cur.skip(2)?; // flags
        let nparams = cur.u16()? as usize;
        cur.skip(if version == 1 { pad8(name_len) } else { name_len })?;
        let params = (0..nparams).map(|_| cur.u32()).collect::<Result<Vec<_>>>()?;
        if version == 1 && nparams % 2 == 1 {
            cur.skip(4.min(cur.remaining()))?;
        }
        filters.push(Filter { id, params });
    }
    Ok(filters)
}

/// Version 1 pipeline message with a single deflate filter.
pub(crate) fn deflate_pipeline(level: u32) -> Vec<u8> {
    let mut out = vec![1u8, 1, 0, 0, 0, 0, 0, 0];
    out.extend_from_slice(&FILTER_DEFLATE.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // unnamed
    out.extend_from_slice(&FLAG_OPTIONAL.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&level.min(9).to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out
}

/// Deflate level of a pipeline, if it has a deflate stage.
pub(crate) fn deflate_level(filters: &[Filter]) -> Option<u32> {
    filters
        .iter()
        .find(|f| f.id == FILTER_DEFLATE)
        .map(|f| f.params.first().copied().unwrap_or(6))
}

/// Undo the pipeline on one stored chunk.
///
/// Bit `i` of `mask` set means filter `i` was skipped for this chunk.
pub(crate) fn unfilter(filters: &[Filter], stored: &[u8], mask: u32, expected: usize) -> Result<Vec<u8>> {
    let mut buf = stored.to_vec();
    for (i, filter) in filters.iter().enumerate().rev() {
        if i < 32 && mask & (1 << i) != 0 {
            continue;
        }
        buf = match filter.id {
            FILTER_DEFLATE => decompress(&buf, expected)?,
            FILTER_SHUFFLE => unshuffle(&buf, filter.params.first().map_or(1, |&s| s as usize)),
            FILTER_FLETCHER32 => {
                let len = buf
                    .len()
                    .checked_sub(4)
                    .ok_or_else(|| Error::invalid("chunk shorter than its checksum"))?;
                buf.truncate(len);
                buf
            }
            id => return Err(Error::unsupported(format!("filter {id}"))),
        };
    }
    if buf.len() != expected {
        return Err(Error::invalid(format!(
            "chunk decoded to {} bytes, expected {expected}",
            buf.len()
        )));
    }
    Ok(buf)
}

/// Reverse the byte shuffle. Trailing bytes beyond whole elements stay put.
fn unshuffle(data: &[u8], elem: usize) -> Vec<u8> {
    let mut out = data.to_vec();
    if elem <= 1 || data.len() < elem {
        return out;
    }
    let n = data.len() / elem;
    for b in 0..elem {
        for i in 0..n {
            out[i * elem + b] = data[b * n + i];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compress;

    #[test]
    fn test_deflate_pipeline_decodes() -> Result<()> {
        let msg = deflate_pipeline(6);
        assert_eq!(msg.len() % 8, 0);
        let filters = decode_pipeline(&msg)?;
        assert_eq!(filters, vec![Filter { id: FILTER_DEFLATE, params: vec![6] }]);
        assert_eq!(deflate_level(&filters), Some(6));
        Ok(())
    }

    #[test]
    fn test_version2_pipeline() -> Result<()> {
        // shuffle(4) then deflate(4)
        let mut msg = vec![2u8, 2];
        for (id, param) in [(FILTER_SHUFFLE, 4u32), (FILTER_DEFLATE, 4)] {
            msg.extend_from_slice(&id.to_le_bytes());
            msg.extend_from_slice(&0u16.to_le_bytes());
            msg.extend_from_slice(&1u16.to_le_bytes());
            msg.extend_from_slice(&param.to_le_bytes());
        }
        let filters = decode_pipeline(&msg)?;
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].id, FILTER_SHUFFLE);
        assert_eq!(deflate_level(&filters), Some(4));
        Ok(())
    }

    #[test]
    fn test_unfilter_chain() -> Result<()> {
        let values: Vec<u8> = [1.0f32, -2.5, 3.25].iter().flat_map(|v| v.to_le_bytes()).collect();
        // shuffle by hand: all first bytes, then all second bytes, ...
        let mut shuffled = vec![0u8; values.len()];
        for i in 0..3 {
            for b in 0..4 {
                shuffled[b * 3 + i] = values[i * 4 + b];
            }
        }
        let mut stored = compress(&shuffled, 6)?;
        stored.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);

        let filters = vec![
            Filter { id: FILTER_SHUFFLE, params: vec![4] },
            Filter { id: FILTER_DEFLATE, params: vec![6] },
            Filter { id: FILTER_FLETCHER32, params: vec![] },
        ];
        assert_eq!(unfilter(&filters, &stored, 0, values.len())?, values);
        Ok(())
    }

    #[test]
    fn test_masked_filter_skipped() -> Result<()> {
        let filters = vec![Filter { id: FILTER_DEFLATE, params: vec![6] }];
        assert_eq!(unfilter(&filters, b"raw!", 1, 4)?, b"raw!".to_vec());
        Ok(())
    }

    #[test]
    fn test_unknown_filter() {
        let filters = vec![Filter { id: 32001, params: vec![] }];
        assert!(matches!(unfilter(&filters, b"data", 0, 4), Err(Error::Unsupported(_))));
    }
}
