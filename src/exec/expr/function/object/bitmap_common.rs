// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
//! Bitmap payload codec shared by bitmap aggregates.
//!
//! Layout: one type byte followed by a type-specific body.
//! - `EMPTY`: no body.
//! - `SINGLE32` / `SINGLE64`: one little-endian value.
//! - `SET`: u32 count, then `count` values as fixed u64 LE.
//! - `BITMAP32`: a portable roaring bitmap.
//! - `BITMAP64`: varint bucket count, then `(high u32 LE, roaring32)` per bucket.
//!
//! Decoding is strict: trailing bytes, truncated bodies and unknown type
//! codes are errors. Encoding is canonical so equal sets encode identically.

use std::collections::BTreeMap;
use std::io::Cursor;

use roaring::{RoaringBitmap, RoaringTreemap};

pub(crate) const BITMAP_TYPE_EMPTY: u8 = 0;
pub(crate) const BITMAP_TYPE_SINGLE32: u8 = 1;
pub(crate) const BITMAP_TYPE_BITMAP32: u8 = 2;
pub(crate) const BITMAP_TYPE_SINGLE64: u8 = 3;
pub(crate) const BITMAP_TYPE_BITMAP64: u8 = 4;
pub(crate) const BITMAP_TYPE_SET: u8 = 10;

/// Sets at or below this cardinality are written as `SET`.
const SET_MAX_VALUES: u64 = 32;

pub(crate) fn encode_varint_u64(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub(crate) fn decode_varint_u64(bytes: &[u8]) -> Result<(u64, usize), String> {
    let mut out = 0u64;
    let mut shift = 0u32;
    for (idx, &byte) in bytes.iter().enumerate() {
        // The tenth byte holds only bit 63.
        if shift == 63 && byte & 0x7e != 0 {
            return Err("bitmap decode varint overflow".to_string());
        }
        out |= u64::from(byte & 0x7f) << shift;
        if (byte & 0x80) == 0 {
            return Ok((out, idx + 1));
        }
        shift += 7;
        if shift > 63 {
            return Err("bitmap decode varint overflow".to_string());
        }
    }
    Err("bitmap decode varint reached end of payload".to_string())
}

fn read_u32_le(bytes: &[u8], offset: usize, what: &str) -> Result<u32, String> {
    let end = offset.saturating_add(4);
    let slice = bytes
        .get(offset..end)
        .ok_or_else(|| format!("bitmap {what} truncated: offset={offset} len={}", bytes.len()))?;
    let mut buf = [0u8; 4];
    buf.copy_from_slice(slice);
    Ok(u32::from_le_bytes(buf))
}

fn read_u64_le(bytes: &[u8], offset: usize, what: &str) -> Result<u64, String> {
    let end = offset.saturating_add(8);
    let slice = bytes
        .get(offset..end)
        .ok_or_else(|| format!("bitmap {what} truncated: offset={offset} len={}", bytes.len()))?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(slice);
    Ok(u64::from_le_bytes(buf))
}

fn expect_len(bytes: &[u8], expected: usize, kind: &str) -> Result<(), String> {
    if bytes.len() != expected {
        return Err(format!(
            "bitmap {kind} payload length mismatch: expected={expected} actual={}",
            bytes.len()
        ));
    }
    Ok(())
}

fn decode_roaring32_payload(bytes: &[u8]) -> Result<(RoaringBitmap, usize), String> {
    if bytes.is_empty() {
        return Err("bitmap roaring32 payload is empty".to_string());
    }
    let mut cursor = Cursor::new(bytes);
    let bitmap = RoaringBitmap::deserialize_from(&mut cursor)
        .map_err(|e| format!("bitmap decode roaring32 payload failed: {e}"))?;
    let consumed = usize::try_from(cursor.position())
        .map_err(|_| "bitmap decode roaring32 payload length overflow".to_string())?;
    if consumed == 0 || consumed > bytes.len() {
        return Err(format!(
            "bitmap decode roaring32 payload consumed invalid size: consumed={} len={}",
            consumed,
            bytes.len()
        ));
    }
    Ok((bitmap, consumed))
}

fn decode_set(bytes: &[u8]) -> Result<RoaringTreemap, String> {
    let count = read_u32_le(bytes, 1, "SET count")? as usize;
    expect_len(bytes, 5usize.saturating_add(count.saturating_mul(8)), "SET")?;
    let mut out = RoaringTreemap::new();
    for idx in 0..count {
        out.insert(read_u64_le(bytes, 5 + idx * 8, "SET value")?);
    }
    Ok(out)
}

fn decode_bitmap32(bytes: &[u8]) -> Result<RoaringTreemap, String> {
    let (bitmap, consumed) = decode_roaring32_payload(&bytes[1..])?;
    if 1 + consumed != bytes.len() {
        return Err(format!(
            "bitmap BITMAP32 payload has trailing bytes: consumed={} len={}",
            1 + consumed,
            bytes.len()
        ));
    }
    Ok(bitmap.iter().map(u64::from).collect())
}

fn decode_bitmap64(bytes: &[u8]) -> Result<RoaringTreemap, String> {
    let (map_size, consumed) = decode_varint_u64(&bytes[1..])?;
    let mut offset = 1usize.saturating_add(consumed);
    let mut out = RoaringTreemap::new();
    for idx in 0..map_size {
        let high = read_u32_le(bytes, offset, "BITMAP64 bucket key")?;
        offset += 4;
        let rest = bytes.get(offset..).unwrap_or(&[]);
        let (lows, used) = decode_roaring32_payload(rest)
            .map_err(|e| format!("bitmap BITMAP64 bucket {idx}: {e}"))?;
        offset = offset.saturating_add(used);
        let base = u64::from(high) << 32;
        for low in lows.iter() {
            out.insert(base | u64::from(low));
        }
    }
    if offset != bytes.len() {
        return Err(format!(
            "bitmap BITMAP64 payload has trailing bytes: offset={} len={}",
            offset,
            bytes.len()
        ));
    }
    Ok(out)
}

/// Decodes an ascending-ordered bitmap payload.
pub fn decode_bitmap(bytes: &[u8]) -> Result<RoaringTreemap, String> {
    let Some(&type_code) = bytes.first() else {
        return Err("bitmap payload is empty".to_string());
    };
    match type_code {
        BITMAP_TYPE_EMPTY => {
            expect_len(bytes, 1, "EMPTY")?;
            Ok(RoaringTreemap::new())
        }
        BITMAP_TYPE_SINGLE32 => {
            expect_len(bytes, 5, "SINGLE32")?;
            let value = read_u32_le(bytes, 1, "SINGLE32 value")?;
            Ok(std::iter::once(u64::from(value)).collect())
        }
        BITMAP_TYPE_SINGLE64 => {
            expect_len(bytes, 9, "SINGLE64")?;
            let value = read_u64_le(bytes, 1, "SINGLE64 value")?;
            Ok(std::iter::once(value).collect())
        }
        BITMAP_TYPE_SET => decode_set(bytes),
        BITMAP_TYPE_BITMAP32 => decode_bitmap32(bytes),
        BITMAP_TYPE_BITMAP64 => decode_bitmap64(bytes),
        other => Err(format!("bitmap unsupported payload type code: {other}")),
    }
}

fn encode_roaring32(bitmap: &RoaringBitmap, out: &mut Vec<u8>) -> Result<(), String> {
    bitmap
        .serialize_into(out)
        .map_err(|e| format!("bitmap encode roaring32 payload failed: {e}"))
}

/// Encodes `values` in the canonical (ascending) layout.
pub fn encode_bitmap(values: &RoaringTreemap) -> Result<Vec<u8>, String> {
    let len = values.len();
    if len == 0 {
        return Ok(vec![BITMAP_TYPE_EMPTY]);
    }
    if len == 1 {
        let value = values
            .min()
            .ok_or_else(|| "bitmap encode missing singleton value".to_string())?;
        if let Ok(v32) = u32::try_from(value) {
            let mut out = Vec::with_capacity(5);
            out.push(BITMAP_TYPE_SINGLE32);
            out.extend_from_slice(&v32.to_le_bytes());
            return Ok(out);
        }
        let mut out = Vec::with_capacity(9);
        out.push(BITMAP_TYPE_SINGLE64);
        out.extend_from_slice(&value.to_le_bytes());
        return Ok(out);
    }
    if len <= SET_MAX_VALUES {
        let count = u32::try_from(len).map_err(|_| format!("bitmap value count overflow: {len}"))?;
        let mut out = Vec::with_capacity(5 + values.len() as usize * 8);
        out.push(BITMAP_TYPE_SET);
        out.extend_from_slice(&count.to_le_bytes());
        for value in values.iter() {
            out.extend_from_slice(&value.to_le_bytes());
        }
        return Ok(out);
    }

    let mut buckets: BTreeMap<u32, RoaringBitmap> = BTreeMap::new();
    for value in values.iter() {
        buckets
            .entry((value >> 32) as u32)
            .or_default()
            .insert(value as u32);
    }
    if buckets.len() == 1
        && let Some(low) = buckets.get(&0)
    {
        let mut out = vec![BITMAP_TYPE_BITMAP32];
        encode_roaring32(low, &mut out)?;
        return Ok(out);
    }

    let mut out = vec![BITMAP_TYPE_BITMAP64];
    encode_varint_u64(buckets.len() as u64, &mut out);
    for (high, lows) in &buckets {
        out.extend_from_slice(&high.to_le_bytes());
        encode_roaring32(lows, &mut out)?;
    }
    Ok(out)
}
