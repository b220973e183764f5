//! Slot framing and variable-length integers
//!
//! A slot is a `[bytes]`: a big-endian `i32` length followed by that many
//! bytes, with `-1` denoting null.

use crate::codec::TypeCodec;
use crate::core::error::{Error, Result};
use crate::types::Value;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Read one `[bytes]` slot; `None` is null
pub fn read_slot(buf: &mut Bytes) -> Result<Option<Bytes>> {
    if buf.remaining() < 4 {
        return Err(Error::malformed(format!(
            "slot length needs 4 bytes, {} remaining",
            buf.remaining()
        )));
    }
    let len = buf.get_i32();
    match len {
        -1 => Ok(None),
        len if len < 0 => Err(Error::malformed(format!("negative slot length {}", len))),
        len if len as usize > buf.remaining() => Err(Error::malformed(format!(
            "slot of {} bytes with {} remaining",
            len,
            buf.remaining()
        ))),
        len => Ok(Some(buf.split_to(len as usize))),
    }
}

/// Read a non-negative `i32` element count
pub fn read_count(buf: &mut Bytes) -> Result<usize> {
    if buf.remaining() < 4 {
        return Err(Error::malformed("truncated element count"));
    }
    let count = buf.get_i32();
    if count < 0 {
        return Err(Error::malformed(format!("negative element count {}", count)));
    }
    Ok(count as usize)
}

/// Encode `value` through `codec` as one slot.
///
/// On failure `out` is truncated back to where it started.
pub fn write_slot(codec: &dyn TypeCodec, value: &Value, out: &mut BytesMut) -> Result<()> {
    if value.is_null() {
        out.put_i32(-1);
        return Ok(());
    }

    let start = out.len();
    out.put_i32(0);
    if let Err(e) = codec.encode(value, out) {
        out.truncate(start);
        return Err(e);
    }

    let len = out.len() - start - 4;
    let len = match i32::try_from(len) {
        Ok(len) => len,
        Err(_) => {
            out.truncate(start);
            return Err(Error::malformed(format!("slot body of {} bytes exceeds i32", len)));
        }
    };
    out[start..start + 4].copy_from_slice(&len.to_be_bytes());
    Ok(())
}

/// Write already-encoded slot bytes
pub fn write_raw_slot(raw: Option<&Bytes>, out: &mut BytesMut) -> Result<()> {
    match raw {
        None => out.put_i32(-1),
        Some(bytes) => {
            let len = i32::try_from(bytes.len()).map_err(|_| {
                Error::malformed(format!("slot body of {} bytes exceeds i32", bytes.len()))
            })?;
            out.put_i32(len);
            out.put_slice(bytes);
        }
    }
    Ok(())
}

/// Append an unsigned vint: the count of leading one bits in the first byte
/// is the number of extra bytes that follow
pub fn write_unsigned_vint(value: u64, out: &mut BytesMut) {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    let size = ((bits + 6) / 7).min(9);
    let extra = size - 1;

    if size == 9 {
        out.put_u8(0xFF);
        out.put_u64(value);
        return;
    }

    let be = value.to_be_bytes();
    let mut encoded = [0u8; 8];
    encoded[8 - size..].copy_from_slice(&be[8 - size..]);
    encoded[8 - size] |= !(0xFFu8 >> extra);
    out.put_slice(&encoded[8 - size..]);
}

/// Read an unsigned vint
pub fn read_unsigned_vint(buf: &mut Bytes) -> Result<u64> {
    if !buf.has_remaining() {
        return Err(Error::malformed("truncated vint"));
    }
    let first = buf.get_u8();
    let extra = first.leading_ones() as usize;
    if buf.remaining() < extra {
        return Err(Error::malformed(format!(
            "vint needs {} more bytes, {} remaining",
            extra,
            buf.remaining()
        )));
    }

    let mut value = if extra >= 8 { 0 } else { u64::from(first & (0xFF >> extra)) };
    for _ in 0..extra {
        value = (value << 8) | u64::from(buf.get_u8());
    }
    Ok(value)
}

/// Append a zig-zag encoded signed vint
pub fn write_signed_vint(value: i64, out: &mut BytesMut) {
    write_unsigned_vint(((value << 1) ^ (value >> 63)) as u64, out);
}

/// Read a zig-zag encoded signed vint
pub fn read_signed_vint(buf: &mut Bytes) -> Result<i64> {
    let raw = read_unsigned_vint(buf)?;
    Ok((raw >> 1) as i64 ^ -((raw & 1) as i64))
}
