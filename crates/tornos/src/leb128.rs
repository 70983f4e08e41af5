//! LEB128 integer encoding, as used throughout the binary format.
//!
//! Unsigned LEB128 for counts, sizes and indices; signed LEB128 for constant
//! payloads. Readers reject truncated and overlong encodings.

use anyhow::{bail, Context, Result};

/// Append the unsigned LEB128 encoding of `value`.
pub fn write_u32(buf: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            buf.push(byte | 0x80);
        } else {
            buf.push(byte);
            return;
        }
    }
}

/// Append the signed LEB128 encoding of `value`.
pub fn write_i32(buf: &mut Vec<u8>, value: i32) {
    write_i64(buf, i64::from(value));
}

/// Append the signed LEB128 encoding of `value`.
pub fn write_i64(buf: &mut Vec<u8>, mut value: i64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if done {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

/// Read an unsigned LEB128 u32 at `*pos`, advancing it.
pub fn read_u32(data: &[u8], pos: &mut usize) -> Result<u32> {
    let mut result: u32 = 0;
    let mut shift = 0;
    loop {
        let byte = *data.get(*pos).context("truncated LEB128 value")?;
        *pos += 1;
        if shift == 28 && byte & 0x7F > 0x0F {
            bail!("overlong LEB128 encoding for u32");
        }
        result |= u32::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift > 28 {
            bail!("overlong LEB128 encoding for u32");
        }
    }
}

/// Read a signed LEB128 i32 at `*pos`, advancing it.
pub fn read_i32(data: &[u8], pos: &mut usize) -> Result<i32> {
    let mut result: i32 = 0;
    let mut shift = 0;
    loop {
        let byte = *data.get(*pos).context("truncated LEB128 value")?;
        *pos += 1;
        if shift == 28 {
            // Final byte of a 5-byte encoding: only the low 4 bits and their
            // sign extension are representable.
            let bits = byte & 0x7F;
            if bits > 0x07 && bits < 0x78 {
                bail!("overlong LEB128 encoding for i32");
            }
        }
        result |= (i32::from(byte & 0x7F)) << shift;
        if byte & 0x80 == 0 {
            shift += 7;
            if shift < 32 && byte & 0x40 != 0 {
                result |= -1 << shift;
            }
            return Ok(result);
        }
        shift += 7;
        if shift > 28 {
            bail!("overlong LEB128 encoding for i32");
        }
    }
}

/// Read a signed LEB128 i64 at `*pos`, advancing it.
pub fn read_i64(data: &[u8], pos: &mut usize) -> Result<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let byte = *data.get(*pos).context("truncated LEB128 value")?;
        *pos += 1;
        if shift == 63 {
            // Final byte of a 10-byte encoding: the sign bit plus its own
            // extension, so only all-zeros or all-ones is coherent.
            let bits = byte & 0x7F;
            if bits != 0x00 && bits != 0x7F {
                bail!("overlong LEB128 encoding for i64");
            }
        }
        result |= i64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            shift += 7;
            if shift < 64 && byte & 0x40 != 0 {
                result |= -1 << shift;
            }
            return Ok(result);
        }
        shift += 7;
        if shift > 63 {
            bail!("overlong LEB128 encoding for i64");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_u32(value: u32) -> u32 {
        let mut buf = Vec::new();
        write_u32(&mut buf, value);
        let mut pos = 0;
        let back = read_u32(&buf, &mut pos).unwrap();
        assert_eq!(pos, buf.len(), "decoder must consume the whole encoding");
        back
    }

    fn roundtrip_i32(value: i32) -> i32 {
        let mut buf = Vec::new();
        write_i32(&mut buf, value);
        let mut pos = 0;
        let back = read_i32(&buf, &mut pos).unwrap();
        assert_eq!(pos, buf.len());
        back
    }

    fn roundtrip_i64(value: i64) -> i64 {
        let mut buf = Vec::new();
        write_i64(&mut buf, value);
        let mut pos = 0;
        let back = read_i64(&buf, &mut pos).unwrap();
        assert_eq!(pos, buf.len());
        back
    }

    #[test]
    fn u32_round_trips() {
        for value in [0, 1, 127, 128, 300, 624485, u32::MAX - 1, u32::MAX] {
            assert_eq!(roundtrip_u32(value), value);
        }
    }

    #[test]
    fn i32_round_trips() {
        for value in [0, 1, -1, 42, -42, 63, 64, -64, -65, i32::MAX, i32::MIN] {
            assert_eq!(roundtrip_i32(value), value);
        }
    }

    #[test]
    fn i64_round_trips() {
        for value in [0i64, -1, 1, i64::from(i32::MAX) + 1, i64::MAX, i64::MIN] {
            assert_eq!(roundtrip_i64(value), value);
        }
    }

    #[test]
    fn known_encodings() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 624485);
        assert_eq!(buf, [0xE5, 0x8E, 0x26]);

        buf.clear();
        write_i32(&mut buf, -1);
        assert_eq!(buf, [0x7F]);

        buf.clear();
        write_i32(&mut buf, 42);
        assert_eq!(buf, [0x2A]);
    }

    #[test]
    fn truncated_input_is_an_error() {
        let mut pos = 0;
        assert!(read_u32(&[0x80], &mut pos).is_err());
        let mut pos = 0;
        assert!(read_i32(&[0xFF, 0xFF], &mut pos).is_err());
        let mut pos = 0;
        assert!(read_u32(&[], &mut pos).is_err());
    }

    #[test]
    fn overlong_input_is_an_error() {
        // Six continuation bytes can never be a valid u32.
        let mut pos = 0;
        assert!(read_u32(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01], &mut pos).is_err());
        // Fifth byte carrying bits beyond the 32nd.
        let mut pos = 0;
        assert!(read_u32(&[0x80, 0x80, 0x80, 0x80, 0x7F], &mut pos).is_err());
    }
}

// ── Kani proof harnesses ─────────────────────────────────────────────────────

#[cfg(kani)]
mod proofs {
    use super::*;

    /// Proof: every u32 survives an encode/decode round trip, and the decoder
    /// consumes exactly the bytes the encoder produced.
    #[kani::proof]
    #[kani::unwind(6)]
    fn u32_round_trips() {
        let value: u32 = kani::any();
        let mut buf = Vec::new();
        write_u32(&mut buf, value);
        let mut pos = 0;
        let back = read_u32(&buf, &mut pos).unwrap();
        kani::assert(back == value, "u32 round trip");
        kani::assert(pos == buf.len(), "decoder consumes whole encoding");
    }

    /// Proof: every i32 survives an encode/decode round trip.
    #[kani::proof]
    #[kani::unwind(6)]
    fn i32_round_trips() {
        let value: i32 = kani::any();
        let mut buf = Vec::new();
        write_i32(&mut buf, value);
        let mut pos = 0;
        let back = read_i32(&buf, &mut pos).unwrap();
        kani::assert(back == value, "i32 round trip");
    }
}
