use std::convert::TryInto;

/// Returns the length of a Vec<T> that has been encoded with bincode, using
/// [FixintEncoding](bincode::config::FixintEncoding) and
/// [LittleEndian](bincode::config::LittleEndian) byte order.
pub fn bincode_vec_fixint_len(buf : &[u8]) -> Result<usize, String> {

    let len_chars = buf.get(..8).ok_or_else(|| "Decode error: truncated list length".to_string())?;
    let len = u64::from_le_bytes(len_chars.try_into().map_err(|_| "Decode error: truncated list length".to_string())?);
    Ok(len as usize)
}

/// Interprets the bytes at the start of `buf` as an encoded 64-bit unsigned number that has been
/// encoded with bincode, using [VarintEncoding](bincode::config::VarintEncoding) and
/// [LittleEndian](bincode::config::LittleEndian) byte order.
///
/// Returns the encoded value, and the number of bytes in the buffer used to encode it.
pub fn bincode_u64_le_varint(buf : &[u8]) -> Result<(u64, usize), String> {

    let truncated = || "Decode error: truncated varint".to_string();
    let tag = *buf.first().ok_or_else(truncated)?;
    let remainder = &buf[1..];

    match tag {
        251 => {
            let len_chars = remainder.get(..2).ok_or_else(truncated)?;
            Ok((u16::from_le_bytes(len_chars.try_into().map_err(|_| truncated())?) as u64, 3))
        },
        252 => {
            let len_chars = remainder.get(..4).ok_or_else(truncated)?;
            Ok((u32::from_le_bytes(len_chars.try_into().map_err(|_| truncated())?) as u64, 5))
        },
        253 => {
            let len_chars = remainder.get(..8).ok_or_else(truncated)?;
            Ok((u64::from_le_bytes(len_chars.try_into().map_err(|_| truncated())?), 9))
        },
        254 => {
            let len_chars = remainder.get(..16).ok_or_else(truncated)?;
            Ok((u128::from_le_bytes(len_chars.try_into().map_err(|_| truncated())?) as u64, 17))
        },
        _ => Ok((tag as u64, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_forms() {
        assert_eq!(bincode_u64_le_varint(&[7]).unwrap(), (7, 1));
        assert_eq!(bincode_u64_le_varint(&[251, 0x2C, 0x01]).unwrap(), (300, 3));
        assert_eq!(bincode_u64_le_varint(&[252, 0, 0, 1, 0]).unwrap(), (65536, 5));
        assert!(bincode_u64_le_varint(&[]).is_err());
        assert!(bincode_u64_le_varint(&[251, 1]).is_err());
    }

    #[test]
    fn fixint_length() {
        assert_eq!(bincode_vec_fixint_len(&[3, 0, 0, 0, 0, 0, 0, 0, 9, 9]).unwrap(), 3);
        assert!(bincode_vec_fixint_len(&[3, 0, 0]).is_err());
    }
}
