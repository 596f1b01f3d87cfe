//! MSB-first packing of `depth`-bit values into bytes.

/// Pack `values` (each `< 2^depth`) MSB-first. The final partial byte is
/// padded with zero low bits.
pub fn pack(values: &[u8], depth: u8) -> Vec<u8> {
    let depth = depth as u32;
    let mut out = Vec::with_capacity((values.len() * depth as usize).div_ceil(8));
    let mut buffer: u32 = 0;
    let mut filled: u32 = 0;

    for &v in values {
        buffer = (buffer << depth) | (v as u32 & ((1 << depth) - 1));
        filled += depth;
        while filled >= 8 {
            filled -= 8;
            out.push((buffer >> filled) as u8);
        }
        buffer &= (1 << filled) - 1;
    }
    if filled > 0 {
        out.push((buffer << (8 - filled)) as u8);
    }
    out
}

/// Unpack up to `count` values. Returns fewer when `bytes` runs out.
pub fn unpack(bytes: &[u8], depth: u8, count: usize) -> Vec<u8> {
    let depth = depth as u32;
    let mask = (1u32 << depth) - 1;
    let mut out = Vec::with_capacity(count);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in bytes {
        if out.len() == count {
            break;
        }
        buffer = (buffer << 8) | byte as u32;
        bits += 8;
        while bits >= depth && out.len() < count {
            bits -= depth;
            out.push(((buffer >> bits) & mask) as u8);
        }
        buffer &= (1 << bits) - 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_bit_layout() {
        assert_eq!(pack(&[0, 15, 8, 4], 4), vec![0x0F, 0x84]);
    }

    #[test]
    fn partial_byte_is_zero_padded() {
        // 101 110 001 -> 10111000 | 1 + seven zero bits
        assert_eq!(pack(&[0b101, 0b110, 0b001], 3), vec![0b1011_1000, 0b1000_0000]);
        assert_eq!(pack(&[1], 1), vec![0b1000_0000]);
    }

    #[test]
    fn unpack_stops_at_count() {
        let packed = pack(&[1, 2, 3, 4, 5], 3);
        assert_eq!(unpack(&packed, 3, 5), vec![1, 2, 3, 4, 5]);
        assert_eq!(unpack(&packed, 3, 2), vec![1, 2]);
    }

    #[test]
    fn unpack_short_input() {
        assert_eq!(unpack(&[0xFF], 4, 3), vec![15, 15]);
        assert!(unpack(&[], 7, 4).is_empty());
    }

    #[test]
    fn every_depth_survives() {
        for depth in 1..=7u8 {
            let max = (1u8 << depth) - 1;
            let values: Vec<u8> = (0..97u32).map(|i| (i * 37 % (max as u32 + 1)) as u8).collect();
            let packed = pack(&values, depth);
            assert_eq!(packed.len(), (values.len() * depth as usize).div_ceil(8));
            assert_eq!(unpack(&packed, depth, values.len()), values);
        }
    }
}
