pub mod uint;

construct_uint!(Uint256, 4);

/// Result of decoding a compact ("nBits") target, including the two flags
/// consensus code has to reject on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompactTarget {
    pub target: Uint256,
    pub is_negative: bool,
    pub is_overflow: bool,
}

impl CompactTarget {
    /// A target is usable for consensus only if it is positive and did not overflow 256 bits
    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.is_negative && !self.is_overflow && !self.target.is_zero()
    }
}

impl Uint256 {
    /// Decodes the compact floating-point-like representation `0xEEMMMMMM`, where `EE` is the
    /// size in bytes and `MMMMMM` a 23-bit mantissa whose top bit is a sign flag.
    ///
    /// The resulting value is reduced modulo 2^256, exactly like the legacy `SetCompact`.
    pub fn decode_compact_target_bits(bits: u32) -> CompactTarget {
        let size = bits >> 24;
        let mut word = bits & 0x007f_ffff;
        let target = if size <= 3 {
            word >>= 8 * (3 - size);
            Uint256::from_u64(word as u64)
        } else {
            Uint256::from_u64(word as u64).wrapping_shl(8 * (size - 3))
        };
        let is_negative = word != 0 && (bits & 0x0080_0000) != 0;
        let is_overflow = word != 0 && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));
        CompactTarget { target, is_negative, is_overflow }
    }

    #[inline]
    pub fn from_compact_target_bits(bits: u32) -> Self {
        Self::decode_compact_target_bits(bits).target
    }

    /// Returns the decoded target only when it is positive, non-zero and fits 256 bits
    #[inline]
    pub fn checked_from_compact_target_bits(bits: u32) -> Option<Self> {
        let decoded = Self::decode_compact_target_bits(bits);
        decoded.is_valid().then_some(decoded.target)
    }

    /// Encodes into the compact representation. Precision below the 3 most significant
    /// bytes is truncated.
    pub fn compact_target_bits(self) -> u32 {
        let mut size = self.bits().div_ceil(8);
        let mut compact = if size <= 3 {
            (self.as_u64() << (8 * (3 - size))) as u32
        } else {
            (self >> (8 * (size - 3))).as_u64() as u32
        };
        // The 0x00800000 bit denotes the sign, so if it is already set, divide the
        // mantissa by 256 and increase the exponent.
        if compact & 0x0080_0000 != 0 {
            compact >>= 8;
            size += 1;
        }
        compact | (size << 24)
    }

    /// Computes `2^256 / (self + 1)` without representing 2^256: since 2^256 is at least
    /// as large as `self + 1`, the quotient equals `(2^256 - self - 1) / (self + 1) + 1`,
    /// i.e. `!self / (self + 1) + 1`.
    ///
    /// For `self == MAX` the divisor wraps to zero and the true quotient is 1.
    /// For `self == 0` the quotient is 2^256, which saturates to `MAX`.
    pub fn inverse_plus_one(self) -> Self {
        if self == Self::MAX {
            return Self::from_u64(1);
        }
        match (!self / (self + 1u64)).overflowing_add_u64(1) {
            (_, true) => Self::MAX,
            (quotient, false) => quotient,
        }
    }
}
