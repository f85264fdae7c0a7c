//! Narrow float representations: IEEE-754 binary16 and bfloat16.
//!
//! Both conversions truncate the mantissa rather than rounding, so encoding is
//! cheap and deterministic. Decoding is exact.

const F32_EXPONENT_MASK: u32 = 0x7F80_0000;
const F32_FRACTION_MASK: u32 = 0x007F_FFFF;

/// Converts an `f32` to binary16 bits.
///
/// - f32 zero and subnormals become signed zero
/// - exponents below 2^-24 flush to zero, 2^-24..2^-15 become half subnormals
/// - exponents above 2^15 saturate to infinity
/// - NaN keeps a non-zero mantissa
pub fn f32_to_half(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = (bits >> 23) & 0xFF;
    let fraction = bits & F32_FRACTION_MASK;

    if exponent == 0 {
        return sign;
    }
    if exponent == 0xFF {
        return sign | 0x7C00 | u16::from(fraction != 0);
    }

    let unbiased = exponent as i32 - 127;
    if unbiased < -24 {
        sign
    } else if unbiased < -14 {
        // 2^-shift with the implicit leading one moved into the fraction
        let shift = (-14 - unbiased) as u32;
        let fraction16 = (0x400 >> shift) + (fraction >> (13 + shift));
        sign | fraction16 as u16
    } else if unbiased > 15 {
        sign | 0x7C00
    } else {
        sign | (((unbiased + 15) as u16) << 10) | (fraction >> 13) as u16
    }
}

/// Converts binary16 bits to an `f32`. Every half value is exactly representable.
pub fn half_to_f32(half: u16) -> f32 {
    let sign = u32::from(half & 0x8000) << 16;
    let exponent = u32::from((half >> 10) & 0x1F);
    let fraction = u32::from(half & 0x03FF);

    match exponent {
        0 if fraction == 0 => f32::from_bits(sign),
        0 => {
            let magnitude = (fraction as f32 / 1024.0) * (1.0 / 16384.0);
            if sign != 0 {
                -magnitude
            } else {
                magnitude
            }
        }
        31 => f32::from_bits(sign | F32_EXPONENT_MASK | u32::from(fraction != 0)),
        _ => f32::from_bits(sign | ((exponent + 112) << 23) | (fraction << 13)),
    }
}

/// Converts an `f32` to bfloat16 bits by keeping its top half.
///
/// Infinities and NaNs are special-cased so a NaN never truncates into an
/// infinity: infinity keeps `0x80` as its low byte, every NaN becomes the
/// all-ones mantissa pattern.
pub fn f32_to_bfloat(value: f32) -> u16 {
    let bits = value.to_bits();
    if bits & F32_EXPONENT_MASK == F32_EXPONENT_MASK {
        let low = if bits & F32_FRACTION_MASK == 0 { 0x80 } else { 0xFF };
        (((bits >> 24) as u16) << 8) | low
    } else {
        (bits >> 16) as u16
    }
}

/// Converts bfloat16 bits to an `f32`.
#[inline]
pub fn bfloat_to_f32(bfloat: u16) -> f32 {
    f32::from_bits(u32::from(bfloat) << 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_exact_values() {
        for (value, bits) in [
            (0.0f32, 0x0000u16),
            (-0.0, 0x8000),
            (1.0, 0x3C00),
            (-1.0, 0xBC00),
            (0.5, 0x3800),
            (2.0, 0x4000),
            (65504.0, 0x7BFF),
        ] {
            assert_eq!(f32_to_half(value), bits, "{value}");
            assert_eq!(half_to_f32(bits).to_bits(), value.to_bits());
        }
    }

    #[test]
    fn half_truncates_mantissa() {
        // 1 + 2^-11 is below half precision
        let value = 1.0 + f32::powi(2.0, -11);
        assert_eq!(half_to_f32(f32_to_half(value)), 1.0);
        assert_eq!(half_to_f32(f32_to_half(3.14159)), 3.140625);
    }

    #[test]
    fn half_subnormals() {
        let smallest = f32::powi(2.0, -24);
        assert_eq!(f32_to_half(smallest), 0x0001);
        assert_eq!(half_to_f32(0x0001), smallest);
        assert_eq!(f32_to_half(f32::powi(2.0, -15)), 0x0200);
        assert_eq!(half_to_f32(0x0200), f32::powi(2.0, -15));
        assert_eq!(half_to_f32(0x8200), -f32::powi(2.0, -15));
        assert_eq!(f32_to_half(f32::powi(2.0, -25)), 0x0000);
        assert_eq!(f32_to_half(-f32::powi(2.0, -30)), 0x8000);
        assert_eq!(f32_to_half(f32::MIN_POSITIVE / 2.0), 0x0000);
    }

    #[test]
    fn half_specials() {
        assert_eq!(f32_to_half(1.0e5), 0x7C00);
        assert_eq!(f32_to_half(-1.0e5), 0xFC00);
        assert_eq!(f32_to_half(f32::INFINITY), 0x7C00);
        assert_eq!(f32_to_half(f32::NEG_INFINITY), 0xFC00);
        assert_eq!(f32_to_half(f32::NAN) & 0x7C00, 0x7C00);
        assert_ne!(f32_to_half(f32::NAN) & 0x03FF, 0);
        assert!(half_to_f32(f32_to_half(f32::NAN)).is_nan());
        assert_eq!(half_to_f32(0x7C00), f32::INFINITY);
        assert_eq!(half_to_f32(0xFC00), f32::NEG_INFINITY);
    }

    #[test]
    fn bfloat_keeps_top_half() {
        assert_eq!(f32_to_bfloat(1.0), 0x3F80);
        assert_eq!(f32_to_bfloat(-2.0), 0xC000);
        // 1.00390625 = 0x3F808000, the low half is dropped
        assert_eq!(f32_to_bfloat(f32::from_bits(0x3F80_8000)), 0x3F80);
        assert_eq!(bfloat_to_f32(0x3F80), 1.0);
        assert_eq!(bfloat_to_f32(0x4049), 3.140625);
    }

    #[test]
    fn bfloat_specials() {
        assert_eq!(f32_to_bfloat(f32::INFINITY), 0x7F80);
        assert_eq!(f32_to_bfloat(f32::NEG_INFINITY), 0xFF80);
        assert_eq!(f32_to_bfloat(f32::NAN) & 0x00FF, 0x00FF);
        // NaN whose payload sits only in the low half still decodes as NaN
        let low_payload_nan = f32::from_bits(0x7F80_0001);
        assert_eq!(f32_to_bfloat(low_payload_nan), 0x7FFF);
        assert!(bfloat_to_f32(f32_to_bfloat(low_payload_nan)).is_nan());
        assert_eq!(bfloat_to_f32(0x7F80), f32::INFINITY);
    }
}
