const ADC_OFFSET_SIGN: u32 = 1 << 10;
const ADC_OFFSET_MAGNITUDE: u32 = ADC_OFFSET_SIGN - 1;

/// Encodes a signed ADC offset into the sign-magnitude register format.
///
/// The magnitude is saturated to 10 bits.
#[must_use]
pub const fn encode_adc_offset(offset: i32) -> u32 {
    let magnitude = {
        let m = offset.unsigned_abs();
        if m > ADC_OFFSET_MAGNITUDE {
            ADC_OFFSET_MAGNITUDE
        } else {
            m
        }
    };
    if offset < 0 {
        magnitude | ADC_OFFSET_SIGN
    } else {
        magnitude
    }
}

/// Decodes a sign-magnitude ADC offset register.
#[must_use]
pub const fn decode_adc_offset(reg: u32) -> i32 {
    let magnitude = (reg & ADC_OFFSET_MAGNITUDE) as i32;
    if reg & ADC_OFFSET_SIGN != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Encodes a column gain coefficient in unsigned fixed point, truncating toward zero.
#[must_use]
pub fn encode_gain(gain: f64, frac_bits: u32) -> u16 {
    (gain * (1u32 << frac_bits) as f64) as i64 as u16
}

/// Decodes a column gain coefficient.
#[must_use]
pub fn decode_gain(reg: u16, frac_bits: u32) -> f64 {
    reg as f64 / (1u32 << frac_bits) as f64
}

/// Encodes a column curvature coefficient as a 16-bit two's complement fixed-point value.
///
/// The scaled value is truncated toward zero, and negative values are written as
/// `(0x10000 + c) & 0xffff`.
#[must_use]
pub fn encode_curve(curve: f64, frac_bits: u32) -> u16 {
    let c = (curve * (1u32 << frac_bits) as f64) as i64;
    if c > 0 {
        c as u16
    } else {
        ((0x10000 + c) & 0xffff) as u16
    }
}

/// Decodes a column curvature coefficient.
#[must_use]
pub fn decode_curve(reg: u16, frac_bits: u32) -> f64 {
    reg as i16 as f64 / (1u32 << frac_bits) as f64
}
