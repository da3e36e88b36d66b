// Command line validation.
//
// Numbers are parsed with C `strtol` prefix rules: leading whitespace and a
// sign are accepted, digits are consumed greedily and whatever follows them
// is ignored. A token without a single digit is rejected.

use crate::{
    errors::UsageError,
    gpu_info::{GpuInfo, GpuVendor, Mode},
};

// Parse the leading integer of a token.
// A radix of 0 selects it from the prefix: "0x" hex, "0" octal, decimal
pub fn parse_long(token: &str, radix: u32) -> Option<i64> {
    let s = token.trim_start();

    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let has_hex_prefix = (s.starts_with("0x") || s.starts_with("0X"))
        && s[2..].starts_with(|c: char| c.is_ascii_hexdigit());

    let (radix, digits) = match radix {
        0 if has_hex_prefix => (16, &s[2..]),
        0 if s.starts_with('0') => (8, s),
        0 => (10, s),
        16 if has_hex_prefix => (16, &s[2..]),
        r => (r, s),
    };

    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    // Negate after parsing the magnitude so i64::MIN stays reachable
    let magnitude = i128::from_str_radix(&digits[..end], radix).ok()?;
    let value = if negative { -magnitude } else { magnitude };

    i64::try_from(value).ok()
}

pub fn parse_vendor(token: &str) -> Result<GpuVendor, UsageError> {
    parse_long(token, 0)
        .and_then(GpuVendor::from_id)
        .ok_or_else(|| UsageError::InvalidVendor {
            token: token.to_string(),
        })
}

pub fn parse_device(token: &str) -> Result<u32, UsageError> {
    parse_long(token, 10)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| UsageError::InvalidDevice {
            token: token.to_string(),
        })
}

// Core and memory offsets, non negative
pub fn parse_offset(token: &str) -> Result<i64, UsageError> {
    parse_long(token, 10)
        .filter(|v| *v >= 0)
        .ok_or_else(|| UsageError::InvalidValue {
            token: token.to_string(),
        })
}

pub fn parse_perf_level(token: &str) -> Result<u32, UsageError> {
    parse_long(token, 10)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| UsageError::InvalidValue {
            token: token.to_string(),
        })
}

// Only the first three characters of the mode are significant
pub fn parse_mode(token: &str) -> Result<Mode, UsageError> {
    if token.starts_with("get") {
        Ok(Mode::Get)
    } else if token.starts_with("set") {
        Ok(Mode::Set)
    } else {
        Err(UsageError::UnknownMode {
            mode: token.to_string(),
        })
    }
}

// Build the request from the positional arguments
pub fn parse_request(
    vendor: &str,
    device: &str,
    mode: &str,
    operands: &[String],
) -> Result<(Mode, GpuInfo), UsageError> {
    let mode_token = mode;
    let mode = parse_mode(mode_token)?;

    if mode == Mode::Set && !(2..=3).contains(&operands.len()) {
        return Err(UsageError::WrongArity {
            mode: mode_token.to_string(),
            count: operands.len(),
        });
    }

    let mut info = GpuInfo::new(parse_vendor(vendor)?, parse_device(device)?);

    // The performance level operand follows the offsets for set
    let perf_level = match mode {
        Mode::Get => operands.first(),
        Mode::Set => {
            info.core = parse_offset(&operands[0])?;
            info.mem = parse_offset(&operands[1])?;

            operands.get(2)
        }
    };

    if info.vendor == GpuVendor::Nvidia {
        if let Some(token) = perf_level {
            info.nv_perf_level = parse_perf_level(token)?;
        }
    }

    Ok((mode, info))
}
