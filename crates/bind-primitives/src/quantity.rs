//! JSON-RPC quantity encoding (`0x`-prefixed, no leading zeros)

use primitive_types::U256;

use crate::PrimitiveError;

/// Parse a hex quantity into a `u64`
pub fn parse_quantity_u64(s: &str) -> Result<u64, PrimitiveError> {
    let digits = strip(s)?;
    u64::from_str_radix(digits, 16).map_err(|e| PrimitiveError::Quantity(format!("{s}: {e}")))
}

/// Parse a hex quantity into a `U256`
pub fn parse_quantity_u256(s: &str) -> Result<U256, PrimitiveError> {
    let digits = strip(s)?;
    if digits.len() > 64 {
        return Err(PrimitiveError::Quantity(format!("{s}: exceeds 256 bits")));
    }
    U256::from_str_radix(digits, 16).map_err(|e| PrimitiveError::Quantity(format!("{s}: {e:?}")))
}

/// Format a `u64` as a quantity
pub fn format_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

/// Format a `U256` as a quantity
pub fn format_quantity_u256(value: &U256) -> String {
    format!("0x{:x}", value)
}

fn strip(s: &str) -> Result<&str, PrimitiveError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Err(PrimitiveError::Quantity(format!("{s}: empty")));
    }
    Ok(digits)
}
