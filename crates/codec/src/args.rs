//! Typed contract-call arguments and their raw byte slots.
//!
//! Encoding rules per [ArgumentFormat]; decoding is the exact inverse except that an
//! empty slot always decodes to an absent value (`value: None`), never to zero.

use crate::error::CodecError;
use crate::hexutil::{dna_to_float_string, float_string_to_dna, hex_to_bytes, to_hex_string};
use crate::utf8::{string_to_utf8, utf8_to_string};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared format of one argument slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentFormat {
    Byte,
    Int8,
    Uint64,
    Int64,
    String,
    Bigint,
    Hex,
    Dna,
    /// Raw hex bytes; also used for any format name the node does not know.
    #[serde(other)]
    Default,
}

impl ArgumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgumentFormat::Byte => "byte",
            ArgumentFormat::Int8 => "int8",
            ArgumentFormat::Uint64 => "uint64",
            ArgumentFormat::Int64 => "int64",
            ArgumentFormat::String => "string",
            ArgumentFormat::Bigint => "bigint",
            ArgumentFormat::Hex => "hex",
            ArgumentFormat::Dna => "dna",
            ArgumentFormat::Default => "default",
        }
    }
}

impl fmt::Display for ArgumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One positional contract argument.
///
/// Numeric values are decimal strings, `hex`/`default` values are `0x`-prefixed hex and
/// `dna` values are decimal DNA amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractArgument {
    pub index: usize,
    pub format: ArgumentFormat,
    pub value: Option<String>,
}

impl ContractArgument {
    pub fn new(index: usize, format: ArgumentFormat, value: impl Into<String>) -> Self {
        Self {
            index,
            format,
            value: Some(value.into()),
        }
    }
}

/// Encode a single argument into its byte slot.
///
/// Integer formats parse the whole trimmed value, so `"12abc"` is an error rather than `12`.
pub fn argument_to_bytes(arg: &ContractArgument) -> Result<Vec<u8>, CodecError> {
    let fail = |cause: String| CodecError::ArgumentEncode {
        index: arg.index,
        format: arg.format,
        cause,
    };
    let value = arg
        .value
        .as_deref()
        .ok_or_else(|| fail("missing value".into()))?;
    let trimmed = value.trim();
    match arg.format {
        ArgumentFormat::Byte | ArgumentFormat::Int8 => {
            let v: i64 = trimmed.parse().map_err(|e| fail(format!("{e}")))?;
            if (0..=255).contains(&v) {
                Ok(vec![v as u8])
            } else {
                Err(fail(format!("invalid {} value {v}", arg.format)))
            }
        }
        ArgumentFormat::Uint64 => {
            if trimmed.starts_with('-') {
                return Err(fail(format!("invalid uint64 value {trimmed}")));
            }
            let v: u64 = trimmed.parse().map_err(|e| fail(format!("{e}")))?;
            Ok(v.to_le_bytes().to_vec())
        }
        ArgumentFormat::Int64 => {
            let v: i64 = trimmed.parse().map_err(|e| fail(format!("{e}")))?;
            Ok(v.to_le_bytes().to_vec())
        }
        ArgumentFormat::String => Ok(string_to_utf8(value)),
        ArgumentFormat::Bigint => {
            if trimmed.starts_with('-') {
                return Err(fail(format!("negative bigint {trimmed}")));
            }
            let v: BigUint = trimmed.parse().map_err(|e| fail(format!("{e}")))?;
            Ok(v.to_bytes_be())
        }
        ArgumentFormat::Dna => {
            let v = float_string_to_dna(trimmed).map_err(|e| fail(e.to_string()))?;
            Ok(v.to_bytes_be())
        }
        ArgumentFormat::Hex | ArgumentFormat::Default => {
            hex_to_bytes(trimmed).map_err(|e| fail(e.to_string()))
        }
    }
}

/// Decode one byte slot as `format`. Empty slots yield `value: None`.
pub fn argument_from_bytes(
    format: ArgumentFormat,
    index: usize,
    bytes: &[u8],
) -> Result<ContractArgument, CodecError> {
    if bytes.is_empty() {
        return Ok(ContractArgument {
            index,
            format,
            value: None,
        });
    }
    let fixed8 = || -> Result<[u8; 8], CodecError> {
        bytes
            .get(..8)
            .and_then(|b| <[u8; 8]>::try_from(b).ok())
            .ok_or_else(|| {
                CodecError::malformed(format!(
                    "{format} at index {index}: need 8 bytes, got {}",
                    bytes.len()
                ))
            })
    };
    let value = match format {
        ArgumentFormat::Byte | ArgumentFormat::Int8 => bytes[0].to_string(),
        ArgumentFormat::Uint64 => u64::from_le_bytes(fixed8()?).to_string(),
        ArgumentFormat::Int64 => i64::from_le_bytes(fixed8()?).to_string(),
        ArgumentFormat::String => utf8_to_string(bytes),
        ArgumentFormat::Bigint => BigUint::from_bytes_be(bytes).to_string(),
        ArgumentFormat::Dna => dna_to_float_string(&BigUint::from_bytes_be(bytes)),
        ArgumentFormat::Hex | ArgumentFormat::Default => to_hex_string(bytes, true),
    };
    Ok(ContractArgument {
        index,
        format,
        value: Some(value),
    })
}

/// Encode an argument list into a dense slot vector `0..=max(index)`; gaps stay empty.
pub fn arguments_to_bytes(args: &[ContractArgument]) -> Result<Vec<Vec<u8>>, CodecError> {
    let Some(max_index) = args.iter().map(|a| a.index).max() else {
        return Ok(Vec::new());
    };
    let mut slots = vec![Vec::new(); max_index + 1];
    for arg in args {
        slots[arg.index] = argument_to_bytes(arg)?;
    }
    Ok(slots)
}

/// Decode slots by position; slots past the end of `bytes` decode as absent.
pub fn arguments_from_bytes(
    formats: &[ArgumentFormat],
    bytes: &[Vec<u8>],
) -> Result<Vec<ContractArgument>, CodecError> {
    formats
        .iter()
        .enumerate()
        .map(|(idx, format)| {
            let slot = bytes.get(idx).map(Vec::as_slice).unwrap_or(&[]);
            argument_from_bytes(*format, idx, slot)
        })
        .collect()
}
