use std::{convert, fmt, str};

use x11rb::protocol::xproto::{self, Atom, AtomEnum};

use crate::{PropertyError, PropertyResult};

/// Requesting this type from `get` accepts a property of any type
pub const ANY_PROPERTY_TYPE: Atom = 0;

/// Name of the atom pair type which, unlike `ATOM`, is not predefined by the server
pub const ATOM_PAIR: &str = "ATOM_PAIR";

/// PropMode describes how existing data is combined with new data when changing a property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PropMode {
    /// The new data replaces the existing data
    #[default]
    Replace,
    /// The new data is prepended to the existing data
    Prepend,
    /// The new data is appended to the existing data
    Append,
}

// Implement format! support
impl fmt::Display for PropMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

// Convert from a string to the enum
impl convert::TryFrom<&str> for PropMode {
    type Error = PropertyError;

    fn try_from(val: &str) -> Result<Self, Self::Error> {
        match val.to_lowercase().as_ref() {
            "replace" => Ok(PropMode::Replace),
            "prepend" => Ok(PropMode::Prepend),
            "append" => Ok(PropMode::Append),
            _ => Err(PropertyError::InvalidArgument(format!("unknown mode {}", val))),
        }
    }
}

impl From<PropMode> for xproto::PropMode {
    fn from(val: PropMode) -> Self {
        match val {
            PropMode::Replace => xproto::PropMode::REPLACE,
            PropMode::Prepend => xproto::PropMode::PREPEND,
            PropMode::Append => xproto::PropMode::APPEND,
        }
    }
}

/// PropFormat is the bit width of each element stored in a property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropFormat {
    Format8,
    Format16,
    Format32,
}

impl PropFormat {
    /// Map the raw format value reported by the server
    pub fn from(val: u8) -> PropertyResult<Self> {
        match val {
            8 => Ok(PropFormat::Format8),
            16 => Ok(PropFormat::Format16),
            32 => Ok(PropFormat::Format32),
            _ => Err(PropertyError::UnknownFormat(val).into()),
        }
    }

    /// Size of a single element in bytes
    pub fn width(&self) -> usize {
        match self {
            PropFormat::Format8 => 1,
            PropFormat::Format16 => 2,
            PropFormat::Format32 => 4,
        }
    }
}

impl From<PropFormat> for u8 {
    fn from(val: PropFormat) -> Self {
        match val {
            PropFormat::Format8 => 8,
            PropFormat::Format16 => 16,
            PropFormat::Format32 => 32,
        }
    }
}

/// Property holds the data retrieved from a window property.
///
/// `data` is always a whole number of elements of the width implied by `format`. Atom arrays
/// are stored as 4 byte atom ids in native byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub type_: Atom,
    pub format: u8,

    /// Bytes the server still held after this read. They are never fetched, a non-zero value
    /// means `data` is truncated.
    pub bytes_after: u32,
    pub data: Vec<u8>,
}

impl Property {
    /// Number of bytes retrieved
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True when the server reported more data than was retrieved
    pub fn is_incomplete(&self) -> bool {
        self.bytes_after != 0
    }

    /// Check if the data is an atom array
    pub fn is_atom_type(&self, atom_pair: Atom) -> bool {
        self.type_ == Atom::from(AtomEnum::ATOM) || (atom_pair != x11rb::NONE && self.type_ == atom_pair)
    }

    /// Get the data as bytes if this is an 8 bit property
    pub fn value8(&self) -> Option<&[u8]> {
        match self.format {
            8 => Some(&self.data),
            _ => None,
        }
    }

    /// Get the data as 16 bit values if this is a 16 bit property
    pub fn value16(&self) -> Option<impl Iterator<Item = u16> + '_> {
        match self.format {
            16 => Some(self.data.chunks_exact(2).map(|x| u16::from_ne_bytes([x[0], x[1]]))),
            _ => None,
        }
    }

    /// Get the data as 32 bit values if this is a 32 bit property
    pub fn value32(&self) -> Option<impl Iterator<Item = u32> + '_> {
        match self.format {
            32 => Some(self.data.chunks_exact(4).map(|x| u32::from_ne_bytes([x[0], x[1], x[2], x[3]]))),
            _ => None,
        }
    }

    /// Get the data as atom ids
    pub fn atoms(&self) -> Vec<Atom> {
        self.data.chunks_exact(4).map(|x| u32::from_ne_bytes([x[0], x[1], x[2], x[3]])).collect()
    }

    /// Get the data as a utf8 string stopping at the first null
    pub fn as_str(&self) -> PropertyResult<&str> {
        let end = self.data.iter().position(|x| *x == 0).unwrap_or(self.data.len());
        Ok(str::from_utf8(&self.data[..end])?)
    }

    /// Get the data as a string replacing invalid utf8 sequences
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Encode 16 bit values in the byte layout `change` expects for format 16
pub fn encode16(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|x| x.to_ne_bytes()).collect()
}

/// Encode 32 bit values in the byte layout `change` expects for format 32
pub fn encode32(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|x| x.to_ne_bytes()).collect()
}
