//! Shared types: [`ByteOrder`], [`EncodingFormat`], and [`SampleType`].

use std::fmt;

use crate::{MseedError, Result};

/// Byte order for multi-byte fields in a miniSEED record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

/// Encoding format for sample data, as declared by Blockette 1000.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingFormat {
    /// ASCII text (code 0).
    Ascii,
    /// 16-bit signed integer (code 1).
    Int16,
    /// 32-bit signed integer (code 3).
    Int32,
    /// 32-bit IEEE float (code 4).
    Float32,
    /// 64-bit IEEE double (code 5).
    Float64,
    /// Steim-1 compressed integers (code 10).
    Steim1,
    /// Steim-2 compressed integers (code 11).
    Steim2,
}

impl EncodingFormat {
    /// Convert a raw encoding code (from Blockette 1000) to an `EncodingFormat`.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::Ascii),
            1 => Ok(Self::Int16),
            3 => Ok(Self::Int32),
            4 => Ok(Self::Float32),
            5 => Ok(Self::Float64),
            10 => Ok(Self::Steim1),
            11 => Ok(Self::Steim2),
            _ => Err(MseedError::UnsupportedEncoding(code)),
        }
    }

    /// Convert to the raw encoding code for Blockette 1000.
    pub fn to_code(self) -> u8 {
        match self {
            Self::Ascii => 0,
            Self::Int16 => 1,
            Self::Int32 => 3,
            Self::Float32 => 4,
            Self::Float64 => 5,
            Self::Steim1 => 10,
            Self::Steim2 => 11,
        }
    }

    /// The in-memory sample type produced when this encoding is unpacked.
    pub fn sample_type(self) -> SampleType {
        match self {
            Self::Ascii => SampleType::Ascii,
            Self::Int16 | Self::Int32 | Self::Steim1 | Self::Steim2 => SampleType::Int,
            Self::Float32 => SampleType::Float,
            Self::Float64 => SampleType::Double,
        }
    }
}

impl fmt::Display for EncodingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascii => write!(f, "ASCII"),
            Self::Int16 => write!(f, "INT16"),
            Self::Int32 => write!(f, "INT32"),
            Self::Float32 => write!(f, "FLOAT32"),
            Self::Float64 => write!(f, "FLOAT64"),
            Self::Steim1 => write!(f, "Steim1"),
            Self::Steim2 => write!(f, "Steim2"),
        }
    }
}

/// Type of unpacked samples, tagged with the conventional single character
/// (`a`, `i`, `f`, `d`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    Ascii,
    Int,
    Float,
    Double,
}

impl SampleType {
    /// Bytes occupied by one sample of this type.
    pub fn size(self) -> usize {
        match self {
            Self::Ascii => 1,
            Self::Int | Self::Float => 4,
            Self::Double => 8,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Ascii => 'a',
            Self::Int => 'i',
            Self::Float => 'f',
            Self::Double => 'd',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'a' => Some(Self::Ascii),
            'i' => Some(Self::Int),
            'f' => Some(Self::Float),
            'd' => Some(Self::Double),
            _ => None,
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_codes_roundtrip() {
        for code in [0u8, 1, 3, 4, 5, 10, 11] {
            let enc = EncodingFormat::from_code(code).unwrap();
            assert_eq!(enc.to_code(), code);
        }
        assert!(matches!(
            EncodingFormat::from_code(2),
            Err(MseedError::UnsupportedEncoding(2))
        ));
    }

    #[test]
    fn test_sample_type_sizes() {
        assert_eq!(EncodingFormat::Int16.sample_type(), SampleType::Int);
        assert_eq!(EncodingFormat::Steim2.sample_type().size(), 4);
        assert_eq!(EncodingFormat::Float64.sample_type().size(), 8);
        assert_eq!(EncodingFormat::Ascii.sample_type().size(), 1);
        assert_eq!(SampleType::from_char('f'), Some(SampleType::Float));
        assert_eq!(SampleType::Double.to_string(), "d");
    }
}
