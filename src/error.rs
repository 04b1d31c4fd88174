//! CCMP errors.

use core::fmt;

/// The error type for CCMP decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The protected body is shorter than a CCMP header plus MIC, or its
    /// payload does not fit the 16-bit CCM length field.
    MalformedFrame,
    /// The computed MIC does not match the one carried by the frame.
    IntegrityFailure,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MalformedFrame => write!(
                f,
                "Malformed CCMP frame: body must hold an 8-byte CCMP header and an 8-byte MIC"
            ),
            Error::IntegrityFailure => write!(f, "Invalid CCMP MIC"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn display() {
        assert_eq!(Error::IntegrityFailure.to_string(), "Invalid CCMP MIC");
        assert!(Error::MalformedFrame.to_string().starts_with("Malformed"));
    }
}
