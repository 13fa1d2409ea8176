//! Validated subject identifiers.
//!
//! The orchestrator rejects obviously malformed input before spending a
//! gateway attempt on it. `Cpf` strips formatting and verifies the mod-11
//! check digits locally; registry-level validation stays with the partner.
//! `Contact` accepts bare national phone numbers (10 to 13 digits after
//! stripping formatting).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while validating subject input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubjectError {
    /// CPF does not have exactly 11 digits after stripping formatting.
    #[error("CPF must have 11 digits, got {digits}")]
    CpfLength {
        /// Number of digits found.
        digits: usize,
    },

    /// CPF is a repeated-digit sequence (e.g. `111.111.111-11`), which the
    /// registry never issues.
    #[error("CPF is a repeated-digit sequence")]
    CpfRepeatedDigits,

    /// CPF check digits do not verify.
    #[error("CPF check digits do not verify")]
    CpfCheckDigits,

    /// Phone number has too few or too many digits.
    #[error("phone number must have 10 to 13 digits, got {digits}")]
    PhoneLength {
        /// Number of digits found.
        digits: usize,
    },
}

/// A validated CPF (Brazilian tax identifier).
///
/// Stored as the bare 11-digit string. `Display` masks the middle digits so
/// sessions can be logged without leaking the full identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cpf(String);

impl Cpf {
    /// Parses a CPF, stripping common formatting (`.`, `-`, spaces).
    ///
    /// # Errors
    ///
    /// Returns an error if the input does not have 11 digits, is a
    /// repeated-digit sequence, or fails check-digit verification.
    pub fn parse(input: &str) -> Result<Self, SubjectError> {
        let digits: Vec<u32> = input.chars().filter_map(|c| c.to_digit(10)).collect();
        if digits.len() != 11 {
            return Err(SubjectError::CpfLength {
                digits: digits.len(),
            });
        }
        if digits.iter().all(|&d| d == digits[0]) {
            return Err(SubjectError::CpfRepeatedDigits);
        }
        if check_digit(&digits[..9], 10) != digits[9] || check_digit(&digits[..10], 11) != digits[10]
        {
            return Err(SubjectError::CpfCheckDigits);
        }
        Ok(Self(digits.iter().map(|d| d.to_string()).collect()))
    }

    /// Returns the bare 11-digit representation (wire format).
    #[must_use]
    pub fn as_digits(&self) -> &str {
        &self.0
    }
}

/// Computes one CPF check digit over `digits` with the given starting weight.
fn check_digit(digits: &[u32], start_weight: u32) -> u32 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| d * (start_weight - i as u32))
        .sum();
    match sum * 10 % 11 {
        10 => 0,
        d => d,
    }
}

impl fmt::Display for Cpf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Masked: first three and last two digits only.
        write!(f, "{}.***.***-{}", &self.0[..3], &self.0[9..])
    }
}

/// A validated contact phone number, digits only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Contact(String);

impl Contact {
    /// Parses a phone number, stripping formatting.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 10 or more than 13 digits remain.
    pub fn parse(input: &str) -> Result<Self, SubjectError> {
        let digits: String = input.chars().filter(char::is_ascii_digit).collect();
        if !(10..=13).contains(&digits.len()) {
            return Err(SubjectError::PhoneLength {
                digits: digits.len(),
            });
        }
        Ok(Self(digits))
    }

    /// Returns the bare digit string (wire format).
    #[must_use]
    pub fn as_digits(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0.len();
        write!(f, "{}****{}", &self.0[..2], &self.0[n - 2..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 529.982.247-25 is the canonical valid CPF test vector.
    const VALID_CPF: &str = "529.982.247-25";

    #[test]
    fn test_cpf_parse_formatted() {
        let cpf = Cpf::parse(VALID_CPF).unwrap();
        assert_eq!(cpf.as_digits(), "52998224725");
    }

    #[test]
    fn test_cpf_parse_bare() {
        assert!(Cpf::parse("52998224725").is_ok());
    }

    #[test]
    fn test_cpf_rejects_short_input() {
        assert_eq!(
            Cpf::parse("1234567890"),
            Err(SubjectError::CpfLength { digits: 10 })
        );
    }

    #[test]
    fn test_cpf_rejects_repeated_digits() {
        assert_eq!(
            Cpf::parse("111.111.111-11"),
            Err(SubjectError::CpfRepeatedDigits)
        );
    }

    #[test]
    fn test_cpf_rejects_bad_check_digits() {
        assert_eq!(
            Cpf::parse("529.982.247-26"),
            Err(SubjectError::CpfCheckDigits)
        );
    }

    #[test]
    fn test_cpf_display_masks_middle() {
        let cpf = Cpf::parse(VALID_CPF).unwrap();
        assert_eq!(cpf.to_string(), "529.***.***-25");
    }

    #[test]
    fn test_contact_parse_strips_formatting() {
        let contact = Contact::parse("(27) 99999-8888").unwrap();
        assert_eq!(contact.as_digits(), "27999998888");
    }

    #[test]
    fn test_contact_rejects_short_number() {
        assert_eq!(
            Contact::parse("999-8888"),
            Err(SubjectError::PhoneLength { digits: 7 })
        );
    }

    #[test]
    fn test_contact_rejects_long_number() {
        assert_eq!(
            Contact::parse("55527999998888222"),
            Err(SubjectError::PhoneLength { digits: 17 })
        );
    }

    #[test]
    fn test_contact_display_masks() {
        let contact = Contact::parse("27999998888").unwrap();
        assert_eq!(contact.to_string(), "27****88");
    }
}
