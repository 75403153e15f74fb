//! crates/veridant_core/src/identifiers.rs
//!
//! Human-readable reference numbers and opaque verification tokens.
//!
//! Reference numbers are printed on issued PDFs and quoted by third parties
//! for manual verification, so their shapes are fixed:
//!
//! | Kind         | Shape                   |
//! |--------------|-------------------------|
//! | Application  | `VAI-{year}-{seq:04}`   |
//! | Certificate  | `CERT-{year}-{seq:05}`  |
//! | Offer letter | `OFR-{year}-{seq:05}`   |
//! | Employee     | `VAI-EMP-{seq:03}`      |
//! | MoU          | `MOU-RH-{year}-{seq:04}`|
//!
//! `seq` is the number of existing rows of that kind plus one. Widths are
//! minimums: a sequence that outgrows its padding prints every digit.

use uuid::Uuid;

/// Length of every verification token.
pub const TOKEN_LENGTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Application,
    Certificate,
    OfferLetter,
    Employee,
    Mou,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 5] = [
        ReferenceKind::Application,
        ReferenceKind::Certificate,
        ReferenceKind::OfferLetter,
        ReferenceKind::Employee,
        ReferenceKind::Mou,
    ];

    /// Key used for this kind in the persistent sequence table.
    pub fn key(&self) -> &'static str {
        match self {
            ReferenceKind::Application => "application",
            ReferenceKind::Certificate => "certificate",
            ReferenceKind::OfferLetter => "offer_letter",
            ReferenceKind::Employee => "employee",
            ReferenceKind::Mou => "mou",
        }
    }
}

/// Formats the reference number for the row that follows `sequence_count`
/// existing rows, issued in `year`.
pub fn reference_number(kind: ReferenceKind, sequence_count: u64, year: i32) -> String {
    let seq = sequence_count + 1;
    match kind {
        ReferenceKind::Application => format!("VAI-{year}-{seq:04}"),
        ReferenceKind::Certificate => format!("CERT-{year}-{seq:05}"),
        ReferenceKind::OfferLetter => format!("OFR-{year}-{seq:05}"),
        ReferenceKind::Employee => format!("VAI-EMP-{seq:03}"),
        ReferenceKind::Mou => format!("MOU-RH-{year}-{seq:04}"),
    }
}

/// A fresh random token: a v4 UUID without separators, upper-cased and cut
/// to [`TOKEN_LENGTH`] characters.
pub fn verification_token() -> String {
    let mut token = Uuid::new_v4().simple().to_string().to_uppercase();
    token.truncate(TOKEN_LENGTH);
    token
}

/// True if `token` has the shape produced by [`verification_token`].
pub fn is_well_formed_token(token: &str) -> bool {
    token.len() == TOKEN_LENGTH
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn formats_match_printed_documents() {
        assert_eq!(reference_number(ReferenceKind::Application, 0, 2026), "VAI-2026-0001");
        assert_eq!(reference_number(ReferenceKind::Certificate, 41, 2026), "CERT-2026-00042");
        assert_eq!(reference_number(ReferenceKind::OfferLetter, 9, 2025), "OFR-2025-00010");
        assert_eq!(reference_number(ReferenceKind::Employee, 6, 2026), "VAI-EMP-007");
        assert_eq!(reference_number(ReferenceKind::Mou, 122, 2026), "MOU-RH-2026-0123");
    }

    #[test]
    fn employee_ids_ignore_the_year() {
        assert_eq!(
            reference_number(ReferenceKind::Employee, 3, 2024),
            reference_number(ReferenceKind::Employee, 3, 2031)
        );
    }

    #[test]
    fn distinct_counts_never_collide_past_the_padding() {
        for kind in ReferenceKind::ALL {
            let numbers: HashSet<_> = (0..12_000u64)
                .map(|n| reference_number(kind, n, 2026))
                .collect();
            assert_eq!(numbers.len(), 12_000, "{kind:?}");
        }
        assert_eq!(reference_number(ReferenceKind::Application, 9_999, 2026), "VAI-2026-10000");
    }

    #[test]
    fn tokens_are_sixteen_upper_hex_characters() {
        for _ in 0..100 {
            let token = verification_token();
            assert_eq!(token.len(), TOKEN_LENGTH);
            assert!(is_well_formed_token(&token), "{token}");
        }
    }

    #[test]
    fn tokens_do_not_repeat() {
        let tokens: HashSet<_> = (0..10_000).map(|_| verification_token()).collect();
        assert_eq!(tokens.len(), 10_000);
    }

    #[test]
    fn malformed_tokens_are_recognised() {
        assert!(!is_well_formed_token("abc"));
        assert!(!is_well_formed_token("0123456789abcdef"));
        assert!(!is_well_formed_token("0123456789ABCDEG"));
        assert!(is_well_formed_token("0123456789ABCDEF"));
    }
}
