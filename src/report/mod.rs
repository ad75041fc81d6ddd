//! Narrative report generation
//!
//! `synthesizer` renders a `ReportBundle` into the full Spanish report;
//! `stream` slices the finished text into paced chunks for delivery.

pub mod stream;
pub mod synthesizer;

pub use stream::{ReportChunks, paced_stream};
pub use synthesizer::synthesize;

/// Integer with es-ES digit grouping: `.` every three digits, applied only
/// from five digits up (`1234`, `12.345`).
#[must_use]
pub fn format_es_number(value: u64) -> String {
    let digits = value.to_string();
    if digits.len() < 5 {
        return digits;
    }

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0")]
    #[case(750, "750")]
    #[case(1234, "1234")]
    #[case(12525, "12.525")]
    #[case(123456, "123.456")]
    #[case(1234567, "1.234.567")]
    fn test_format_es_number(#[case] value: u64, #[case] expected: &str) {
        assert_eq!(format_es_number(value), expected);
    }
}
