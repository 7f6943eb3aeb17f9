//! Chinese date strings (`2024年1月15日`).

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{DocxError, Result};

fn component_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"([0-9]+)([年月日])").expect("invalid date component regex"))
}

fn full_date_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^([0-9]{1,4})年([0-9]{1,2})月([0-9]{1,2})日$").expect("invalid full date regex")
    })
}

/// Splits a date into its numbers (zero-padded to two digits) and the
/// 年/月/日 separators that follow them.
///
/// ```
/// let (numbers, seps) = docxlib_core::parse_date_string("2024年1月15日");
/// assert_eq!(numbers, ["2024", "01", "15"]);
/// assert_eq!(seps, ["年", "月", "日"]);
/// ```
pub fn parse_date_string(s: &str) -> (Vec<String>, Vec<String>) {
    component_regex()
        .captures_iter(s)
        .map(|caps| (format!("{:0>2}", &caps[1]), caps[2].to_string()))
        .unzip()
}

/// Checks that `s` is `Y年M月D日` and names a real calendar day.
pub fn validate_date_string(s: &str) -> Result<()> {
    let caps = full_date_regex().captures(s).ok_or_else(|| {
        DocxError::Validation(format!(
            "invalid date format: {} (expected e.g. 2024年1月15日)",
            s
        ))
    })?;
    let does_not_exist = || DocxError::Validation(format!("date does not exist: {}", s));
    let number = |i: usize| caps[i].parse::<u32>().map_err(|_| does_not_exist());
    let (year, month, day) = (number(1)?, number(2)?, number(3)?);
    if year < 1 {
        return Err(does_not_exist());
    }

    NaiveDate::from_ymd_opt(year as i32, month, day)
        .map(|_| ())
        .ok_or_else(does_not_exist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_pads_numbers() {
        let (numbers, seps) = parse_date_string("2024年1月5日");
        assert_eq!(numbers, vec!["2024", "01", "05"]);
        assert_eq!(seps, vec!["年", "月", "日"]);
    }

    #[test]
    fn test_parse_partial_and_empty() {
        let (numbers, seps) = parse_date_string("2025年3月");
        assert_eq!(numbers, vec!["2025", "03"]);
        assert_eq!(seps, vec!["年", "月"]);
        let (numbers, seps) = parse_date_string("hello");
        assert!(numbers.is_empty() && seps.is_empty());
        let (numbers, _) = parse_date_string("２０２４年1月");
        assert_eq!(numbers, vec!["01"]);
    }

    #[rstest]
    #[case("2024年1月15日")]
    #[case("2024年01月15日")]
    #[case("2024年2月29日")]
    #[case("2024年12月31日")]
    #[case("2024年4月30日")]
    fn test_valid_dates(#[case] input: &str) {
        assert!(validate_date_string(input).is_ok());
    }

    #[rstest]
    #[case("hello")]
    #[case("2024-01-15")]
    #[case("2025年月1日")]
    #[case("年1月1日")]
    #[case("2025年1月")]
    #[case("2025年1月1日 ")]
    #[case("２０２４年1月1日")]
    #[case("2024年１月1日")]
    fn test_invalid_format(#[case] input: &str) {
        let err = validate_date_string(input).unwrap_err();
        assert!(matches!(err, DocxError::Validation(ref m) if m.contains("invalid date format")));
    }

    #[rstest]
    #[case("2025年0月1日")]
    #[case("2025年13月1日")]
    #[case("2025年2月30日")]
    #[case("2023年2月29日")]
    #[case("2025年4月31日")]
    #[case("2025年1月0日")]
    #[case("0年1月1日")]
    #[case("0000年1月1日")]
    fn test_nonexistent_dates(#[case] input: &str) {
        let err = validate_date_string(input).unwrap_err();
        assert!(matches!(err, DocxError::Validation(ref m) if m.contains("date does not exist")));
    }
}
