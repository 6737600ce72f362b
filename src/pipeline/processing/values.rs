//! Free-text field parsers for monetary amounts, release dates and running times.
//!
//! Every parser fails closed: text that matches none of the known shapes gives
//! `None` (or 0 minutes for running time) instead of an error, so one malformed
//! record never aborts a batch.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

const RANGE_DASHES: [char; 3] = ['-', '\u{2014}', '\u{2013}'];

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern compiles")
}

// Amount shapes, ASCII digits only. The grouped form must not be followed by " million"/" billion";
// the regex crate has no lookahead so that check happens in `extract_amount`.
static AMOUNT: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)(?P<scaled>\$\s*[0-9]+\.?[0-9]*\s*[mb]illi?on)|(?P<grouped>\$\s*[0-9]{1,3}(?:[,.][0-9]{3})+)")
});
static GROUPED_EXACT: Lazy<Regex> = Lazy::new(|| compile(r"^\$\s*[0-9]{1,3}(?:[,.][0-9]{3})+$"));
static SCALE_SUFFIX: Lazy<Regex> = Lazy::new(|| compile(r"(?i)^\s[mb]illion"));
static MILLIONS: Lazy<Regex> = Lazy::new(|| compile(r"(?i)^\$\s*[0-9]+\.?[0-9]*\s*milli?on"));
static BILLIONS: Lazy<Regex> = Lazy::new(|| compile(r"(?i)^\$\s*[0-9]+\.?[0-9]*\s*billi?on"));
static GROUPED: Lazy<Regex> = Lazy::new(|| compile(r"^\$\s*[0-9]{1,3}(?:[,.][0-9]{3})+"));
static CITATION: Lazy<Regex> = Lazy::new(|| compile(r"\[\d+\]\s*"));

static MONTH_ALT: Lazy<String> = Lazy::new(|| MONTHS.join("|"));
// One alternation so the leftmost date wins; grammar order only breaks ties at
// the same position.
static RELEASE_DATE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        concat!(
            r"(?P<full_month>{m})\s(?P<full_day>[123]?\d),\s(?P<full_year>\d{{4}})",
            r"|(?P<iso_year>\d{{4}}).(?P<iso_month>[01]\d).(?P<iso_day>[0123]\d)",
            r"|(?P<my_month>{m})\s(?P<my_year>\d{{4}})",
            r"|(?P<year>\d{{4}})",
        ),
        m = *MONTH_ALT
    ))
});

static RUNTIME: Lazy<Regex> = Lazy::new(|| compile(r"(\d+)\s*ho?u?r?s?\s*(\d*)|(\d+)\s*m"));

/// Parses a monetary amount such as `"$12.5 million"`, `"$1.2 billion"` or
/// `"$1,200,000"`. Ranges keep only their upper bound.
pub fn parse_amount(text: Option<&str>) -> Option<f64> {
    let collapsed = collapse_ranges(text?);
    extract_amount(&collapsed).and_then(parse_dollars)
}

/// Budget cells also carry citation markers (`[3]`) that are dropped after the
/// range collapse.
pub fn parse_budget(text: Option<&str>) -> Option<f64> {
    let collapsed = collapse_ranges(text?);
    let cleaned = strip_citations(&collapsed);
    extract_amount(&cleaned).and_then(parse_dollars)
}

pub fn strip_citations(text: &str) -> String {
    CITATION.replace_all(text, "").into_owned()
}

/// Replaces everything from a `$` up to the last dash on the same line (a dash
/// not followed by a lowercase letter) with a single `$`, so
/// `"$10 million-$15 million"` becomes `"$15 million"`.
pub fn collapse_ranges(text: &str) -> String {
    text.split('\n')
        .map(collapse_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_line(line: &str) -> String {
    let Some(start) = line.find('$') else {
        return line.to_string();
    };
    let mut end = None;
    let mut chars = line[start..].char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        if !RANGE_DASHES.contains(&c) {
            continue;
        }
        let next_is_lower = matches!(chars.peek(), Some((_, n)) if n.is_ascii_lowercase());
        if !next_is_lower {
            end = Some(start + offset + c.len_utf8());
        }
    }
    match end {
        Some(end) => format!("{}${}", &line[..start], &line[end..]),
        None => line.to_string(),
    }
}

/// Finds the leftmost amount-shaped substring. At a given position the
/// million/billion form wins over the grouped form.
pub fn extract_amount(text: &str) -> Option<&str> {
    let mut from = 0;
    while from < text.len() {
        let caps = AMOUNT.captures_at(text, from)?;
        if let Some(m) = caps.name("scaled") {
            return Some(m.as_str());
        }
        let m = caps.name("grouped")?;
        let start = m.start();
        let mut end = m.end();
        loop {
            if !SCALE_SUFFIX.is_match(&text[end..]) {
                return Some(&text[start..end]);
            }
            // give back one thousands group and retry
            if end < start + 4 || !GROUPED_EXACT.is_match(&text[start..end - 4]) {
                break;
            }
            end -= 4;
        }
        // `$` is one byte, so this stays on a char boundary
        from = start + 1;
    }
    None
}

/// Converts an extracted amount string to currency units.
pub fn parse_dollars(s: &str) -> Option<f64> {
    if MILLIONS.is_match(s) {
        return strip_to_number(s).map(|v| v * 1e6);
    }
    if BILLIONS.is_match(s) {
        return strip_to_number(s).map(|v| v * 1e9);
    }
    if let Some(m) = GROUPED.find(s) {
        if SCALE_SUFFIX.is_match(&s[m.end()..]) {
            return None;
        }
        let digits: String = m
            .as_str()
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        return digits.parse::<f64>().ok();
    }
    None
}

fn strip_to_number(s: &str) -> Option<f64> {
    let number: String = s
        .chars()
        .filter(|c| *c != '$' && !c.is_whitespace() && !c.is_ascii_alphabetic())
        .collect();
    number.parse::<f64>().ok()
}

/// Parses the leftmost date found: a full date, a numeric date, a month and
/// year, or a bare year. At the same position the more specific form wins.
/// Missing day or month default to 1.
pub fn parse_release_date(text: Option<&str>) -> Option<NaiveDate> {
    let caps = RELEASE_DATE.captures(text?)?;

    if let Some(year) = caps.name("full_year") {
        return ymd(
            year.as_str(),
            month_number(&caps["full_month"])?,
            caps["full_day"].parse().ok()?,
        );
    }
    if let Some(year) = caps.name("iso_year") {
        return ymd(
            year.as_str(),
            caps["iso_month"].parse().ok()?,
            caps["iso_day"].parse().ok()?,
        );
    }
    if let Some(year) = caps.name("my_year") {
        return ymd(year.as_str(), month_number(&caps["my_month"])?, 1);
    }
    ymd(&caps["year"], 1, 1)
}

fn month_number(name: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|idx| idx as u32 + 1)
}

fn ymd(year: &str, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day)
}

/// Parses `"1 hr 30 min"`, `"2 hours"` or `"95 minutes"` into minutes.
/// Unknown durations are 0, never `None`.
pub fn parse_running_time(text: Option<&str>) -> u32 {
    let Some(caps) = text.and_then(|t| RUNTIME.captures(t)) else {
        return 0;
    };
    let group = |i: usize| -> u32 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0)
    };
    let (hours, minutes, bare_minutes) = (group(1), group(2), group(3));
    if bare_minutes == 0 {
        hours.saturating_mul(60).saturating_add(minutes)
    } else {
        bare_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_parse_amount_forms() {
        assert_eq!(parse_amount(Some("$1,200,000")), Some(1_200_000.0));
        assert_eq!(parse_amount(Some("$12.5 million")), Some(12_500_000.0));
        assert_eq!(parse_amount(Some("$1.2 billion")), Some(1_200_000_000.0));
        assert_eq!(parse_amount(Some("$3 millon")), Some(3_000_000.0));
        assert_eq!(parse_amount(Some("$2 BILLION")), Some(2_000_000_000.0));
    }

    #[test]
    fn test_parse_amount_rejects_non_amounts() {
        assert_eq!(parse_amount(Some("not a number")), None);
        assert_eq!(parse_amount(None), None);
        assert_eq!(parse_amount(Some("")), None);
        assert_eq!(parse_amount(Some("£5 million")), None);
    }

    #[test]
    fn test_parse_amount_period_separators() {
        assert_eq!(parse_amount(Some("$1.200.000")), Some(1_200_000.0));
    }

    #[test]
    fn test_parse_amount_embedded_in_text() {
        let worldwide = parse_amount(Some("US$ 43.8 million (worldwide)")).unwrap();
        assert!((worldwide - 43_800_000.0).abs() < 1e-3);
        assert_eq!(parse_amount(Some("Over $250,000 (est.)")), Some(250_000.0));
    }

    #[test]
    fn test_parse_amount_keeps_upper_bound_of_range() {
        assert_eq!(
            parse_amount(Some("$10 million\u{2014}$15 million")),
            Some(15_000_000.0)
        );
        assert_eq!(parse_amount(Some("$10-15 million")), Some(15_000_000.0));
    }

    #[test]
    fn test_grouped_form_backs_off_before_scale_word() {
        // "$1,000,000 million" cannot end on a group followed by " million",
        // so the match shrinks to the first group
        assert_eq!(extract_amount("$1,000,000 million"), Some("$1,000"));
        assert_eq!(extract_amount("$12,345 million"), None);
    }

    #[test]
    fn test_collapse_ranges_ignores_hyphenated_words() {
        assert_eq!(collapse_ranges("$5 million (semi-official)"), "$5 million (semi-official)");
        assert_eq!(collapse_ranges("no dollars - here"), "no dollars - here");
    }

    #[test]
    fn test_parse_budget_strips_citations() {
        assert_eq!(parse_budget(Some("$6[2] million")), Some(6_000_000.0));
        assert_eq!(parse_budget(Some("$35 million[1]")), Some(35_000_000.0));
    }

    #[test]
    fn test_parse_release_date_forms() {
        assert_eq!(parse_release_date(Some("January 5, 1999")), date(1999, 1, 5));
        assert_eq!(parse_release_date(Some("July 24, 1990 (US)")), date(1990, 7, 24));
        assert_eq!(parse_release_date(Some("2001-02-03")), date(2001, 2, 3));
        assert_eq!(parse_release_date(Some("March 1987")), date(1987, 3, 1));
        assert_eq!(parse_release_date(Some("1999")), date(1999, 1, 1));
    }

    #[test]
    fn test_parse_release_date_takes_leftmost_date() {
        assert_eq!(
            parse_release_date(Some("1999 festival; December 10, 2000 wide")),
            date(1999, 1, 1)
        );
        assert_eq!(
            parse_release_date(Some("1999 (Cannes) June 4, 2000 (United States)")),
            date(1999, 1, 1)
        );
        // same position: the full date beats month-year and bare year
        assert_eq!(
            parse_release_date(Some("June 4, 2000 (US), 1999 (Cannes)")),
            date(2000, 6, 4)
        );
        assert_eq!(parse_release_date(Some("2000-06-04 premiere")), date(2000, 6, 4));
    }

    #[test]
    fn test_parse_release_date_failures() {
        assert_eq!(parse_release_date(Some("TBA")), None);
        assert_eq!(parse_release_date(None), None);
        assert_eq!(parse_release_date(Some("February 30, 1999")), None);
    }

    #[test]
    fn test_parse_running_time() {
        assert_eq!(parse_running_time(Some("1h 30min")), 90);
        assert_eq!(parse_running_time(Some("45 min")), 45);
        assert_eq!(parse_running_time(Some("")), 0);
        assert_eq!(parse_running_time(None), 0);
        assert_eq!(parse_running_time(Some("2 hours")), 120);
        assert_eq!(parse_running_time(Some("102 minutes")), 102);
        assert_eq!(parse_running_time(Some("unknown")), 0);
    }
}
