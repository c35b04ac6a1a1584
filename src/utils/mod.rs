use crate::error::ScrapeError;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::info;

/// A simple wall-clock timer for logging elapsed time.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "⏱  Finished: {} (took {:.2?})",
            self.label,
            self.start.elapsed()
        );
    }
}

/// Format a large integer with thousands separators.
pub fn fmt_number(n: i64) -> String {
    let s = n.abs().to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    if n < 0 {
        result.push('-');
    }
    result.chars().rev().collect()
}

// ── Page selection ────────────────────────────────────────────────────────────

/// Parse a page selection like `"1,5,10-15,20"` into a sorted,
/// deduplicated list of 1-based page numbers.
///
/// Tokens are single integers or `start-end` inclusive ranges; whitespace
/// is ignored. One malformed token rejects the whole input — a partially
/// applied selection would silently scrape the wrong pages.
pub fn parse_page_spec(input: &str) -> Result<Vec<u32>, ScrapeError> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(ScrapeError::InvalidInput("empty page selection".into()));
    }

    let mut pages = BTreeSet::new();
    for token in cleaned.split(',') {
        if let Some((start, end)) = token.split_once('-') {
            let start = parse_page_number(start)?;
            let end = parse_page_number(end)?;
            if end < start {
                return Err(ScrapeError::InvalidInput(format!(
                    "range {}-{} runs backwards",
                    start, end
                )));
            }
            pages.extend(start..=end);
        } else {
            pages.insert(parse_page_number(token)?);
        }
    }

    Ok(pages.into_iter().collect())
}

fn parse_page_number(token: &str) -> Result<u32, ScrapeError> {
    let n: u32 = token
        .parse()
        .map_err(|_| ScrapeError::InvalidInput(format!("bad page token {:?}", token)))?;
    if n == 0 {
        return Err(ScrapeError::InvalidInput("pages are 1-based".into()));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_number() {
        assert_eq!(fmt_number(1_234_567), "1,234,567");
        assert_eq!(fmt_number(0), "0");
        assert_eq!(fmt_number(-42_000), "-42,000");
        assert_eq!(fmt_number(999), "999");
    }

    #[test]
    fn page_spec_mixed_ranges() {
        assert_eq!(
            parse_page_spec("1,5,10-15,20,25-30,80").unwrap(),
            vec![1, 5, 10, 11, 12, 13, 14, 15, 20, 25, 26, 27, 28, 29, 30, 80]
        );
    }

    #[test]
    fn page_spec_dedupes_and_sorts() {
        assert_eq!(parse_page_spec("1,1,2,2-3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_page_spec("7,3,5").unwrap(), vec![3, 5, 7]);
    }

    #[test]
    fn page_spec_ignores_whitespace() {
        assert_eq!(parse_page_spec(" 1 , 2 - 4 ").unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn page_spec_rejects_malformed_input() {
        assert!(parse_page_spec("1,,5").is_err());
        assert!(parse_page_spec("a-b").is_err());
        assert!(parse_page_spec("1,x").is_err());
        assert!(parse_page_spec("5-3").is_err());
        assert!(parse_page_spec("0,1").is_err());
        assert!(parse_page_spec("").is_err());
    }
}
