//! Size strings ("12.3 GB").

use once_cell::sync::Lazy;
use regex_lite::Regex;

static SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*([KMGT]i?B|bytes?|B)\b").unwrap());

/// Find a size in `text` and render it as `<number> <unit>`.
pub fn normalize_size(text: &str) -> Option<String> {
    let caps = SIZE.captures(text)?;
    let number = caps.get(1)?.as_str().replace(',', ".");
    let unit = caps.get(2)?.as_str();
    let unit = match unit.to_ascii_lowercase().as_str() {
        "b" | "byte" | "bytes" => "B".to_string(),
        _ => {
            let mut unit = unit.to_string();
            unit.make_ascii_uppercase();
            unit.replace("IB", "iB")
        }
    };
    Some(format!("{} {}", number, unit))
}

/// Approximate number of bytes a size string denotes.
pub fn size_in_bytes(text: &str) -> Option<u64> {
    let caps = SIZE.captures(text)?;
    let number: f64 = caps.get(1)?.as_str().replace(',', ".").parse().ok()?;
    let exponent = match caps.get(2)?.as_str().chars().next()?.to_ascii_uppercase() {
        'K' => 1,
        'M' => 2,
        'G' => 3,
        'T' => 4,
        _ => 0,
    };
    Some((number * 1024f64.powi(exponent)).round() as u64)
}

/// Whether two size strings denote the same quantity.
///
/// Strings that cannot be parsed are compared as text.
pub fn same_size(a: &str, b: &str) -> bool {
    match (size_in_bytes(a), size_in_bytes(b)) {
        (Some(x), Some(y)) => {
            let tolerance = x.max(y) / 1000;
            x.abs_diff(y) <= tolerance
        }
        _ => a.trim().eq_ignore_ascii_case(b.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_size("12.3GB").as_deref(), Some("12.3 GB"));
        assert_eq!(normalize_size("  800 mb ").as_deref(), Some("800 MB"));
        assert_eq!(normalize_size("4,5 GiB").as_deref(), Some("4.5 GiB"));
        assert_eq!(normalize_size("Total size 1 TB").as_deref(), Some("1 TB"));
        assert_eq!(normalize_size("unknown"), None);
    }

    #[test]
    fn test_bytes() {
        assert_eq!(size_in_bytes("1 KB"), Some(1024));
        assert_eq!(size_in_bytes("1.5 GB"), Some(1_610_612_736));
        assert_eq!(size_in_bytes("12 B"), Some(12));
    }

    #[test]
    fn test_same_size() {
        assert!(same_size("10 GB", "10.0 GB"));
        assert!(same_size("1024 MB", "1 GB"));
        assert!(!same_size("10 GB", "12 GB"));
        assert!(same_size("n/a", "N/A"));
        assert!(!same_size("10 GB", ""));
    }
}
