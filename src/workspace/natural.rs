//! Natural ("human") string ordering.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Compare two strings so that embedded numbers sort by value.
///
/// `file2` sorts before `file10`. Runs of ASCII digits are compared
/// numerically, everything else character by character. Numbers that
/// are equal in value order by their zero padding (`7` before `007`).
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let left = take_digits(&mut a);
                let right = take_digits(&mut b);
                match compare_numeric(&left, &right) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        digits.push(c);
    }
    digits
}

fn compare_numeric(left: &str, right: &str) -> Ordering {
    let l = left.trim_start_matches('0');
    let r = right.trim_start_matches('0');
    l.len()
        .cmp(&r.len())
        .then_with(|| l.cmp(r))
        .then_with(|| left.len().cmp(&right.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(items: &[&str]) -> Vec<String> {
        let mut v: Vec<String> = items.iter().map(|s| s.to_string()).collect();
        v.sort_by(|a, b| natural_cmp(a, b));
        v
    }

    #[test]
    fn test_numbers_by_value() {
        assert_eq!(
            sorted(&["file10", "file2", "file1"]),
            vec!["file1", "file2", "file10"]
        );
    }

    #[test]
    fn test_plain_text_is_lexical() {
        assert_eq!(sorted(&["beta", "alpha", "Gamma"]), vec!["Gamma", "alpha", "beta"]);
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(natural_cmp("file", "file1"), Ordering::Less);
        assert_eq!(natural_cmp("file1", "file"), Ordering::Greater);
    }

    #[test]
    fn test_multiple_number_runs() {
        assert_eq!(
            sorted(&["v1.10.0", "v1.2.10", "v1.2.9"]),
            vec!["v1.2.9", "v1.2.10", "v1.10.0"]
        );
    }

    #[test]
    fn test_zero_padding() {
        assert_eq!(natural_cmp("7", "007"), Ordering::Less);
        assert_eq!(natural_cmp("008", "7"), Ordering::Greater);
        assert_eq!(natural_cmp("a01", "a01"), Ordering::Equal);
    }
}
