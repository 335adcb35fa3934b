//! Dated comment-log condensing

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// How many distinct comment dates survive by default
pub const DEFAULT_MAX_COMMENTS: usize = 3;

static DATE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}/\d{2}").expect("date tag pattern is valid"));

/// Trim a newline-delimited comment log down to the entries carrying the
/// `max_comments` most recent `MM/DD` date tags.
///
/// Tags are compared as bare (month, day) pairs with no year context, so a
/// `12/31` from last year outsorts a `01/01` from this year. That matches
/// how these logs have always been read and is kept on purpose.
///
/// Lines are grouped under every tag they contain; the survivors come back
/// in their original relative order with exact duplicates removed. Input
/// without a single tag anywhere is returned unchanged.
pub fn condense_comments(text: &str, max_comments: usize) -> String {
    if text.trim().is_empty() || max_comments == 0 {
        return text.to_string();
    }

    let lines: Vec<&str> = text.split('\n').collect();
    let tags_per_line: Vec<Vec<(u32, u32)>> = lines.iter().map(|line| line_tags(line)).collect();

    let mut distinct: Vec<(u32, u32)> = Vec::new();
    for tags in &tags_per_line {
        for tag in tags {
            if !distinct.contains(tag) {
                distinct.push(*tag);
            }
        }
    }
    if distinct.is_empty() {
        return text.to_string();
    }

    distinct.sort_unstable_by(|a, b| b.cmp(a));
    let selected: HashSet<(u32, u32)> = distinct.into_iter().take(max_comments).collect();

    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    for (line, tags) in lines.iter().zip(&tags_per_line) {
        if tags.iter().any(|tag| selected.contains(tag)) && seen.insert(*line) {
            kept.push(*line);
        }
    }

    kept.join("\n")
}

fn line_tags(line: &str) -> Vec<(u32, u32)> {
    DATE_TAG
        .find_iter(line)
        .filter_map(|m| {
            let (month, day) = m.as_str().split_once('/')?;
            Some((month.parse().ok()?, day.parse().ok()?))
        })
        .collect()
}
