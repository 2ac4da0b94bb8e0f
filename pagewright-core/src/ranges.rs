//! Page range algebra
//!
//! User-facing ranges are 1-based and inclusive: `"1-5,10,15-20"`. The same
//! notation, once sorted and compressed, is the wire format handed to the
//! structural engine.

use crate::error::{DomainError, Result};
use std::fmt;

/// An inclusive, 1-based span of pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageRange {
    start: u32,
    end: u32,
}

impl PageRange {
    /// Create a range, enforcing `1 <= start <= end`
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if start == 0 || end == 0 {
            return Err(DomainError::invalid_range("Page numbers start at 1")
                .with_context("start", start)
                .with_context("end", end));
        }
        if start > end {
            return Err(DomainError::invalid_range(format!(
                "Start {start} is greater than end {end}"
            ))
            .with_context("start", start)
            .with_context("end", end));
        }
        Ok(Self { start, end })
    }

    /// A range covering exactly one page
    pub fn single(page: u32) -> Result<Self> {
        Self::new(page, page)
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// Number of pages covered
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, page: u32) -> bool {
        (self.start..=self.end).contains(&page)
    }

    /// Iterate the covered page numbers
    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Parse a range string such as `"1-3,7,10-11"`
///
/// Page counts are not checked here; see [`validate_against_page_count`].
pub fn parse(input: &str) -> Result<Vec<PageRange>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_range("Page range cannot be empty"));
    }

    trimmed
        .split(',')
        .map(|segment| parse_segment(segment).map_err(|e| e.with_context("input", input)))
        .collect()
}

fn parse_segment(segment: &str) -> Result<PageRange> {
    let segment = segment.trim();
    if segment.is_empty() {
        return Err(DomainError::invalid_range("Empty segment in page range"));
    }

    match segment.split_once('-') {
        Some((start, end)) => {
            let start = parse_page_number(start)?;
            let end = parse_page_number(end)?;
            PageRange::new(start, end)
        }
        None => PageRange::single(parse_page_number(segment)?),
    }
}

fn parse_page_number(token: &str) -> Result<u32> {
    let token = token.trim();
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DomainError::invalid_range(format!(
            "Invalid page number: '{token}'"
        )));
    }
    token
        .parse::<u32>()
        .map_err(|_| DomainError::invalid_range(format!("Page number too large: '{token}'")))
}

/// Check every range against the live page count of a document
pub fn validate_against_page_count(ranges: &[PageRange], total_pages: u32) -> Result<()> {
    if total_pages == 0 {
        return Err(DomainError::new(
            crate::error::ErrorCode::PageOutOfRange,
            "Document has no pages",
        )
        .with_context("total_pages", total_pages));
    }

    for range in ranges {
        if range.start > total_pages || range.end > total_pages {
            return Err(DomainError::new(
                crate::error::ErrorCode::PageOutOfRange,
                format!("Page range {range} exceeds document page count {total_pages}"),
            )
            .with_context("range", range.to_string())
            .with_context("total_pages", total_pages));
        }
    }

    Ok(())
}

/// Sort ranges and merge the ones that overlap or touch
pub fn normalize(ranges: &[PageRange]) -> Vec<PageRange> {
    let mut sorted = ranges.to_vec();
    sorted.sort();

    let mut merged: Vec<PageRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start <= last.end.saturating_add(1) => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Sorted, deduplicated page numbers covered by `ranges`
pub fn expand(ranges: &[PageRange]) -> Vec<u32> {
    normalize(ranges)
        .iter()
        .flat_map(|range| range.pages())
        .collect()
}

/// Compress sorted page numbers into the fewest `N` / `N-M` tokens
///
/// `[1, 2, 3, 7, 10, 11]` becomes `"1-3,7,10-11"`. Duplicates collapse.
pub fn compress(sorted_pages: &[u32]) -> String {
    let mut tokens = Vec::new();
    let mut iter = sorted_pages.iter().copied();

    let Some(first) = iter.next() else {
        return String::new();
    };

    let (mut run_start, mut run_end) = (first, first);
    for page in iter {
        if page == run_end || page == run_end + 1 {
            run_end = page;
        } else {
            tokens.push(PageRange { start: run_start, end: run_end }.to_string());
            run_start = page;
            run_end = page;
        }
    }
    tokens.push(PageRange { start: run_start, end: run_end }.to_string());

    tokens.join(",")
}

/// Render a set of ranges in canonical wire form
pub fn to_wire_string(ranges: &[PageRange]) -> String {
    compress(&expand(ranges))
}

/// Convert 0-based indices into sorted, deduplicated 1-based page numbers
pub fn to_one_based_sorted(indices: &[usize]) -> Vec<u32> {
    let mut pages: Vec<u32> = indices.iter().map(|&i| i as u32 + 1).collect();
    pages.sort_unstable();
    pages.dedup();
    pages
}

/// Build the page order that results from moving pages to a new position
///
/// `moving_indices` and `target_index` are 0-based; the returned order is
/// 1-based. The moved pages keep their relative order and are inserted at
/// `target_index`, clamped to the number of pages that stay put.
pub fn build_permutation(total_pages: u32, moving_indices: &[usize], target_index: usize) -> Vec<u32> {
    let moving: Vec<u32> = to_one_based_sorted(moving_indices)
        .into_iter()
        .filter(|&page| page <= total_pages)
        .collect();

    let mut order: Vec<u32> = (1..=total_pages)
        .filter(|page| moving.binary_search(page).is_err())
        .collect();

    let insert_at = target_index.min(order.len());
    order.splice(insert_at..insert_at, moving);
    order
}

/// Render an explicit page order, e.g. `"2,4,5,1,3"`
///
/// Unlike [`compress`], the order is preserved and nothing is merged.
pub fn order_string(order: &[u32]) -> String {
    order
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
