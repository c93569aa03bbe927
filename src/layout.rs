//! Text-block reconstruction.
//!
//! Fragments come in unordered with raw page coordinates; reading order and
//! paragraph structure are rebuilt by geometry alone. Lines are formed by
//! bucketing the vertical coordinate with a fixed tolerance, read
//! top-to-bottom; consecutive non-blank lines merge into paragraphs; the two
//! largest distinct line sizes on a page mark heading levels.
//!
//! The tolerance is a heuristic, not adaptive to the document's font scale,
//! so dense multi-column or very small print can misgroup. It is configurable
//! for that reason.

use std::collections::BTreeMap;

use crate::pdf_text::{PageText, TextFragment};

/// Default vertical bucket tolerance, in text-space units.
pub const DEFAULT_LINE_TOLERANCE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading1(String),
    Heading2(String),
    Paragraph(String),
}

#[derive(Debug)]
pub struct PageLayout {
    pub number: u32,
    pub blocks: Vec<Block>,
}

pub fn reconstruct_pages(pages: &[PageText], tolerance: f64) -> Vec<PageLayout> {
    pages
        .iter()
        .map(|page| PageLayout {
            number: page.number,
            blocks: reconstruct_blocks(&page.fragments, tolerance),
        })
        .collect()
}

fn reconstruct_blocks(fragments: &[TextFragment], tolerance: f64) -> Vec<Block> {
    let lines = group_lines(fragments, tolerance);
    let paragraphs = merge_paragraphs(&lines);

    // The two largest distinct line sizes on the page are heading levels.
    let mut sizes: Vec<f64> = lines.iter().map(|l| l.size).collect();
    sizes.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    sizes.dedup_by(|a, b| a.to_bits() == b.to_bits());
    let h1_size = sizes.first().copied();
    let h2_size = sizes.get(1).copied();

    paragraphs
        .into_iter()
        .map(|para| {
            if para.len() == 1 && Some(para[0].size) == h1_size {
                Block::Heading1(para[0].text.clone())
            } else if para.len() == 1 && Some(para[0].size) == h2_size {
                Block::Heading2(para[0].text.clone())
            } else {
                let text = para
                    .iter()
                    .map(|l| l.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                Block::Paragraph(text)
            }
        })
        .collect()
}

/// Buckets fragments into lines by rounded y, orders fragments within a line
/// by x, lines top-to-bottom by descending y. Line size is the mean of the
/// member fragments' sizes.
fn group_lines(fragments: &[TextFragment], tolerance: f64) -> Vec<Line> {
    let tolerance = if tolerance > 0.0 { tolerance } else { DEFAULT_LINE_TOLERANCE };

    let mut buckets: BTreeMap<i64, Vec<&TextFragment>> = BTreeMap::new();
    for fragment in fragments {
        let key = (fragment.y / tolerance).round() as i64;
        buckets.entry(key).or_default().push(fragment);
    }

    buckets
        .into_iter()
        .rev() // top of the page first
        .map(|(_, mut members)| {
            members.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
            let text = members
                .iter()
                .map(|f| f.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string();
            let size = members.iter().map(|f| f.size).sum::<f64>() / members.len() as f64;
            Line { text, size }
        })
        .collect()
}

/// Consecutive non-blank lines form a paragraph; a blank line closes it.
fn merge_paragraphs(lines: &[Line]) -> Vec<Vec<Line>> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<Line> = Vec::new();
    for line in lines {
        if line.text.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.clone());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}
