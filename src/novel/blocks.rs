use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::script::transcript::{
    BACKGROUND_MARKER, BRANCH_OPEN, CHOICES_HEADER, IMAGE_MARKER, SCENE_OPEN,
};

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https://[^\s\)\]]+").unwrap());

const SCENE_RULE: &str = "==========";
const URL_SCHEME: &str = "https://";
/// Marker spellings a rewrite sometimes produces when it keeps the raw
/// instruction cell as a speaker name.
const RAW_BACKGROUND_MARKER: &str = "【--background--】";
const RAW_IMAGE_BETWEEN_MARKER: &str = "【--imagetween--】";
const IMAGE_TOKENS: &[&str] = &[
    IMAGE_MARKER,
    BACKGROUND_MARKER,
    RAW_BACKGROUND_MARKER,
    RAW_IMAGE_BETWEEN_MARKER,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { text: String },
    ImagePage { url: String, is_background: bool },
    TextPage { lines: Vec<String> },
    BranchSection { raw_text: String },
}

/// Split a transcript into blocks, in document order.
pub fn segment(transcript: &str) -> Vec<Block> {
    let normalized = transcript.replace("\r\n", "\n");
    let paragraphs: Vec<&str> = normalized.split("\n\n").map(str::trim).collect();
    let merged = merge_branch_paragraphs(&paragraphs);

    let mut blocks = Vec::with_capacity(merged.len());
    for para in &merged {
        classify_paragraph(para, &mut blocks);
    }
    debug!(paragraphs = paragraphs.len(), blocks = blocks.len(), "segmented transcript");
    blocks
}

/// A rewrite is free to put blank lines between a choice list and its branch
/// markers. Fold those paragraphs back into one section: keep absorbing while
/// paragraphs carry branch markers (or are blank); absorb one trailing plain
/// paragraph and stop; stop before a new choice list, scene heading or image.
fn merge_branch_paragraphs(paragraphs: &[&str]) -> Vec<String> {
    let mut merged = Vec::with_capacity(paragraphs.len());
    let mut i = 0;

    while i < paragraphs.len() {
        let para = paragraphs[i];
        if !starts_branch_section(para) {
            merged.push(para.to_string());
            i += 1;
            continue;
        }

        let mut combined = vec![para];
        let mut j = i + 1;
        while j < paragraphs.len() {
            let next = paragraphs[j];
            if next.contains(CHOICES_HEADER) || is_scene_break(next) || carries_image(next) {
                break;
            }
            combined.push(next);
            j += 1;
            if !next.is_empty() && !next.contains(BRANCH_OPEN) {
                break;
            }
        }
        merged.push(combined.join("\n\n"));
        i = j;
    }

    merged
}

fn starts_branch_section(para: &str) -> bool {
    para.contains(CHOICES_HEADER)
        || para.starts_with(BRANCH_OPEN)
        || para
            .lines()
            .next()
            .is_some_and(|first| first.trim().starts_with("選択肢"))
}

fn is_scene_break(para: &str) -> bool {
    para.contains(SCENE_RULE) || para.starts_with(SCENE_OPEN)
}

/// An image marker together with a URL, in a line or anywhere in a paragraph.
fn carries_image(s: &str) -> bool {
    s.contains(URL_SCHEME) && IMAGE_TOKENS.iter().any(|t| s.contains(t))
}

fn classify_paragraph(para: &str, blocks: &mut Vec<Block>) {
    if para.is_empty() {
        return;
    }

    // ── Scene rule: keep only the heading line ──
    if para.contains(SCENE_RULE) {
        for line in para.lines().map(str::trim) {
            if line.starts_with(SCENE_OPEN) && line.contains('】') {
                blocks.push(Block::Heading {
                    text: heading_text(line),
                });
            }
        }
        return;
    }

    // ── Image lines become their own pages, the rest falls through ──
    // Image pages come out ahead of the rest of the paragraph, so an image
    // inside a branch paragraph precedes that section's pages.
    let remainder;
    let mut para = para;
    if carries_image(para) {
        let mut rest = Vec::new();
        for line in para.lines().map(str::trim) {
            if carries_image(line) {
                if let Some(url) = URL_RE.find(line) {
                    blocks.push(Block::ImagePage {
                        url: url.as_str().to_string(),
                        is_background: line.contains(BACKGROUND_MARKER)
                            || line.contains(RAW_BACKGROUND_MARKER),
                    });
                }
            } else if !line.is_empty() {
                rest.push(line);
            }
        }
        if rest.is_empty() {
            return;
        }
        remainder = rest.join("\n");
        para = &remainder;
    }

    // ── Heading without a rule ──
    if para.starts_with(SCENE_OPEN) && para.contains('】') {
        blocks.push(Block::Heading {
            text: heading_text(para),
        });
        return;
    }

    // ── Choice list / branch markers ──
    if para.contains(CHOICES_HEADER) || para.contains(BRANCH_OPEN) {
        blocks.push(Block::BranchSection {
            raw_text: para.to_string(),
        });
        return;
    }

    // ── Plain text ──
    let lines: Vec<String> = para
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    blocks.push(Block::TextPage { lines });
}

fn heading_text(s: &str) -> String {
    s.replace(SCENE_OPEN, "").replace('】', "").trim().to_string()
}

/// Split `【name】text` into its name and body. The name keeps its brackets.
pub fn split_speaker(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if !line.starts_with('【') {
        return None;
    }
    let end = line.find('】')? + '】'.len_utf8();
    Some((&line[..end], &line[end..]))
}
