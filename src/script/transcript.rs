//! Plain-text transcript format handed to the rewriting step.
//!
//! The marker lines written here are what `novel::blocks` later looks for, so
//! they must survive a rewrite verbatim even when the prose around them
//! doesn't.

use super::extractor::{Event, ImageKind};
use crate::config::BranchDisplay;

pub const SCENE_RULE_WIDTH: usize = 60;
pub const SCENE_OPEN: &str = "【シーン:";
pub const CHOICES_HEADER: &str = "【ドクターの選択肢】";
pub const BRANCH_OPEN: &str = "【分岐:";
pub const IMAGE_MARKER: &str = "[画像]";
pub const BACKGROUND_MARKER: &str = "[背景]";

pub fn write_transcript(events: &[Event], display: BranchDisplay) -> String {
    let rule = "=".repeat(SCENE_RULE_WIDTH);
    let mut lines: Vec<String> = Vec::with_capacity(events.len() * 2);

    for event in events {
        match event {
            Event::SceneHeading { name } => {
                lines.push(format!("\n\n{rule}"));
                lines.push(format!("{SCENE_OPEN} {name}】"));
                lines.push(format!("{rule}\n"));
            }
            Event::Dialogue {
                speaker: Some(speaker),
                text,
            } => lines.push(format!("【{speaker}】{text}")),
            Event::Dialogue { speaker: None, text } => lines.push(text.clone()),
            Event::ImageRef {
                kind: ImageKind::Image,
                url,
            } => lines.push(format!("{IMAGE_MARKER}: {url}")),
            Event::ImageRef {
                kind: ImageKind::Background,
                url,
            } => lines.push(format!("{BACKGROUND_MARKER}: {url}")),
            Event::ChoiceList { options } => {
                if display == BranchDisplay::Suppress {
                    continue;
                }
                lines.push(format!("\n{CHOICES_HEADER}"));
                for (i, option) in options.iter().enumerate() {
                    lines.push(choice_line(i + 1, option));
                }
                lines.push(String::new());
            }
            // Branch markers are always written: the renderer rebuilds one
            // page per outcome from them.
            Event::BranchRef { raw_label, selected } => {
                lines.push(format!("\n{BRANCH_OPEN} {raw_label}】"));
                for option in selected {
                    lines.push(choice_line(option.index, &option.text));
                }
            }
        }
    }

    lines.join("\n")
}

fn choice_line(index: usize, text: &str) -> String {
    format!("  選択肢{index}: {text}")
}
