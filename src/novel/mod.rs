pub mod blocks;
pub mod branches;
pub mod render;
pub mod shell;

use shell::Shell;

/// Transcript → blocks → pages → document.
pub fn render_document(transcript: &str, title: &str, shell: &Shell) -> String {
    let blocks = blocks::segment(transcript);
    let pages = render::render_blocks(&blocks);
    shell.assemble(title, &pages)
}

#[cfg(test)]
mod tests {
    use super::blocks::{segment, Block};
    use super::branches::{reconstruct, BranchKey, BranchPage};
    use super::*;
    use crate::config::BranchDisplay;
    use crate::script::extractor::{extract_events, Event};
    use crate::script::transcript::write_transcript;
    use crate::workbook::{Row, Sheet};

    fn sheet(name: &str, rows: &[(Option<&str>, Option<&str>)]) -> Sheet {
        Sheet {
            name: name.to_string(),
            rows: rows.iter().map(|(i, c)| Row::new(*i, *c)).collect(),
        }
    }

    fn sample_sheets() -> Vec<Sheet> {
        vec![
            sheet(
                "序章",
                &[
                    (Some("--image--"), Some("https://example.com/a.png")),
                    (Some("アーミヤ"), Some("おはようございます。")),
                    (Some("--Decision--"), None),
                    (Some("Option_1"), Some("A")),
                    (Some("Option_2"), Some("B")),
                    (Some("Option_3"), Some("C")),
                    (Some("--Decision End--"), None),
                    (Some("--Branch--"), Some(">Options_1")),
                    (Some("アーミヤ"), Some("Aの話。")),
                    (Some("--Branch--"), Some(">Options_2&3")),
                    (Some("アーミヤ"), Some("BかCの話。")),
                    (Some("--Branch--"), Some("End of Options")),
                ],
            ),
            sheet(
                "終章",
                &[
                    (Some("--background--"), Some("https://example.com/bg.png")),
                    (None, Some("夜が明けた。")),
                ],
            ),
        ]
    }

    fn kind(block: &Block) -> &'static str {
        match block {
            Block::Heading { .. } => "heading",
            Block::ImagePage { .. } => "image",
            Block::TextPage { .. } => "text",
            Block::BranchSection { .. } => "branch",
        }
    }

    #[test]
    fn transcript_segments_back_into_document_order() {
        let events = extract_events(&sample_sheets(), "ドクター").events;
        let transcript = write_transcript(&events, BranchDisplay::Inline);
        let blocks = segment(&transcript);

        let kinds: Vec<&str> = blocks.iter().map(kind).collect();
        assert_eq!(
            kinds,
            vec!["heading", "image", "text", "branch", "heading", "image", "text"]
        );

        let branch_labels: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                Event::BranchRef { raw_label, .. } => Some(raw_label.as_str()),
                _ => None,
            })
            .collect();
        let expected: Vec<BranchKey> = branch_labels
            .iter()
            .filter_map(|l| BranchKey::from_label(l))
            .collect();

        let Block::BranchSection { raw_text } = &blocks[3] else {
            panic!("expected a branch section");
        };
        let keys: Vec<BranchKey> = reconstruct(raw_text)
            .into_iter()
            .filter_map(|p| match p {
                BranchPage::Menu { .. } => None,
                BranchPage::Choice { index, .. } => Some(BranchKey::Single(index)),
                BranchPage::Combined { key, .. } => Some(key),
                BranchPage::Tail { .. } => Some(BranchKey::Tail),
            })
            .collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn suppressed_choice_list_keeps_outcome_pages() {
        let events = extract_events(&sample_sheets(), "ドクター").events;
        let transcript = write_transcript(&events, BranchDisplay::Suppress);
        let blocks = segment(&transcript);

        let kinds: Vec<&str> = blocks.iter().map(kind).collect();
        assert_eq!(
            kinds,
            vec!["heading", "image", "text", "branch", "heading", "image", "text"]
        );

        let Block::BranchSection { raw_text } = &blocks[3] else {
            panic!("expected a branch section");
        };
        let pages = reconstruct(raw_text);
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| !matches!(p, BranchPage::Menu { .. })));
        assert!(matches!(&pages[0], BranchPage::Choice { index: 1, lines, .. } if lines.contains(&"【アーミヤ】Aの話。".to_string())));
        assert!(matches!(&pages[1], BranchPage::Combined { lines, .. } if lines == &vec!["【アーミヤ】BかCの話。".to_string()]));
        assert!(matches!(pages[2], BranchPage::Tail { .. }));
    }

    #[test]
    fn render_twice_is_byte_identical() {
        let events = extract_events(&sample_sheets(), "ドクター").events;
        let transcript = write_transcript(&events, BranchDisplay::Inline);
        let shell = Shell::builtin();
        assert_eq!(
            render_document(&transcript, "序章", &shell),
            render_document(&transcript, "序章", &shell)
        );
    }
}
