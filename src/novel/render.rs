use std::sync::LazyLock;

use regex::Regex;

use super::blocks::{split_speaker, Block};
use super::branches::{reconstruct, BranchKey, BranchPage};

/// One or two digits followed by a date/time/unit glyph, set upright.
static TCY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,2})([年月日時分秒c])").unwrap());

const LINE_BREAK: &str = "<br>\n            ";

/// Render blocks into page fragments, in order. A branch section expands
/// into several pages.
pub fn render_blocks(blocks: &[Block]) -> Vec<String> {
    let mut pages = Vec::with_capacity(blocks.len());
    for block in blocks {
        match block {
            Block::Heading { text } => pages.push(heading_page(text)),
            Block::ImagePage { url, is_background } => pages.push(image_page(url, *is_background)),
            Block::TextPage { lines } => {
                let body: Vec<String> = lines.iter().map(|l| dialogue_line(l)).collect();
                pages.push(paragraph_page("page text", &body));
            }
            Block::BranchSection { raw_text } => {
                pages.extend(reconstruct(raw_text).iter().map(branch_page));
            }
        }
    }
    pages
}

pub fn branch_page(page: &BranchPage) -> String {
    let body: Vec<String> = match page {
        BranchPage::Menu { choices } => choices.iter().map(|c| choice_span(c)).collect(),
        BranchPage::Choice {
            chosen_label, lines, ..
        } => chosen_page_lines(chosen_label.as_deref(), lines),
        BranchPage::Combined { key, lines } => with_marker(key, lines),
        BranchPage::Tail { lines } => with_marker(&BranchKey::Tail, lines),
    };
    paragraph_page("page branch text", &body)
}

/// The chosen option is highlighted where it appears; every other line,
/// including later option-like lines, is body text.
fn chosen_page_lines(chosen_label: Option<&str>, lines: &[String]) -> Vec<String> {
    let mut pending = chosen_label;
    lines
        .iter()
        .map(|l| {
            if pending == Some(l.as_str()) {
                pending = None;
                choice_span(l)
            } else {
                dialogue_line(l)
            }
        })
        .collect()
}

fn with_marker(key: &BranchKey, lines: &[String]) -> Vec<String> {
    let marker = format!(r#"<span class="branch-marker">{}</span>"#, escape(&key.marker()));
    std::iter::once(marker)
        .chain(lines.iter().map(|l| dialogue_line(l)))
        .collect()
}

fn heading_page(text: &str) -> String {
    let heading = escape(text).replace('\n', "<br>");
    format!("    <div class=\"page\">\n        <h2>{heading}</h2>\n    </div>")
}

fn image_page(url: &str, is_background: bool) -> String {
    let alt = if is_background { "背景" } else { "イラスト" };
    format!(
        "    <div class=\"page\">\n        <img class=\"illustration\" src=\"{}\" alt=\"{alt}\">\n    </div>",
        escape(url)
    )
}

fn paragraph_page(class: &str, body: &[String]) -> String {
    format!(
        "    <div class=\"{class}\">\n        <p>\n            {}\n        </p>\n    </div>",
        body.join(LINE_BREAK)
    )
}

fn choice_span(line: &str) -> String {
    format!(r#"<span class="choice-text">{}</span>"#, escape(line))
}

/// `【name】text` gets the name set apart above the line; anything else is
/// plain prose.
fn dialogue_line(line: &str) -> String {
    match split_speaker(line) {
        Some((name, body)) => format!(
            r#"<span class="speaker">{}</span><br>{}"#,
            escape(name),
            inline(body)
        ),
        None => inline(line),
    }
}

fn inline(text: &str) -> String {
    TCY_RE
        .replace_all(&escape(text), r#"<span class="tcy">$1</span>$2"#)
        .into_owned()
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speaker_lines_and_tcy() {
        let pages = render_blocks(&[Block::TextPage {
            lines: vec!["【アーミヤ】3日後に出発します。".into(), "2024年、冬。".into()],
        }]);
        assert_eq!(pages.len(), 1);
        let page = &pages[0];
        assert!(page.starts_with("    <div class=\"page text\">"));
        assert!(page.contains(
            r#"<span class="speaker">【アーミヤ】</span><br><span class="tcy">3</span>日後に出発します。"#
        ));
        assert!(page.contains(r#"20<span class="tcy">24</span>年、冬。"#));
        assert!(page.contains("出発します。<br>\n            20"));
    }

    #[test]
    fn untrusted_text_is_escaped() {
        let pages = render_blocks(&[Block::TextPage {
            lines: vec!["<script>alert(\"x\")</script> & more".into()],
        }]);
        assert!(pages[0].contains("&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; more"));
        assert!(!pages[0].contains("<script>"));
    }

    #[test]
    fn heading_and_images() {
        let pages = render_blocks(&[
            Block::Heading {
                text: "序章\n夜明け".into(),
            },
            Block::ImagePage {
                url: "https://example.com/bg.png".into(),
                is_background: true,
            },
            Block::ImagePage {
                url: "https://example.com/a.png".into(),
                is_background: false,
            },
        ]);
        assert!(pages[0].contains("<h2>序章<br>夜明け</h2>"));
        assert!(pages[1].contains(r#"src="https://example.com/bg.png" alt="背景""#));
        assert!(pages[2].contains(r#"alt="イラスト""#));
    }

    #[test]
    fn branch_section_expands_to_pages() {
        let pages = render_blocks(&[Block::BranchSection {
            raw_text: "【ドクターの選択肢】\n選択肢1: 逃げる\n選択肢2: 戦う\n\
                       【分岐: >Options_1】\n選択肢1: 逃げる\n【アーミヤ】了解です。\n\
                       【分岐: End of Options】\n選択肢1: 逃げる\n夜が明けた。"
                .into(),
        }]);
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.contains("class=\"page branch text\"")));
        assert!(pages[0].contains(r#"<span class="choice-text">選択肢2: 戦う</span>"#));
        assert!(pages[1].contains(r#"<span class="choice-text">選択肢1: 逃げる</span>"#));
        assert!(pages[1].contains(r#"<span class="speaker">【アーミヤ】</span><br>了解です。"#));
        assert!(pages[2].contains(r#"<span class="branch-marker">【分岐: End of Options】</span>"#));
        assert!(!pages[2].contains("choice-text"));
    }

    #[test]
    fn only_the_chosen_line_is_highlighted() {
        let pages = reconstruct("【分岐: >Options_1】\n選択肢1: A\n【アーミヤ】いいえ。\n選択肢2: B");
        let page = branch_page(&pages[0]);
        assert!(page.contains(r#"<span class="choice-text">選択肢1: A</span>"#));
        assert!(!page.contains(r#"<span class="choice-text">選択肢2: B</span>"#));
        assert!(page.contains("いいえ。<br>\n            選択肢2: B"));
    }

    #[test]
    fn chosen_line_keeps_its_position() {
        let page = branch_page(&BranchPage::Choice {
            index: 2,
            chosen_label: Some("選択肢2: 戦う".into()),
            lines: vec!["彼女は振り返った。".into(), "選択肢2: 戦う".into()],
        });
        assert!(page.contains(
            "彼女は振り返った。<br>\n            <span class=\"choice-text\">選択肢2: 戦う</span>"
        ));
    }

    #[test]
    fn combined_page_shows_marker_not_choices() {
        let page = branch_page(&BranchPage::Combined {
            key: BranchKey::Combined("1&2".into()),
            lines: vec!["同じ結末。".into()],
        });
        assert!(page.contains("【分岐: &gt;Options_1&amp;2】"));
        assert!(page.contains("同じ結末。"));
    }
}
