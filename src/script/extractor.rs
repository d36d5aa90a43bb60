use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::instruction::Instruction;
use crate::workbook::{Row, Sheet};

static OPTIONS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">Options_([0-9&]+)").unwrap());

pub const NICKNAME_TOKEN: &str = "{@nickname}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Image,
    Background,
}

/// An option a branch row points at, already resolved against the current
/// decision block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedOption {
    /// 1-based, positional.
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SceneHeading { name: String },
    Dialogue { speaker: Option<String>, text: String },
    ImageRef { kind: ImageKind, url: String },
    ChoiceList { options: Vec<String> },
    BranchRef { raw_label: String, selected: Vec<SelectedOption> },
}

impl Event {
    pub fn selected_options(&self) -> Vec<usize> {
        match self {
            Event::BranchRef { selected, .. } => selected.iter().map(|o| o.index).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub sheets: usize,
    pub rows: usize,
    pub skipped: usize,
    pub decisions: usize,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub events: Vec<Event>,
    pub stats: ExtractStats,
}

/// Decision bookkeeping. Threaded through every sheet of a run; only
/// `--Decision--` resets it.
#[derive(Debug, Default)]
struct DecisionState {
    in_decision: bool,
    options: Vec<String>,
    choice_list_emitted: bool,
}

struct Extractor<'a> {
    nickname: &'a str,
    decision: DecisionState,
    events: Vec<Event>,
    stats: ExtractStats,
}

/// Walk all sheets in order and flatten them into transcript events.
pub fn extract_events(sheets: &[Sheet], nickname: &str) -> Extraction {
    let mut ex = Extractor {
        nickname,
        decision: DecisionState::default(),
        events: Vec::new(),
        stats: ExtractStats::default(),
    };

    for sheet in sheets {
        ex.stats.sheets += 1;
        ex.events.push(Event::SceneHeading {
            name: sheet.name.clone(),
        });
        for row in &sheet.rows {
            ex.stats.rows += 1;
            ex.step(row);
        }
        debug!(sheet = %sheet.name, events = ex.events.len(), "extracted sheet");
    }

    if ex.decision.in_decision {
        warn!(
            options = ex.decision.options.len(),
            "decision block never closed; its options were not listed"
        );
    }

    Extraction {
        events: ex.events,
        stats: ex.stats,
    }
}

impl Extractor<'_> {
    fn step(&mut self, row: &Row) {
        let instruction = Instruction::parse(row.instruction.as_deref());
        let content = row.content.as_deref().map(str::trim).unwrap_or_default();

        if content.is_empty() && !instruction.is_structural() {
            self.stats.skipped += 1;
            return;
        }

        match instruction {
            Instruction::DecisionStart => {
                if self.decision.in_decision && !self.decision.choice_list_emitted {
                    warn!(
                        options = self.decision.options.len(),
                        "decision block reopened before it was closed"
                    );
                }
                self.stats.decisions += 1;
                self.decision = DecisionState {
                    in_decision: true,
                    ..DecisionState::default()
                };
            }
            Instruction::Choice(label) => {
                if self.decision.in_decision {
                    self.decision.options.push(content.to_string());
                } else {
                    debug!(?label, option = content, "option outside a decision block ignored");
                }
            }
            Instruction::DecisionEnd => {
                self.decision.in_decision = false;
                if !self.decision.options.is_empty() && !self.decision.choice_list_emitted {
                    self.events.push(Event::ChoiceList {
                        options: self.decision.options.clone(),
                    });
                    self.decision.choice_list_emitted = true;
                }
            }
            Instruction::Branch => {
                let event = Event::BranchRef {
                    raw_label: content.to_string(),
                    selected: resolve_options(content, &self.decision.options),
                };
                debug!(label = content, selected = ?event.selected_options(), "branch");
                self.events.push(event);
            }
            Instruction::Image => self.events.push(Event::ImageRef {
                kind: ImageKind::Image,
                url: content.to_string(),
            }),
            Instruction::Background => self.events.push(Event::ImageRef {
                kind: ImageKind::Background,
                url: content.to_string(),
            }),
            Instruction::ImageBetween | Instruction::SceneSeparator => {}
            Instruction::Speaker(name) => {
                let text = content.replace(NICKNAME_TOKEN, self.nickname);
                self.events.push(Event::Dialogue {
                    speaker: Some(name),
                    text,
                });
            }
            Instruction::Narration => {
                let text = content.replace(NICKNAME_TOKEN, self.nickname);
                self.events.push(Event::Dialogue {
                    speaker: None,
                    text,
                });
            }
        }
    }
}

/// Parse `>Options_N[&M...]` out of a branch label and look each index up in
/// the current option list. Indices that are zero, unparsable or past the
/// end are dropped.
pub fn resolve_options(label: &str, options: &[String]) -> Vec<SelectedOption> {
    let Some(caps) = OPTIONS_RE.captures(label) else {
        return Vec::new();
    };
    caps[1]
        .split('&')
        .filter_map(|n| n.parse::<usize>().ok())
        .filter(|&n| n >= 1 && n <= options.len())
        .map(|index| SelectedOption {
            index,
            text: options[index - 1].clone(),
        })
        .collect()
}
