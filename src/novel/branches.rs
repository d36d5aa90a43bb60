use std::collections::BTreeMap;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use tracing::debug;

use crate::script::transcript::{BRANCH_OPEN, CHOICES_HEADER};

static OPTIONS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">Options_([0-9&]+)").unwrap());

const TAIL_LABEL: &str = "End of Options";

/// Which outcome a `【分岐: …】` marker opens. The derived order is the page
/// order: single options by index, combined ones by their label text, the
/// tail last.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BranchKey {
    Single(u32),
    /// Sorted, de-duplicated indices joined with `&`.
    Combined(String),
    Tail,
}

impl BranchKey {
    pub fn from_label(label: &str) -> Option<Self> {
        if let Some(caps) = OPTIONS_RE.captures(label) {
            let indices: Vec<u32> = caps[1]
                .split('&')
                .filter_map(|n| n.parse::<u32>().ok())
                .filter(|&n| n > 0)
                .sorted_unstable()
                .dedup()
                .collect();
            return match indices.as_slice() {
                [] => None,
                [n] => Some(BranchKey::Single(*n)),
                many => Some(BranchKey::Combined(many.iter().join("&"))),
            };
        }
        label.contains(TAIL_LABEL).then_some(BranchKey::Tail)
    }

    /// Marker shown at the top of pages that don't repeat the choice text.
    pub fn marker(&self) -> String {
        match self {
            BranchKey::Single(n) => format!("{BRANCH_OPEN} >Options_{n}】"),
            BranchKey::Combined(label) => format!("{BRANCH_OPEN} >Options_{label}】"),
            BranchKey::Tail => format!("{BRANCH_OPEN} {TAIL_LABEL}】"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchOutcome {
    pub chosen_label: Option<String>,
    pub body_lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchPage {
    /// Every choice of the decision, shown once.
    Menu { choices: Vec<String> },
    /// One option's outcome. The chosen line is part of `lines`.
    Choice {
        index: u32,
        chosen_label: Option<String>,
        lines: Vec<String>,
    },
    /// An outcome several options share; choice lines are left out.
    Combined { key: BranchKey, lines: Vec<String> },
    /// What follows the decision regardless of the choice.
    Tail { lines: Vec<String> },
}

/// Outcome being filled in while walking the lines after a marker.
#[derive(Debug, Default)]
struct Accumulator {
    key: Option<BranchKey>,
    outcome: BranchOutcome,
    awaiting_choice_line: bool,
}

impl Accumulator {
    fn open(key: Option<BranchKey>) -> Self {
        Accumulator {
            key,
            outcome: BranchOutcome::default(),
            awaiting_choice_line: true,
        }
    }

    fn push(&mut self, line: &str) {
        if self.awaiting_choice_line && is_choice_line(line) {
            self.outcome.chosen_label = Some(line.to_string());
            self.awaiting_choice_line = false;
        }
        self.outcome.body_lines.push(line.to_string());
    }

    /// Merge into `outcomes`. Keyless outcomes come from labels we couldn't
    /// read and are dropped.
    fn close(self, outcomes: &mut BTreeMap<BranchKey, BranchOutcome>) {
        let Some(key) = self.key else {
            if !self.outcome.body_lines.is_empty() {
                debug!(lines = self.outcome.body_lines.len(), "dropped lines of an unreadable branch marker");
            }
            return;
        };
        let entry = outcomes.entry(key).or_default();
        if entry.chosen_label.is_none() {
            entry.chosen_label = self.outcome.chosen_label;
        }
        entry.body_lines.extend(self.outcome.body_lines);
    }
}

fn is_choice_line(line: &str) -> bool {
    line.starts_with("選択肢") || line.starts_with("選択:")
}

/// Rebuild the pages of one branch section: the shared menu, one page per
/// single option, one per combined outcome, then the tail.
pub fn reconstruct(raw_text: &str) -> Vec<BranchPage> {
    let mut all_choices: Vec<String> = Vec::new();
    let mut outcomes: BTreeMap<BranchKey, BranchOutcome> = BTreeMap::new();
    let mut current: Option<Accumulator> = None;

    for line in raw_text.lines().map(str::trim) {
        if line.starts_with(CHOICES_HEADER) {
            continue;
        }

        if let Some(rest) = line.strip_prefix(BRANCH_OPEN) {
            if let Some(prev) = current.take() {
                prev.close(&mut outcomes);
            }
            let label = rest.trim_end_matches('】').trim();
            let key = BranchKey::from_label(label);
            if key.is_none() {
                debug!(label, "unreadable branch label");
            }
            current = Some(Accumulator::open(key));
            continue;
        }

        match current.as_mut() {
            None if is_choice_line(line) => all_choices.push(line.to_string()),
            None => {}
            Some(acc) if !line.is_empty() => acc.push(line),
            Some(_) => {}
        }
    }
    if let Some(last) = current.take() {
        last.close(&mut outcomes);
    }

    let mut pages = Vec::with_capacity(outcomes.len() + 1);
    let choices: Vec<String> = all_choices.into_iter().unique().collect();
    if !choices.is_empty() {
        pages.push(BranchPage::Menu { choices });
    }

    for (key, outcome) in outcomes {
        let page = match key {
            BranchKey::Single(index) => BranchPage::Choice {
                index,
                chosen_label: outcome.chosen_label,
                lines: outcome.body_lines,
            },
            key @ BranchKey::Combined(_) => BranchPage::Combined {
                key,
                lines: without_choice_lines(outcome.body_lines),
            },
            BranchKey::Tail => BranchPage::Tail {
                lines: without_choice_lines(outcome.body_lines),
            },
        };
        pages.push(page);
    }
    pages
}

fn without_choice_lines(lines: Vec<String>) -> Vec<String> {
    lines.into_iter().filter(|l| !is_choice_line(l)).collect()
}
