/// What a row's instruction cell (column B) asks the extractor to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    SceneSeparator,
    ImageBetween,
    Image,
    Background,
    DecisionStart,
    DecisionEnd,
    /// `Option_<N>`. The suffix is kept for logging only: options are indexed
    /// by the order their rows appear in, not by N.
    Choice(Option<u32>),
    Branch,
    Speaker(String),
    Narration,
}

const SCENE_SEPARATOR: &str = "----";
const IMAGE_BETWEEN: &str = "--imagetween--";
const IMAGE: &str = "--image--";
const BACKGROUND: &str = "--background--";
const DECISION_START: &str = "--Decision--";
const DECISION_END: &str = "--Decision End--";
const BRANCH: &str = "--Branch--";
const OPTION_PREFIX: &str = "Option_";

impl Instruction {
    pub fn parse(cell: Option<&str>) -> Self {
        let Some(raw) = cell.map(str::trim).filter(|s| !s.is_empty()) else {
            return Instruction::Narration;
        };
        match raw {
            SCENE_SEPARATOR => Instruction::SceneSeparator,
            IMAGE_BETWEEN => Instruction::ImageBetween,
            IMAGE => Instruction::Image,
            BACKGROUND => Instruction::Background,
            DECISION_START => Instruction::DecisionStart,
            DECISION_END => Instruction::DecisionEnd,
            BRANCH => Instruction::Branch,
            s => match s.strip_prefix(OPTION_PREFIX) {
                Some(n) => Instruction::Choice(n.trim().parse().ok()),
                None => Instruction::Speaker(s.to_string()),
            },
        }
    }

    /// Structural markers carry no payload in the content column, so they are
    /// honoured even when that cell is empty.
    pub fn is_structural(&self) -> bool {
        matches!(self, Instruction::DecisionStart | Instruction::DecisionEnd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers() {
        assert_eq!(Instruction::parse(Some("----")), Instruction::SceneSeparator);
        assert_eq!(Instruction::parse(Some("--imagetween--")), Instruction::ImageBetween);
        assert_eq!(Instruction::parse(Some("--image--")), Instruction::Image);
        assert_eq!(Instruction::parse(Some("--background--")), Instruction::Background);
        assert_eq!(Instruction::parse(Some("--Decision--")), Instruction::DecisionStart);
        assert_eq!(Instruction::parse(Some("--Decision End--")), Instruction::DecisionEnd);
        assert_eq!(Instruction::parse(Some(" --Branch-- ")), Instruction::Branch);
    }

    #[test]
    fn option_suffix() {
        assert_eq!(Instruction::parse(Some("Option_3")), Instruction::Choice(Some(3)));
        assert_eq!(Instruction::parse(Some("Option_x")), Instruction::Choice(None));
    }

    #[test]
    fn speaker_and_narration() {
        assert_eq!(
            Instruction::parse(Some("アーミヤ")),
            Instruction::Speaker("アーミヤ".to_string())
        );
        assert_eq!(Instruction::parse(None), Instruction::Narration);
        assert_eq!(Instruction::parse(Some("  ")), Instruction::Narration);
    }

    #[test]
    fn only_decision_bounds_are_structural() {
        assert!(Instruction::DecisionStart.is_structural());
        assert!(Instruction::DecisionEnd.is_structural());
        assert!(!Instruction::Branch.is_structural());
        assert!(!Instruction::Choice(Some(1)).is_structural());
    }
}
