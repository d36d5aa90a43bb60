pub mod extractor;
pub mod instruction;
pub mod transcript;

use crate::config::BranchDisplay;
use crate::workbook::Sheet;
use extractor::ExtractStats;

/// Rows → events → transcript text.
pub fn build_transcript(sheets: &[Sheet], nickname: &str, display: BranchDisplay) -> (String, ExtractStats) {
    let extraction = extractor::extract_events(sheets, nickname);
    let text = transcript::write_transcript(&extraction.events, display);
    (text, extraction.stats)
}
