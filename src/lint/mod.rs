//! Judgment linter for fact statements.
//!
//! A cause tree should hold observable facts. Blame and opinion vocabulary
//! ("culpa", "negligente", "estaba distraído") signals an interpretation that
//! belongs in the node notes instead. The check is advisory and never blocks
//! a save.

use crate::tree::NodeDraft;

/// Blame and opinion stems, matched case-insensitively as substrings.
const JUDGEMENT_TERMS: &[&str] = &[
    // es
    "culpa",
    "negligenc",
    "negligente",
    "irresponsable",
    "descuidado",
    "imprudente",
    "peligroso",
    "mala suerte",
    "distraíd",
    "distraid",
    // en
    "fault",
    "negligent",
    "careless",
    "reckless",
    "irresponsible",
    "bad luck",
    "was distracted",
];

/// True when `text` reads as a judgment rather than an observable fact.
pub fn looks_like_judgement(text: &str) -> bool {
    !judgement_terms(text).is_empty()
}

/// The terms of the word list found in `text`.
pub fn judgement_terms(text: &str) -> Vec<&'static str> {
    let lowered = text.to_lowercase();
    JUDGEMENT_TERMS
        .iter()
        .copied()
        .filter(|term| lowered.contains(term))
        .collect()
}

/// Move the draft text verbatim into its notes and clear the text.
///
/// Existing notes are kept, separated by a blank line. Returns `false` and
/// leaves the draft alone when the text is blank.
pub fn move_to_notes(draft: &mut NodeDraft) -> bool {
    let text = draft.text.trim();
    if text.is_empty() {
        return false;
    }
    let notes = match draft.notes.as_deref().map(str::trim) {
        Some(existing) if !existing.is_empty() => format!("{}\n\n{}", existing, text),
        _ => text.to_string(),
    };
    draft.notes = Some(notes);
    draft.text.clear();
    true
}
