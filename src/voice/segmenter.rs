//! Split text into same-script runs.

use serde::Serialize;

use super::script::{ScriptClass, ScriptClassifier};
use crate::error::{Result, VoiceError};

/// A maximal stretch of text in one script class. `text` is trimmed and
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextRun {
    pub class: ScriptClass,
    pub text: String,
}

impl TextRun {
    pub fn new(class: ScriptClass, text: impl Into<String>) -> Self {
        Self {
            class,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    classifier: ScriptClassifier,
}

impl Segmenter {
    pub fn new(classifier: ScriptClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &ScriptClassifier {
        &self.classifier
    }

    /// Segment `text` into ordered runs; adjacent runs always differ in class.
    pub fn segment(&self, text: &str) -> Result<Vec<TextRun>> {
        if text.trim().is_empty() {
            return Err(VoiceError::InputEmpty);
        }

        let mut runs = Vec::new();
        let mut open: Option<ScriptClass> = None;
        let mut current = String::new();

        for c in text.chars() {
            match (self.classifier.script_of(c), open) {
                (Some(class), Some(open_class)) if class != open_class && !c.is_whitespace() => {
                    push_run(&mut runs, open_class, &current);
                    current.clear();
                    open = Some(class);
                }
                // First scripted character; any neutral prefix joins its run.
                (Some(class), None) => open = Some(class),
                _ => {}
            }
            current.push(c);
        }

        push_run(&mut runs, open.unwrap_or(ScriptClass::Primary), &current);

        if runs.is_empty() {
            return Err(VoiceError::InputEmpty);
        }
        Ok(runs)
    }
}

/// Append a trimmed run, merging with the previous run if trimming left two
/// neighbours of the same class.
fn push_run(runs: &mut Vec<TextRun>, class: ScriptClass, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    match runs.last_mut() {
        Some(last) if last.class == class => {
            last.text.push(' ');
            last.text.push_str(text);
        }
        _ => runs.push(TextRun::new(class, text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ScriptClass::{Primary, Secondary};

    fn segment(text: &str) -> Vec<TextRun> {
        Segmenter::default().segment(text).unwrap()
    }

    #[test]
    fn primary_only_is_one_trimmed_run() {
        assert_eq!(segment("  hello world \n"), vec![TextRun::new(Primary, "hello world")]);
    }

    #[test]
    fn mixed_greeting_splits_into_three_runs() {
        assert_eq!(
            segment("สวัสดี hello เธอ"),
            vec![
                TextRun::new(Secondary, "สวัสดี"),
                TextRun::new(Primary, "hello"),
                TextRun::new(Secondary, "เธอ"),
            ]
        );
    }

    #[test]
    fn punctuation_stays_with_open_run() {
        assert_eq!(
            segment("เย้! เธอทำครบทุก goal วันนี้แล้ว! Proud of you!"),
            vec![
                TextRun::new(Secondary, "เย้! เธอทำครบทุก"),
                TextRun::new(Primary, "goal"),
                TextRun::new(Secondary, "วันนี้แล้ว!"),
                TextRun::new(Primary, "Proud of you!"),
            ]
        );
    }

    #[test]
    fn leading_neutral_characters_join_first_run() {
        assert_eq!(segment("(สวัสดี)"), vec![TextRun::new(Secondary, "(สวัสดี)")]);
        assert_eq!(segment("42 hello"), vec![TextRun::new(Primary, "42 hello")]);
    }

    #[test]
    fn neutral_only_input_is_primary() {
        assert_eq!(segment("123 !!"), vec![TextRun::new(Primary, "123 !!")]);
    }

    #[test]
    fn switch_without_whitespace_still_splits() {
        assert_eq!(
            segment("helloสวัสดีworld"),
            vec![
                TextRun::new(Primary, "hello"),
                TextRun::new(Secondary, "สวัสดี"),
                TextRun::new(Primary, "world"),
            ]
        );
    }

    #[test]
    fn run_count_matches_maximal_substrings() {
        let text = "a ก b ข c ค";
        let runs = segment(text);
        assert_eq!(runs.len(), 6);
        for pair in runs.windows(2) {
            assert_ne!(pair[0].class, pair[1].class);
        }
        let joined: String = runs.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join(" ");
        let strip = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        assert_eq!(strip(&joined), strip(text));
    }

    #[test]
    fn concatenated_same_class_runs_merge() {
        let a = segment("good morning");
        let b = segment("have a nice day");
        let joined = format!("{} {}", a[0].text, b[0].text);
        assert_eq!(segment(&joined).len(), 1);

        let th = format!("{}{}", segment("สวัสดี")[0].text, segment("ครับ")[0].text);
        assert_eq!(segment(&th), vec![TextRun::new(Secondary, "สวัสดีครับ")]);
    }

    #[test]
    fn empty_and_blank_input_rejected() {
        let s = Segmenter::default();
        assert!(matches!(s.segment(""), Err(VoiceError::InputEmpty)));
        assert!(matches!(s.segment(" \t\n"), Err(VoiceError::InputEmpty)));
    }
}
