//! Per-character script classification.
//!
//! One Unicode block is designated; letters inside it belong to one class and
//! every other letter to the other. Characters that are not letters
//! (whitespace, punctuation, digits, symbols) are neutral and take whichever
//! class is currently open.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::config::ScriptConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptClass {
    Primary,
    Secondary,
}

impl ScriptClass {
    pub fn other(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            _ => None,
        }
    }
}

impl fmt::Display for ScriptClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScriptClassifier {
    block: RangeInclusive<char>,
    block_class: ScriptClass,
}

impl Default for ScriptClassifier {
    fn default() -> Self {
        Self::new(&ScriptConfig::default())
    }
}

impl ScriptClassifier {
    pub fn new(config: &ScriptConfig) -> Self {
        Self {
            block: config.block_start..=config.block_end,
            block_class: config.block_class,
        }
    }

    /// Class a character forces, or `None` if it is neutral.
    ///
    /// Everything in the block counts, including the block's own digits and
    /// punctuation.
    pub fn script_of(&self, c: char) -> Option<ScriptClass> {
        if self.block.contains(&c) {
            Some(self.block_class)
        } else if c.is_alphabetic() {
            Some(self.block_class.other())
        } else {
            None
        }
    }

    /// Whole-text detection for the single-backend path: the block's class if
    /// any block character appears, otherwise the other class.
    pub fn detect(&self, text: &str) -> ScriptClass {
        if text.chars().any(|c| self.block.contains(&c)) {
            self.block_class
        } else {
            self.block_class.other()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thai_letters_are_secondary_latin_primary() {
        let c = ScriptClassifier::default();
        assert_eq!(c.script_of('ส'), Some(ScriptClass::Secondary));
        assert_eq!(c.script_of('\u{0E31}'), Some(ScriptClass::Secondary));
        assert_eq!(c.script_of('h'), Some(ScriptClass::Primary));
        assert_eq!(c.script_of('é'), Some(ScriptClass::Primary));
    }

    #[test]
    fn non_letters_are_neutral() {
        let c = ScriptClassifier::default();
        for ch in [' ', '!', ',', '7', '\n', '🙂'] {
            assert_eq!(c.script_of(ch), None, "{ch:?}");
        }
    }

    #[test]
    fn thai_digits_stay_in_block() {
        let c = ScriptClassifier::default();
        assert_eq!(c.script_of('๓'), Some(ScriptClass::Secondary));
    }

    #[test]
    fn detect_any_block_character_wins() {
        let c = ScriptClassifier::default();
        assert_eq!(c.detect("hello world"), ScriptClass::Primary);
        assert_eq!(c.detect("Proud of you! เย้"), ScriptClass::Secondary);
        assert_eq!(c.detect("123"), ScriptClass::Primary);
    }

    #[test]
    fn block_class_is_configurable() {
        let c = ScriptClassifier::new(&ScriptConfig {
            block_start: '\u{0E00}',
            block_end: '\u{0E7F}',
            block_class: ScriptClass::Primary,
        });
        assert_eq!(c.script_of('ส'), Some(ScriptClass::Primary));
        assert_eq!(c.script_of('h'), Some(ScriptClass::Secondary));
        assert_eq!(c.detect("hello"), ScriptClass::Secondary);
    }
}
