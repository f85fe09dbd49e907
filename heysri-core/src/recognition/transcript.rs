//! Rolling transcript of one listening session.
//!
//! Final text only grows within a session. The interim suffix is replaced
//! wholesale by every result event and is never merged into the final text.

use super::RecognitionSegment;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    final_text: String,
    interim: String,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one engine result event into the transcript.
    ///
    /// Segments from `result_index` onward are split into finals (appended)
    /// and interims (replacing the previous interim). Returns `true` if
    /// either part changed.
    pub fn apply(&mut self, result_index: usize, results: &[RecognitionSegment]) -> bool {
        let mut finals: Vec<&str> = Vec::new();
        let mut interims: Vec<&str> = Vec::new();

        for segment in results.iter().skip(result_index) {
            let text = segment.transcript.trim();
            if text.is_empty() {
                continue;
            }
            if segment.is_final {
                finals.push(text);
            } else {
                interims.push(text);
            }
        }

        let before_final = self.final_text.len();
        if !finals.is_empty() {
            self.append_final(&finals.join(" "));
        }
        let interim_changed = self.set_interim(&interims.join(" "));

        interim_changed || self.final_text.len() != before_final
    }

    /// Append confirmed text, separated from what is already there by one space.
    pub fn append_final(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.final_text.is_empty() {
            self.final_text.push(' ');
        }
        self.final_text.push_str(text);
    }

    /// Replace the interim suffix. Returns `true` if it changed.
    pub fn set_interim(&mut self, text: &str) -> bool {
        let text = text.trim();
        if self.interim == text {
            return false;
        }
        self.interim = text.to_string();
        true
    }

    pub fn clear_interim(&mut self) -> bool {
        self.set_interim("")
    }

    pub fn clear(&mut self) {
        self.final_text.clear();
        self.interim.clear();
    }

    pub fn final_text(&self) -> &str {
        &self.final_text
    }

    pub fn interim(&self) -> &str {
        &self.interim
    }

    /// Final and interim text joined by a space, trimmed.
    pub fn combined(&self) -> String {
        match (self.final_text.is_empty(), self.interim.is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.final_text.clone(),
            (true, false) => self.interim.clone(),
            (false, false) => format!("{} {}", self.final_text, self.interim),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.final_text.is_empty() && self.interim.is_empty()
    }
}
