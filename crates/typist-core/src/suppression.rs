/// Single-use marker for a clipboard write the engine makes on its own behalf.
///
/// Armed before the write, consumed by the next observed clipboard change
/// whatever caused it. When the token knows what text was written, a change
/// carrying different text is treated as external and is not skipped.
#[derive(Debug, Default)]
pub struct Suppression {
    pending: Option<SelfWrite>,
}

#[derive(Debug, Default)]
struct SelfWrite {
    expected: Option<String>,
}

impl Suppression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm before any step that will touch the clipboard.
    pub fn arm(&mut self) {
        self.pending = Some(SelfWrite::default());
    }

    /// Bind the armed token to the text about to be written.
    pub fn expect(&mut self, text: &str) {
        self.pending = Some(SelfWrite {
            expected: Some(text.to_string()),
        });
    }

    /// Drop the token when the write never happened.
    pub fn disarm(&mut self) {
        self.pending = None;
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// True when the token is armed but not yet bound to any text.
    pub fn is_blind(&self) -> bool {
        matches!(&self.pending, Some(write) if write.expected.is_none())
    }

    /// Consume the token for one observed change. Returns true when that
    /// change is the engine's own write and must not be captured.
    pub fn consume(&mut self, observed: Option<&str>) -> bool {
        match self.pending.take() {
            None => false,
            Some(SelfWrite { expected: None }) => true,
            Some(SelfWrite {
                expected: Some(expected),
            }) => observed == Some(expected.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unarmed_never_skips() {
        let mut suppression = Suppression::new();
        assert!(!suppression.consume(Some("x")));
    }

    #[test]
    fn blind_token_skips_next_change_only() {
        let mut suppression = Suppression::new();
        suppression.arm();
        assert!(suppression.is_blind());
        assert!(suppression.consume(Some("anything")));
        assert!(!suppression.is_armed());
        assert!(!suppression.consume(Some("anything")));
    }

    #[test]
    fn bound_token_skips_matching_text() {
        let mut suppression = Suppression::new();
        suppression.arm();
        suppression.expect("expanded");
        assert!(suppression.consume(Some("expanded")));
    }

    #[test]
    fn bound_token_lets_external_text_through_and_clears() {
        let mut suppression = Suppression::new();
        suppression.expect("expanded");
        assert!(!suppression.consume(Some("copied elsewhere")));
        assert!(!suppression.is_armed());
    }

    #[test]
    fn disarm_clears() {
        let mut suppression = Suppression::new();
        suppression.arm();
        suppression.disarm();
        assert!(!suppression.consume(None));
    }
}
