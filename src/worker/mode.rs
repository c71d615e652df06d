//! Result mode labeling as an explicit state machine
//!
//! Replaces ad hoc mode-string concatenation: the base records which
//! enrichment paths fired (collaboration dominates plain context), the
//! degradation records which reasoning tier answered. `label()` renders the
//! composable wire string (`agent-collab-fallback`, ...).

use crate::reasoning::Degradation;

/// Enrichment level of the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaseMode {
    /// No context, no collaboration
    #[default]
    Simple,
    /// Memory context was prepended
    Contextual,
    /// At least one peer collaboration exchange ran (dominates Contextual)
    Collaborative,
}

/// Composable mode tracked through the worker pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AgentMode {
    base: BaseMode,
    degradation: Option<Degradation>,
}

impl AgentMode {
    pub fn new() -> Self {
        Self::default()
    }

    /// A collaboration exchange ran (success or timeout)
    pub fn note_collaboration(&mut self) {
        self.base = BaseMode::Collaborative;
    }

    /// Context was found; upgrades Simple only, since collaboration
    /// labeling takes precedence
    pub fn note_context(&mut self) {
        if self.base == BaseMode::Simple {
            self.base = BaseMode::Contextual;
        }
    }

    /// Record which degraded reasoning path fired, if any
    pub fn note_degradation(&mut self, degradation: Option<Degradation>) {
        self.degradation = degradation;
    }

    pub fn base(&self) -> BaseMode {
        self.base
    }

    /// Render the wire label
    pub fn label(&self) -> String {
        let base = match self.base {
            BaseMode::Simple => "simple",
            BaseMode::Contextual => "contextual",
            BaseMode::Collaborative => "agent-collab",
        };
        match self.degradation {
            Some(degradation) => format!("{}{}", base, degradation.suffix()),
            None => base.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_simple() {
        assert_eq!(AgentMode::new().label(), "simple");
    }

    #[test]
    fn test_context_upgrades_simple() {
        let mut mode = AgentMode::new();
        mode.note_context();
        assert_eq!(mode.label(), "contextual");
    }

    #[test]
    fn test_collaboration_dominates_context() {
        let mut mode = AgentMode::new();
        mode.note_collaboration();
        mode.note_context();
        assert_eq!(mode.label(), "agent-collab");

        // Order does not matter
        let mut mode = AgentMode::new();
        mode.note_context();
        mode.note_collaboration();
        assert_eq!(mode.label(), "agent-collab");
    }

    #[test]
    fn test_degradation_suffixes() {
        let mut mode = AgentMode::new();
        mode.note_degradation(Some(Degradation::Fallback));
        assert_eq!(mode.label(), "simple-fallback");

        let mut mode = AgentMode::new();
        mode.note_collaboration();
        mode.note_degradation(Some(Degradation::ApologyFallback));
        assert_eq!(mode.label(), "agent-collab-error-fallback");
    }

    #[test]
    fn test_contextual_fallback_composition() {
        let mut mode = AgentMode::new();
        mode.note_context();
        mode.note_degradation(Some(Degradation::Fallback));
        assert_eq!(mode.label(), "contextual-fallback");
    }
}
