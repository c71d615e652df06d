//! Collaboration request extraction from free text
//!
//! Tasks may embed instructions like "Check with the CFO about pricing."
//! This is a heuristic, single-pass, non-recursive parser: one request per
//! lexical match, no resolution of coordinating conjunctions. "Ask CFO and
//! CMO about X." yields a single request targeting the CFO, with the rest of
//! the sentence as its question; each additional target needs its own
//! matching clause. Kept pure so the heuristics never leak into the worker
//! pipeline.

use crate::roles::RoleId;
use regex::Regex;
use std::sync::OnceLock;

/// Question substituted when the trailing clause is empty or too short
pub const DEFAULT_QUESTION: &str = "Please advise on the relevant matter.";

/// Minimum trailing-clause length to be used as the question verbatim
const MIN_QUESTION_LEN: usize = 3;

/// How the requester phrased the consultation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollabVerb {
    CheckWith,
    Ask,
    ConfirmWith,
}

impl CollabVerb {
    fn parse(text: &str) -> Self {
        match text.to_ascii_lowercase().as_str() {
            "check with" => CollabVerb::CheckWith,
            "confirm with" => CollabVerb::ConfirmWith,
            _ => CollabVerb::Ask,
        }
    }
}

/// One parsed cross-role consultation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaborationRequest {
    /// Target peer; never equals the requesting role
    pub agent: RoleId,
    pub verb: CollabVerb,
    pub question: String,
}

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(check with|ask|confirm with)\s+(?:the\s+)?(ceo|cfo|cmo|cto)([^.?!]*)[.?!]")
            .expect("collaboration pattern is valid")
    })
}

/// Extract all collaboration requests from `text`, excluding self-loops
pub fn extract_collab_requests(text: &str, requester: RoleId) -> Vec<CollaborationRequest> {
    let mut requests = Vec::new();

    for captures in pattern().captures_iter(text) {
        let verb = CollabVerb::parse(&captures[1]);

        let agent = match captures[2].parse::<RoleId>() {
            Ok(role) => role,
            Err(_) => continue,
        };
        if agent == requester {
            continue;
        }

        let clause = captures.get(3).map_or("", |m| m.as_str()).trim();
        let question = if clause.len() < MIN_QUESTION_LEN {
            DEFAULT_QUESTION.to_string()
        } else {
            clause.to_string()
        };

        requests.push(CollaborationRequest {
            agent,
            verb,
            question,
        });
    }

    requests
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_collaboration_phrase() {
        let requests = extract_collab_requests("Design a logo tagline.", RoleId::Cmo);
        assert!(requests.is_empty());
    }

    #[test]
    fn test_basic_extraction() {
        let requests =
            extract_collab_requests("Refine GTM. Check with CFO about pricing.", RoleId::Ceo);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].agent, RoleId::Cfo);
        assert_eq!(requests[0].verb, CollabVerb::CheckWith);
        assert_eq!(requests[0].question, "about pricing");
    }

    #[test]
    fn test_the_article_and_case_insensitive() {
        let requests =
            extract_collab_requests("ASK THE CTO about the deployment plan?", RoleId::Ceo);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].agent, RoleId::Cto);
        assert_eq!(requests[0].verb, CollabVerb::Ask);
        assert_eq!(requests[0].question, "about the deployment plan");
    }

    #[test]
    fn test_self_loop_skipped() {
        let requests = extract_collab_requests("Check with the CEO about vision.", RoleId::Ceo);
        assert!(requests.is_empty());
    }

    #[test]
    fn test_short_clause_gets_default_question() {
        let requests = extract_collab_requests("Confirm with the CFO.", RoleId::Cmo);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].verb, CollabVerb::ConfirmWith);
        assert_eq!(requests[0].question, DEFAULT_QUESTION);
    }

    #[test]
    fn test_multiple_clauses_yield_multiple_requests() {
        let text = "Plan the launch. Ask the CTO about infra costs. Confirm with the CFO on budget.";
        let requests = extract_collab_requests(text, RoleId::Ceo);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].agent, RoleId::Cto);
        assert_eq!(requests[1].agent, RoleId::Cfo);
        assert_eq!(requests[1].question, "on budget");
    }

    // Compound targets are undefined in the grammar: the second role name
    // is swallowed into the first request's trailing clause. Pinned here
    // so a change in behavior is a deliberate decision.
    #[test]
    fn test_compound_targets_not_merged() {
        let requests = extract_collab_requests("Ask CFO and CMO about pricing.", RoleId::Ceo);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].agent, RoleId::Cfo);
        assert_eq!(requests[0].question, "and CMO about pricing");
    }

    #[test]
    fn test_unterminated_sentence_not_matched() {
        // The grammar requires a sentence terminator after the clause
        let requests = extract_collab_requests("Check with CFO about pricing", RoleId::Ceo);
        assert!(requests.is_empty());
    }
}
