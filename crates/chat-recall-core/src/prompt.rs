//! System instruction composition.
//!
//! The instruction sent to the generator has up to three parts, always in
//! this order:
//!
//! 1. [`CITATION_POLICY`], a fixed header describing how to use and cite
//!    the references.
//! 2. The numbered reference lines, verbatim. Omitted when nothing passed
//!    the relevance filter.
//! 3. The caller's persona block, verbatim. Omitted only when absent.
//!
//! The persona is trusted input from the calling layer and is neither
//! sanitized nor truncated.

/// Fixed citation contract placed at the top of every system instruction.
pub const CITATION_POLICY: &str = "\
You are a helpful assistant answering questions about a team's chat history. \
You are given numbered references: prior messages retrieved because they are \
relevant to the user's question.

Follow these rules:
1. Use the references actively. When they contain information relevant to the \
question, build your answer from them.
2. Whenever you use information from a reference, place an inline marker of the \
form {ref:N} immediately after the claim it supports, where N is the reference \
number. Example: The team deploys on Fridays {ref:2}.
3. When an answer draws on several references, combine them and cite each one, \
for example {ref:1}{ref:3}.
4. Never write phrases such as \"Reference [N]\", \"the references\" or \
\"available references\" in your answer. Present the information as your own \
synthesis, for example \"From what I could find, ...\".
5. If the references do not contain the information needed to answer, say that \
that information is not specified. Do not invent details.";

/// Heading placed above the reference lines.
pub const REFERENCES_HEADING: &str = "References:";

/// Build the system instruction for one request.
pub fn compose_system_prompt(reference_lines: &[String], persona: Option<&str>) -> String {
    let mut prompt = String::from(CITATION_POLICY);

    if !reference_lines.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(REFERENCES_HEADING);
        for line in reference_lines {
            prompt.push('\n');
            prompt.push_str(line);
        }
    }

    if let Some(persona) = persona {
        prompt.push_str("\n\n");
        prompt.push_str(persona);
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> Vec<String> {
        vec![
            "Reference [1] (from #backend): We use Postgres".to_string(),
            "Reference [2] (from DM): Redis for caching".to_string(),
        ]
    }

    #[test]
    fn test_policy_mentions_marker_contract() {
        assert!(CITATION_POLICY.contains("{ref:N}"));
        assert!(CITATION_POLICY.contains("From what I could find"));
        assert!(CITATION_POLICY.contains("that information is not specified"));
        assert!(CITATION_POLICY.contains("available references"));
    }

    #[test]
    fn test_prompt_starts_with_policy() {
        let prompt = compose_system_prompt(&lines(), None);
        assert!(prompt.starts_with(CITATION_POLICY));
    }

    #[test]
    fn test_references_in_ordinal_order() {
        let prompt = compose_system_prompt(&lines(), None);
        let first = prompt.find("Reference [1]").unwrap();
        let second = prompt.find("Reference [2]").unwrap();
        assert!(first < second);
        assert!(prompt.contains(REFERENCES_HEADING));
        assert!(prompt.ends_with("Reference [2] (from DM): Redis for caching"));
    }

    #[test]
    fn test_no_references_omits_section() {
        let prompt = compose_system_prompt(&[], None);
        assert_eq!(prompt, CITATION_POLICY);
        assert!(!prompt.contains(REFERENCES_HEADING));
    }

    #[test]
    fn test_persona_appended_last_verbatim() {
        let persona = "You are Ada.\n  Speak   tersely. <b>ok</b>";
        let prompt = compose_system_prompt(&lines(), Some(persona));
        assert!(prompt.ends_with(persona));
        let refs_at = prompt.find("Reference [2]").unwrap();
        let persona_at = prompt.rfind(persona).unwrap();
        assert!(refs_at < persona_at);
    }

    #[test]
    fn test_persona_without_references() {
        let prompt = compose_system_prompt(&[], Some("Be brief."));
        assert_eq!(prompt, format!("{}\n\nBe brief.", CITATION_POLICY));
    }

    #[test]
    fn test_whitespace_persona_kept_as_given() {
        let prompt = compose_system_prompt(&[], Some("   \n"));
        assert_eq!(prompt, format!("{}\n\n   \n", CITATION_POLICY));
    }

    #[test]
    fn test_no_persona_leaves_policy_alone() {
        assert_eq!(compose_system_prompt(&[], None), CITATION_POLICY);
    }

    #[test]
    fn test_long_persona_not_truncated() {
        let persona = "p".repeat(10_000);
        let prompt = compose_system_prompt(&[], Some(&persona));
        assert!(prompt.ends_with(&persona));
    }
}
