// Resume feedback prompt template.
// The wording biases the model toward a flat four-field JSON object; the
// normalizer still treats the reply as untrusted.

pub const FEEDBACK_PROMPT_TEMPLATE: &str = "\
You are a resume expert. Analyze the following resume and provide feedback in JSON with these fields, \
Do not include markdown or code blocks.:
- clarity (as a single string summary, not an object or array)
- strengths (as a single string)
- gaps (as a single string)
- suggestions (as a single string)
Do not use arrays or objects for any field. Again remember, Do not include markdown or code blocks. \
Only return a valid JSON object.

Resume:
{resume_text}";

/// Interpolates the resume text at the end of the fixed instruction.
pub fn build_prompt(resume_text: &str) -> String {
    FEEDBACK_PROMPT_TEMPLATE.replace("{resume_text}", resume_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_text_is_appended_last() {
        let prompt = build_prompt("Jane Doe\nRust engineer");
        assert!(prompt.ends_with("Resume:\nJane Doe\nRust engineer"));
    }

    #[test]
    fn test_prompt_names_all_four_fields() {
        let prompt = build_prompt("");
        for field in ["clarity", "strengths", "gaps", "suggestions"] {
            assert!(prompt.contains(&format!("- {field} (")), "missing {field}");
        }
        assert!(prompt.contains("Only return a valid JSON object."));
    }

    #[test]
    fn test_braces_in_resume_are_left_alone() {
        let prompt = build_prompt("skills: {rust, go}");
        assert!(prompt.ends_with("skills: {rust, go}"));
    }

    #[test]
    fn test_is_deterministic() {
        assert_eq!(build_prompt("abc"), build_prompt("abc"));
    }
}
