/// A PII category the masking model must redact
#[derive(Debug, Clone, Copy)]
pub struct PiiCategory {
    /// Name used in the instruction list
    pub name: &'static str,
    /// Bracket tag substituted for matches, without numeric suffix
    pub tag: &'static str,
}

/// Categories redacted on every call
pub const DEFAULT_PII_CATEGORIES: &[PiiCategory] = &[
    PiiCategory { name: "patient names", tag: "PATIENT_NAME" },
    PiiCategory { name: "phone numbers", tag: "PHONE_NUMBER" },
    PiiCategory { name: "street or mailing addresses", tag: "ADDRESS" },
    PiiCategory { name: "email addresses", tag: "EMAIL" },
    PiiCategory { name: "social security numbers", tag: "SSN" },
    PiiCategory { name: "dates of birth", tag: "DATE_OF_BIRTH" },
    PiiCategory { name: "account numbers", tag: "ACCOUNT_NUMBER" },
    PiiCategory { name: "credit card numbers", tag: "CREDIT_CARD" },
    PiiCategory { name: "medical record numbers", tag: "MEDICAL_RECORD_NUMBER" },
];

/// Build the system prompt for PII masking
pub fn build_masking_system_prompt() -> String {
    r#"You redact personally identifiable information from call transcripts. You MUST follow these rules:

1. Replace every instance of a listed PII category with its bracketed tag, e.g. [PATIENT_NAME].
2. When a category has several distinct values, number them: [PATIENT_NAME_1], [PATIENT_NAME_2]. Reuse the same numbered tag for repeat occurrences of the same value.
3. NEVER mask medication names, dosages, or medical conditions. Those must remain readable for clinical review.
4. Preserve the transcript structure EXACTLY: the same lines in the same order, each keeping its "Agent:" or "Customer:" prefix, with the blank line between entries unchanged.
5. Change nothing else. No rewording, no added or removed punctuation, no commentary.

Output only the redacted transcript."#
        .to_string()
}

/// Build the user prompt: category list plus the joined transcript
pub fn build_masking_user_prompt(joined_transcript: &str, categories: &[PiiCategory]) -> String {
    let mut prompt = String::new();

    prompt.push_str("# Categories to Redact\n\n");
    for category in categories {
        prompt.push_str(&format!("- {} -> [{}]\n", category.name, category.tag));
    }
    prompt.push('\n');

    prompt.push_str("# Transcript\n\n");
    prompt.push_str(joined_transcript);
    prompt.push('\n');

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_masking_user_prompt() {
        let joined = "Agent: Thank you for calling.\n\nCustomer: Hi, this is John Smith, DOB 04/12/1961.";
        let prompt = build_masking_user_prompt(joined, DEFAULT_PII_CATEGORIES);

        assert!(prompt.contains("[PATIENT_NAME]"));
        assert!(prompt.contains("[DATE_OF_BIRTH]"));
        assert!(prompt.contains("John Smith"));
        assert!(prompt.contains("Agent: Thank you for calling."));
    }

    #[test]
    fn test_system_prompt_preserves_medications() {
        let prompt = build_masking_system_prompt();
        assert!(prompt.contains("NEVER mask medication names"));
        assert!(prompt.contains("blank line"));
    }
}
