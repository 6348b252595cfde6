//! Prompts for the word-list request.

use std::collections::HashSet;

/// Fixed instruction sent as the system message of every word-list request.
pub const SYSTEM_PROMPT: &str = r#"You help prepare words for the party game "Hat".

## How the game is played
- Players explain every word three times: by talking (round 1), by gestures only (round 2),
  and with a single associated word (round 3).
- Every word therefore has to work in all three rounds.

## Word requirements
- Nouns only, singular, in their dictionary (nominative) form
- Common nouns, unless the theme is explicitly about names
- Avoid abstract concepts that are hard to show with gestures
- Avoid words that are hard to find an association for
- No repetitions
- Between 3 and 25 characters long
- Every word must fit the requested theme

Answer with a JSON object of the form {"words": ["word1", "word2", ...]}"#;

/// Name of the structured-output schema attached to the request.
pub const WORD_LIST_SCHEMA_NAME: &str = "word_list";

/// Build the user instruction for a request.
///
/// On the first attempt `excluded` is empty; on retries it carries every word
/// generated so far so the model does not repeat them.
pub fn build_user_prompt(theme: &str, count: usize, excluded: &HashSet<String>) -> String {
    if excluded.is_empty() {
        return format!("Generate {count} unique words on the theme: {theme}");
    }

    let mut already: Vec<&str> = excluded.iter().map(String::as_str).collect();
    already.sort_unstable();

    format!(
        "Generate {count} more unique words on the theme: {theme}. \
         Words already generated (do not repeat them): {}",
        already.join(", ")
    )
}

/// JSON schema constraining the reply to `{"words": [string, ...]}`.
pub fn word_list_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "words": {
                "type": "array",
                "items": { "type": "string" }
            }
        },
        "required": ["words"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_prompt() {
        let prompt = build_user_prompt("space", 20, &HashSet::new());
        assert_eq!(prompt, "Generate 20 unique words on the theme: space");
    }

    #[test]
    fn test_retry_prompt_lists_exclusions() {
        let excluded: HashSet<String> = ["rocket", "comet"].iter().map(|s| s.to_string()).collect();
        let prompt = build_user_prompt("space", 5, &excluded);
        assert!(prompt.starts_with("Generate 5 more unique words on the theme: space."));
        assert!(prompt.ends_with("comet, rocket"));
    }

    #[test]
    fn test_schema_requires_words() {
        let schema = word_list_schema();
        assert_eq!(schema["properties"]["words"]["type"], "array");
        assert_eq!(schema["required"][0], "words");
    }
}
