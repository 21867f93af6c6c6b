/// Instruction template for the insight report. Only the review text between
/// the two halves varies.
const PROMPT_HEAD: &str = "\
You are an API that analyzes app reviews.
Analyze the following text and return ONLY a JSON object.
Do not include markdown formatting.

TEXT TO ANALYZE:
'''
";

const PROMPT_TAIL: &str = r#"
'''

REQUIRED JSON STRUCTURE:
{
  "summary": "A 2-sentence executive summary of the reviews.",
  "pain_points": [
    {
      "issue": "Short title of the problem",
      "frequency": "High/Medium/Low",
      "example_quote": "A direct quote from the text"
    }
  ],
  "actions": [
    "Specific action step 1",
    "Specific action step 2",
    "Specific action step 3"
  ],
  "details": "A deeper paragraph explaining the context of the pain points and user sentiment."
}
"#;

pub fn build_prompt(review_text: &str) -> String {
    let mut prompt =
        String::with_capacity(PROMPT_HEAD.len() + review_text.len() + PROMPT_TAIL.len());
    prompt.push_str(PROMPT_HEAD);
    prompt.push_str(review_text);
    prompt.push_str(PROMPT_TAIL);
    prompt
}
