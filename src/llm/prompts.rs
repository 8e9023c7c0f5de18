//! Prompt assembly for the external generator capability.

use std::fmt::Write as _;

use crate::corpus::Exemplar;

/// Prompt asking the generator for one novel interview question testing
/// `skill`, seeded with sample questions from the corpus. Tolerates an
/// empty sample list: the samples section is simply omitted.
#[must_use]
pub fn question_prompt(skill: &str, samples: &[String]) -> String {
    let mut prompt = format!(
        "You are an HR interviewer preparing a candidate assessment. \
         Write exactly one new interview question that tests {skill}. \
         Respond with the question text only."
    );
    if !samples.is_empty() {
        prompt.push_str("\n\nHere are sample questions previously asked for this role:\n");
        for sample in samples {
            let _ = writeln!(prompt, "- {sample}");
        }
        prompt.push_str("Write a question in the same spirit, but not a copy of any sample.");
    }
    prompt
}

/// Prompt asking the generator to rate and critique a candidate's answer,
/// grounded in retrieved historical exemplars when any exist. With zero
/// exemplars the examples section is omitted entirely and the generator
/// evaluates from its own knowledge.
#[must_use]
pub fn feedback_prompt(
    question: &str,
    answer: &str,
    skill: &str,
    exemplars: &[Exemplar],
) -> String {
    let mut prompt = format!(
        "You are a response evaluator responsible for providing a rating \
         and feedback for an interview answer testing {skill}. If relevant \
         examples are provided, ground your evaluation in them; otherwise \
         evaluate based on your own knowledge."
    );
    if !exemplars.is_empty() {
        prompt.push_str("\n----------------\nExamples:\n");
        for exemplar in exemplars {
            let _ = write!(
                prompt,
                "\nQuestion: {}\nResponse: {}\nRating: {}\n",
                exemplar.question, exemplar.answer, exemplar.rating
            );
        }
        prompt.push_str("----------------\n");
    }
    let _ = write!(
        prompt,
        "\nNow provide the feedback and rating for the question and response below.\n\
         Question: {question}\nResponse: {answer}\n"
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_prompt_includes_samples() {
        let prompt = question_prompt(
            "management",
            &["How do you delegate?".to_string(), "Describe a hard call.".to_string()],
        );
        assert!(prompt.contains("management"));
        assert!(prompt.contains("- How do you delegate?"));
        assert!(prompt.contains("- Describe a hard call."));
    }

    #[test]
    fn question_prompt_without_samples_omits_the_section() {
        let prompt = question_prompt("technical", &[]);
        assert!(prompt.contains("technical"));
        assert!(!prompt.contains("sample questions"));
    }

    #[test]
    fn feedback_prompt_lists_exemplars_with_ratings() {
        let exemplars = vec![Exemplar {
            question: "Tell me about teamwork".into(),
            answer: "I pair daily".into(),
            rating: 4.0,
        }];
        let prompt = feedback_prompt("Q", "A", "social", &exemplars);
        assert!(prompt.contains("Examples:"));
        assert!(prompt.contains("Tell me about teamwork"));
        assert!(prompt.contains("Rating: 4"));
        assert!(prompt.contains("Question: Q"));
        assert!(prompt.contains("Response: A"));
    }

    #[test]
    fn feedback_prompt_with_no_exemplars_omits_examples_block() {
        let prompt = feedback_prompt("Q", "A", "social", &[]);
        assert!(!prompt.contains("Examples:"));
        assert!(prompt.contains("Question: Q"));
    }
}
