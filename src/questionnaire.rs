//! Questionnaire assembly
//!
//! Fans one (company, role) request out across the configured skills:
//! sample the corpus per skill, generate one novel question per skill in
//! parallel, then retrieve supporting exemplars for each generated
//! question. Per-skill failures stay per-skill; one bad skill never
//! poisons its siblings.

use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::corpus::{Exemplar, QuestionStore, SamplePool};
use crate::error::{IprepError, Result};
use crate::index::SemanticIndex;
use crate::llm::prompts::{feedback_prompt, question_prompt};
use crate::llm::TextGenerator;
use crate::retrieval::find_exemplars;

/// One generated questionnaire item with its retrieved grounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionnaireEntry {
    pub skill: String,
    pub question: String,
    /// Historical exemplars scoped to the sampled id pool; empty when
    /// retrieval found nothing relevant.
    pub exemplars: Vec<Exemplar>,
}

/// A candidate's answer to one questionnaire item, ready for evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub skill: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub exemplars: Vec<Exemplar>,
}

/// Generated feedback for one answered question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub question: String,
    pub answer: String,
    pub feedback: String,
}

/// Drives the per-skill sample → generate → retrieve pipeline.
pub struct QuestionnaireAssembler<'a> {
    corpus: &'a QuestionStore,
    index: Arc<SemanticIndex>,
    generator: &'a dyn TextGenerator,
    sample_limit: usize,
    top_k: usize,
}

impl std::fmt::Debug for QuestionnaireAssembler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionnaireAssembler")
            .field("sample_limit", &self.sample_limit)
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl<'a> QuestionnaireAssembler<'a> {
    #[must_use]
    pub fn new(
        corpus: &'a QuestionStore,
        index: Arc<SemanticIndex>,
        generator: &'a dyn TextGenerator,
        sample_limit: usize,
        top_k: usize,
    ) -> Self {
        Self {
            corpus,
            index,
            generator,
            sample_limit,
            top_k,
        }
    }

    /// Assemble one questionnaire entry per requested skill.
    ///
    /// Returns one slot per skill, in request order. Sampling misses
    /// degrade to an empty pool (the generator works without samples and
    /// retrieval later finds nothing); generator failures surface in that
    /// skill's slot only. Generation runs on one thread per skill.
    pub fn assemble(
        &self,
        company: &str,
        role: &str,
        skills: &[String],
    ) -> Vec<Result<QuestionnaireEntry>> {
        // The relational store is not shareable across threads, so both
        // sampling and retrieval stay on the caller's thread; only the
        // latency-bound generator calls fan out.
        let pools: Vec<SamplePool> = skills
            .iter()
            .map(|skill| {
                match self
                    .corpus
                    .sample_questions(company, role, skill, self.sample_limit)
                {
                    Ok(pool) => pool,
                    Err(err) if err.is_empty_result() => {
                        tracing::warn!(company, role, skill, "no sample questions, generating unseeded");
                        SamplePool::default()
                    }
                    Err(err) => {
                        tracing::error!(company, role, skill, %err, "sampling failed, generating unseeded");
                        SamplePool::default()
                    }
                }
            })
            .collect();

        let generator = self.generator;
        let generated: Vec<Result<String>> = thread::scope(|scope| {
            let handles: Vec<_> = skills
                .iter()
                .zip(&pools)
                .map(|(skill, pool)| {
                    scope.spawn(move || {
                        let prompt = question_prompt(skill, &pool.questions);
                        generator.generate(&prompt)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(IprepError::Generator(
                            "question generation task panicked".to_string(),
                        ))
                    })
                })
                .collect()
        });

        skills
            .iter()
            .zip(pools)
            .zip(generated)
            .map(|((skill, pool), question)| {
                let question = question?;
                let exemplars = self.exemplars_for(&question, &pool, skill);
                Ok(QuestionnaireEntry {
                    skill: skill.clone(),
                    question,
                    exemplars,
                })
            })
            .collect()
    }

    fn exemplars_for(&self, question: &str, pool: &SamplePool, skill: &str) -> Vec<Exemplar> {
        match find_exemplars(&self.index, self.corpus, question, &pool.ids, self.top_k) {
            Ok(exemplars) => exemplars,
            Err(err) if err.is_empty_result() => {
                tracing::warn!(skill, "no exemplars for generated question");
                Vec::new()
            }
            Err(err) => {
                tracing::error!(skill, %err, "exemplar retrieval failed");
                Vec::new()
            }
        }
    }
}

/// Evaluate every answered question in parallel, one generator call each.
///
/// Returns one slot per input, in input order; a failed evaluation
/// occupies its own slot without affecting the rest.
pub fn evaluate_all(
    generator: &dyn TextGenerator,
    answered: &[AnsweredQuestion],
) -> Vec<Result<Feedback>> {
    thread::scope(|scope| {
        let handles: Vec<_> = answered
            .iter()
            .map(|item| {
                scope.spawn(move || {
                    let prompt =
                        feedback_prompt(&item.question, &item.answer, &item.skill, &item.exemplars);
                    generator.generate(&prompt)
                })
            })
            .collect();
        handles
            .into_iter()
            .zip(answered)
            .map(|(handle, item)| {
                let feedback = handle.join().unwrap_or_else(|_| {
                    Err(IprepError::Generator(
                        "evaluation task panicked".to_string(),
                    ))
                })?;
                Ok(Feedback {
                    question: item.question.clone(),
                    answer: item.answer.clone(),
                    feedback,
                })
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexBuilder;
    use tempfile::TempDir;

    /// Echoes a marker derived from the prompt; fails on demand for
    /// prompts containing `fail_on`.
    struct ScriptedGenerator {
        fail_on: Option<String>,
    }

    impl TextGenerator for ScriptedGenerator {
        fn generate(&self, prompt: &str) -> Result<String> {
            if let Some(marker) = &self.fail_on {
                if prompt.contains(marker.as_str()) {
                    return Err(IprepError::Generator("scripted failure".to_string()));
                }
            }
            // First prompt line names the skill (question prompts) or the
            // evaluated skill (feedback prompts).
            Ok(format!("generated: {}", prompt.len()))
        }
    }

    fn fixture() -> (TempDir, QuestionStore, Arc<SemanticIndex>) {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("corpus.csv"),
            "id,company_name,job_title,job_category,skill_tested,interview_question,question,answer,rating\n\
             1,Acme,Engineer,tech,social,Tell me about teamwork,Tell me about teamwork,I pair daily,4\n\
             2,Acme,Engineer,tech,social,Tell me about teamwork,How do you team up?,We rotate,5\n\
             3,Acme,Engineer,tech,management,Describe a conflict you resolved,Describe a conflict,I mediated,3\n",
        )
        .unwrap();
        let store = QuestionStore::open(temp.path()).unwrap();
        let index = Arc::new(IndexBuilder::new(64).build(&store.all_records().unwrap()));
        (temp, store, index)
    }

    #[test]
    fn assemble_returns_one_slot_per_skill_in_order() {
        let (_temp, store, index) = fixture();
        let generator = ScriptedGenerator { fail_on: None };
        let assembler = QuestionnaireAssembler::new(&store, index, &generator, 5, 10);

        let skills = vec!["social".to_string(), "management".to_string()];
        let entries = assembler.assemble("Acme", "Engineer", &skills);

        assert_eq!(entries.len(), 2);
        let first = entries[0].as_ref().unwrap();
        let second = entries[1].as_ref().unwrap();
        assert_eq!(first.skill, "social");
        assert_eq!(second.skill, "management");
        assert!(first.question.starts_with("generated:"));
    }

    #[test]
    fn generator_failure_stays_in_its_own_slot() {
        let (_temp, store, index) = fixture();
        let generator = ScriptedGenerator {
            fail_on: Some("management".to_string()),
        };
        let assembler = QuestionnaireAssembler::new(&store, index, &generator, 5, 10);

        let skills = vec!["social".to_string(), "management".to_string()];
        let entries = assembler.assemble("Acme", "Engineer", &skills);

        assert!(entries[0].is_ok());
        assert!(matches!(
            entries[1].as_ref().unwrap_err(),
            IprepError::Generator(_)
        ));
    }

    #[test]
    fn unknown_company_degrades_to_unseeded_generation() {
        let (_temp, store, index) = fixture();
        let generator = ScriptedGenerator { fail_on: None };
        let assembler = QuestionnaireAssembler::new(&store, index, &generator, 5, 10);

        let skills = vec!["social".to_string()];
        let entries = assembler.assemble("Initech", "Engineer", &skills);

        let entry = entries[0].as_ref().unwrap();
        assert!(entry.question.starts_with("generated:"));
        // Empty permitted pool means no exemplar can survive reconciliation.
        assert!(entry.exemplars.is_empty());
    }

    #[test]
    fn evaluate_all_keeps_input_order_and_isolates_failures() {
        let generator = ScriptedGenerator {
            fail_on: Some("badanswer".to_string()),
        };
        let answered = vec![
            AnsweredQuestion {
                skill: "social".to_string(),
                question: "Q1".to_string(),
                answer: "fine answer".to_string(),
                exemplars: Vec::new(),
            },
            AnsweredQuestion {
                skill: "social".to_string(),
                question: "Q2".to_string(),
                answer: "badanswer".to_string(),
                exemplars: Vec::new(),
            },
        ];

        let results = evaluate_all(&generator, &answered);
        assert_eq!(results.len(), 2);
        let ok = results[0].as_ref().unwrap();
        assert_eq!(ok.question, "Q1");
        assert!(ok.feedback.starts_with("generated:"));
        assert!(results[1].is_err());
    }

    #[test]
    fn evaluate_all_with_no_input_is_empty() {
        let generator = ScriptedGenerator { fail_on: None };
        assert!(evaluate_all(&generator, &[]).is_empty());
    }

    #[test]
    fn feedback_prompt_receives_the_exemplars() {
        struct CapturingGenerator;
        impl TextGenerator for CapturingGenerator {
            fn generate(&self, prompt: &str) -> Result<String> {
                assert!(prompt.contains("Rating: 4"));
                assert!(prompt.contains("historic answer"));
                Ok("ok".to_string())
            }
        }
        let answered = vec![AnsweredQuestion {
            skill: "social".to_string(),
            question: "Q".to_string(),
            answer: "A".to_string(),
            exemplars: vec![Exemplar {
                question: "old Q".to_string(),
                answer: "historic answer".to_string(),
                rating: 4.0,
            }],
        }];
        let results = evaluate_all(&CapturingGenerator, &answered);
        assert!(results[0].is_ok());
    }
}
