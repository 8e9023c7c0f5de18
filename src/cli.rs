//! Command-line interface
//!
//! clap v4 derive definitions plus the command handlers. Every handler
//! resolves its stores from [`Config`] on entry; nothing global beyond
//! the process-wide index registry.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::config::Config;
use crate::corpus::QuestionStore;
use crate::error::{IprepError, Result};
use crate::index::{self, IndexBuilder, IndexStore, SemanticIndex};
use crate::llm::GeminiClient;
use crate::questionnaire::{self, AnsweredQuestion, QuestionnaireAssembler};
use crate::retrieval::find_exemplars;

/// Interview preparation pipeline over a historical Q&A corpus
#[derive(Parser, Debug)]
#[command(name = "iprep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit machine-readable JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file path (default: ~/.config/iprep/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build or inspect the semantic question index
    Index(IndexArgs),

    /// Sample historical questions for a company/role/skill filter
    Sample(SampleArgs),

    /// Retrieve exemplar answers for a question, scoped to a filter
    Retrieve(RetrieveArgs),

    /// Generate a full questionnaire for a company/role
    Questionnaire(QuestionnaireArgs),

    /// Evaluate answered questions from a JSON file
    Feedback(FeedbackArgs),
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    #[command(subcommand)]
    pub command: IndexCommand,
}

#[derive(Subcommand, Debug)]
pub enum IndexCommand {
    /// Rebuild the persisted index from the corpus
    Build,
    /// Show collection name, entry count, and in-process build count
    Status,
}

#[derive(Args, Debug)]
pub struct SampleArgs {
    #[arg(long)]
    pub company: String,
    #[arg(long)]
    pub role: String,
    #[arg(long)]
    pub skill: String,
    /// Maximum sample question texts to print
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct RetrieveArgs {
    /// The (generated) question to find exemplars for
    #[arg(long)]
    pub question: String,
    #[arg(long)]
    pub company: String,
    #[arg(long)]
    pub role: String,
    #[arg(long)]
    pub skill: String,
    /// Nearest-neighbor candidates to consult
    #[arg(long)]
    pub top_k: Option<usize>,
}

#[derive(Args, Debug)]
pub struct QuestionnaireArgs {
    #[arg(long)]
    pub company: String,
    #[arg(long)]
    pub role: String,
    /// Skills to cover; defaults to the configured skill list
    #[arg(long, value_delimiter = ',')]
    pub skills: Vec<String>,
}

#[derive(Args, Debug)]
pub struct FeedbackArgs {
    /// JSON file holding an array of answered questions
    /// (skill, question, answer, optional exemplars)
    #[arg(long)]
    pub input: PathBuf,
}

/// Dispatch the parsed command.
pub fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    match &cli.command {
        Commands::Index(args) => run_index(cli, &config, args),
        Commands::Sample(args) => run_sample(cli, &config, args),
        Commands::Retrieve(args) => run_retrieve(cli, &config, args),
        Commands::Questionnaire(args) => run_questionnaire(cli, &config, args),
        Commands::Feedback(args) => run_feedback(cli, &config, args),
    }
}

fn open_stores(config: &Config) -> Result<(QuestionStore, IndexStore)> {
    let corpus = QuestionStore::open(&config.corpus.data_dir)?;
    let index_store = IndexStore::open(&config.index.db_path)?;
    Ok((corpus, index_store))
}

fn resolve_index(
    config: &Config,
    corpus: &QuestionStore,
    index_store: &IndexStore,
) -> Result<Arc<SemanticIndex>> {
    index::get_or_build(
        index_store,
        corpus,
        &config.index.collection,
        config.index.dims,
    )
}

fn run_index(cli: &Cli, config: &Config, args: &IndexArgs) -> Result<()> {
    let (corpus, index_store) = open_stores(config)?;
    match args.command {
        IndexCommand::Build => {
            let records = corpus.all_records()?;
            let index = IndexBuilder::new(config.index.dims).build_and_persist(
                &index_store,
                &config.index.collection,
                &records,
            )?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&serde_json::json!({
                        "collection": config.index.collection,
                        "entries": index.len(),
                        "records": records.len(),
                    }))?
                );
            } else {
                println!(
                    "{} {} entries from {} records into '{}'",
                    "indexed".green().bold(),
                    index.len(),
                    records.len(),
                    config.index.collection
                );
            }
        }
        IndexCommand::Status => {
            let entries = match index_store.collection_dims(&config.index.collection)? {
                Some(_) => Some(index_store.entry_count(&config.index.collection)?),
                None => None,
            };
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&serde_json::json!({
                        "collection": config.index.collection,
                        "entries": entries,
                        "builds_this_process": index::completed_builds(),
                    }))?
                );
            } else {
                match entries {
                    Some(count) => println!(
                        "collection '{}': {} entries ({} builds this process)",
                        config.index.collection,
                        count,
                        index::completed_builds()
                    ),
                    None => println!(
                        "collection '{}': {}",
                        config.index.collection,
                        "not built".yellow()
                    ),
                }
            }
        }
    }
    Ok(())
}

fn run_sample(cli: &Cli, config: &Config, args: &SampleArgs) -> Result<()> {
    let corpus = QuestionStore::open(&config.corpus.data_dir)?;
    let limit = args.limit.unwrap_or(config.sampling.sample_questions);
    let pool = corpus.sample_questions(&args.company, &args.role, &args.skill, limit)?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string(&serde_json::json!({
                "questions": pool.questions,
                "ids": pool.ids,
            }))?
        );
    } else {
        println!(
            "{} sample questions ({} matching records)",
            pool.questions.len().to_string().bold(),
            pool.ids.len()
        );
        for question in &pool.questions {
            println!("  {} {question}", "-".dimmed());
        }
    }
    Ok(())
}

fn run_retrieve(cli: &Cli, config: &Config, args: &RetrieveArgs) -> Result<()> {
    let (corpus, index_store) = open_stores(config)?;
    let index = resolve_index(config, &corpus, &index_store)?;

    let pool = corpus.sample_questions(
        &args.company,
        &args.role,
        &args.skill,
        config.sampling.sample_questions,
    )?;
    let top_k = args.top_k.unwrap_or(config.index.top_k);
    let exemplars = find_exemplars(&index, &corpus, &args.question, &pool.ids, top_k)?;

    if cli.json {
        println!("{}", serde_json::to_string(&exemplars)?);
    } else {
        println!("{} exemplars", exemplars.len().to_string().bold());
        for exemplar in &exemplars {
            println!("\n{} {}", "Q:".cyan().bold(), exemplar.question);
            println!("{} {}", "A:".green().bold(), exemplar.answer);
            println!("{} {}", "rating:".dimmed(), exemplar.rating);
        }
    }
    Ok(())
}

fn run_questionnaire(cli: &Cli, config: &Config, args: &QuestionnaireArgs) -> Result<()> {
    let (corpus, index_store) = open_stores(config)?;
    let index = resolve_index(config, &corpus, &index_store)?;
    let generator = GeminiClient::from_config(&config.generator)?;

    let skills = if args.skills.is_empty() {
        config.sampling.skills.clone()
    } else {
        args.skills.clone()
    };

    let assembler = QuestionnaireAssembler::new(
        &corpus,
        index,
        &generator,
        config.sampling.sample_questions,
        config.index.top_k,
    );
    let entries = assembler.assemble(&args.company, &args.role, &skills);

    let mut failures = 0usize;
    if cli.json {
        let report: Vec<serde_json::Value> = entries
            .iter()
            .zip(&skills)
            .map(|(entry, skill)| match entry {
                Ok(entry) => serde_json::json!({
                    "skill": entry.skill,
                    "question": entry.question,
                    "exemplars": entry.exemplars,
                }),
                Err(err) => {
                    failures += 1;
                    serde_json::json!({ "skill": skill, "error": err.to_string() })
                }
            })
            .collect();
        println!("{}", serde_json::to_string(&report)?);
    } else {
        for (entry, skill) in entries.iter().zip(&skills) {
            match entry {
                Ok(entry) => {
                    println!("\n{} {}", "skill:".bold(), entry.skill.cyan());
                    println!("  {}", entry.question);
                    if !entry.exemplars.is_empty() {
                        println!(
                            "  {} {} exemplar(s) retrieved",
                            "+".green(),
                            entry.exemplars.len()
                        );
                    }
                }
                Err(err) => {
                    failures += 1;
                    println!("\n{} {}", "skill:".bold(), skill.cyan());
                    println!("  {} {err}", "failed:".red().bold());
                }
            }
        }
    }

    if failures == skills.len() && !skills.is_empty() {
        return Err(IprepError::Generator(
            "every skill failed to generate".to_string(),
        ));
    }
    Ok(())
}

fn run_feedback(cli: &Cli, config: &Config, args: &FeedbackArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.input).map_err(|err| {
        IprepError::Config(format!("read answers {}: {err}", args.input.display()))
    })?;
    let answered: Vec<AnsweredQuestion> = serde_json::from_str(&raw)?;
    let generator = GeminiClient::from_config(&config.generator)?;

    let results = questionnaire::evaluate_all(&generator, &answered);

    if cli.json {
        let report: Vec<serde_json::Value> = results
            .iter()
            .zip(&answered)
            .map(|(result, item)| match result {
                Ok(feedback) => serde_json::json!({
                    "question": feedback.question,
                    "feedback": feedback.feedback,
                }),
                Err(err) => serde_json::json!({
                    "question": item.question,
                    "error": err.to_string(),
                }),
            })
            .collect();
        println!("{}", serde_json::to_string(&report)?);
    } else {
        for (result, item) in results.iter().zip(&answered) {
            println!("\n{} {}", "Q:".cyan().bold(), item.question);
            match result {
                Ok(feedback) => println!("{}", feedback.feedback),
                Err(err) => println!("{} {err}", "failed:".red().bold()),
            }
        }
    }
    Ok(())
}
