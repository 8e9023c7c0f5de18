//! CLI integration tests, driving the compiled binary end to end against
//! temporary corpus and index files via `IPREP_*` environment overrides.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const HEADER: &str =
    "id,company_name,job_title,job_category,skill_tested,interview_question,question,answer,rating\n";

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();
    std::fs::write(
        data.join("corpus.csv"),
        format!(
            "{HEADER}1,Acme,Engineer,tech,social,Tell me about teamwork,Tell me about teamwork,I pair daily,4\n\
             2,Acme,Engineer,tech,social,Tell me about teamwork,How do you team up?,We rotate,5\n\
             3,Acme,Engineer,tech,management,Describe a conflict,Describe a conflict,I mediated,3\n"
        ),
    )
    .unwrap();
    dir
}

fn iprep(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("iprep").unwrap();
    cmd.env("IPREP_CORPUS_DATA_DIR", dir.path().join("data"))
        .env("IPREP_INDEX_DB_PATH", dir.path().join("index.db"))
        .env_remove("IPREP_CONFIG");
    cmd
}

#[test]
fn help_lists_the_subcommands() {
    Command::cargo_bin("iprep")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("sample")
                .and(predicate::str::contains("retrieve"))
                .and(predicate::str::contains("questionnaire"))
                .and(predicate::str::contains("feedback")),
        );
}

#[test]
fn sample_prints_deduplicated_questions() {
    let dir = workspace();
    iprep(&dir)
        .args([
            "--quiet", "sample", "--company", "Acme", "--role", "Engineer", "--skill", "social",
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Tell me about teamwork")
                .and(predicate::str::contains("2 matching records")),
        );
}

#[test]
fn sample_json_emits_ids_and_questions() {
    let dir = workspace();
    let output = iprep(&dir)
        .args([
            "--quiet", "--json", "sample", "--company", "Acme", "--role", "Engineer", "--skill",
            "social",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["ids"], serde_json::json!([1, 2]));
    assert_eq!(parsed["questions"].as_array().unwrap().len(), 1);
}

#[test]
fn sample_unknown_company_fails() {
    let dir = workspace();
    iprep(&dir)
        .args([
            "--quiet", "sample", "--company", "Initech", "--role", "Engineer", "--skill", "social",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No questions found"));
}

#[test]
fn index_build_then_status_reports_entries() {
    let dir = workspace();
    iprep(&dir)
        .args(["--quiet", "index", "build"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 entries from 3 records"));

    iprep(&dir)
        .args(["--quiet", "index", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 entries"));
}

#[test]
fn index_status_without_build_says_not_built() {
    let dir = workspace();
    iprep(&dir)
        .args(["--quiet", "index", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not built"));
}

#[test]
fn retrieve_scopes_exemplars_to_the_filter() {
    let dir = workspace();
    let output = iprep(&dir)
        .args([
            "--quiet",
            "--json",
            "retrieve",
            "--question",
            "Tell me about teamwork",
            "--company",
            "Acme",
            "--role",
            "Engineer",
            "--skill",
            "social",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let exemplars: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let answers: Vec<&str> = exemplars
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["answer"].as_str().unwrap())
        .collect();
    assert!(answers.contains(&"I pair daily"));
    assert!(answers.contains(&"We rotate"));
}

#[test]
fn questionnaire_without_api_key_fails_with_config_error() {
    let dir = workspace();
    iprep(&dir)
        .env("IPREP_GENERATOR_API_KEY_ENV", "IPREP_TEST_UNSET_KEY")
        .env_remove("IPREP_TEST_UNSET_KEY")
        .args([
            "--quiet",
            "questionnaire",
            "--company",
            "Acme",
            "--role",
            "Engineer",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("IPREP_TEST_UNSET_KEY"));
}

#[test]
fn feedback_rejects_unreadable_input() {
    let dir = workspace();
    iprep(&dir)
        .args(["--quiet", "feedback", "--input", "/nonexistent/answers.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("read answers"));
}

#[test]
fn explicit_missing_config_file_fails() {
    let dir = workspace();
    iprep(&dir)
        .args([
            "--quiet",
            "--config",
            "/nonexistent/config.toml",
            "index",
            "status",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}
