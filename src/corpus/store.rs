//! Relational question store (SQLite, in-memory)
//!
//! All `*.csv` files under the corpus directory are loaded once at open
//! into a single `records` table; the store is read-only afterwards and
//! safe to reopen (idempotent full reload).

use std::collections::BTreeSet;
use std::collections::HashSet;
use std::path::Path;

use rusqlite::{Connection, params, params_from_iter};

use crate::corpus::csv;
use crate::corpus::{Exemplar, HistoricalRecord};
use crate::error::{IprepError, Result};

/// Corpus columns required in every loaded file, in table order.
const COLUMNS: [&str; 9] = [
    "id",
    "company_name",
    "job_title",
    "job_category",
    "skill_tested",
    "interview_question",
    "question",
    "answer",
    "rating",
];

/// Sample questions plus the permitted-id pool for one
/// (company, role, skill) request. Transient; owned by the caller for the
/// duration of one questionnaire build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplePool {
    /// Deduplicated question texts, first-seen order, truncated to the
    /// requested limit.
    pub questions: Vec<String>,
    /// All matching record ids, untruncated.
    pub ids: Vec<i64>,
}

impl SamplePool {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// SQLite-backed store over the historical interview corpus.
pub struct QuestionStore {
    conn: Connection,
}

impl std::fmt::Debug for QuestionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionStore").finish_non_exhaustive()
    }
}

impl QuestionStore {
    /// Open a store over every `*.csv` file in `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE records (
                id                 INTEGER NOT NULL,
                company            TEXT NOT NULL,
                role               TEXT NOT NULL,
                category           TEXT NOT NULL,
                skill              TEXT NOT NULL,
                interview_question TEXT NOT NULL,
                question           TEXT NOT NULL,
                answer             TEXT NOT NULL,
                rating             REAL NOT NULL
            );
            CREATE INDEX idx_records_filter ON records (company, role, skill);",
        )?;

        let store = Self { conn };
        store.load_dir(data_dir.as_ref())?;
        Ok(store)
    }

    fn load_dir(&self, dir: &Path) -> Result<()> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .map_err(|err| {
                IprepError::Corpus(format!("read corpus dir {}: {err}", dir.display()))
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(IprepError::Corpus(format!(
                "no corpus files (*.csv) found in {}",
                dir.display()
            )));
        }

        for path in paths {
            self.load_file(&path)?;
        }
        tracing::debug!(records = self.len()?, "corpus loaded");
        Ok(())
    }

    fn load_file(&self, path: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| IprepError::Corpus(format!("read {}: {err}", path.display())))?;
        let rows = csv::parse(&raw)?;
        let Some((header, data)) = rows.split_first() else {
            return Ok(());
        };
        let positions = csv::header_positions(header, &COLUMNS)?;

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (
                    id, company, role, category, skill,
                    interview_question, question, answer, rating
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for (line, row) in data.iter().enumerate() {
                let field = |idx: usize| row.get(positions[idx]).map_or("", String::as_str);
                let id = field(0).trim().parse::<i64>().map_err(|err| {
                    IprepError::Corpus(format!(
                        "{} row {}: invalid id '{}': {err}",
                        path.display(),
                        line + 2,
                        field(0)
                    ))
                })?;
                let rating = parse_rating(field(8)).map_err(|reason| {
                    IprepError::Corpus(format!(
                        "{} row {}: {reason}",
                        path.display(),
                        line + 2
                    ))
                })?;
                stmt.execute(params![
                    id,
                    field(1),
                    field(2),
                    field(3),
                    field(4),
                    field(5),
                    field(6),
                    field(7),
                    rating,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Total record count.
    pub fn len(&self) -> Result<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Sample questions for a (company, role, skill) filter.
    ///
    /// Matching is whitespace-trimmed equality. Skill is a soft constraint:
    /// when the skill-qualified query matches nothing the filter relaxes to
    /// (company, role) alone. Errors with
    /// [`IprepError::NoMatchingQuestions`] only when even the relaxed query
    /// is empty.
    pub fn sample_questions(
        &self,
        company: &str,
        role: &str,
        skill: &str,
        limit: usize,
    ) -> Result<SamplePool> {
        let mut rows = self.query_samples(company, role, Some(skill))?;
        if rows.is_empty() {
            tracing::debug!(company, role, skill, "no skill match, relaxing to company/role");
            rows = self.query_samples(company, role, None)?;
        }
        if rows.is_empty() {
            return Err(IprepError::NoMatchingQuestions {
                company: company.to_string(),
                role: role.to_string(),
            });
        }

        let mut seen = HashSet::new();
        let mut pool = SamplePool::default();
        for (id, question) in rows {
            pool.ids.push(id);
            if !question.trim().is_empty() && seen.insert(question.clone()) {
                pool.questions.push(question);
            }
        }
        pool.questions.truncate(limit);
        Ok(pool)
    }

    fn query_samples(
        &self,
        company: &str,
        role: &str,
        skill: Option<&str>,
    ) -> Result<Vec<(i64, String)>> {
        let (sql, bound): (&str, Vec<&str>) = match skill {
            Some(skill) => (
                "SELECT id, interview_question FROM records
                 WHERE trim(company) = trim(?) AND trim(role) = trim(?)
                   AND trim(skill) = trim(?)
                 ORDER BY id",
                vec![company, role, skill],
            ),
            None => (
                "SELECT id, interview_question FROM records
                 WHERE trim(company) = trim(?) AND trim(role) = trim(?)
                 ORDER BY id",
                vec![company, role],
            ),
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(bound), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Question/answer/rating rows for an exact id membership query.
    /// One row per matching record; order unspecified.
    pub fn lookup_by_ids(&self, ids: &BTreeSet<i64>) -> Result<Vec<Exemplar>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT question, answer, rating FROM records WHERE id IN ({placeholders})"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
            Ok(Exemplar {
                question: row.get(0)?,
                answer: row.get(1)?,
                rating: row.get(2)?,
            })
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Full scan, used by the index builder only.
    pub fn all_records(&self) -> Result<Vec<HistoricalRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, company, role, category, skill,
                    interview_question, question, answer, rating
             FROM records ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(HistoricalRecord {
                id: row.get(0)?,
                company: row.get(1)?,
                role: row.get(2)?,
                category: row.get(3)?,
                skill: row.get(4)?,
                interview_question: row.get(5)?,
                question: row.get(6)?,
                answer: row.get(7)?,
                rating: row.get(8)?,
            })
        })?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

fn parse_rating(raw: &str) -> std::result::Result<f64, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    trimmed
        .parse::<f64>()
        .map_err(|err| format!("invalid rating '{trimmed}': {err}"))
}
