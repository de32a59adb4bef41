//! Skill reference data
//!
//! The reference maps canonical skill names to the lowercase variants that
//! should resolve to them. A built-in table covers the common technical
//! vocabulary; an optional TOML file extends or overrides it. The reference
//! is loaded once at process start and read-only afterwards; changing it
//! requires a restart.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading the skill reference
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Failed to read skill reference file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse skill reference TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid skill pattern '{pattern}' for '{name}': {message}")]
    Pattern {
        name: String,
        pattern: String,
        message: String,
    },
}

/// One skill record: canonical display name plus its match patterns
#[derive(Debug, Clone, Deserialize)]
pub struct SkillEntry {
    pub name: String,
    pub patterns: Vec<String>,
}

/// One suppression rule: when `canonical` is present in an extraction
/// result, the `subsumes` entries are dropped from the same result
#[derive(Debug, Clone, Deserialize)]
pub struct SuppressionEntry {
    pub canonical: String,
    pub subsumes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReferenceFile {
    #[serde(rename = "skill", default)]
    skills: Vec<SkillEntry>,
    #[serde(rename = "suppression", default)]
    suppressions: Vec<SuppressionEntry>,
}

/// Built-in skill table: (canonical name, lowercase variants)
///
/// Single-letter languages (Go, R, C) are deliberately absent here; they
/// live in the extractor's case-sensitive precision set because a
/// case-insensitive "r" would collide with ordinary English.
const BUILT_IN: &[(&str, &[&str])] = &[
    ("Python", &["python"]),
    ("SQL", &["sql"]),
    ("Tableau", &["tableau"]),
    ("Power BI", &["power bi", "powerbi"]),
    ("Excel", &["excel", "microsoft excel"]),
    ("Java", &["java"]),
    ("JavaScript", &["javascript"]),
    ("TypeScript", &["typescript"]),
    ("C++", &["c++"]),
    ("C#", &["c#", "csharp"]),
    ("Rust", &["rust"]),
    ("Scala", &["scala"]),
    ("Kubernetes", &["kubernetes", "k8s"]),
    ("Docker", &["docker"]),
    ("AWS", &["aws", "amazon web services"]),
    ("Azure", &["azure"]),
    ("GCP", &["gcp", "google cloud"]),
    ("Terraform", &["terraform"]),
    ("Linux", &["linux"]),
    ("Git", &["git"]),
    ("CI/CD", &["ci/cd", "ci-cd"]),
    ("CI", &["ci", "continuous integration"]),
    ("CD", &["cd", "continuous delivery", "continuous deployment"]),
    ("Machine Learning", &["machine learning"]),
    ("Deep Learning", &["deep learning"]),
    ("NLP", &["nlp", "natural language processing"]),
    ("Pandas", &["pandas"]),
    ("NumPy", &["numpy"]),
    ("Spark", &["spark", "apache spark"]),
    ("Hadoop", &["hadoop"]),
    ("Kafka", &["kafka", "apache kafka"]),
    ("Airflow", &["airflow"]),
    ("dbt", &["dbt"]),
    ("Snowflake", &["snowflake"]),
    ("PostgreSQL", &["postgresql", "postgres"]),
    ("MySQL", &["mysql"]),
    ("MongoDB", &["mongodb", "mongo"]),
    ("Redis", &["redis"]),
    ("Elasticsearch", &["elasticsearch", "elastic search"]),
    ("REST", &["rest api", "restful"]),
    ("GraphQL", &["graphql"]),
    ("React", &["react", "react.js", "reactjs"]),
    ("Node.js", &["node.js", "nodejs"]),
    ("Django", &["django"]),
    ("Flask", &["flask"]),
    ("Looker", &["looker"]),
    ("ETL", &["etl"]),
    ("A/B Testing", &["a/b testing", "ab testing"]),
    ("Statistics", &["statistics", "statistical analysis"]),
    ("Data Visualization", &["data visualization", "data visualisation"]),
    ("Agile", &["agile"]),
    ("Scrum", &["scrum"]),
];

/// Built-in suppression rules
const BUILT_IN_SUPPRESSIONS: &[(&str, &[&str])] = &[("CI/CD", &["CI", "CD"])];

/// The loaded skill reference: entries, the canonical lookup map, and the
/// suppression table
#[derive(Debug, Clone)]
pub struct SkillReference {
    entries: Vec<SkillEntry>,
    suppressions: Vec<SuppressionEntry>,
    canonical: HashMap<String, String>,
}

impl SkillReference {
    /// Loads the built-in table, extended by the optional TOML file
    ///
    /// File entries with a name already present replace the built-in entry
    /// wholesale.
    pub fn load(path: Option<&Path>) -> Result<Self, ReferenceError> {
        let mut entries = built_in_entries();
        let mut suppressions = built_in_suppressions();

        if let Some(path) = path {
            let content = std::fs::read_to_string(path)?;
            let file: ReferenceFile = toml::from_str(&content)?;

            for entry in file.skills {
                entries.retain(|e| !e.name.eq_ignore_ascii_case(&entry.name));
                entries.push(entry);
            }
            suppressions.extend(file.suppressions);
        }

        Ok(Self::from_entries(entries, suppressions))
    }

    /// Builds a reference from explicit entries (primarily for tests)
    pub fn from_entries(entries: Vec<SkillEntry>, suppressions: Vec<SuppressionEntry>) -> Self {
        let mut canonical = HashMap::new();
        for entry in &entries {
            canonical.insert(entry.name.to_lowercase(), entry.name.clone());
            for pattern in &entry.patterns {
                canonical.insert(pattern.to_lowercase(), entry.name.clone());
            }
        }

        Self {
            entries,
            suppressions,
            canonical,
        }
    }

    /// All skill entries
    pub fn entries(&self) -> &[SkillEntry] {
        &self.entries
    }

    /// All suppression rules
    pub fn suppressions(&self) -> &[SuppressionEntry] {
        &self.suppressions
    }

    /// Resolves a raw candidate string to its canonical display name
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        self.canonical
            .get(&raw.trim().to_lowercase())
            .map(|s| s.as_str())
    }
}

fn built_in_entries() -> Vec<SkillEntry> {
    BUILT_IN
        .iter()
        .map(|(name, patterns)| SkillEntry {
            name: name.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        })
        .collect()
}

fn built_in_suppressions() -> Vec<SuppressionEntry> {
    BUILT_IN_SUPPRESSIONS
        .iter()
        .map(|(canonical, subsumes)| SuppressionEntry {
            canonical: canonical.to_string(),
            subsumes: subsumes.iter().map(|s| s.to_string()).collect(),
        })
        .collect()
}
