use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const SCHOOLS_FILE: &str = "schools.json";
pub const DATA_DIR: &str = "data";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct School {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub registered_date: String,
    #[serde(default)]
    pub student_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    First,
    Second,
}

impl Term {
    pub const ALL: [Term; 2] = [Term::First, Term::Second];

    pub fn as_str(self) -> &'static str {
        match self {
            Term::First => "1st_term",
            Term::Second => "2nd_term",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Term::First => "1st Term",
            Term::Second => "2nd Term",
        }
    }

    pub fn parse(s: &str) -> Option<Term> {
        match s {
            "1st_term" => Some(Term::First),
            "2nd_term" => Some(Term::Second),
            _ => None,
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.xlsx", self.as_str())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// School ids and academic years become directory names.
pub fn is_safe_component(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && !s.contains(['/', '\\', '\0'])
}

/// Registry file plus the per-school data tree under one root directory.
#[derive(Debug, Clone)]
pub struct SchoolStore {
    root: PathBuf,
}

impl SchoolStore {
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(root.join(DATA_DIR)).with_context(|| {
            format!("failed to create data directory under {}", root.to_string_lossy())
        })?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn schools_path(&self) -> PathBuf {
        self.root.join(SCHOOLS_FILE)
    }

    pub fn school_dir(&self, school_id: &str) -> PathBuf {
        self.root.join(DATA_DIR).join(school_id)
    }

    pub fn year_dir(&self, school_id: &str, academic_year: &str) -> PathBuf {
        self.school_dir(school_id).join(academic_year)
    }

    pub fn term_path(&self, school_id: &str, academic_year: &str, term: Term) -> PathBuf {
        self.year_dir(school_id, academic_year).join(term.file_name())
    }

    /// A missing registry file is an empty registry.
    pub fn load(&self) -> anyhow::Result<Vec<School>> {
        let path = self.schools_path();
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text)
            .with_context(|| format!("{} is invalid JSON", path.to_string_lossy()))
    }

    pub fn save(&self, schools: &[School]) -> anyhow::Result<()> {
        let path = self.schools_path();
        let text = serde_json::to_string_pretty(schools).context("failed to serialize schools")?;
        write_atomic(&path, text.as_bytes())
    }

    pub fn find(&self, school_id: &str) -> anyhow::Result<Option<School>> {
        Ok(self.load()?.into_iter().find(|s| s.id == school_id))
    }

    /// Returns `Ok(false)` when the id is already taken.
    pub fn register(&self, school: School) -> anyhow::Result<bool> {
        if !is_safe_component(&school.id) {
            return Err(anyhow!("invalid school id: {:?}", school.id));
        }
        let mut schools = self.load()?;
        if schools.iter().any(|s| s.id == school.id) {
            return Ok(false);
        }
        let dir = self.school_dir(&school.id);
        schools.push(school);
        self.save(&schools)?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.to_string_lossy()))?;
        Ok(true)
    }

    /// Removes the record and the school's data folder. Unknown ids are a no-op.
    pub fn delete(&self, school_id: &str) -> anyhow::Result<bool> {
        let mut schools = self.load()?;
        let before = schools.len();
        schools.retain(|s| s.id != school_id);
        let removed = schools.len() != before;
        if removed {
            self.save(&schools)?;
        }
        if is_safe_component(school_id) {
            let dir = self.school_dir(school_id);
            if dir.exists() {
                std::fs::remove_dir_all(&dir)
                    .with_context(|| format!("failed to remove {}", dir.to_string_lossy()))?;
            }
        }
        Ok(removed)
    }

    pub fn set_student_count(&self, school_id: &str, count: usize) -> anyhow::Result<()> {
        let mut schools = self.load()?;
        if let Some(s) = schools.iter_mut().find(|s| s.id == school_id) {
            s.student_count = count;
            self.save(&schools)?;
        }
        Ok(())
    }

    /// Writes an uploaded term file, replacing any previous upload.
    pub fn write_term_file(
        &self,
        school_id: &str,
        academic_year: &str,
        term: Term,
        bytes: &[u8],
    ) -> anyhow::Result<PathBuf> {
        let dir = self.year_dir(school_id, academic_year);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.to_string_lossy()))?;
        let path = self.term_path(school_id, academic_year, term);
        write_atomic(&path, bytes)?;
        Ok(path)
    }

    /// Distinct academic-year folders across the given schools.
    pub fn active_years(&self, schools: &[School]) -> anyhow::Result<BTreeSet<String>> {
        let mut years = BTreeSet::new();
        for school in schools {
            let dir = self.school_dir(&school.id);
            if !dir.is_dir() {
                continue;
            }
            for ent in std::fs::read_dir(&dir)
                .with_context(|| format!("failed to list {}", dir.to_string_lossy()))?
            {
                let ent = ent?;
                if !ent.path().is_dir() {
                    continue;
                }
                if let Some(name) = ent.file_name().to_str() {
                    years.insert(name.to_string());
                }
            }
        }
        Ok(years)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("invalid target path {}", path.to_string_lossy()))?;
    let tmp = path.with_file_name(format!(".{}.{}.writing", file_name, uuid::Uuid::new_v4()));

    let mut out = std::fs::File::create(&tmp)
        .with_context(|| format!("failed to create temp file {}", tmp.to_string_lossy()))?;
    out.write_all(bytes)
        .with_context(|| format!("failed to write {}", tmp.to_string_lossy()))?;
    out.flush()
        .with_context(|| format!("failed to flush {}", tmp.to_string_lossy()))?;
    drop(out);

    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e)
            .with_context(|| format!("failed to move temp file to {}", path.to_string_lossy()));
    }
    Ok(())
}
