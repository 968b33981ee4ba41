//! Placeholder rendering for build and run commands.
//!
//! Templates are opaque shell command lines with `{name}` placeholders.
//! Recognized names are `root`, `size`, `workers` and `jobs`. `{{` and `}}`
//! produce literal braces, and `${...}` is passed through untouched so shell
//! parameter expansion keeps working.
//!
//! # Example
//!
//! ```
//! use nqbench_core::template::{render, TemplateVars};
//!
//! let vars = TemplateVars::new("/opt/bench").with_size(8).with_workers(4);
//! let line = render("{root}/sylvan/nqueens -w {workers} {size}", &vars).unwrap();
//! assert_eq!(line, "/opt/bench/sylvan/nqueens -w 4 8");
//! ```

use std::borrow::Cow;

use thiserror::Error;

/// Placeholder names understood by [`render`].
pub const KNOWN_PLACEHOLDERS: [&str; 4] = ["root", "size", "workers", "jobs"];

/// Template parsing or rendering failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed placeholder starting at byte {0}")]
    Unclosed(usize),

    #[error("empty placeholder at byte {0}")]
    Empty(usize),

    #[error("unknown placeholder {{{0}}}")]
    Unknown(String),

    #[error("placeholder {{{0}}} has no value in this context")]
    Missing(String),
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    root: Option<String>,
    size: Option<u32>,
    workers: Option<u32>,
    jobs: Option<usize>,
}

impl TemplateVars {
    /// Creates variables with the benchmark root set.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_workers(mut self, workers: u32) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    fn value(&self, name: &str) -> Result<String, TemplateError> {
        let value = match name {
            "root" => self.root.as_deref().map(|r| shell_quote(r).into_owned()),
            "size" => self.size.map(|s| s.to_string()),
            "workers" => self.workers.map(|w| w.to_string()),
            "jobs" => self.jobs.map(|j| j.to_string()),
            other => return Err(TemplateError::Unknown(other.to_string())),
        };
        value.ok_or_else(|| TemplateError::Missing(name.to_string()))
    }
}

enum Piece<'a> {
    Literal(&'a str),
    Brace(char),
    Placeholder(&'a str),
}

fn scan(template: &str) -> Result<Vec<Piece<'_>>, TemplateError> {
    let bytes = template.as_bytes();
    let mut pieces = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if i > 0 && bytes[i - 1] == b'$' => {
                // Shell parameter expansion: copy through to the closing brace.
                let close = template[i..]
                    .find('}')
                    .ok_or(TemplateError::Unclosed(i))?;
                i += close + 1;
            }
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                pieces.push(Piece::Literal(&template[literal_start..i]));
                pieces.push(Piece::Brace('{'));
                i += 2;
                literal_start = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                pieces.push(Piece::Literal(&template[literal_start..i]));
                pieces.push(Piece::Brace('}'));
                i += 2;
                literal_start = i;
            }
            b'{' => {
                let close = template[i..]
                    .find('}')
                    .ok_or(TemplateError::Unclosed(i))?;
                let name = &template[i + 1..i + close];
                if name.is_empty() {
                    return Err(TemplateError::Empty(i));
                }
                pieces.push(Piece::Literal(&template[literal_start..i]));
                pieces.push(Piece::Placeholder(name));
                i += close + 1;
                literal_start = i;
            }
            _ => i += 1,
        }
    }
    pieces.push(Piece::Literal(&template[literal_start..]));
    Ok(pieces)
}

/// Lists the placeholder names used by a template, in order of appearance.
///
/// ```
/// use nqbench_core::template::placeholders;
///
/// let names = placeholders("make -j{jobs} -C {root} && echo ${HOME}").unwrap();
/// assert_eq!(names, vec!["jobs", "root"]);
/// ```
pub fn placeholders(template: &str) -> Result<Vec<&str>, TemplateError> {
    Ok(scan(template)?
        .into_iter()
        .filter_map(|p| match p {
            Piece::Placeholder(name) => Some(name),
            _ => None,
        })
        .collect())
}

/// Renders a template, substituting every placeholder.
///
/// `{root}` is shell-quoted when it contains characters outside the safe set.
pub fn render(template: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len() + 16);
    for piece in scan(template)? {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Brace(c) => out.push(c),
            Piece::Placeholder(name) => out.push_str(&vars.value(name)?),
        }
    }
    Ok(out)
}

/// Quotes a string for POSIX `sh` if it needs quoting.
///
/// ```
/// use nqbench_core::template::shell_quote;
///
/// assert_eq!(shell_quote("/opt/bench"), "/opt/bench");
/// assert_eq!(shell_quote("/my bench"), "'/my bench'");
/// assert_eq!(shell_quote("it's"), r"'it'\''s'");
/// ```
pub fn shell_quote(s: &str) -> Cow<'_, str> {
    let safe = !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"/._-+:,=@%".contains(&b));
    if safe {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(format!("'{}'", s.replace('\'', r"'\''")))
    }
}

/// Expands an environment value: `{root}` becomes the raw root path and
/// `${NAME}` is looked up through `lookup` (missing variables expand to "").
///
/// ```
/// use nqbench_core::template::expand_env;
///
/// let value = expand_env("{root}/lib:${LD_LIBRARY_PATH}", "/opt/bench", |name| {
///     (name == "LD_LIBRARY_PATH").then(|| "/usr/lib".to_string())
/// });
/// assert_eq!(value, "/opt/bench/lib:/usr/lib");
/// ```
pub fn expand_env<F>(value: &str, root: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let with_root = value.replace("{root}", root);
    let mut out = String::with_capacity(with_root.len());
    let mut rest = with_root.as_str();

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                out.push_str(&lookup(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
