//! Reader for definition lines.
//!
//! Each line names one object: `<name>:<columns>[:...]:<filter>` in the
//! legacy format, or the same prefixed with `#T:` (table) or `#G:`
//! (generator). The first line carrying a colon decides which format the
//! whole stream uses. Malformed lines are skipped with a warning.

use std::io::BufRead;

use tracing::{info, warn};

use crate::error::Result;

/// One object named on the definition stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    Table {
        name: String,
        columns: Vec<String>,
        filter: Option<String>,
    },
    Generator {
        source: String,
        destination: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineFormat {
    Tagged,
    Legacy,
}

/// Iterator over the definitions of a line stream.
pub struct DefinitionReader<R> {
    lines: std::io::Lines<R>,
    format: Option<LineFormat>,
}

impl<R: BufRead> DefinitionReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            lines: input.lines(),
            format: None,
        }
    }

    fn parse(&mut self, line: &str) -> Option<Definition> {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(first_colon) = line.find(':') else {
            warn!("Received line without colon, ignoring.");
            return None;
        };

        let format = *self.format.get_or_insert_with(|| {
            let format = if first_colon == 2 && line.starts_with('#') {
                LineFormat::Tagged
            } else {
                LineFormat::Legacy
            };
            info!(
                "{} format detected.",
                if format == LineFormat::Tagged { "New" } else { "Old" }
            );
            format
        });

        let (generator, rest) = match format {
            LineFormat::Tagged => {
                let generator = line.as_bytes().get(1) == Some(&b'G');
                let rest = line.get(3..).unwrap_or("");
                if !rest.contains(':') {
                    warn!("Received line without object name, ignoring.");
                    return None;
                }
                (generator, rest)
            }
            LineFormat::Legacy => (false, line),
        };

        let (name, tail) = rest.split_once(':')?;
        let Some((payload, _)) = tail.split_once(':') else {
            warn!(
                "{} for {} not terminated, ignoring.",
                if generator { "Generator" } else { "Column list" },
                name
            );
            return None;
        };
        if payload.is_empty() {
            warn!("Object {} does not exist in destination db, skipping.", name);
            return None;
        }

        if generator {
            return Some(Definition::Generator {
                source: name.to_string(),
                destination: payload.to_string(),
            });
        }

        let filter = tail
            .rsplit_once(':')
            .map(|(_, f)| f.trim())
            .filter(|f| !f.is_empty())
            .map(str::to_string);
        Some(Definition::Table {
            name: name.to_string(),
            columns: split_identifiers(payload),
            filter,
        })
    }
}

impl<R: BufRead> Iterator for DefinitionReader<R> {
    type Item = Result<Definition>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if let Some(definition) = self.parse(&line) {
                return Some(Ok(definition));
            }
        }
    }
}

/// Split a comma-separated identifier list.
///
/// Quoted identifiers keep their text with `""` unescaped; unquoted ones
/// are folded to lower case.
pub fn split_identifiers(list: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = list.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            ',' if !in_quotes => {
                push_identifier(&mut out, &current, quoted);
                current.clear();
                quoted = false;
            }
            c => current.push(c),
        }
    }
    push_identifier(&mut out, &current, quoted);
    out
}

fn push_identifier(out: &mut Vec<String>, text: &str, quoted: bool) {
    if quoted {
        out.push(text.to_string());
    } else {
        let text = text.trim();
        if !text.is_empty() {
            out.push(text.to_lowercase());
        }
    }
}
