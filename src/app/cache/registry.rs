//! Persistent per-bucket URL registry
//!
//! Each bucket directory holds a `urls.properties` file mapping full URL
//! strings to the short file names assigned to them. Names are assigned once,
//! numbered by the registry size at the time of assignment, and never reused
//! or renamed, so a URL keeps its file across process restarts.
//!
//! The file uses the standard `key=value` properties syntax, including its
//! escaping rules, because URLs routinely contain `=` and `:`. Callers must
//! hold the write lock for the registry path around `load` + `assign`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::app::cache::path::append_suffix;
use crate::constants::files;
use crate::errors::{CacheError, CacheResult};

/// URL → file name registry for one bucket directory
#[derive(Debug, Clone)]
pub struct DirectoryRegistry {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl DirectoryRegistry {
    /// Load the registry at `path`; a missing file is an empty registry
    pub async fn load(path: &Path) -> CacheResult<Self> {
        let entries = match fs::read_to_string(path).await {
            Ok(content) => parse_properties(&content).map_err(|line| {
                CacheError::RegistryCorrupted {
                    path: path.to_path_buf(),
                    line,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(CacheError::io(path, e)),
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// File name previously assigned to `url`
    pub fn get(&self, url: &str) -> Option<&str> {
        self.entries.get(url).map(String::as_str)
    }

    /// Number of URLs registered in this bucket
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no URL has been registered yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the file name for `url`, assigning and persisting one if needed
    pub async fn get_or_assign(&mut self, url: &str, extension: Option<&str>) -> CacheResult<String> {
        if let Some(name) = self.entries.get(url) {
            return Ok(name.clone());
        }

        let name = self.next_name(extension.unwrap_or(""));
        self.entries.insert(url.to_string(), name.clone());
        self.save().await?;

        debug!("Registered {} as {} in {}", url, name, self.path.display());
        Ok(name)
    }

    /// Next unused name: current size plus extension
    ///
    /// A hand-edited registry may already use that number; skip forward
    /// rather than hand two URLs the same file.
    fn next_name(&self, extension: &str) -> String {
        let mut sequence = self.entries.len();
        loop {
            let candidate = format!("{}{}", sequence, extension);
            if !self.entries.values().any(|name| *name == candidate) {
                return candidate;
            }
            sequence += 1;
        }
    }

    /// Persist the registry atomically (temp file + rename)
    async fn save(&self) -> CacheResult<()> {
        let temp_path = append_suffix(&self.path, ".tmp");
        let content = format_properties(&self.entries);

        fs::write(&temp_path, content)
            .await
            .map_err(|e| CacheError::io(&temp_path, e))?;
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| CacheError::io(&self.path, e))?;

        Ok(())
    }
}

/// Render entries in properties syntax
fn format_properties(entries: &BTreeMap<String, String>) -> String {
    let mut out = format!("#{}\n", files::REGISTRY_HEADER);
    for (key, value) in entries {
        out.push_str(&escape(key, true));
        out.push('=');
        out.push_str(&escape(value, false));
        out.push('\n');
    }
    out
}

fn escape(text: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (index, c) in text.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            ' ' if is_key || index == 0 => out.push_str("\\ "),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            c if (' '..='~').contains(&c) => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04X}", unit));
                }
            }
        }
    }
    out
}

/// Parse properties text, returning the 1-based line of the first bad entry
fn parse_properties(content: &str) -> Result<BTreeMap<String, String>, usize> {
    let mut entries = BTreeMap::new();
    let mut logical = String::new();
    let mut start_line = 0;

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim_start_matches(is_blank);

        if logical.is_empty() {
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            start_line = index + 1;
        }

        if ends_with_continuation(line) {
            logical.push_str(&line[..line.len() - 1]);
            continue;
        }

        logical.push_str(line);
        let (key, value) = split_key_value(&logical);
        let key = unescape(key).ok_or(start_line)?;
        let value = unescape(value).ok_or(start_line)?;
        entries.insert(key, value);
        logical.clear();
    }

    // A continuation on the last line still forms an entry
    if !logical.is_empty() {
        let (key, value) = split_key_value(&logical);
        let key = unescape(key).ok_or(start_line)?;
        let value = unescape(value).ok_or(start_line)?;
        entries.insert(key, value);
    }

    Ok(entries)
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\x0c'
}

fn ends_with_continuation(line: &str) -> bool {
    line.bytes().rev().take_while(|b| *b == b'\\').count() % 2 == 1
}

fn split_key_value(line: &str) -> (&str, &str) {
    let bytes = line.as_bytes();
    let mut end = 0;
    let mut escaped = false;

    while end < bytes.len() {
        let b = bytes[end];
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == b'=' || b == b':' || is_blank(b as char) {
            break;
        }
        end += 1;
    }

    let key = &line[..end];
    let mut rest = line[end..].trim_start_matches(is_blank);
    if rest.starts_with('=') || rest.starts_with(':') {
        rest = rest[1..].trim_start_matches(is_blank);
    }

    (key, rest)
}

fn unescape(text: &str) -> Option<String> {
    let mut units: Vec<u16> = Vec::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u16; 2];
            units.extend_from_slice(c.encode_utf16(&mut buf));
            continue;
        }

        match chars.next() {
            Some('t') => units.push(u16::from(b'\t')),
            Some('n') => units.push(u16::from(b'\n')),
            Some('r') => units.push(u16::from(b'\r')),
            Some('f') => units.push(0x0c),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return None;
                }
                units.push(u16::from_str_radix(&hex, 16).ok()?);
            }
            Some(other) => {
                let mut buf = [0u16; 2];
                units.extend_from_slice(other.encode_utf16(&mut buf));
            }
            // Trailing lone backslash is dropped
            None => {}
        }
    }

    String::from_utf16(&units).ok()
}
