//! `server.properties` overlay and atomic file I/O.
//!
//! Format: line-oriented `key=value`, one entry per line. Lines starting with
//! `#` or `!` are comments. Comments are not preserved on rewrite.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the properties file inside a server's working directory.
pub const PROPERTIES_FILE: &str = "server.properties";

/// Ordered key/value overlay.
///
/// Insertion order is kept so rewritten files stay stable. Setting an
/// existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyOverlay {
    entries: Vec<(String, String)>,
}

impl PropertyOverlay {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a value, replacing an existing key in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge `newer` over `self`: values in `newer` win, new keys are appended.
    pub fn merge(&mut self, newer: &Self) {
        for (key, value) in newer.iter() {
            self.set(key, value);
        }
    }

    /// Parse properties file content.
    ///
    /// Follows the `java.util.Properties` line format: blank lines and
    /// comments are skipped, a line ending in an odd number of backslashes
    /// continues on the next line, and backslash escapes (including
    /// `\uXXXX`) are decoded. The key ends at the first unescaped `=` or `:`;
    /// lines without one are skipped. Unescaped whitespace around the
    /// separator is dropped.
    pub fn parse(content: &str) -> Self {
        let mut overlay = Self::new();
        let mut lines = content.lines();
        while let Some(line) = lines.next() {
            let first = line.trim_start();
            if first.is_empty() || first.starts_with(['#', '!']) {
                continue;
            }
            let mut logical = first.to_string();
            while continues(&logical) {
                logical.pop();
                match lines.next() {
                    Some(next) => logical.push_str(next.trim_start()),
                    None => break,
                }
            }
            if let Some((key, value)) = split_entry(&logical) {
                overlay.set(key, value);
            }
        }
        overlay
    }

    /// Render as file content, one escaped `key=value` per line.
    pub fn render(&self) -> String {
        let mut out = String::from("# Managed by blockhost\n");
        for (key, value) in self.iter() {
            escape_key(key, &mut out);
            out.push('=');
            escape_value(value, &mut out);
            out.push('\n');
        }
        out
    }
}

fn continues(line: &str) -> bool {
    line.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

fn split_entry(line: &str) -> Option<(String, String)> {
    let mut key = String::new();
    // Length of the key up to its last escaped or non-whitespace char.
    let mut key_len = 0;
    let mut chars = line.chars();
    loop {
        match chars.next()? {
            '\\' => {
                push_unescaped(&mut chars, &mut key);
                key_len = key.len();
            }
            '=' | ':' => break,
            c => {
                key.push(c);
                if !c.is_whitespace() {
                    key_len = key.len();
                }
            }
        }
    }
    key.truncate(key_len);
    if key.is_empty() {
        return None;
    }
    let value = chars.as_str().trim_start_matches([' ', '\t', '\x0c']);
    Some((key, unescape(value)))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            push_unescaped(&mut chars, &mut out);
        } else {
            out.push(c);
        }
    }
    out
}

/// Decode the escape following a backslash. A trailing lone backslash is dropped.
fn push_unescaped(chars: &mut std::str::Chars<'_>, out: &mut String) {
    match chars.next() {
        Some('n') => out.push('\n'),
        Some('r') => out.push('\r'),
        Some('t') => out.push('\t'),
        Some('f') => out.push('\x0c'),
        Some('u') => {
            let hex = chars.as_str().get(..4).filter(|h| h.bytes().all(|b| b.is_ascii_hexdigit()));
            match hex.and_then(|h| u32::from_str_radix(h, 16).ok()).and_then(char::from_u32) {
                Some(decoded) => {
                    out.push(decoded);
                    for _ in 0..4 {
                        chars.next();
                    }
                }
                None => out.push('u'),
            }
        }
        Some(c) => out.push(c),
        None => {}
    }
}

fn push_control_escape(c: char, out: &mut String) -> bool {
    let escaped = match c {
        '\\' => "\\\\",
        '\n' => "\\n",
        '\r' => "\\r",
        '\t' => "\\t",
        '\x0c' => "\\f",
        _ => return false,
    };
    out.push_str(escaped);
    true
}

fn escape_key(key: &str, out: &mut String) {
    for c in key.chars() {
        if push_control_escape(c, out) {
            continue;
        }
        if matches!(c, ' ' | '=' | ':' | '#' | '!') {
            out.push('\\');
        }
        out.push(c);
    }
}

fn escape_value(value: &str, out: &mut String) {
    for (i, c) in value.chars().enumerate() {
        if push_control_escape(c, out) {
            continue;
        }
        // Leading spaces would be read as separator whitespace.
        if i == 0 && c == ' ' {
            out.push('\\');
        }
        out.push(c);
    }
}

impl FromIterator<(String, String)> for PropertyOverlay {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut overlay = Self::new();
        for (k, v) in iter {
            overlay.set(k, v);
        }
        overlay
    }
}

impl Serialize for PropertyOverlay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PropertyOverlay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OverlayVisitor;

        impl<'de> Visitor<'de> for OverlayVisitor {
            type Value = PropertyOverlay;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of property names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut overlay = PropertyOverlay::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    overlay.set(key, value);
                }
                Ok(overlay)
            }
        }

        deserializer.deserialize_map(OverlayVisitor)
    }
}

/// Read a properties file. A missing file reads as empty.
pub fn read_properties(path: &Path) -> io::Result<PropertyOverlay> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(PropertyOverlay::parse(&content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(PropertyOverlay::new()),
        Err(e) => Err(e),
    }
}

/// Write a properties file atomically using temp file + rename.
///
/// 1. Write to `<name>.tmp` in the same directory
/// 2. Rename over `<name>` (atomic on Unix)
pub fn write_properties(path: &Path, overlay: &PropertyOverlay) -> io::Result<()> {
    let temp_path = temp_path_for(path);
    fs::write(&temp_path, overlay.render())?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    debug!(path = %path.display(), entries = overlay.len(), "Wrote properties file");
    Ok(())
}

/// Merge `overlay` into the file at `path` (overlay wins) and write it back atomically.
///
/// Returns the merged set.
pub fn apply_overlay(path: &Path, overlay: &PropertyOverlay) -> io::Result<PropertyOverlay> {
    let mut merged = read_properties(path)?;
    merged.merge(overlay);
    write_properties(path, &merged)?;
    Ok(merged)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parse_skips_comments_and_blank_lines() {
        let content = "#Minecraft server properties\n\nmotd=A Minecraft Server\n! bang comment\nmax-players = 20\nbroken line\n";
        let overlay = PropertyOverlay::parse(content);
        assert_eq!(overlay.len(), 2);
        assert_eq!(overlay.get("motd"), Some("A Minecraft Server"));
        assert_eq!(overlay.get("max-players"), Some("20"));
    }

    #[test]
    fn value_may_contain_equals() {
        let overlay = PropertyOverlay::parse("generator-settings=a=b\n");
        assert_eq!(overlay.get("generator-settings"), Some("a=b"));
    }

    #[test]
    fn merge_newer_values_win_and_order_is_kept() {
        let mut base = PropertyOverlay::parse("a=1\nb=2\n");
        let newer = PropertyOverlay::parse("b=3\nc=4\n");
        base.merge(&newer);
        let pairs: Vec<_> = base.iter().collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "3"), ("c", "4")]);
    }

    #[test]
    fn written_file_reads_back_same_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROPERTIES_FILE);

        let overlay: PropertyOverlay = [
            ("server-port", "25565"),
            ("motd", "Hello = world"),
            ("level-seed", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        write_properties(&path, &overlay).unwrap();
        let read = read_properties(&path).unwrap();

        let as_map = |o: &PropertyOverlay| -> HashMap<String, String> {
            o.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };
        assert_eq!(as_map(&read), as_map(&overlay));
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn special_characters_survive_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROPERTIES_FILE);

        let overlay: PropertyOverlay = [
            ("motd", "  indented"),
            ("welcome", "hi\nonline-mode=false"),
            ("windows-path", "C:\\servers\\"),
            ("tabbed", "\tstart\r\nend "),
            ("odd key=with:separators", "x"),
            ("#not-a-comment", "1"),
            ("!bang", "2"),
            ("section", "\u{a7}6Gold"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        write_properties(&path, &overlay).unwrap();
        let read = read_properties(&path).unwrap();

        assert_eq!(read, overlay);
        assert_eq!(read.get("online-mode"), None);
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), overlay.len() + 1);
    }

    #[test]
    fn parse_decodes_escapes_and_continuations() {
        let content = "motd=\\u00A7aHello \\\n    world\nkey\\ with\\ spaces : value\nlevel-name = \\ world\n";
        let overlay = PropertyOverlay::parse(content);
        assert_eq!(overlay.get("motd"), Some("\u{a7}aHello world"));
        assert_eq!(overlay.get("key with spaces"), Some("value"));
        assert_eq!(overlay.get("level-name"), Some(" world"));
    }

    #[test]
    fn apply_overlay_merges_into_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROPERTIES_FILE);
        fs::write(&path, "motd=old\nonline-mode=true\n").unwrap();

        let mut overlay = PropertyOverlay::new();
        overlay.set("motd", "new");
        let merged = apply_overlay(&path, &overlay).unwrap();

        assert_eq!(merged.get("motd"), Some("new"));
        assert_eq!(merged.get("online-mode"), Some("true"));
        assert_eq!(read_properties(&path).unwrap(), merged);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let overlay = read_properties(&dir.path().join("nope.properties")).unwrap();
        assert!(overlay.is_empty());
    }

    #[test]
    fn overlay_json_keeps_document_order() {
        let overlay: PropertyOverlay =
            serde_json::from_str(r#"{"zeta":"1","alpha":"2"}"#).unwrap();
        let keys: Vec<_> = overlay.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(
            serde_json::to_string(&overlay).unwrap(),
            r#"{"zeta":"1","alpha":"2"}"#
        );
    }
}
