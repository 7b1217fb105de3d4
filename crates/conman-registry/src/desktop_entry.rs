//! Desktop entry (INI-style) configuration blocks.
//!
//! The parser is forgiving in the usual INI ways: comments, blank lines,
//! `key: value` as well as `key=value`, and quoted values. It still rejects
//! lines that are neither headers nor key/value pairs.

use std::io::Write;

use crate::error::{RegistryError, RegistryResult};

/// Section holding the application keys.
pub const DESKTOP_ENTRY_SECTION: &str = "Desktop Entry";

/// A named section with ordered keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of `key`, matched case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Set `key`, replacing an existing value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A parsed desktop entry file.
///
/// Keys that appear before any section header live in an unnamed default
/// section, which is written without a header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesktopEntry {
    sections: Vec<Section>,
}

impl DesktopEntry {
    /// Parse INI text.
    pub fn parse(text: &str) -> RegistryResult<Self> {
        let mut entry = Self::default();
        let mut current: Option<usize> = None;

        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw_line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .ok_or_else(|| RegistryError::MalformedConfig {
                        line: line_no,
                        reason: format!("unclosed section header {:?}", line),
                    })?
                    .trim();
                if name.is_empty() {
                    return Err(RegistryError::MalformedConfig {
                        line: line_no,
                        reason: "empty section name".to_string(),
                    });
                }
                current = Some(entry.section_index_or_insert(name));
                continue;
            }

            let (key, value) = split_key_value(line).ok_or_else(|| {
                RegistryError::MalformedConfig {
                    line: line_no,
                    reason: format!("key-value delimiter not found: {}", line),
                }
            })?;
            if key.is_empty() {
                return Err(RegistryError::MalformedConfig {
                    line: line_no,
                    reason: "empty key name".to_string(),
                });
            }

            let index = match current {
                Some(index) => index,
                None => {
                    let index = entry.section_index_or_insert("");
                    current = Some(index);
                    index
                }
            };
            entry.sections[index].set(key, unquote(value));
        }

        Ok(entry)
    }

    fn section_index_or_insert(&mut self, name: &str) -> usize {
        match self.sections.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        }
    }

    /// Section by exact name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.name == name)
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    /// Serialize back to INI text.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut first = true;
        for section in &self.sections {
            if !first {
                writeln!(writer)?;
            }
            first = false;

            if !section.name.is_empty() {
                writeln!(writer, "[{}]", section.name)?;
            }
            for (key, value) in &section.entries {
                writeln!(writer, "{}={}", key, value)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for DesktopEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut buf = Vec::new();
        self.write_to(&mut buf).map_err(|_| std::fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let pos = line.find(['=', ':'])?;
    Some((line[..pos].trim(), line[pos + 1..].trim()))
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPOTIFY: &str = "[Desktop Entry]\nType=Application\nName=Spotify\nIcon=spotify\nExec=\"docker run --rm --name spotify spotify:latest\"\nTerminal=false";

    #[test]
    fn test_parse_desktop_entry() {
        let entry = DesktopEntry::parse(SPOTIFY).unwrap();
        let section = entry.section(DESKTOP_ENTRY_SECTION).unwrap();
        assert_eq!(section.get("Name"), Some("Spotify"));
        assert_eq!(section.get("icon"), Some("spotify"));
        assert_eq!(
            section.get("Exec"),
            Some("docker run --rm --name spotify spotify:latest")
        );
        assert_eq!(section.get("Missing"), None);
    }

    #[test]
    fn test_parse_forgiving_syntax() {
        let text = "# comment\n; another\n\n[Desktop Entry]\n  Name : Gimp  \nIcon=gimp\n";
        let entry = DesktopEntry::parse(text).unwrap();
        let section = entry.section(DESKTOP_ENTRY_SECTION).unwrap();
        assert_eq!(section.get("name"), Some("Gimp"));
    }

    #[test]
    fn test_parse_default_section() {
        let entry = DesktopEntry::parse("Version=1.0\n[Desktop Entry]\nName=x").unwrap();
        assert_eq!(entry.section("").unwrap().get("Version"), Some("1.0"));
        assert_eq!(entry.sections().count(), 2);
    }

    #[test]
    fn test_parse_value_keeps_equals() {
        let entry = DesktopEntry::parse("[A]\nExec=env FOO=bar app").unwrap();
        assert_eq!(entry.section("A").unwrap().get("Exec"), Some("env FOO=bar app"));
    }

    #[test]
    fn test_parse_rejects_missing_delimiter() {
        let err = DesktopEntry::parse("[Desktop Entry]\nName=x\njust words").unwrap_err();
        match err {
            RegistryError::MalformedConfig { line, .. } => assert_eq!(line, 3),
            other => panic!("expected MalformedConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_unclosed_header() {
        assert!(matches!(
            DesktopEntry::parse("[Desktop Entry\nName=x"),
            Err(RegistryError::MalformedConfig { line: 1, .. })
        ));
        assert!(DesktopEntry::parse("[]\n").is_err());
        assert!(DesktopEntry::parse("=value\n").is_err());
    }

    #[test]
    fn test_write_roundtrip() {
        let entry = DesktopEntry::parse(SPOTIFY).unwrap();
        let text = entry.to_string();
        assert!(text.starts_with("[Desktop Entry]\nType=Application\nName=Spotify\n"));
        assert_eq!(DesktopEntry::parse(&text).unwrap(), entry);
    }

    #[test]
    fn test_write_separates_sections() {
        let entry = DesktopEntry::parse("[A]\nx=1\n[B]\ny=2").unwrap();
        assert_eq!(entry.to_string(), "[A]\nx=1\n\n[B]\ny=2\n");
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let entry = DesktopEntry::parse("[A]\nName=one\nname=two").unwrap();
        let section = entry.section("A").unwrap();
        assert_eq!(section.get("NAME"), Some("two"));
        assert_eq!(section.entries().count(), 1);
    }
}
