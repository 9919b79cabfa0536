//! Shared profile file parsing
//!
//! Both files use the same INI dialect. The config file names profiles
//! `[profile name]` (except `[default]`); the credentials file uses the bare
//! name. Sections the toolkit does not understand are skipped.

use crate::error::{ToolkitError, ToolkitResult};
use std::collections::HashMap;
use std::path::Path;
use tracing::trace;

/// Which of the two shared files is being read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Config,
    Credentials,
}

/// Raw properties of one profile section
pub type RawProfile = HashMap<String, String>;

/// Map a section header to a profile name, or `None` for non-profile sections
fn profile_name(header: &str, kind: FileKind) -> Option<String> {
    let header = header.trim();
    match kind {
        FileKind::Credentials => Some(header.to_string()),
        FileKind::Config => {
            if header == "default" {
                return Some(header.to_string());
            }
            header
                .strip_prefix("profile")
                .filter(|rest| rest.starts_with(char::is_whitespace))
                .map(|rest| rest.trim().to_string())
        }
    }
}

fn strip_inline_comment(value: &str) -> &str {
    let mut previous_was_space = false;
    for (idx, ch) in value.char_indices() {
        if (ch == '#' || ch == ';') && previous_was_space {
            return value[..idx].trim_end();
        }
        previous_was_space = ch.is_whitespace();
    }
    value
}

/// Parse one file into `(profile name, properties)` pairs in file order
///
/// Property names are lower-cased. Indented lines following a property are
/// appended to it as sub-property text.
pub fn parse_profile_file(
    path: &Path,
    contents: &str,
    kind: FileKind,
) -> ToolkitResult<Vec<(String, RawProfile)>> {
    let mut profiles: Vec<(String, RawProfile)> = Vec::new();
    // None: before any section. Some(None): inside a skipped section.
    let mut current: Option<Option<usize>> = None;
    let mut last_key: Option<String> = None;

    for (idx, raw_line) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw_line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if trimmed.starts_with('[') {
            let close = trimmed.find(']').ok_or_else(|| {
                ToolkitError::profile_parse(path, line_no, "section header is missing ']'")
            })?;
            let rest = trimmed[close + 1..].trim();
            if !rest.is_empty() && !rest.starts_with('#') && !rest.starts_with(';') {
                return Err(ToolkitError::profile_parse(
                    path,
                    line_no,
                    "unexpected text after section header",
                ));
            }
            let header = &trimmed[1..close];
            if header.trim().is_empty() {
                return Err(ToolkitError::profile_parse(path, line_no, "empty section name"));
            }

            current = Some(profile_name(header, kind).map(|name| {
                match profiles.iter().position(|(existing, _)| *existing == name) {
                    Some(pos) => pos,
                    None => {
                        profiles.push((name, RawProfile::new()));
                        profiles.len() - 1
                    }
                }
            }));
            last_key = None;
            trace!(path = %path.display(), header = %header, "Profile section");
            continue;
        }

        let section = current.ok_or_else(|| {
            ToolkitError::profile_parse(path, line_no, "property defined outside of a profile")
        })?;

        let indented = raw_line.starts_with(char::is_whitespace);
        if indented {
            if let (Some(pos), Some(key)) = (section, last_key.as_ref()) {
                let value = profiles[pos].1.entry(key.clone()).or_default();
                if !value.is_empty() {
                    value.push('\n');
                }
                value.push_str(trimmed);
                continue;
            }
        }

        let (key, value) = trimmed.split_once('=').ok_or_else(|| {
            ToolkitError::profile_parse(path, line_no, "expected 'key = value'")
        })?;
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            return Err(ToolkitError::profile_parse(path, line_no, "property name is empty"));
        }

        if let Some(pos) = section {
            let value = strip_inline_comment(value.trim()).to_string();
            profiles[pos].1.insert(key.clone(), value);
        }
        last_key = Some(key);
    }

    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(contents: &str, kind: FileKind) -> ToolkitResult<Vec<(String, RawProfile)>> {
        parse_profile_file(Path::new("/tmp/test-profile"), contents, kind)
    }

    #[test]
    fn test_credentials_file() {
        let profiles = parse(
            "# comment\n[default]\naws_access_key_id = AKIADEFAULT\naws_secret_access_key=secret\n\n[dev]\nAWS_ACCESS_KEY_ID = AKIADEV\n",
            FileKind::Credentials,
        )
        .unwrap();

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].0, "default");
        assert_eq!(profiles[0].1["aws_secret_access_key"], "secret");
        assert_eq!(profiles[1].0, "dev");
        assert_eq!(profiles[1].1["aws_access_key_id"], "AKIADEV");
    }

    #[test]
    fn test_config_file_prefixes() {
        let profiles = parse(
            "[default]\nregion = us-east-1\n[profile dev]\nrole_arn = arn:aws:iam::123:role/dev\n[sso-session corp]\nsso_region = us-east-1\n[profileless]\nx = y\n",
            FileKind::Config,
        )
        .unwrap();

        let names: Vec<&str> = profiles.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["default", "dev"]);
        assert_eq!(profiles[1].1["role_arn"], "arn:aws:iam::123:role/dev");
    }

    #[test]
    fn test_inline_comments_and_sub_properties() {
        let profiles = parse(
            "[dev]\nregion = us-west-2 # oregon\ns3 =\n  max_concurrent_requests = 10\n  addressing_style = path\n",
            FileKind::Credentials,
        )
        .unwrap();
        let dev = &profiles[0].1;
        assert_eq!(dev["region"], "us-west-2");
        assert_eq!(dev["s3"], "max_concurrent_requests = 10\naddressing_style = path");
    }

    #[test]
    fn test_repeated_section_merges() {
        let profiles = parse("[dev]\na = 1\n[other]\nb = 2\n[dev]\nc = 3\n", FileKind::Credentials).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].1.len(), 2);
    }

    #[test]
    fn test_property_outside_profile() {
        let err = parse("region = us-east-1\n", FileKind::Config).unwrap_err();
        assert_eq!(
            err,
            ToolkitError::profile_parse(
                Path::new("/tmp/test-profile"),
                1,
                "property defined outside of a profile"
            )
        );
    }

    #[test]
    fn test_malformed_lines_report_line_numbers() {
        match parse("[dev]\naws_access_key_id\n", FileKind::Credentials).unwrap_err() {
            ToolkitError::ProfileParse { line, message, .. } => {
                assert_eq!(line, 2);
                assert!(message.contains("key = value"));
            }
            other => panic!("Unexpected error: {:?}", other),
        }

        assert!(parse("[dev\n", FileKind::Credentials).is_err());
        assert!(parse("[ ]\n", FileKind::Credentials).is_err());
    }
}
