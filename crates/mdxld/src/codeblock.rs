//! Code fence info strings.

use serde::Serialize;

/// Parsed info string of a fenced code block.
///
/// For ```` ```tsx filename="Button.tsx" live ```` the language is `tsx` and
/// the meta is `filename="Button.tsx" live`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FenceInfo {
    /// First word of the info string
    pub lang: Option<String>,

    /// Everything after the language
    pub meta: Option<String>,

    /// Optional filename hint from the meta
    pub filename: Option<String>,
}

impl FenceInfo {
    /// Parse a code fence info string.
    pub fn parse(info: &str) -> Self {
        let info = info.trim();
        let (lang, meta) = match info.split_once(char::is_whitespace) {
            Some((lang, meta)) => (lang, meta.trim()),
            None => (info, ""),
        };

        Self {
            lang: non_empty(lang),
            meta: non_empty(meta),
            filename: extract_filename(meta),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Extract filename from code fence info string if present.
///
/// Supports formats like:
/// - `tsx filename="Button.tsx"`
/// - `tsx file=Button.tsx`
pub fn extract_filename(info: &str) -> Option<String> {
    // Try filename="..." format
    if let Some(start) = info.find("filename=\"") {
        let rest = &info[start + 10..];
        if let Some(end) = rest.find('"') {
            return Some(rest[..end].to_string());
        }
    }

    // Try file=... format (without quotes)
    if let Some(start) = info.find("file=") {
        let rest = &info[start + 5..];
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let filename = rest[..end].trim_matches('"');
        if !filename.is_empty() {
            return Some(filename.to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lang_and_meta() {
        let info = FenceInfo::parse("tsx live  title=\"Demo\"");

        assert_eq!(info.lang.as_deref(), Some("tsx"));
        assert_eq!(info.meta.as_deref(), Some("live  title=\"Demo\""));
        assert_eq!(info.filename, None);
    }

    #[test]
    fn handles_empty_and_bare_info() {
        assert_eq!(FenceInfo::parse(""), FenceInfo::default());

        let info = FenceInfo::parse("rust");
        assert_eq!(info.lang.as_deref(), Some("rust"));
        assert_eq!(info.meta, None);
    }

    #[test]
    fn extracts_filename() {
        assert_eq!(
            extract_filename("tsx filename=\"Button.tsx\""),
            Some("Button.tsx".to_string())
        );
        assert_eq!(
            extract_filename("tsx file=Button.tsx live"),
            Some("Button.tsx".to_string())
        );
        assert_eq!(extract_filename("tsx live"), None);
        assert_eq!(
            FenceInfo::parse("js filename=\"main.js\"").filename.as_deref(),
            Some("main.js")
        );
    }
}
