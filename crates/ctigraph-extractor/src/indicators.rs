//! Lexical indicator-of-compromise recognition
//!
//! Deterministic regex matchers for IPv4 addresses, domains, URLs, email
//! addresses, file paths and names, CVE ids and ATT&CK technique ids.
//! Overlapping matches are all reported; a URL's host also shows up as a
//! DOMAIN.

use crate::types::Mention;
use regex::Regex;
use std::sync::LazyLock;

/// Kinds of indicator the extractor recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    /// Dotted-quad IPv4 address
    Ipv4,
    /// Domain ending in a common suffix
    Domain,
    /// `http(s)://` URL
    Url,
    /// Email address
    Email,
    /// Windows path or bare file name with a known extension
    File,
    /// `CVE-YYYY-NNNN+`
    VulnCve,
    /// `T####[.###]`
    AttackTechnique,
}

impl IndicatorKind {
    /// Label written next to the matched text
    pub fn label(self) -> &'static str {
        match self {
            IndicatorKind::Ipv4 => "IPv4",
            IndicatorKind::Domain => "DOMAIN",
            IndicatorKind::Url => "URL",
            IndicatorKind::Email => "EMAIL",
            IndicatorKind::File => "FILE",
            IndicatorKind::VulnCve => "VULN_CVE",
            IndicatorKind::AttackTechnique => "ATTACK_TID",
        }
    }
}

const DOMAIN_SUFFIXES: &str = "com|net|org|gov|edu|mil|io|co|info|biz|us|uk|de|fr|ru|cn|jp";

const FILE_EXTENSIONS: &str = "exe|dll|sys|lnk|bat|cmd|ps1|psm1|vbs|js|jse|hta|jar|apk|\
iso|img|msi|msp|scr|sh|py|pl|php|\
zip|rar|7z|gz|bz2|xz|tar|\
pdf|rtf|doc|docx|xls|xlsx|ppt|pptx|csv|txt|log|dat|tmp";

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:[a-z0-9](?:[a-z0-9-]{{0,61}}[a-z0-9])?\.)+(?:{})\b",
        DOMAIN_SUFFIXES
    ))
    .expect("valid regex")
});

static IPV4_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b",
    )
    .expect("valid regex")
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhttps?://[^\s)]+").expect("valid regex"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("valid regex")
});

static WINDOWS_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(?i)(?:[a-z]:\\|\\\\)[^\s"<>|]+?\.(?:{})\b"#,
        FILE_EXTENSIONS
    ))
    .expect("valid regex")
});

static BARE_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(?i)\b[^\s\\/:"<>|]+\.(?:{})\b"#,
        FILE_EXTENSIONS
    ))
    .expect("valid regex")
});

static CVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bCVE-\d{4}-\d{4,7}\b").expect("valid regex"));

static TECHNIQUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bT\d{4}(?:\.\d{3})?\b").expect("valid regex"));

/// Matchers in reporting order
fn matchers() -> [(&'static Regex, IndicatorKind); 8] {
    [
        (&*DOMAIN_RE, IndicatorKind::Domain),
        (&*IPV4_RE, IndicatorKind::Ipv4),
        (&*URL_RE, IndicatorKind::Url),
        (&*EMAIL_RE, IndicatorKind::Email),
        (&*WINDOWS_PATH_RE, IndicatorKind::File),
        (&*BARE_FILE_RE, IndicatorKind::File),
        (&*CVE_RE, IndicatorKind::VulnCve),
        (&*TECHNIQUE_RE, IndicatorKind::AttackTechnique),
    ]
}

/// Find every indicator in `text`
///
/// Never fails; empty or malformed input yields an empty list.
pub fn extract_indicators(text: &str) -> Vec<Mention> {
    let mut found = Vec::new();
    for (re, kind) in matchers() {
        for m in re.find_iter(text) {
            found.push(Mention::new(m.as_str(), kind.label()));
        }
    }
    found
}

/// True if `text` contains at least one indicator
pub fn has_indicator(text: &str) -> bool {
    matchers().iter().any(|(re, _)| re.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(mentions: &[Mention], label: &str) -> usize {
        mentions.iter().filter(|m| m.label == label).count()
    }

    fn texts<'a>(mentions: &'a [Mention], label: &str) -> Vec<&'a str> {
        mentions
            .iter()
            .filter(|m| m.label == label)
            .map(|m| m.text.as_str())
            .collect()
    }

    #[test]
    fn test_mixed_indicators() {
        let found = extract_indicators(
            "Contact admin@example.com or visit http://bad.example.io/path and CVE-2023-12345",
        );
        assert_eq!(count(&found, "EMAIL"), 1);
        assert_eq!(count(&found, "URL"), 1);
        assert_eq!(count(&found, "VULN_CVE"), 1);
        let domains = count(&found, "DOMAIN");
        assert!((1..=2).contains(&domains), "got {} domains", domains);
        assert_eq!(texts(&found, "URL"), vec!["http://bad.example.io/path"]);
    }

    #[test]
    fn test_ipv4_bounds() {
        let found = extract_indicators("C2 at 192.168.10.254 and 10.0.0.1, not 256.1.1.1");
        assert_eq!(texts(&found, "IPv4"), vec!["192.168.10.254", "10.0.0.1"]);
    }

    #[test]
    fn test_files() {
        let found =
            extract_indicators(r"Dropped C:\Users\Public\svc.exe and update.ps1 via archive.tar.gz");
        let files = texts(&found, "FILE");
        assert!(files.contains(&r"C:\Users\Public\svc.exe"));
        assert!(files.contains(&"update.ps1"));
        assert!(files.contains(&"archive.tar.gz"));
    }

    #[test]
    fn test_technique_ids() {
        let found = extract_indicators("Uses T1059.001 and T1566 but not t1566 or T12345");
        assert_eq!(texts(&found, "ATTACK_TID"), vec!["T1059.001", "T1566"]);
    }

    #[test]
    fn test_cve_is_case_insensitive() {
        let found = extract_indicators("patched cve-2021-44228 quickly");
        assert_eq!(texts(&found, "VULN_CVE"), vec!["cve-2021-44228"]);
    }

    #[test]
    fn test_empty_and_plain_text() {
        assert!(extract_indicators("").is_empty());
        assert!(extract_indicators("The actor remained quiet for months").is_empty());
        assert!(!has_indicator("nothing here"));
        assert!(has_indicator("see evil.ru"));
    }
}
