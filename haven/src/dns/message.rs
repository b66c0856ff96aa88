use crate::errors::{ErrorKind, HavenError, HavenResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// DNS record types queried over DNS-over-HTTPS.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    Cname,
    Txt,
    Srv,
}

impl RecordType {
    /// The numeric type code carried in JSON answers.
    pub fn code(&self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::Cname => 5,
            RecordType::Txt => 16,
            RecordType::Srv => 33,
        }
    }

    /// The mnemonic sent as the `type` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
            RecordType::Srv => "SRV",
        }
    }

    pub fn from_code(code: u16) -> Option<RecordType> {
        match code {
            1 => Some(RecordType::A),
            5 => Some(RecordType::Cname),
            16 => Some(RecordType::Txt),
            33 => Some(RecordType::Srv),
            _ => None,
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A DNS JSON response: `{"Status": 0, "Answer": [...]}`.
///
/// A non-zero status (for example 3, NXDOMAIN) is an empty answer set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DohResponse {
    #[serde(rename = "Status")]
    pub status: u32,
    #[serde(rename = "Answer", default)]
    pub answer: Vec<DohAnswer>,
}

/// One answer record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DohAnswer {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: u16,
    #[serde(rename = "TTL", default)]
    pub ttl: u32,
    pub data: String,
}

impl DohResponse {
    /// Parses a response body.
    ///
    /// # Errors
    ///
    /// Returns [ErrorKind::MalformedResponse] if the body is not a DNS JSON
    /// document.
    pub fn parse(body: &[u8]) -> HavenResult<DohResponse> {
        serde_json::from_slice(body).map_err(|e| {
            log::error!("Malformed DNS-over-HTTPS response: {}", e);
            HavenError::new(
                &format!("Malformed DNS-over-HTTPS response: {}", e),
                ErrorKind::MalformedResponse,
            )
        })
    }

    /// Returns the answers of `record_type`, or nothing when the status is
    /// not NOERROR.
    pub fn answers(&self, record_type: RecordType) -> impl Iterator<Item = &DohAnswer> {
        let ok = self.status == 0;
        self.answer
            .iter()
            .filter(move |a| ok && a.record_type == record_type.code())
    }
}

/// A service record pointing at one host of a cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SrvRecord {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    /// Host name without the trailing dot.
    pub target: String,
}

impl SrvRecord {
    /// Parses SRV answer data of the form `priority weight port target`.
    /// Returns `None` for anything else.
    pub fn parse(data: &str) -> Option<SrvRecord> {
        let mut parts = data.split_whitespace();
        let priority = parts.next()?.parse().ok()?;
        let weight = parts.next()?.parse().ok()?;
        let port = parts.next()?.parse().ok()?;
        let target = parts.next()?.trim_end_matches('.');
        if target.is_empty() || parts.next().is_some() {
            return None;
        }

        Some(SrvRecord {
            priority,
            weight,
            port,
            target: target.to_string(),
        })
    }
}

impl Display for SrvRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.target, self.port)
    }
}

/// Decodes TXT answer data: each quoted character-string has its quotes
/// removed and the strings are concatenated, so `"a" "b"` becomes `ab`.
/// Unquoted data is returned as is.
pub fn decode_txt(data: &str) -> String {
    let trimmed = data.trim();
    if !trimmed.starts_with('"') {
        return trimmed.to_string();
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut in_quotes = false;
    let mut chars = trimmed.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            c if in_quotes => out.push(c),
            _ => {}
        }
    }
    out
}
