// src/dispatch/request.rs

use std::fmt;
use std::str::FromStr;

/// Request method as far as the dispatcher cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Other(String),
}

impl Method {
    /// Only reads participate in per-module rebuilds.
    pub fn is_read(&self) -> bool {
        matches!(self, Method::Get | Method::Head)
    }
}

impl FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_uppercase().as_str() {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            other => Method::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Head => f.write_str("HEAD"),
            Method::Other(m) => f.write_str(m),
        }
    }
}

/// Inbound artifact request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Request target as received, possibly with query string or fragment.
    pub target: String,
}

impl Request {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::Get, target)
    }

    /// Parse a `METHOD TARGET` line. Returns `None` for blank or one-word
    /// lines.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let method = parts.next()?;
        let target = parts.next()?;
        let method = method.parse().unwrap_or(Method::Other(method.to_string()));
        Some(Self::new(method, target))
    }

    /// Target with query string and fragment removed; this is what modules
    /// are keyed by.
    pub fn pathname(&self) -> &str {
        let end = self
            .target
            .find(['?', '#'])
            .unwrap_or(self.target.len());
        &self.target[..end]
    }
}
