use std::{fmt, str::FromStr};

/// Two-letter domain identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Resource harness (SHN)
    HN,
    /// In-process duplex transport (SDX)
    DX,
    /// Test kit glue (SKT)
    KT,
    /// Configuration loading (SCF)
    CF,
}

impl Domain {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HN => "HN",
            Self::DX => "DX",
            Self::KT => "KT",
            Self::CF => "CF",
        }
    }

    fn from_str_opt(s: &str) -> Option<Self> {
        Some(match s {
            "HN" => Self::HN,
            "DX" => Self::DX,
            "KT" => Self::KT,
            "CF" => Self::CF,
            _ => return None,
        })
    }
}

impl fmt::Display for Domain {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category digit (0-9)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Category {
    /// Malformed frames or payloads
    Framing = 0,
    /// Failed lookups
    Resolution = 1,
    /// Constraint violations
    Validation = 2,
    /// Duplicate or conflicting state
    Conflict = 3,
    /// Operation on a closed or finished component
    Lifecycle = 4,
    /// Caller-requested cancellation
    Cancelled = 5,
    /// Deadline elapsed
    Timeout = 6,
    /// Connection level failures
    Transport = 7,
    /// Release actions that failed during teardown
    Cleanup = 8,
    /// Bugs and panics
    Internal = 9,
}

impl Category {
    pub const fn as_digit(&self) -> u8 {
        *self as u8
    }

    pub const fn from_digit(digit: u8) -> Option<Self> {
        Some(match digit {
            0 => Self::Framing,
            1 => Self::Resolution,
            2 => Self::Validation,
            3 => Self::Conflict,
            4 => Self::Lifecycle,
            5 => Self::Cancelled,
            6 => Self::Timeout,
            7 => Self::Transport,
            8 => Self::Cleanup,
            9 => Self::Internal,
            _ => return None,
        })
    }
}

impl fmt::Display for Category {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.as_digit())
    }
}

/// Compositional error code - S[Domain][Category][Seq]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    pub domain: Domain,
    pub category: Category,
    pub sequence: u16,
}

impl ErrorCode {
    pub const fn new(
        domain: Domain,
        category: Category,
        sequence: u16,
    ) -> Self {
        Self {
            domain,
            category,
            sequence,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "S{}{}{:03}",
            self.domain,
            self.category.as_digit(),
            self.sequence
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid error code: {0}")]
pub struct ParseCodeError(pub String);

impl FromStr for ErrorCode {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseCodeError(s.to_string());

        if !s.starts_with('S') || s.len() != 7 {
            return Err(invalid());
        }

        let domain = s
            .get(1..3)
            .and_then(Domain::from_str_opt)
            .ok_or_else(invalid)?;

        let category = s
            .get(3..4)
            .and_then(|d| d.parse::<u8>().ok())
            .and_then(Category::from_digit)
            .ok_or_else(invalid)?;

        let sequence: u16 = s
            .get(4..)
            .filter(|d| d.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|d| d.parse().ok())
            .ok_or_else(invalid)?;

        Ok(Self::new(domain, category, sequence))
    }
}

/// Failure severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    /// Fails the test
    #[default]
    Error,
    /// Reported, test still passes
    Warning,
    /// Informational only
    Info,
}

impl Severity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
