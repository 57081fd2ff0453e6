use std::fmt;
use std::ops::RangeInclusive;

/// HTTP status code classes (1xx through 5xx)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFamily {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
}

impl StatusFamily {
    pub const ALL: [StatusFamily; 5] = [
        StatusFamily::Informational,
        StatusFamily::Success,
        StatusFamily::Redirection,
        StatusFamily::ClientError,
        StatusFamily::ServerError,
    ];

    pub fn range(&self) -> RangeInclusive<u16> {
        match self {
            StatusFamily::Informational => 100..=199,
            StatusFamily::Success => 200..=299,
            StatusFamily::Redirection => 300..=399,
            StatusFamily::ClientError => 400..=499,
            StatusFamily::ServerError => 500..=599,
        }
    }

    pub fn contains(&self, status: u16) -> bool {
        self.range().contains(&status)
    }

    /// Family of `status`, or `None` outside 100..=599
    pub fn of(status: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|family| family.contains(status))
    }
}

impl fmt::Display for StatusFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusFamily::Informational => "INFORMATIONAL",
            StatusFamily::Success => "SUCCESS",
            StatusFamily::Redirection => "REDIRECTION",
            StatusFamily::ClientError => "CLIENT_ERROR",
            StatusFamily::ServerError => "SERVER_ERROR",
        };
        let range = self.range();
        write!(f, "{} {}..{}", name, range.start(), range.end())
    }
}
