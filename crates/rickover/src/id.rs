//! Prefixed identifiers: a free-form short textual prefix concatenated with
//! a canonical 36-character UUID string. Storage is by the UUID only; the
//! prefix is reattached on read. The producer HTTP surface always mints
//! `job_`-prefixed ids, but parsing accepts any prefix so long as the last
//! 36 characters are a valid UUID.

use std::fmt;

use uuid::Uuid;

pub const DEFAULT_PREFIX: &str = "job_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Rejects any string whose last 36 characters are not a valid UUID.
    /// Everything before that is treated as a discardable prefix.
    pub fn parse(s: &str) -> Result<Self, ParseJobIdError> {
        if s.len() < 36 {
            return Err(ParseJobIdError);
        }
        let (_, tail) = s.split_at(s.len() - 36);
        let uuid = Uuid::parse_str(tail).map_err(|_| ParseJobIdError)?;
        Ok(Self(uuid))
    }

    /// Renders with the default `job_` prefix, as the producer surface does.
    pub fn to_prefixed_string(&self) -> String {
        format!("{DEFAULT_PREFIX}{}", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_prefixed_string())
    }
}

impl From<Uuid> for JobId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseJobIdError;

impl fmt::Display for ParseJobIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "last 36 characters are not a valid UUID")
    }
}

impl std::error::Error for ParseJobIdError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_prefixed_string() {
        let id = JobId::generate();
        let rendered = id.to_prefixed_string();
        let parsed = JobId::parse(&rendered).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn accepts_arbitrary_prefixes() {
        let uuid = Uuid::new_v4();
        let parsed = JobId::parse(&format!("sms-{uuid}")).unwrap();
        assert_eq!(parsed.uuid(), uuid);
    }

    #[test]
    fn rejects_short_strings() {
        assert!(JobId::parse("job_not-a-uuid").is_err());
    }

    #[test]
    fn rejects_garbage_tail() {
        let bad = format!("job_{}", "x".repeat(36));
        assert!(JobId::parse(&bad).is_err());
    }
}
