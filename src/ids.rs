use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use ulid::Ulid;

/// Per-dispatch correlation identifier, threaded through every log line for
/// the request.
///
/// Hosts that propagate an inbound `X-Request-Id`-style header hand it to
/// [`RequestId::from_header_or_new`] (or
/// [`Dispatcher::dispatch_with_id`](crate::dispatcher::Dispatcher::dispatch_with_id));
/// an unparseable value gets a fresh id rather than an error, so a bad
/// header never fails a request.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(Ulid);

impl RequestId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Adopt a caller-supplied id when it parses, otherwise mint a new one.
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|s| s.parse::<RequestId>().ok())
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RequestId(Ulid::from_string(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_header_id_is_adopted() {
        let id = RequestId::new();
        let adopted = RequestId::from_header_or_new(Some(&id.to_string()));
        assert_eq!(adopted, id);
    }

    #[test]
    fn test_garbage_header_gets_fresh_id() {
        let a = RequestId::from_header_or_new(Some("not-a-ulid"));
        let b = RequestId::from_header_or_new(None);
        assert_ne!(a, b);
        assert!(a.to_string().parse::<RequestId>().is_ok());
    }
}
