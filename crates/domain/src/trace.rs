use serde::Serialize;

/// Structured trace events emitted across all SessionRelay crates.
///
/// Every recovered or surfaced failure in the session cache and the
/// relay path ends up here, so one log query covers the whole system.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    StoreCall {
        operation: String,
        object: String,
        status: u16,
        duration_ms: u64,
    },
    SessionLookup {
        session: String,
        found: bool,
        error: Option<String>,
    },
    SessionExtracted {
        session: String,
        path: String,
        bytes: usize,
    },
    SessionExtractSkipped {
        session: String,
        reason: String,
    },
    SessionDeleted {
        session: String,
        ok: bool,
        error: Option<String>,
    },
    StagingSwept {
        dir: String,
        kept: Option<String>,
        removed: usize,
        failed: usize,
    },
    GateRejected {
        sender: String,
        reason: String,
    },
    RelayCall {
        sender: String,
        status: u16,
        duration_ms: u64,
        has_reply: bool,
    },
    RelayFailed {
        sender: String,
        stage: String,
        error: String,
    },
    ReplySent {
        sender: String,
        chars: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "sr_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let ev = TraceEvent::ReplySent {
            sender: "123@c.us".into(),
            chars: 5,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "ReplySent");
        assert_eq!(json["sender"], "123@c.us");
        assert_eq!(json["chars"], 5);
    }
}
