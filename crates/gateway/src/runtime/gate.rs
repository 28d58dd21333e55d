//! Message gate: which inbound events are worth relaying.
//!
//! The gate is a pure function of the message, the startup context and
//! the current time.  Nothing here logs or mutates; callers decide what
//! to do with a rejection.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use sr_domain::config::GateConfig;
use sr_domain::message::{InboundMessage, MessageKind};

/// Captured once at process start and only read afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownContext {
    started_at: DateTime<Utc>,
    cooldown: Duration,
}

impl CooldownContext {
    pub fn new(started_at: DateTime<Utc>, cooldown: Duration) -> Self {
        Self {
            started_at,
            cooldown,
        }
    }

    pub fn starting_now(cooldown: Duration) -> Self {
        Self::new(Utc::now(), cooldown)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Has the post-startup quiet period elapsed at `now`?
    pub fn cooled_down(&self, now: DateTime<Utc>) -> bool {
        let elapsed_ms = now.signed_duration_since(self.started_at).num_milliseconds();
        let window_ms = i64::try_from(self.cooldown.as_millis()).unwrap_or(i64::MAX);
        elapsed_ms >= window_ms
    }
}

/// Why a message was not relayed.  Checks run in declaration order and
/// the first failing one is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Sent before the process started (history replay on reconnect).
    BeforeStart,
    /// Arrived during the post-startup quiet period.
    CoolingDown,
    /// Status/broadcast pseudo-conversation.
    Broadcast,
    /// Not a plain text message.
    NotText,
    /// Text body is empty or whitespace.
    EmptyBody,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeStart => "before_start",
            Self::CoolingDown => "cooling_down",
            Self::Broadcast => "broadcast",
            Self::NotText => "not_text",
            Self::EmptyBody => "empty_body",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Accept,
    Reject(RejectReason),
}

impl GateDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

#[derive(Debug, Clone)]
pub struct MessageGate {
    broadcast_sender: String,
}

impl MessageGate {
    pub fn new(cfg: &GateConfig) -> Self {
        Self {
            broadcast_sender: cfg.broadcast_sender.clone(),
        }
    }

    pub fn evaluate(
        &self,
        msg: &InboundMessage,
        ctx: &CooldownContext,
        now: DateTime<Utc>,
    ) -> GateDecision {
        if msg.timestamp.saturating_mul(1000) < ctx.started_at.timestamp_millis() {
            return GateDecision::Reject(RejectReason::BeforeStart);
        }
        if !ctx.cooled_down(now) {
            return GateDecision::Reject(RejectReason::CoolingDown);
        }
        if msg.sender == self.broadcast_sender {
            return GateDecision::Reject(RejectReason::Broadcast);
        }
        if msg.kind != MessageKind::Text {
            return GateDecision::Reject(RejectReason::NotText);
        }
        if msg.body.trim().is_empty() {
            return GateDecision::Reject(RejectReason::EmptyBody);
        }
        GateDecision::Accept
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const START_SECS: i64 = 1_700_000_000;

    fn ctx() -> CooldownContext {
        CooldownContext::new(
            Utc.timestamp_opt(START_SECS, 0).unwrap(),
            Duration::from_secs(120),
        )
    }

    fn at(secs_after_start: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(START_SECS + secs_after_start, 0).unwrap()
    }

    fn gate() -> MessageGate {
        MessageGate::new(&GateConfig::default())
    }

    #[test]
    fn accepts_well_formed_text_after_cooldown() {
        let msg = InboundMessage::text("123@c.us", "hello", START_SECS + 130);
        assert_eq!(gate().evaluate(&msg, &ctx(), at(130)), GateDecision::Accept);
    }

    #[test]
    fn message_stamped_exactly_at_start_is_not_old() {
        let msg = InboundMessage::text("123@c.us", "hello", START_SECS);
        assert!(gate().evaluate(&msg, &ctx(), at(120)).is_accept());
    }

    #[test]
    fn rejects_messages_from_before_start() {
        for body in ["hello", "", "   "] {
            for sender in ["123@c.us", "status@broadcast"] {
                let msg = InboundMessage::text(sender, body, START_SECS - 1);
                assert_eq!(
                    gate().evaluate(&msg, &ctx(), at(600)),
                    GateDecision::Reject(RejectReason::BeforeStart)
                );
            }
        }
    }

    #[test]
    fn rejects_everything_during_cooldown() {
        let msg = InboundMessage::text("123@c.us", "hello", START_SECS + 10);
        assert_eq!(
            gate().evaluate(&msg, &ctx(), at(119)),
            GateDecision::Reject(RejectReason::CoolingDown)
        );
        assert!(gate().evaluate(&msg, &ctx(), at(120)).is_accept());
    }

    #[test]
    fn rejects_broadcast_sender() {
        let msg = InboundMessage::text("status@broadcast", "hello", START_SECS + 200);
        assert_eq!(
            gate().evaluate(&msg, &ctx(), at(300)),
            GateDecision::Reject(RejectReason::Broadcast)
        );
    }

    #[test]
    fn rejects_blank_bodies() {
        for body in ["", " ", "\n\t "] {
            let msg = InboundMessage::text("123@c.us", body, START_SECS + 200);
            assert_eq!(
                gate().evaluate(&msg, &ctx(), at(300)),
                GateDecision::Reject(RejectReason::EmptyBody)
            );
        }
    }

    #[test]
    fn rejects_non_text_kinds() {
        let mut msg = InboundMessage::text("123@c.us", "caption", START_SECS + 200);
        msg.kind = MessageKind::Other("image".into());
        assert_eq!(
            gate().evaluate(&msg, &ctx(), at(300)),
            GateDecision::Reject(RejectReason::NotText)
        );
    }

    #[test]
    fn broadcast_sender_is_configurable() {
        let gate = MessageGate::new(&GateConfig {
            broadcast_sender: "news@broadcast".into(),
            ..GateConfig::default()
        });
        let msg = InboundMessage::text("status@broadcast", "hi", START_SECS + 200);
        assert!(gate.evaluate(&msg, &ctx(), at(300)).is_accept());
    }

    #[test]
    fn huge_timestamps_do_not_overflow() {
        let msg = InboundMessage::text("123@c.us", "hi", i64::MAX);
        assert!(gate().evaluate(&msg, &ctx(), at(300)).is_accept());
    }
}
