use biometrics::{Collector, Counter, Moments};

pub(crate) static GATEWAY_REQUESTS: Counter = Counter::new("chatgate.gateway.requests");
pub(crate) static GATEWAY_EMPTY_MESSAGES: Counter =
    Counter::new("chatgate.gateway.empty_messages");
pub(crate) static GATEWAY_UPSTREAM_CONNECT_ERRORS: Counter =
    Counter::new("chatgate.gateway.upstream_connect_errors");
pub(crate) static GATEWAY_UPSTREAM_INVALID_RESPONSES: Counter =
    Counter::new("chatgate.gateway.upstream_invalid_responses");
pub(crate) static GATEWAY_UPSTREAM_DURATION: Moments =
    Moments::new("chatgate.gateway.upstream_duration_seconds");

pub(crate) static CHAT_TURNS: Counter = Counter::new("chatgate.chat.turns");
pub(crate) static CHAT_TURN_ERRORS: Counter = Counter::new("chatgate.chat.turn_errors");
pub(crate) static CHAT_DROPPED_SUBMITS: Counter = Counter::new("chatgate.chat.dropped_submits");
pub(crate) static CHAT_TURN_DURATION: Moments =
    Moments::new("chatgate.chat.turn_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&GATEWAY_REQUESTS);
    collector.register_counter(&GATEWAY_EMPTY_MESSAGES);
    collector.register_counter(&GATEWAY_UPSTREAM_CONNECT_ERRORS);
    collector.register_counter(&GATEWAY_UPSTREAM_INVALID_RESPONSES);
    collector.register_moments(&GATEWAY_UPSTREAM_DURATION);

    collector.register_counter(&CHAT_TURNS);
    collector.register_counter(&CHAT_TURN_ERRORS);
    collector.register_counter(&CHAT_DROPPED_SUBMITS);
    collector.register_moments(&CHAT_TURN_DURATION);
}
