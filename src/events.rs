//! Structured event sink.
//!
//! The core never touches a global logger. Every diagnostic is emitted
//! through a caller-supplied `&dyn EventSink`, keeping `optimize`/`load_lots`
//! pure with respect to process-wide state.

/// Receives structured diagnostics emitted by the engine.
pub trait EventSink {
    fn info(&self, event: &str, fields: &[(&str, &str)]);
    fn warn(&self, event: &str, fields: &[(&str, &str)]);
    fn error(&self, event: &str, fields: &[(&str, &str)]);
}

fn render(event: &str, fields: &[(&str, &str)]) -> String {
    if fields.is_empty() {
        return event.to_string();
    }
    let pairs: Vec<String> = fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{event} {}", pairs.join(" "))
}

/// Default sink, backed by the `log` facade. Whatever logger the binary
/// installs (e.g. `env_logger`) receives these records.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn info(&self, event: &str, fields: &[(&str, &str)]) {
        log::info!("{}", render(event, fields));
    }

    fn warn(&self, event: &str, fields: &[(&str, &str)]) {
        log::warn!("{}", render(event, fields));
    }

    fn error(&self, event: &str, fields: &[(&str, &str)]) {
        log::error!("{}", render(event, fields));
    }
}

/// Discards everything. Used by tests that don't want log noise.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn info(&self, _event: &str, _fields: &[(&str, &str)]) {}
    fn warn(&self, _event: &str, _fields: &[(&str, &str)]) {}
    fn error(&self, _event: &str, _fields: &[(&str, &str)]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_without_fields_is_bare_event() {
        assert_eq!(render("dropped_row", &[]), "dropped_row");
    }

    #[test]
    fn render_with_fields_appends_pairs() {
        assert_eq!(
            render("dropped_row", &[("row", "3"), ("field", "dc")]),
            "dropped_row row=3 field=dc"
        );
    }
}
