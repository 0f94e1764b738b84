//! Signal source abstraction
//!
//! The frame codec and signal database live outside this crate; fusion only
//! ever sees named, numerically decoded signal values. This module defines
//! the seam: [`SignalSource`] is implemented by the real codec adapter, and
//! [`TableSignalSource`] is an in-memory implementation used by the test
//! suite and for log replay.

use crate::types::{Bus, CarStateError, MessageSnapshot, Result};
use std::collections::HashMap;

/// Read access to the latest decoded signal values, per logical bus.
///
/// `get` fails if the message has never been observed since codec
/// construction — a failed cycle is propagated to the caller, never papered
/// over with stale data.
pub trait SignalSource {
    /// Latest decoded value of `signal` in `message`.
    fn get(&self, bus: Bus, message: &str, signal: &str) -> Result<f64>;

    /// Every value seen for `signal` since the previous cycle, oldest first.
    /// Needed for signals that can toggle faster than the control rate
    /// (buttons).
    fn get_all(&self, bus: Bus, message: &str, signal: &str) -> Result<Vec<f64>>;

    /// Presence-tolerant lookup for signals that only exist on some
    /// variants.
    fn get_opt(&self, bus: Bus, message: &str, signal: &str) -> Option<f64> {
        self.get(bus, message, signal).ok()
    }

    /// Copy of every signal in the message's most recent frame.
    fn snapshot(&self, bus: Bus, message: &str) -> Result<MessageSnapshot>;

    /// True if the message has been observed at least once.
    fn has_message(&self, bus: Bus, message: &str) -> bool;

    /// Value-table description for a raw signal value (e.g. gear "D"),
    /// as defined by the external signal database.
    fn value_label(&self, bus: Bus, message: &str, signal: &str, raw: i64) -> Option<String>;
}

/// In-memory [`SignalSource`] backed by plain tables.
///
/// Each signal keeps the full history pushed since the last
/// [`clear_history`](TableSignalSource::clear_history) call; `get` returns
/// the newest entry.
#[derive(Debug, Default, Clone)]
pub struct TableSignalSource {
    messages: HashMap<(Bus, String), HashMap<String, Vec<f64>>>,
    labels: HashMap<(Bus, String, String, i64), String>,
}

impl TableSignalSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a signal to a single value, discarding prior history.
    pub fn set(&mut self, bus: Bus, message: &str, signal: &str, value: f64) {
        let signals = self
            .messages
            .entry((bus, message.to_string()))
            .or_default();
        signals.insert(signal.to_string(), vec![value]);
    }

    /// Append a value to a signal's history (a new frame arrived).
    pub fn push(&mut self, bus: Bus, message: &str, signal: &str, value: f64) {
        let signals = self
            .messages
            .entry((bus, message.to_string()))
            .or_default();
        signals.entry(signal.to_string()).or_default().push(value);
    }

    /// Register a value-table entry for a signal.
    pub fn set_label(&mut self, bus: Bus, message: &str, signal: &str, raw: i64, label: &str) {
        self.labels.insert(
            (bus, message.to_string(), signal.to_string(), raw),
            label.to_string(),
        );
    }

    /// Truncate every signal's history to its latest value, as the codec
    /// does at each cycle boundary.
    pub fn clear_history(&mut self) {
        for signals in self.messages.values_mut() {
            for history in signals.values_mut() {
                if let Some(&last) = history.last() {
                    history.clear();
                    history.push(last);
                }
            }
        }
    }

    fn signals(&self, bus: Bus, message: &str) -> Result<&HashMap<String, Vec<f64>>> {
        self.messages
            .get(&(bus, message.to_string()))
            .ok_or_else(|| CarStateError::MissingMessage {
                bus,
                message: message.to_string(),
            })
    }
}

impl SignalSource for TableSignalSource {
    fn get(&self, bus: Bus, message: &str, signal: &str) -> Result<f64> {
        let history = self
            .signals(bus, message)?
            .get(signal)
            .ok_or_else(|| CarStateError::MissingSignal {
                message: message.to_string(),
                signal: signal.to_string(),
            })?;
        history
            .last()
            .copied()
            .ok_or_else(|| CarStateError::MissingSignal {
                message: message.to_string(),
                signal: signal.to_string(),
            })
    }

    fn get_all(&self, bus: Bus, message: &str, signal: &str) -> Result<Vec<f64>> {
        Ok(self
            .signals(bus, message)?
            .get(signal)
            .cloned()
            .unwrap_or_default())
    }

    fn snapshot(&self, bus: Bus, message: &str) -> Result<MessageSnapshot> {
        let signals = self.signals(bus, message)?;
        Ok(signals
            .iter()
            .filter_map(|(name, history)| history.last().map(|v| (name.clone(), *v)))
            .collect())
    }

    fn has_message(&self, bus: Bus, message: &str) -> bool {
        self.messages.contains_key(&(bus, message.to_string()))
    }

    fn value_label(&self, bus: Bus, message: &str, signal: &str, raw: i64) -> Option<String> {
        self.labels
            .get(&(bus, message.to_string(), signal.to_string(), raw))
            .cloned()
    }
}
