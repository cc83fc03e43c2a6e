//! Interval-based sample recording
//!
//! Recording is pull-based: a recording device configures the logger through
//! its first (payload-carrying) logging request, the logger samples the
//! requested quantities every interval ticks, and each subsequent periodic
//! request drains the batch into a reply. The reply event is not cloneable,
//! so a batch can never be duplicated or rerouted.

use synfire_event::{
    EntityId, LoggingItem, ProtocolError, Result as ProtocolResult, SampleRow, Time,
};

use crate::state::NeuronState;

/// Reads one recordable quantity off the state snapshot
type Accessor = fn(&NeuronState) -> f64;

/// Table of recordable quantities
const RECORDABLES: &[(&str, Accessor)] = &[
    ("V_m", |s| s.voltage()),
    ("Theta", |s| s.threshold()),
    ("g_AMPA", |s| s.conductance(crate::receptor::Receptor::Ampa)),
    ("g_NMDA", |s| s.conductance(crate::receptor::Receptor::Nmda)),
    ("g_GABA_A", |s| s.conductance(crate::receptor::Receptor::GabaA)),
    ("g_GABA_B", |s| s.conductance(crate::receptor::Receptor::GabaB)),
    ("I_NaP", |s| s.i_nap()),
    ("I_KNa", |s| s.i_kna()),
    ("I_T", |s| s.i_t()),
    ("I_h", |s| s.i_h()),
];

/// Names of all recordable quantities, in table order
pub fn recordable_names() -> Vec<&'static str> {
    RECORDABLES.iter().map(|&(name, _)| name).collect()
}

/// Per-neuron sample collector feeding the recording collaborator
#[derive(Debug, Clone, Default)]
pub struct DataLogger {
    interval: u32,
    quantities: Vec<(&'static str, Accessor)>,
    items: Vec<LoggingItem>,
}

impl DataLogger {
    /// Create an unconfigured logger; records nothing until configured
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a recording device has configured this logger
    pub fn is_configured(&self) -> bool {
        self.interval > 0
    }

    /// Configure interval and quantity list from a payload-carrying request.
    ///
    /// Unknown quantity names reject the request; the previous configuration
    /// stays in effect.
    pub fn configure(
        &mut self,
        entity: EntityId,
        interval: u32,
        names: &[String],
    ) -> ProtocolResult<()> {
        if interval == 0 {
            return Err(ProtocolError::invalid_event(
                "recording interval must be at least one tick",
            ));
        }
        let mut quantities = Vec::with_capacity(names.len());
        for name in names {
            let entry = RECORDABLES
                .iter()
                .find(|&&(known, _)| known == name.as_str())
                .ok_or_else(|| ProtocolError::unknown_quantity(name.clone(), entity))?;
            quantities.push(*entry);
        }
        self.interval = interval;
        self.quantities = quantities;
        self.items.clear();
        Ok(())
    }

    /// Sample the requested quantities if a recording point falls at the end
    /// of the tick that just completed; `now` is the 0-based index of that
    /// tick, so samples carry timestamps `interval`, `2*interval`, ...
    pub fn record(&mut self, now: Time, state: &NeuronState) {
        if !self.is_configured() {
            return;
        }
        let end_of_tick = now + 1;
        if end_of_tick.steps() % i64::from(self.interval) != 0 {
            return;
        }
        let data: SampleRow = self
            .quantities
            .iter()
            .map(|&(_, accessor)| accessor(state))
            .collect();
        self.items.push(LoggingItem {
            timestamp: end_of_tick,
            data,
        });
    }

    /// Hand over the batch collected since the previous drain
    pub fn drain(&mut self) -> Vec<LoggingItem> {
        std::mem::take(&mut self.items)
    }

    /// Drop buffered samples, keeping the configuration
    pub fn reset(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::NeuronParams;

    #[test]
    fn test_unconfigured_logger_is_inert() {
        let params = NeuronParams::default();
        let state = NeuronState::new(&params);
        let mut logger = DataLogger::new();
        logger.record(Time::ZERO, &state);
        assert!(logger.drain().is_empty());
    }

    #[test]
    fn test_configure_rejects_unknown_quantity() {
        let mut logger = DataLogger::new();
        let result = logger.configure(
            EntityId::new(1),
            5,
            &["V_m".to_string(), "I_bogus".to_string()],
        );
        assert!(matches!(result, Err(ProtocolError::UnknownQuantity { .. })));
        assert!(!logger.is_configured());
    }

    #[test]
    fn test_samples_on_interval() {
        let params = NeuronParams::default();
        let state = NeuronState::new(&params);
        let mut logger = DataLogger::new();
        logger
            .configure(EntityId::new(1), 3, &["V_m".to_string(), "Theta".to_string()])
            .unwrap();

        for tick in 0..9 {
            logger.record(Time::from_steps(tick), &state);
        }
        let items = logger.drain();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].timestamp, Time::from_steps(3));
        assert_eq!(items[2].timestamp, Time::from_steps(9));
        assert_eq!(items[0].data.len(), 2);
        assert_eq!(items[0].data[0], state.voltage());

        // batch moves out exactly once
        assert!(logger.drain().is_empty());
    }

    #[test]
    fn test_recordable_names_contains_core_quantities() {
        let names = recordable_names();
        for name in ["V_m", "Theta", "g_AMPA", "I_h"] {
            assert!(names.contains(&name));
        }
    }
}
