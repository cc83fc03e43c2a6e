//! The neuron entity: tick-atomic integration and the event surface
//!
//! Externally the neuron advances in lock-step, one tick per [`HtNeuron::update`]
//! call; internally each tick is integrated with as many adaptive sub-steps
//! as the solver needs. The per-tick order is fixed: drain the input
//! accumulators, integrate, apply the spike/refractory rule, record, rotate.
//! Event delivery for a tick must happen only after every entity has
//! finished producing that tick's output events; the system-wide minimum
//! delay guarantees no event is ever consumed in the tick it was produced.

use synfire_event::{
    EntityId, Event, EventHandler, EventHead, EventTag, LoggingReply, LoggingRequest,
    ProtocolError, RPort, Result as ProtocolResult, RingBuffer, Time, MIN_DELAY,
};
use synfire_solver::{Rkf45, StepControl};

use crate::error::{ModelError, Result};
use crate::intrinsic;
use crate::logger::DataLogger;
use crate::params::NeuronParams;
use crate::receptor::Receptor;
use crate::state::{dg_index, g_index, NeuronState, D_IKNA, H_IT, M_IH, M_IT, STATE_DIM, THETA, V_M};

/// Voltages below this are treated as numerical runaway
const V_MIN_PLAUSIBLE: f64 = -1e3;

/// Host-level timing configuration of one entity
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NeuronConfig {
    /// Tick duration in ms
    pub tick_ms: f64,
    /// Minimum transmission delay in ticks; outgoing spikes carry it
    pub min_delay: u32,
    /// Capacity of the input accumulators, bounding the longest incoming
    /// delay in ticks
    pub delay_horizon: usize,
}

impl Default for NeuronConfig {
    fn default() -> Self {
        Self {
            tick_ms: 0.1,
            min_delay: MIN_DELAY,
            delay_horizon: 64,
        }
    }
}

impl NeuronConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.tick_ms > 0.0 && self.tick_ms.is_finite()) {
            return Err(ModelError::bad_parameter(
                "tick_ms",
                self.tick_ms.to_string(),
                "> 0.0",
            ));
        }
        if self.min_delay < MIN_DELAY {
            return Err(ModelError::bad_parameter(
                "min_delay",
                self.min_delay.to_string(),
                ">= 1",
            ));
        }
        if self.delay_horizon < self.min_delay as usize {
            return Err(ModelError::bad_parameter(
                "delay_horizon",
                self.delay_horizon.to_string(),
                ">= min_delay",
            ));
        }
        Ok(())
    }
}

/// Derived constants, recomputed whenever parameters or tick duration change
#[derive(Debug, Clone)]
struct Calibration {
    /// Conductance step per unit impulse weight, one per receptor channel
    cond_steps: [f64; Receptor::COUNT],
    /// Duration of the repolarizing K current in whole ticks
    refractory_ticks: u32,
}

impl Calibration {
    fn compute(params: &NeuronParams, config: &NeuronConfig) -> Result<Self> {
        let mut cond_steps = [0.0; Receptor::COUNT];
        for receptor in Receptor::ALL {
            cond_steps[receptor.index()] = params.synapse(receptor).cond_step();
        }
        let ticks = (params.t_spike / config.tick_ms).round();
        if !(ticks >= 1.0) {
            return Err(ModelError::bad_parameter(
                "t_spike",
                params.t_spike.to_string(),
                "at least one tick",
            ));
        }
        Ok(Self {
            cond_steps,
            refractory_ticks: ticks as u32,
        })
    }
}

/// Input accumulators, written by incoming events and drained once per tick
#[derive(Debug, Clone)]
struct Buffers {
    spike_inputs: [RingBuffer; Receptor::COUNT],
    currents: RingBuffer,
    /// External current held for the duration of the tick
    i_stim: f64,
}

impl Buffers {
    fn new(horizon: usize) -> Self {
        Self {
            spike_inputs: core::array::from_fn(|_| RingBuffer::new(horizon)),
            currents: RingBuffer::new(horizon),
            i_stim: 0.0,
        }
    }

    fn clear(&mut self) {
        for buffer in &mut self.spike_inputs {
            buffer.clear();
        }
        self.currents.clear();
        self.i_stim = 0.0;
    }
}

/// Read-only per-tick inputs to the derivative function
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicsContext {
    /// External current held for the tick
    pub i_stim: f64,
    /// Whether the repolarizing K current governs the voltage this tick
    pub spike_current_active: bool,
}

/// Right-hand side of the membrane ODE system.
///
/// A pure function of its arguments: the solver evaluates it at
/// intermediate, possibly rejected trial points, so nothing may be cached
/// here. The NMDA gate is a sigmoid of the instantaneous voltage and must be
/// evaluated inside this function, since V is itself under integration.
pub fn membrane_dynamics(
    y: &[f64],
    dydt: &mut [f64],
    params: &NeuronParams,
    ctx: &DynamicsContext,
) {
    let v = y[V_M];
    let theta = y[THETA];

    // synaptic currents, I = -g (V - E)
    let mut i_syn = 0.0;
    i_syn += -y[g_index(Receptor::Ampa)] * (v - params.ampa.e_rev);
    let m_nmda = 1.0 / (1.0 + ((params.nmda_v_act - v) / params.nmda_s_act).exp());
    i_syn += -y[g_index(Receptor::Nmda)] * m_nmda * (v - params.nmda.e_rev);
    i_syn += -y[g_index(Receptor::GabaA)] * (v - params.gaba_a.e_rev);
    i_syn += -y[g_index(Receptor::GabaB)] * (v - params.gaba_b.e_rev);

    let i_na_leak = -params.g_na_leak * (v - params.e_na);
    let i_k_leak = -params.g_k_leak * (v - params.e_k);

    let i_nap = intrinsic::i_nap(v, params.nap_g_peak, params.nap_e_rev);
    let i_kna = intrinsic::i_kna(v, y[D_IKNA], params.kna_g_peak, params.kna_e_rev);
    let i_t = intrinsic::i_t(v, y[M_IT], y[H_IT], params.t_g_peak, params.t_e_rev);
    let i_h = intrinsic::i_h(v, y[M_IH], params.h_g_peak, params.h_e_rev);

    // during the spike window the repolarizing K current alone governs V;
    // the threshold keeps relaxing toward its equilibrium throughout
    dydt[V_M] = if ctx.spike_current_active {
        -(v - params.e_k) / params.tau_spike
    } else {
        (i_na_leak + i_k_leak + i_syn + i_nap + i_kna + i_t + i_h + ctx.i_stim) / params.tau_m
    };

    dydt[THETA] = -(theta - params.theta_eq) / params.tau_theta;

    for receptor in Receptor::ALL {
        let synapse = params.synapse(receptor);
        let dg = dg_index(receptor);
        let g = g_index(receptor);
        dydt[dg] = -y[dg] / synapse.tau_rise;
        dydt[g] = y[dg] - y[g] / synapse.tau_decay;
    }

    dydt[D_IKNA] = intrinsic::kna_d_dot(v, y[D_IKNA]);
    dydt[M_IT] = (intrinsic::t_m_inf(v) - y[M_IT]) / intrinsic::t_tau_m(v);
    dydt[H_IT] = (intrinsic::t_h_inf(v) - y[H_IT]) / intrinsic::t_tau_h(v);
    dydt[M_IH] = (intrinsic::h_m_inf(v) - y[M_IH]) / intrinsic::h_tau_m(v);
}

/// Conductance-based neuron after Hill & Tononi (2005): integrate-and-fire
/// with an adaptive threshold, no hard reset, a repolarizing K current in
/// place of a refractory clamp, four beta-kinetics synaptic channels and
/// four intrinsic currents.
#[derive(Debug)]
pub struct HtNeuron {
    id: EntityId,
    params: NeuronParams,
    state: NeuronState,
    config: NeuronConfig,
    cal: Calibration,
    buffers: Buffers,
    solver: Rkf45,
    /// Last accepted solver step, seeding the next tick's integration
    step_hint: f64,
    /// Start of the tick the next update call will integrate
    now: Time,
    logger: DataLogger,
}

impl HtNeuron {
    /// Create a neuron with the given identity, parameters and timing
    pub fn new(id: EntityId, params: NeuronParams, config: NeuronConfig) -> Result<Self> {
        params.validate()?;
        config.validate()?;
        let cal = Calibration::compute(&params, &config)?;
        let state = NeuronState::new(&params);
        let solver = Rkf45::new(STATE_DIM, StepControl::new(params.error_tol, params.error_tol)?)?;
        let step_hint = config.tick_ms.min(0.01);
        let buffers = Buffers::new(config.delay_horizon);
        Ok(Self {
            id,
            params,
            state,
            config,
            cal,
            buffers,
            solver,
            step_hint,
            now: Time::ZERO,
            logger: DataLogger::new(),
        })
    }

    /// Create a neuron with default parameters and timing
    pub fn with_defaults(id: EntityId) -> Result<Self> {
        Self::new(id, NeuronParams::default(), NeuronConfig::default())
    }

    /// Entity identity
    pub fn entity_id(&self) -> EntityId {
        self.id
    }

    /// Current parameters
    pub fn params(&self) -> &NeuronParams {
        &self.params
    }

    /// Current integration state
    pub fn state(&self) -> &NeuronState {
        &self.state
    }

    /// Timing configuration
    pub fn config(&self) -> &NeuronConfig {
        &self.config
    }

    /// Start of the tick the next update will integrate
    pub fn now(&self) -> Time {
        self.now
    }

    /// Apply named parameter updates, all-or-nothing.
    ///
    /// Derived constants (conductance normalization, refractory tick count,
    /// solver tolerance) are recomputed together with the commit; a rejected
    /// batch leaves parameters and derived constants untouched.
    pub fn set_params<'a, I>(&mut self, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut staged = self.params.clone();
        staged.apply(updates)?;
        let cal = Calibration::compute(&staged, &self.config)?;
        let solver = Rkf45::new(STATE_DIM, StepControl::new(staged.error_tol, staged.error_tol)?)?;
        self.params = staged;
        self.cal = cal;
        self.solver = solver;
        Ok(())
    }

    /// Apply named state updates, all-or-nothing
    pub fn set_state<'a, I>(&mut self, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        self.state.apply(updates)?;
        self.state.refresh_currents(&self.params);
        Ok(())
    }

    /// Reset state, buffers and clock to their initial values; parameters,
    /// timing and logger configuration survive
    pub fn reset(&mut self) {
        self.state = NeuronState::new(&self.params);
        self.buffers.clear();
        self.step_hint = self.config.tick_ms.min(0.01);
        self.now = Time::ZERO;
        self.logger.reset();
    }

    /// Advance the neuron by one tick.
    ///
    /// Returns the spike event to dispatch if the membrane potential crossed
    /// the adaptive threshold this tick. The event carries the end-of-tick
    /// stamp and the configured minimum delay; the host resolves receiver
    /// and r-port per connection (cloning the event per target) and must
    /// deliver only after all entities have finished this tick.
    ///
    /// A solver failure or an implausible voltage is fatal for this entity:
    /// the error propagates and the neuron must not be advanced further.
    pub fn update(&mut self) -> Result<Option<Event>> {
        // 1. fold accumulated inputs into the kinetic rise variables
        for receptor in Receptor::ALL {
            let weight = self.buffers.spike_inputs[receptor.index()].take();
            if weight != 0.0 {
                self.state.y[dg_index(receptor)] +=
                    self.cal.cond_steps[receptor.index()] * weight;
            }
        }
        self.buffers.i_stim = self.buffers.currents.take();

        // 2. integrate across the tick with adaptive sub-steps
        let ctx = DynamicsContext {
            i_stim: self.buffers.i_stim,
            spike_current_active: self.state.spike_current_active,
        };
        let params = &self.params;
        self.step_hint = self.solver.advance(
            &mut self.state.y,
            0.0,
            self.config.tick_ms,
            self.step_hint,
            |_, y, dydt| membrane_dynamics(y, dydt, params, &ctx),
        )?;

        let v = self.state.y[V_M];
        if !v.is_finite() || v < V_MIN_PLAUSIBLE {
            return Err(ModelError::instability(v));
        }

        // 3. threshold crossing: no hard reset, V and Theta jump to E_Na and
        // the repolarizing K current takes over for the refractory window
        let mut spike = None;
        if !self.state.spike_current_active && self.state.y[V_M] >= self.state.y[THETA] {
            self.state.y[V_M] = self.params.e_na;
            self.state.y[THETA] = self.params.e_na;
            self.state.spike_current_active = true;
            // +1 compensates the end-of-tick decrement below
            self.state.refractory_ticks_left = self.cal.refractory_ticks + 1;

            log::debug!("entity {} spiked at end of tick {}", self.id, self.now);
            spike = Some(
                Event::spike(1)
                    .with_sender(self.id)
                    .with_stamp(self.now + 1)
                    .with_delay(self.config.min_delay),
            );
        }

        // 4. refractory countdown
        if self.state.spike_current_active {
            self.state.refractory_ticks_left -= 1;
            self.state.spike_current_active = self.state.refractory_ticks_left > 0;
        }

        // 5. refresh recorded currents, sample, rotate, advance the clock
        self.state.refresh_currents(&self.params);
        self.logger.record(self.now, &self.state);
        for buffer in &mut self.buffers.spike_inputs {
            buffer.advance();
        }
        self.buffers.currents.advance();
        self.now += 1;

        Ok(spike)
    }

    /// Names of the quantities a recording device may request
    pub fn recordables(&self) -> Vec<&'static str> {
        crate::logger::recordable_names()
    }

    fn rel_delivery_steps(&self, head: &EventHead) -> ProtocolResult<usize> {
        let rel = head.rel_delivery_steps(self.now);
        if rel < 0 {
            return Err(ProtocolError::causality(rel));
        }
        Ok(rel as usize)
    }
}

impl EventHandler for HtNeuron {
    fn id(&self) -> EntityId {
        self.id
    }

    fn accepts(&mut self, kind: EventTag, rport: RPort) -> ProtocolResult<RPort> {
        match kind {
            EventTag::Spike => Receptor::from_rport(rport)
                .map(Receptor::rport)
                .ok_or_else(|| ProtocolError::unknown_receptor(rport, kind, self.id)),
            EventTag::Current | EventTag::LoggingRequest => {
                if rport == 0 {
                    Ok(0)
                } else {
                    Err(ProtocolError::unknown_receptor(rport, kind, self.id))
                }
            }
            other => Err(ProtocolError::unsupported(other, self.id)),
        }
    }

    fn handle_spike(&mut self, head: &EventHead, multiplicity: u32) -> ProtocolResult<()> {
        let receptor = Receptor::from_rport(head.rport).ok_or_else(|| {
            ProtocolError::unknown_receptor(head.rport, EventTag::Spike, self.id)
        })?;
        let rel = self.rel_delivery_steps(head)?;
        self.buffers.spike_inputs[receptor.index()]
            .add(rel, head.weight * f64::from(multiplicity))
    }

    fn handle_current(&mut self, head: &EventHead, amplitude: f64) -> ProtocolResult<()> {
        let rel = self.rel_delivery_steps(head)?;
        self.buffers.currents.add(rel, head.weight * amplitude)
    }

    fn handle_logging_request(
        &mut self,
        head: &EventHead,
        request: &LoggingRequest,
    ) -> ProtocolResult<Event> {
        if !request.is_probe() {
            self.logger.configure(
                self.id,
                request.recording_interval(),
                request.record_from(),
            )?;
        }
        let reply = LoggingReply::new(self.logger.drain());
        Ok(Event::logging_reply(reply)
            .with_sender(self.id)
            .with_receiver(head.sender)
            .with_stamp(self.now)
            .with_delay(self.config.min_delay))
    }
}
