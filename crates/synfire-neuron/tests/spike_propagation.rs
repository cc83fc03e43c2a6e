//! Cross-entity delivery: a spiking neuron's output event reaches its target
//! one tick later, never earlier.

use synfire_event::{EntityId, EntityRegistry, Event, EventTag, Time};
use synfire_neuron::{HtNeuron, NeuronConfig, NeuronParams, Receptor};

fn passive_params() -> NeuronParams {
    let mut params = NeuronParams::default();
    params
        .apply([
            ("g_NaL", 0.0),
            ("NaP_g_peak", 0.0),
            ("KNa_g_peak", 0.0),
            ("T_g_peak", 0.0),
            ("h_g_peak", 0.0),
        ])
        .unwrap();
    params
}

fn make_neuron(id: u64) -> HtNeuron {
    HtNeuron::new(EntityId::new(id), passive_params(), NeuronConfig::default()).unwrap()
}

#[test]
fn emitted_spike_reaches_target_next_tick() {
    let mut registry = EntityRegistry::new();
    let sender = registry.register(make_neuron(1)).unwrap();
    let receiver = registry.register(make_neuron(2)).unwrap();

    let rport = registry
        .connect(receiver, EventTag::Spike, Receptor::Ampa.rport())
        .unwrap();

    // push the sender over threshold so tick 0 produces a spike
    registry
        .get_mut(sender)
        .unwrap()
        .set_state([("V_m", -45.0)])
        .unwrap();

    // tick 0: advance every entity first, collect output events
    let mut outbox: Vec<Event> = Vec::new();
    for id in [sender, receiver] {
        if let Some(spike) = registry.get_mut(id).unwrap().update().unwrap() {
            outbox.push(
                spike
                    .with_receiver(receiver)
                    .with_rport(rport)
                    .with_weight(1.0),
            );
        }
    }
    assert_eq!(outbox.len(), 1);
    let spike = outbox.pop().unwrap();
    assert_eq!(spike.sender(), sender);
    assert_eq!(spike.stamp(), Time::from_steps(1));
    assert!(spike.delay() >= 1);
    // due exactly at the receiver's next tick
    assert_eq!(spike.rel_delivery_steps(Time::from_steps(1)), 0);

    // delivery happens only after all entities finished the tick
    registry.dispatch(spike).unwrap();

    // tick 1: the receiver folds the arrival into its AMPA channel
    let receiver_neuron = registry.get_mut(receiver).unwrap();
    assert_eq!(receiver_neuron.state().conductance(Receptor::Ampa), 0.0);
    receiver_neuron.update().unwrap();
    assert!(receiver_neuron.state().conductance(Receptor::Ampa) > 0.0);
    assert!(receiver_neuron.state().voltage() > -90.0);
}

#[test]
fn cloned_events_fan_out_independently() {
    let mut registry = EntityRegistry::new();
    let a = registry.register(make_neuron(1)).unwrap();
    let b = registry.register(make_neuron(2)).unwrap();

    for id in [a, b] {
        registry
            .connect(id, EventTag::Spike, Receptor::GabaA.rport())
            .unwrap();
    }

    // one logical spike dispatched to two receivers with per-receiver heads
    let template = Event::spike(1)
        .with_sender(EntityId::new(50))
        .with_stamp(Time::ZERO)
        .with_rport(Receptor::GabaA.rport())
        .with_weight(1.0)
        .with_delay(1);

    let to_a = template.try_clone().unwrap().with_receiver(a);
    let to_b = template
        .try_clone()
        .unwrap()
        .with_receiver(b)
        .with_delay(3)
        .with_weight(2.0);
    registry.dispatch(to_a).unwrap();
    registry.dispatch(to_b).unwrap();

    // a sees its input on tick 0, b only when the longer delay elapses
    registry.get_mut(a).unwrap().update().unwrap();
    registry.get_mut(b).unwrap().update().unwrap();
    assert!(registry.get(a).unwrap().state().conductance(Receptor::GabaA) > 0.0);
    assert_eq!(registry.get(b).unwrap().state().conductance(Receptor::GabaA), 0.0);

    for _ in 0..2 {
        registry.get_mut(b).unwrap().update().unwrap();
    }
    assert!(registry.get(b).unwrap().state().conductance(Receptor::GabaA) > 0.0);
}
