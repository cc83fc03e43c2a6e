//! Pull-based recording: a device configures the logger through its first
//! request, then periodically drains batches of (value, timestamp) samples.

use synfire_event::{
    EntityId, EntityRegistry, Event, EventKind, EventTag, LoggingRequest, ProtocolError, Time,
};
use synfire_neuron::{HtNeuron, NeuronConfig, NeuronParams};

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

fn request(device: EntityId, neuron: EntityId, stamp: Time, payload: LoggingRequest) -> Event {
    Event::logging_request(payload)
        .with_sender(device)
        .with_receiver(neuron)
        .with_stamp(stamp)
        .with_delay(1)
}

#[test]
fn recording_round_trip() {
    let device = EntityId::new(100);
    let mut registry = EntityRegistry::new();
    let neuron =
        HtNeuron::new(EntityId::new(1), passive_params(), NeuronConfig::default()).unwrap();
    let id = registry.register(neuron).unwrap();

    registry.connect(id, EventTag::LoggingRequest, 0).unwrap();

    // first request carries interval and quantity list; the immediate reply
    // is an empty batch
    let configure = request(
        device,
        id,
        Time::ZERO,
        LoggingRequest::new(5, vec!["V_m".to_string(), "g_AMPA".to_string()]),
    );
    let reply = registry.dispatch(configure).unwrap().expect("reply event");
    assert_eq!(reply.sender(), id);
    assert_eq!(reply.receiver(), device);
    match reply.kind() {
        EventKind::LoggingReply(batch) => assert!(batch.items().is_empty()),
        other => panic!("expected logging reply, got {:?}", other),
    }

    // twenty ticks at interval 5: samples stamped 5, 10, 15, 20
    for _ in 0..20 {
        registry.get_mut(id).unwrap().update().unwrap();
    }

    // periodic requests are empty probes; the reply moves the batch out
    let probe = request(device, id, Time::from_steps(20), LoggingRequest::probe());
    let reply = registry.dispatch(probe).unwrap().expect("reply event");

    // the reply is deliberately non-cloneable
    assert!(matches!(
        reply.try_clone(),
        Err(ProtocolError::NotCloneable { .. })
    ));

    match reply.into_kind() {
        EventKind::LoggingReply(batch) => {
            let items = batch.into_items();
            assert_eq!(items.len(), 4);
            for (index, item) in items.iter().enumerate() {
                assert_eq!(item.timestamp, Time::from_steps(5 * (index as i64 + 1)));
                assert_eq!(item.data.len(), 2);
                // quiescent passive neuron: V at rest, no conductance
                assert!((item.data[0] - (-90.0)).abs() < 1e-9);
                assert_eq!(item.data[1], 0.0);
            }
        }
        other => panic!("expected logging reply, got {:?}", other),
    }

    // a drained batch is gone: the next probe returns an empty reply
    let probe = request(device, id, Time::from_steps(20), LoggingRequest::probe());
    let reply = registry.dispatch(probe).unwrap().expect("reply event");
    match reply.into_kind() {
        EventKind::LoggingReply(batch) => assert!(batch.items().is_empty()),
        other => panic!("expected logging reply, got {:?}", other),
    }
}

#[test]
fn unknown_quantity_rejects_the_request() {
    let device = EntityId::new(100);
    let mut registry = EntityRegistry::new();
    let neuron =
        HtNeuron::new(EntityId::new(1), passive_params(), NeuronConfig::default()).unwrap();
    let id = registry.register(neuron).unwrap();

    let configure = request(
        device,
        id,
        Time::ZERO,
        LoggingRequest::new(5, vec!["V_bogus".to_string()]),
    );
    let result = registry.dispatch(configure);
    assert!(matches!(result, Err(ProtocolError::UnknownQuantity { .. })));
}
