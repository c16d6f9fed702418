mod common;

use std::sync::Arc;

use common::{assert_quiet, loopback, next, until_marker, Record, RecordingSink};
use crossbeam_channel::Receiver;
use mpvbridge_core::engine::code;
use mpvbridge_core::loopback::LoopbackEngine;
use mpvbridge_core::{BridgeError, EngineEvent, EventId, Format, Instance, LifecycleState, PropertyValue};

type Running = (Arc<LoopbackEngine>, Instance, Receiver<Record>);

fn running() -> Running {
    let (engine, factory) = loopback();
    let (sink, rx) = RecordingSink::new();
    let instance = Instance::create(factory, sink).unwrap();
    instance.initialize().unwrap();
    (engine, instance, rx)
}

#[test]
fn scalar_round_trips() {
    let (_engine, instance, _rx) = running();

    instance.set_int("volume", 42).unwrap();
    assert_eq!(instance.get_int("volume").unwrap(), 42);

    instance.set_double("speed", 1.25).unwrap();
    assert_eq!(instance.get_double("speed").unwrap(), 1.25);

    instance.set_bool("pause", true).unwrap();
    assert!(instance.get_bool("pause").unwrap());
    instance.set_bool("pause", false).unwrap();
    assert!(!instance.get_bool("pause").unwrap());
}

#[test]
fn string_round_trip_frees_engine_buffers() {
    let (engine, instance, _rx) = running();

    instance.set_string("title", "Big Buck Bunny").unwrap();
    assert_eq!(instance.get_string("title").unwrap(), "Big Buck Bunny");

    instance.set_string("empty", "").unwrap();
    assert_eq!(instance.get_string("empty").unwrap(), "");

    assert_eq!(engine.live_strings(), 0);
}

#[test]
fn numeric_properties_read_as_text() {
    let (_engine, instance, _rx) = running();
    instance.set_int("volume", 7).unwrap();
    assert_eq!(instance.get_string("volume").unwrap(), "7");
}

#[test]
fn missing_property_reports_engine_code() {
    let (_engine, instance, _rx) = running();
    match instance.get_int("no-such-property") {
        Err(BridgeError::PropertyRead { name, code }) => {
            assert_eq!(name, "no-such-property");
            assert_eq!(code, code::PROPERTY_NOT_FOUND);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn incompatible_format_reports_read_failure() {
    let (_engine, instance, _rx) = running();
    instance.set_double("speed", 1.5).unwrap();
    assert!(matches!(
        instance.get_int("speed"),
        Err(BridgeError::PropertyRead { code: code::PROPERTY_FORMAT, .. })
    ));
}

#[test]
fn interior_nul_is_rejected_before_the_engine() {
    let (engine, instance, _rx) = running();
    assert!(matches!(instance.set_string("title", "a\0b"), Err(BridgeError::InvalidArgument(_))));
    assert!(matches!(instance.get_int("vol\0ume"), Err(BridgeError::InvalidArgument(_))));
    assert_eq!(engine.property("title"), None);
}

#[test]
fn properties_require_running_instance() {
    let (_engine, factory) = loopback();
    let (sink, _rx) = RecordingSink::new();
    let instance = Instance::create(factory, sink).unwrap();
    assert!(matches!(instance.get_int("volume"), Err(BridgeError::InvalidState(LifecycleState::Created))));
}

#[test]
fn observed_flag_change_is_delivered_once() {
    let (engine, instance, rx) = running();

    instance.observe("pause", Format::Flag).unwrap();
    instance.set_bool("pause", true).unwrap();
    engine.emit(EngineEvent::Other(EventId::SEEK));

    let records = until_marker(&rx, EventId::SEEK);
    assert_eq!(records, vec![Record::Property("pause".into(), PropertyValue::Flag(true))]);
    assert_quiet(&rx);
}

#[test]
fn observed_properties_convert_to_requested_format() {
    let (_engine, instance, rx) = running();

    instance.observe("time-pos", Format::Double).unwrap();
    instance.set_int("time-pos", 3).unwrap();
    assert_eq!(next(&rx), Record::Property("time-pos".into(), PropertyValue::Double(3.0)));

    instance.observe("volume", Format::String).unwrap();
    instance.set_int("volume", 80).unwrap();
    assert_eq!(next(&rx), Record::Property("volume".into(), PropertyValue::String("80".into())));
}

#[test]
fn unsupported_observe_format_is_dropped() {
    let (engine, instance, rx) = running();

    instance.observe("metadata", Format::NodeMap).unwrap();
    instance.set_string("metadata", "ignored").unwrap();
    engine.emit(EngineEvent::Other(EventId::SEEK));

    assert!(until_marker(&rx, EventId::SEEK).is_empty());
}
