/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */


use std::{sync::{Arc, atomic::{AtomicUsize, Ordering}}, time::Duration};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use odin_adsb::{AdsbMsg, Callsign, IcaoId, LatLon, sbs::parse_sbs};
use odin_msgbuffer::*;

const POSITION_1: &str = "MSG,3,1,1,A81BD0,1,2015/11/27,21:31:03.354,2015/11/27,21:31:03.316,,20125,,,36.69804,-121.86007,,,,,,0";
const POSITION_2: &str = "MSG,3,1,1,A81BD0,1,2015/11/27,21:31:03.704,2015/11/27,21:31:03.716,,20125,,,36.69830,-121.86017,,,,,,0";
const VELOCITY: &str = "MSG,4,1,1,A81BD0,1,2015/11/27,21:31:04.704,2015/11/27,21:31:04.689,,,0,328,,,-1856,,,,,0";
const CALLSIGN: &str = "MSG,1,1,1,A81BD0,1,2015/11/27,21:31:05.205,2015/11/27,21:31:05.153,VRD961  ,,,,,,,,,,,0";
const BLANK_CALLSIGN: &str = "MSG,1,1,1,A81BD0,1,2015/11/27,21:31:05.205,2015/11/27,21:31:05.153,        ,,,,,,,,,,,0";
const SQUAWK: &str = "MSG,6,1,1,A81BD0,1,2015/11/27,21:31:05.255,2015/11/27,21:31:05.253,,,,,,,,1200,-1,0,0,0";
const POSITION_3: &str = "MSG,3,1,1,A81BD0,1,2015/11/27,21:31:06.104,2015/11/27,21:31:06.116,,20100,,,36.69900,-121.86050,,,,,,0";

fn sbs (line: &str)->AdsbMsg {
    parse_sbs( line, Tz::UTC).unwrap()
}

fn t0 ()->DateTime<Utc> { Utc.with_ymd_and_hms( 2024, 3, 10, 17, 0, 0).unwrap() }

fn secs (s: f64)->TimeDelta { TimeDelta::milliseconds( (s * 1000.0).round() as i64) }

fn position_msg (id: &str, generated: DateTime<Utc>)->AdsbMsg {
    let mut msg = AdsbMsg::new( "MSG", 3, IcaoId::from(id), generated, generated);
    msg.position = Some( LatLon::new( 37.5, -122.0));
    msg
}

fn callsign_msg (id: &str, generated: DateTime<Utc>)->AdsbMsg {
    let mut msg = AdsbMsg::new( "MSG", 1, IcaoId::from(id), generated, generated);
    msg.callsign = Some( Callsign::Id("SWA1842".into()));
    msg
}

fn immediate_config ()->MsgBufferConfig {
    MsgBufferConfig { max_message_age: Duration::ZERO, min_publish_interval: Duration::ZERO, ..MsgBufferConfig::default() }
}

/// feed lines into buffer using the message generation time as clock
fn replay<P: FlushPolicy, C: BatchConsumer> (buf: &mut MsgBuffer<P,C>, lines: &[&str]) {
    for line in lines {
        let msg = sbs( line);
        buf.add_at( &msg, msg.generated);
    }
}

// run with "cargo test --test test_msgbuffer -- --nocapture"

#[test]
fn test_whitelist_admission () {
    let mut buf = MsgBuffer::flat( &MsgBufferConfig::default(), CollectingConsumer::new());
    let id = IcaoId::from("A81BD0");

    replay( &mut buf, &[VELOCITY, CALLSIGN]);
    assert_eq!( buf.n_senders(), 0, "non-position message admitted sender");
    assert_eq!( buf.pending(), 0);
    assert_eq!( buf.stats().n_dropped, 2);

    replay( &mut buf, &[POSITION_1]);
    assert!( buf.senders().contains( &id), "position message did not admit sender");
    assert_eq!( buf.pending(), 0, "admission message created a composite");

    // the admission message does not get cached
    let state = buf.senders().get( &id).unwrap();
    assert_eq!( state.ground_speed, None);
    assert_eq!( state.callsign, None);

    replay( &mut buf, &[POSITION_2]);
    assert_eq!( buf.pending(), 1);
    assert_eq!( buf.consumer().n_batches(), 0); // not old enough yet
    println!("{buf}");
}

#[test]
fn test_backfill () {
    let mut buf = MsgBuffer::flat( &immediate_config().with_receiver_name("test"), CollectingConsumer::new());
    replay( &mut buf, &[POSITION_1, VELOCITY, CALLSIGN, SQUAWK, POSITION_3]);

    let consumer = buf.consumer();
    assert_eq!( consumer.n_batches(), 1);

    let cm = &consumer.batches[0][0];
    println!("{cm}");
    assert_eq!( cm.icao24.as_str(), "A81BD0");
    assert_eq!( cm.position, LatLon::new( 36.699, -121.8605));
    assert_eq!( cm.altitude, Some(20100));
    assert_eq!( cm.callsign, Some( Callsign::Id("VRD961".into())));
    assert_eq!( cm.ground_speed, Some(0));
    assert_eq!( cm.track, Some(328));
    assert_eq!( cm.vertical_rate, Some(-1856));
    assert_eq!( cm.squawk.as_deref(), Some("1200"));
    assert_eq!( cm.receiver_name, "test");
    assert_eq!( cm.data_system(), "ADSB");
}

#[test]
fn test_blank_callsign () {
    let mut buf = MsgBuffer::flat( &immediate_config(), CollectingConsumer::new());
    let id = IcaoId::from("A81BD0");

    replay( &mut buf, &[POSITION_1, BLANK_CALLSIGN]);
    assert_eq!( buf.senders().get( &id).unwrap().callsign, Some( Callsign::Blank));

    replay( &mut buf, &[POSITION_3]);
    assert_eq!( buf.consumer().batches[0][0].callsign, Some( Callsign::Blank));

    replay( &mut buf, &[CALLSIGN, POSITION_3]);
    assert_eq!( buf.consumer().batches[1][0].callsign, Some( Callsign::Id("VRD961".into())));
}

#[test]
fn test_require_backfill_policy () {
    let config = MsgBufferConfig { emit_policy: EmitPolicy::RequireBackfill, ..immediate_config() };
    let mut buf = MsgBuffer::flat( &config, CollectingConsumer::new());

    replay( &mut buf, &[POSITION_1, VELOCITY, POSITION_2]);
    assert_eq!( buf.consumer().n_msgs(), 0, "incomplete composite emitted (ground speed is 0)");
}

#[test]
fn test_ageout () {
    let config = MsgBufferConfig { max_quiet_time: Duration::from_secs(10), ..MsgBufferConfig::default() };
    let mut buf = MsgBuffer::flat( &config, CollectingConsumer::new());
    let a = IcaoId::from("A1");

    buf.add_at( &position_msg( "A1", t0()), t0());
    assert_eq!( buf.n_senders(), 1);

    // just before max_quiet_time A1 survives the sweep triggered by another sender
    let t = t0() + secs(9.999);
    buf.add_at( &position_msg( "B2", t), t);
    assert_eq!( buf.n_senders(), 2);
    assert!( buf.senders().contains( &a), "aged out too soon");

    // A1 is past max_quiet_time but the last sweep was less than a second ago
    let t = t0() + secs(10.5);
    buf.add_at( &callsign_msg( "C3", t), t);
    assert!( buf.senders().contains( &a), "sweep not rate limited");

    let t = t0() + secs(11.0);
    buf.add_at( &callsign_msg( "C3", t), t);
    assert!( !buf.senders().contains( &a), "did not age out");
    assert_eq!( buf.n_senders(), 1);
    assert_eq!( buf.stats().n_aged_out, 1);

    // once removed, a sender has to re-qualify with a position report
    buf.add_at( &callsign_msg( "A1", t), t);
    assert!( !buf.senders().contains( &a));
    buf.add_at( &position_msg( "A1", t), t);
    assert!( buf.senders().contains( &a));
    assert_eq!( buf.pending(), 0);
}

#[test]
fn test_ageout_idempotence () {
    let config = MsgBufferConfig { max_quiet_time: Duration::from_secs(10), ..MsgBufferConfig::default() };
    let mut buf = MsgBuffer::flat( &config, CollectingConsumer::new());
    for (i,id) in ["A1", "A2", "A3"].iter().enumerate() {
        let t = t0() + secs( i as f64);
        buf.add_at( &position_msg( id, t), t);
    }

    let t = t0() + secs(11.5); // A3 has been quiet for 9.5s
    assert_eq!( buf.age_out_quiet_senders( t), 2);
    assert_eq!( buf.n_senders(), 1);
    assert_eq!( buf.age_out_quiet_senders( t), 0);
    assert_eq!( buf.age_out_quiet_senders( t + secs(0.9)), 0);
    assert_eq!( buf.n_senders(), 1);
}

#[test]
fn test_immediate_flush () {
    let mut buf = MsgBuffer::flat( &immediate_config(), CollectingConsumer::new());
    let mut t = t0();
    buf.add_at( &position_msg( "A1", t), t);

    for _ in 0..5 {
        t = t + secs(0.5);
        buf.add_at( &position_msg( "A1", t), t);
    }

    let consumer = buf.consumer();
    assert_eq!( consumer.n_batches(), 5);
    assert!( consumer.batches.iter().all( |b| b.len() == 1));
    assert_eq!( buf.pending(), 0);
}

#[test]
fn test_flat_flush_gates () {
    // defaults: max_message_age 30s, min_publish_interval 5s
    let mut buf = MsgBuffer::flat( &MsgBufferConfig::default(), CollectingConsumer::new());

    buf.add_at( &position_msg( "A1", t0()), t0());
    let t = t0() + secs(1.0);
    buf.add_at( &position_msg( "A1", t), t);
    assert_eq!( buf.pending(), 1);

    let t = t0() + secs(30.0);
    buf.flush_at( t);
    assert_eq!( buf.consumer().n_batches(), 0, "flushed before oldest message reached max age");

    let t = t0() + secs(31.0);
    buf.add_at( &position_msg( "A1", t), t);
    assert_eq!( buf.consumer().n_batches(), 1);
    assert_eq!( buf.consumer().batches[0].len(), 2);
    assert_eq!( buf.pending(), 0);

    // late message with an old generation time does not cause a flush storm
    let t = t0() + secs(33.0);
    buf.add_at( &position_msg( "A1", t0() + secs(2.0)), t);
    assert_eq!( buf.consumer().n_batches(), 1, "min publish interval ignored");

    buf.flush_at( t0() + secs(36.0));
    assert_eq!( buf.consumer().n_batches(), 2);
}

#[test]
fn test_arrival_order () {
    let mut buf = MsgBuffer::flat( &MsgBufferConfig::default(), CollectingConsumer::new());
    buf.add_at( &position_msg( "A1", t0()), t0());
    buf.add_at( &position_msg( "B2", t0()), t0());

    let gen_times = [3.0, 1.0, 2.0];
    for (i,g) in gen_times.iter().enumerate() {
        let id = if i % 2 == 0 { "A1" } else { "B2" };
        buf.add_at( &position_msg( id, t0() + secs(*g)), t0() + secs(3.0));
    }
    buf.final_flush();

    let batches = &buf.consumer().batches;
    assert_eq!( batches.len(), 1);
    let got: Vec<DateTime<Utc>> = batches[0].iter().map( |cm| cm.generated).collect();
    let expected: Vec<DateTime<Utc>> = gen_times.iter().map( |g| t0() + secs(*g)).collect();
    assert_eq!( got, expected);
}

#[test]
fn test_empty_final_flush () {
    let mut buf = MsgBuffer::flat( &MsgBufferConfig::default(), CollectingConsumer::new());
    buf.final_flush();
    assert_eq!( buf.consumer().n_batches(), 0);

    let mut buf = MsgBuffer::tracked( &MsgBufferConfig::default(), CollectingConsumer::new());
    buf.final_flush();
    assert_eq!( buf.consumer().n_batches(), 0);
}

#[test]
fn test_flush_after_final_flush () {
    let config = MsgBufferConfig { max_message_age: Duration::ZERO, min_publish_interval: Duration::from_secs(1), ..MsgBufferConfig::default() };
    let mut buf = MsgBuffer::flat( &config, CollectingConsumer::new());

    buf.add_at( &position_msg( "A1", t0()), t0());
    buf.final_flush_at( t0());
    assert_eq!( buf.consumer().n_batches(), 0);

    for i in 1..10 {
        let t = t0() + secs( i as f64 * 10.0);
        buf.add_at( &position_msg( "A1", t), t);
    }
    assert_eq!( buf.consumer().n_batches(), 9, "buffer stopped flushing after final flush");
    assert_eq!( buf.pending(), 0);

    // the min publish interval counts from the final flush
    buf.final_flush_at( t0() + secs(95.0));
    let t = t0() + secs(95.5);
    buf.add_at( &position_msg( "A1", t), t);
    assert_eq!( buf.consumer().n_batches(), 9);

    buf.flush_at( t0() + secs(96.0));
    assert_eq!( buf.consumer().n_batches(), 10);
}

#[test]
fn test_add_composite () {
    let mut buf = MsgBuffer::flat( &immediate_config(), CollectingConsumer::new());
    let msg = position_msg( "A1", t0());
    let cm = odin_adsb::CompositeMsg::from_msg( &msg, "remote").unwrap();

    buf.add_composite_at( cm.clone(), t0());
    assert_eq!( buf.n_senders(), 0); // composites don't touch the sender cache
    assert_eq!( buf.consumer().batches, vec![vec![cm]]);
}

#[test]
fn test_channel_consumer () {
    let (tx,rx) = kanal::bounded::<Vec<odin_adsb::CompositeMsg>>(8);
    let mut buf = MsgBuffer::flat( &immediate_config(), ChannelConsumer::new( tx));
    replay( &mut buf, &[POSITION_1, POSITION_2, POSITION_3]);

    assert_eq!( rx.len(), 2);
    let batch = rx.recv().unwrap();
    assert_eq!( batch.len(), 1);
    assert_eq!( batch[0].position, LatLon::new( 36.6983, -121.86017));

    // a closed receiver does not bring down the buffer
    drop(rx);
    replay( &mut buf, &[POSITION_3]);
    assert_eq!( buf.stats().n_batches, 3);
}

#[test]
fn test_callback_consumer () {
    let count = Arc::new( AtomicUsize::new(0));
    let n = count.clone();
    let consumer = CallbackConsumer::new( move |batch: Vec<odin_adsb::CompositeMsg>| { n.fetch_add( batch.len(), Ordering::Relaxed); });

    let mut buf = MsgBuffer::flat( &immediate_config(), consumer);
    replay( &mut buf, &[POSITION_1, POSITION_2, POSITION_3]);
    assert_eq!( count.load( Ordering::Relaxed), 2);
}

#[test]
fn test_shipped_config () {
    let config = load_config( "configs/msgbuffer.ron").unwrap();
    println!("{config:?}");
    assert_eq!( config, MsgBufferConfig::default());
}
