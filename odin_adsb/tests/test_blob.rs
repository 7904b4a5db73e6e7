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


use chrono::{TimeZone,Timelike,Utc};
use odin_adsb::{AdsbMsg, Callsign, CompositeMsg, IcaoId, LatLon, OdinAdsbError, blob::{decode_batch, encode_batch, encode_batch_bytes, decode_batch_bytes}};

fn batch ()->Vec<CompositeMsg> {
    let t0 = Utc.with_ymd_and_hms( 2016, 3, 10, 18, 22, 22).unwrap().with_nanosecond( 989_123_456).unwrap();

    let mut m1 = AdsbMsg::new( "MSG", 3, IcaoId::from("A81BD0"), t0, t0);
    m1.position = Some( LatLon::new( 36.69804, -121.86007));
    m1.altitude = Some(20125);
    m1.ground_speed = Some(304);
    m1.track = Some(0);
    m1.vertical_rate = Some(-1856);
    m1.callsign = Some( Callsign::Id("VRD961".to_string()));
    m1.squawk = Some("1200".to_string());
    m1.on_ground = Some(false);

    let mut m2 = AdsbMsg::new( "MLAT", 3, IcaoId::from("~A76E37"), t0, t0);
    m2.position = Some( LatLon::new( 36.8347, -120.4883));
    m2.callsign = Some( Callsign::Blank);
    m2.num_stations = Some(4);
    m2.alert = Some(true);

    let m3 = AdsbMsg { position: Some( LatLon::new( -33.9, 151.2)), ..AdsbMsg::new( "MSG", 2, IcaoId::from("7C6DB8"), t0, t0) };

    vec![
        CompositeMsg::from_msg( &m1, "sfo-1").unwrap(),
        CompositeMsg::from_msg( &m2, "mlat").unwrap(),
        CompositeMsg::from_msg( &m3, "").unwrap(),
    ]
}

// run with "cargo test --test test_blob -- --nocapture"

#[test]
fn test_blob_roundtrip() {
    let msgs = batch();
    let blob = encode_batch( &msgs).unwrap();
    println!("blob: {blob}");

    let decoded = decode_batch( &blob).unwrap();
    assert_eq!( decoded, msgs); // same content and order
}

#[test]
fn test_empty_blob() {
    let blob = encode_batch( &[]).unwrap();
    assert!( decode_batch( &blob).unwrap().is_empty());
}

#[test]
fn test_corrupt_blob() {
    let data = encode_batch_bytes( &batch()).unwrap();

    let truncated = &data[..data.len()-3];
    assert!( matches!( decode_batch_bytes( truncated), Err(OdinAdsbError::Blob(_))));

    let mut wrong_version = data.clone();
    wrong_version[0] = 99;
    assert!( matches!( decode_batch_bytes( &wrong_version), Err(OdinAdsbError::Blob(_))));

    let mut trailing = data.clone();
    trailing.push(0);
    assert!( matches!( decode_batch_bytes( &trailing), Err(OdinAdsbError::Blob(_))));

    assert!( matches!( decode_batch( "not base64 !"), Err(OdinAdsbError::Base64Error(_))));
}

#[test]
fn test_long_string_roundtrip() {
    // longer than a u16 length, with a multi-byte char right at the 64k boundary
    let receiver = format!("{}é-ü", "x".repeat( u16::MAX as usize - 1));
    let mut msgs = batch();
    msgs[0].receiver_name = receiver.clone();
    msgs[1].callsign = Some( Callsign::Id( "Ä".repeat( 40_000)));

    let blob = encode_batch( &msgs).unwrap();
    let decoded = decode_batch( &blob).unwrap();
    assert_eq!( decoded[0].receiver_name, receiver);
    assert_eq!( decoded, msgs);
}
