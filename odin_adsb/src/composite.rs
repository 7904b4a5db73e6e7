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

use std::{collections::HashSet, fmt};
use chrono::{DateTime,Utc};
use serde::{Serialize,Deserialize};

use crate::{AdsbMsg, Callsign, IcaoId, LatLon};

/// a message with the same fields as an [`AdsbMsg`] but with data merged from several of them.
/// ADS-B receivers normally emit messages with only some fields set - to get altitude, speed, position
/// *and* callsign we have to combine about three. We use a distinct type to be unambiguous about
/// where the data came from. Composites always have a position
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub struct CompositeMsg {
    pub msg_type: String,
    pub subtype: i64,
    pub icao24: IcaoId,

    pub generated: DateTime<Utc>,
    pub logged: DateTime<Utc>,

    pub callsign: Option<Callsign>,
    pub altitude: Option<i64>,
    pub ground_speed: Option<i64>,
    pub track: Option<i64>,
    pub position: LatLon,
    pub vertical_rate: Option<i64>,
    pub squawk: Option<String>,

    pub alert: Option<bool>,
    pub emergency: Option<bool>,
    pub spi: Option<bool>,
    pub on_ground: Option<bool>,

    pub num_stations: Option<i64>,

    pub receiver_name: String, // identifies the receiver station that generated the data
}

impl CompositeMsg {
    /// clone the field values of a position report. Returns `None` if the message has no position
    pub fn from_msg (msg: &AdsbMsg, receiver_name: &str)->Option<Self> {
        let position = msg.position?;

        Some( CompositeMsg {
            msg_type: msg.msg_type.clone(),
            subtype: msg.subtype,
            icao24: msg.icao24.clone(),
            generated: msg.generated,
            logged: msg.logged,
            callsign: msg.callsign.clone(),
            altitude: msg.altitude,
            ground_speed: msg.ground_speed,
            track: msg.track,
            position,
            vertical_rate: msg.vertical_rate,
            squawk: msg.squawk.clone(),
            alert: msg.alert,
            emergency: msg.emergency,
            spi: msg.spi,
            on_ground: msg.on_ground,
            num_stations: msg.num_stations,
            receiver_name: receiver_name.to_string()
        })
    }

    /// tells real ADS-B data apart from synthetic MLAT positions
    pub fn data_system (&self)->&str {
        match self.msg_type.as_str() {
            "MLAT" => "MLAT",
            "MSG" => "ADSB",
            other => other
        }
    }

    pub fn is_mlat (&self)->bool { self.msg_type == "MLAT" }
    pub fn is_masked (&self)->bool { self.icao24.is_masked() }

    pub fn signature (&self)->Signature {
        Signature { icao24: self.icao24.clone(), position: self.position }
    }
}

fn opt<T: fmt::Display> (v: &Option<T>)->String {
    match v {
        Some(v) => v.to_string(),
        None => "-".to_string()
    }
}

impl fmt::Display for CompositeMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cs = self.callsign.as_ref().map( |cs| cs.as_str()).unwrap_or("");
        write!( f, "{}{}+ : {}[{:7.7}] {:>5}f, {:>3}k, {:>5}f/m, {:>3}deg, {} @ {} ({}) {}",
            self.msg_type, self.subtype, self.icao24, cs,
            opt(&self.altitude), opt(&self.ground_speed), opt(&self.vertical_rate), opt(&self.track),
            self.position, self.generated, self.receiver_name, self.data_system())
    }
}

/// sort composites ascending by generation time (stable, i.e. equal timestamps keep arrival order)
pub fn sort_by_generated (msgs: &mut [CompositeMsg]) {
    msgs.sort_by_key( |m| m.generated);
}

/// the subset of a composite message that identifies its content. If two messages have equal
/// signatures they are duplicates, e.g. the same observation reported by two receivers
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq,Eq,Hash)]
pub struct Signature {
    pub icao24: IcaoId,
    pub position: LatLon,
}

/// drop all but the first message for each signature, keeping the order of the remaining ones
pub fn dedup_by_signature (msgs: Vec<CompositeMsg>)->Vec<CompositeMsg> {
    let mut seen: HashSet<Signature> = HashSet::with_capacity( msgs.len());
    msgs.into_iter().filter( |m| seen.insert( m.signature())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn composite (icao: &str, lat: f64, receiver: &str)->CompositeMsg {
        let t = Utc.with_ymd_and_hms( 2016, 3, 10, 18, 22, 22).unwrap();
        let mut msg = AdsbMsg::new( "MSG", 3, IcaoId::from(icao), t, t);
        msg.position = Some( LatLon::new( lat, -121.86));
        CompositeMsg::from_msg( &msg, receiver).unwrap()
    }

    #[test]
    fn test_from_msg_requires_position() {
        let t = Utc::now();
        let msg = AdsbMsg::new( "MSG", 4, IcaoId::from("A81BD0"), t, t);
        assert!( CompositeMsg::from_msg( &msg, "test").is_none());
    }

    #[test]
    fn test_data_system() {
        let mut cm = composite( "A81BD0", 36.7, "r1");
        assert_eq!( cm.data_system(), "ADSB");
        cm.msg_type = "MLAT".to_string();
        assert_eq!( cm.data_system(), "MLAT");
        cm.msg_type = "STA".to_string();
        assert_eq!( cm.data_system(), "STA");
    }

    #[test]
    fn test_dedup() {
        let msgs = vec![
            composite( "A81BD0", 36.7, "r1"),
            composite( "A81BD0", 36.7, "r2"), // same observation from other receiver
            composite( "A81BD0", 36.8, "r2"),
            composite( "AB5024", 36.7, "r1"),
        ];
        let msgs = dedup_by_signature( msgs);
        assert_eq!( msgs.len(), 3);
        assert_eq!( msgs[0].receiver_name, "r1");
        assert_eq!( msgs[1].position.lat, 36.8);
        assert_eq!( msgs[2].icao24.as_str(), "AB5024");
    }
}
