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

//! message types for ADS-B/MLAT surveillance data in SBS-1 (BaseStation) format
//!
//! Receivers such as dump1090 emit one partial fact per message (position, velocity, callsign,
//! squawk..) which we represent as [`AdsbMsg`]. Merging several of them yields a [`CompositeMsg`]
//! that carries the full state of an aircraft at the time of a position report.

use std::{fmt, hash::{Hash,Hasher}};
use chrono::{DateTime,Utc};
use serde::{Serialize,Deserialize};

pub mod errors;
pub mod sbs;
pub mod composite;
pub mod blob;

pub use composite::{CompositeMsg, Signature, dedup_by_signature};
pub use errors::{OdinAdsbError, Result};

/// identifiers starting with this char are masked (anonymized) by the source
pub const MASK_MARKER: char = '~';

/// the 24bit Mode S transponder address as reported by the receiver (hex string)
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq,Eq,Hash,PartialOrd,Ord,Default)]
pub struct IcaoId(String);

impl IcaoId {
    pub fn new (id: impl Into<String>)->Self { IcaoId(id.into()) }

    pub fn as_str (&self)->&str { self.0.as_str() }

    pub fn is_masked (&self)->bool { self.0.starts_with(MASK_MARKER) }
}

impl fmt::Display for IcaoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IcaoId {
    fn from (s: &str)->Self { IcaoId(s.to_string()) }
}

/// geodetic position in degrees
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Default)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new (lat: f64, lon: f64)->Self { LatLon{lat,lon} }
}

// positions are only compared for identity (signatures), hence we can hash the bit patterns
impl Eq for LatLon {}

impl Hash for LatLon {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lat.to_bits().hash(state);
        self.lon.to_bits().hash(state);
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.7},{:.7})", self.lat, self.lon)
    }
}

/// a callsign that was actually received. MSG,1 messages sometimes report a blank callsign, which
/// we have to keep apart from flights we have not yet received any callsign for. The latter is
/// represented as `None` wherever callsigns are stored as `Option<Callsign>`
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq,Eq,Hash)]
pub enum Callsign {
    Blank,
    Id(String),
}

impl Callsign {
    /// map a (trimmed) callsign cell into a Callsign
    pub fn from_trimmed (s: &str)->Self {
        if s.is_empty() { Callsign::Blank } else { Callsign::Id(s.to_string()) }
    }

    pub fn is_blank (&self)->bool { matches!(self, Callsign::Blank) }

    pub fn as_str (&self)->&str {
        match self {
            Callsign::Blank => "",
            Callsign::Id(s) => s.as_str()
        }
    }
}

impl fmt::Display for Callsign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callsign::Blank => write!(f, "<blank>"),
            Callsign::Id(s) => write!(f, "{s}")
        }
    }
}

/// a single decoded SBS-1 message. Apart from the header fields everything is optional since each
/// message subtype only reports a slice of the aircraft state. Note that presence is what counts -
/// a `Some(0)` ground speed is a valid observation.
#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
pub struct AdsbMsg {
    pub msg_type: String, // MSG, MLAT, STA, ID, AIR, SEL or CLK
    pub subtype: i64,     // MSG transmission type 1..8
    pub icao24: IcaoId,

    pub generated: DateTime<Utc>, // when the receiver produced the message
    pub logged: DateTime<Utc>,

    pub callsign: Option<Callsign>,
    pub altitude: Option<i64>,      // mode C altitude in ft (flight level, not AMSL)
    pub ground_speed: Option<i64>,  // knots
    pub track: Option<i64>,         // degrees, derived from velocity E/W and N/S (not heading)
    pub position: Option<LatLon>,
    pub vertical_rate: Option<i64>, // ft/min (64ft resolution)
    pub squawk: Option<String>,     // mode A squawk code

    pub alert: Option<bool>,        // squawk has changed
    pub emergency: Option<bool>,
    pub spi: Option<bool>,          // transponder ident activated
    pub on_ground: Option<bool>,

    pub num_stations: Option<i64>,  // extended basestation format (MLAT) only
}

impl AdsbMsg {
    /// a header-only message - all optional fields are absent
    pub fn new (msg_type: &str, subtype: i64, icao24: IcaoId, generated: DateTime<Utc>, logged: DateTime<Utc>)->Self {
        AdsbMsg {
            msg_type: msg_type.to_string(), subtype, icao24, generated, logged,
            callsign: None, altitude: None, ground_speed: None, track: None, position: None,
            vertical_rate: None, squawk: None,
            alert: None, emergency: None, spi: None, on_ground: None,
            num_stations: None
        }
    }

    pub fn is_mlat (&self)->bool { self.msg_type == "MLAT" }
    pub fn is_masked (&self)->bool { self.icao24.is_masked() }

    pub fn has_callsign (&self)->bool { self.callsign.is_some() }
    pub fn has_altitude (&self)->bool { self.altitude.is_some() }
    pub fn has_ground_speed (&self)->bool { self.ground_speed.is_some() }
    pub fn has_track (&self)->bool { self.track.is_some() }
    pub fn has_position (&self)->bool { self.position.is_some() }
    pub fn has_vertical_rate (&self)->bool { self.vertical_rate.is_some() }
    pub fn has_squawk (&self)->bool { self.squawk.is_some() }
}

impl fmt::Display for AdsbMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "{}{} : {}", self.msg_type, self.subtype, self.icao24)?;
        if let Some(pos) = &self.position { write!( f, " {pos}")?; }
        Ok(())
    }
}
