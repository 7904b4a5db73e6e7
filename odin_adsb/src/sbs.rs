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

//! SBS-1 (BaseStation) codec as documented on http://woodair.net/SBS/Article/Barebones42_Socket_Data.htm
//!
//! Message examples:
//!  MSG,1,111,11111,AA2BC2,111111,2016/03/11,13:07:16.663,2016/03/11,13:07:16.626,UAL814  ,,,,,,,,,,,0
//!  MSG,3,111,11111,A04424,111111,2016/03/11,13:07:05.343,2016/03/11,13:07:05.288,,11025,,,37.17274,-122.03935,,,,,,0
//!  MSG,4,111,11111,AC1FCC,111111,2016/03/11,13:07:07.777,2016/03/11,13:07:07.713,,,316,106,,,1536,,,,,0
//!
//! fields:
//!   0: message type (MSG, SEL, ID, AIR, STA, CLK, or MLAT for mlat-client output)
//!   1: transmission type (MSG only: 1-8, 3: ES Airborne Position Message)
//!   2: DB session id   - '111' for dump1090 generated SBS
//!   3: DB aircraft id  - '11111' for dump1090 generated SBS
//!   4: ICAO 24 bit id (mode S transponder code)
//!   5: DB flight id - '111111' for dump1090 generated SBS
//!   6: date generated
//!   7: time generated
//!   8: date logged
//!   9: time logged
//!  10: callsign
//!  11: mode-C altitude (relative to 1013.2mb (Flight Level), *not* AMSL)
//!  12: ground speed
//!  13: track (from vx,vy, *not* heading)
//!  14: latitude
//!  15: longitude
//!  16: vertical rate (ft/min - 64ft resolution)
//!  17: squawk (mode-A squawk code)
//!  18: alert (flag indicating squawk has changed)
//!  19: emergency (flag)
//!  20: spi (flag, transponder ident activated)
//!  21: on ground (flag)
//!
//! the extended basestation format used by mlat-client adds
//!  22: number of stations
//!  23: (unused)
//!  24: error estimate

use std::io::{BufRead, BufReader, Lines, Read};
use chrono::{DateTime, Utc, NaiveDate, NaiveTime, TimeZone, offset::LocalResult};
use chrono_tz::Tz;
use csv::{ReaderBuilder, StringRecord};

use crate::{AdsbMsg, Callsign, IcaoId, LatLon};
use crate::errors::{Result, OdinAdsbError, parse_error};

pub const SBS_MESSAGE: usize = 0;
pub const SBS_TRANSMISSION: usize = 1;
pub const SBS_SESSION: usize = 2;
pub const SBS_AIRCRAFT_ID: usize = 3;
pub const SBS_ICAO24: usize = 4;
pub const SBS_FLIGHT_ID: usize = 5;
pub const SBS_DATE_GEN: usize = 6;
pub const SBS_TIME_GEN: usize = 7;
pub const SBS_DATE_LOG: usize = 8;
pub const SBS_TIME_LOG: usize = 9;
pub const SBS_CALLSIGN: usize = 10;
pub const SBS_ALTITUDE: usize = 11;
pub const SBS_GROUND_SPEED: usize = 12;
pub const SBS_TRACK: usize = 13;
pub const SBS_LATITUDE: usize = 14;
pub const SBS_LONGITUDE: usize = 15;
pub const SBS_VERTICAL_RATE: usize = 16;
pub const SBS_SQUAWK: usize = 17;
pub const SBS_ALERT: usize = 18;
pub const SBS_EMERGENCY: usize = 19;
pub const SBS_SPI: usize = 20;
pub const SBS_ON_GROUND: usize = 21;
pub const EXT_SBS_NUM_STATIONS: usize = 22;
pub const EXT_SBS_ERROR_ESTIMATE: usize = 24;

pub const SBS_FIELDS: usize = 22;
pub const EXT_SBS_FIELDS: usize = 25;

const DATE_FORMAT: &str = "%Y/%m/%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// encoder/decoder for SBS-1 lines. dump1090 reports times without timezone in the local time of the
/// receiver station, hence we need to know the station timezone to map them to UTC
#[derive(Debug,Clone,Copy)]
pub struct SbsCodec {
    pub timezone: Tz,
}

impl Default for SbsCodec {
    fn default()->Self { SbsCodec{ timezone: Tz::UTC } }
}

impl SbsCodec {
    pub fn new (timezone: Tz)->Self { SbsCodec{timezone} }

    /// parse a single SBS line
    pub fn parse (&self, line: &str)->Result<AdsbMsg> {
        let mut reader = new_csv_reader( line.as_bytes());
        let mut rec = StringRecord::new();
        if reader.read_record( &mut rec)? {
            self.parse_record( &rec, line)
        } else {
            Err( OdinAdsbError::FieldCount{ n: 0, line: line.to_string() })
        }
    }

    pub fn parse_record (&self, rec: &StringRecord, line: &str)->Result<AdsbMsg> {
        if rec.len() != SBS_FIELDS && rec.len() != EXT_SBS_FIELDS {
            return Err( OdinAdsbError::FieldCount{ n: rec.len(), line: line.to_string() })
        }
        let cell = |i: usize| rec.get(i).unwrap_or("");

        let subtype = match cell(SBS_TRANSMISSION).trim().parse::<i64>() {
            Ok(i) => i,
            Err(_) => return Err( parse_error!( line, "invalid transmission type '{}'", cell(SBS_TRANSMISSION)))
        };
        let generated = self.get_utc_datetime( cell(SBS_DATE_GEN), cell(SBS_TIME_GEN), line)?;
        let logged = self.get_utc_datetime( cell(SBS_DATE_LOG), cell(SBS_TIME_LOG), line)?;

        let mut msg = AdsbMsg::new( cell(SBS_MESSAGE), subtype, IcaoId::new( cell(SBS_ICAO24)), generated, logged);

        let cs = cell(SBS_CALLSIGN);
        if !cs.is_empty() {
            msg.callsign = Some( Callsign::from_trimmed( cs.trim())); // this might trim to blank
        }
        let squawk = cell(SBS_SQUAWK);
        if !squawk.is_empty() {
            msg.squawk = Some( squawk.trim().to_string());
        }

        msg.altitude = opt_i64( cell(SBS_ALTITUDE), "altitude", line)?;
        msg.ground_speed = opt_i64( cell(SBS_GROUND_SPEED), "ground speed", line)?;
        msg.track = opt_i64( cell(SBS_TRACK), "track", line)?;
        msg.vertical_rate = opt_i64( cell(SBS_VERTICAL_RATE), "vertical rate", line)?;

        let lat = cell(SBS_LATITUDE);
        let lon = cell(SBS_LONGITUDE);
        if !lat.is_empty() && !lon.is_empty() {
            let lat = opt_f64( lat, "latitude", line)?;
            let lon = opt_f64( lon, "longitude", line)?;
            if let (Some(lat),Some(lon)) = (lat,lon) {
                msg.position = Some( LatLon::new( lat, lon));
            }
        }

        msg.alert = opt_flag( cell(SBS_ALERT));
        msg.emergency = opt_flag( cell(SBS_EMERGENCY));
        msg.spi = opt_flag( cell(SBS_SPI));
        msg.on_ground = opt_flag( cell(SBS_ON_GROUND));

        if rec.len() == EXT_SBS_FIELDS {
            msg.num_stations = opt_i64( cell(EXT_SBS_NUM_STATIONS), "number of stations", line)?;
        }

        Ok(msg)
    }

    /// turn a message back into a (base format) SBS line. Absent fields produce empty cells
    pub fn serialize (&self, msg: &AdsbMsg)->String {
        let mut r: Vec<String> = vec![String::new(); SBS_FIELDS];

        let generated = msg.generated.with_timezone( &self.timezone);
        let logged = msg.logged.with_timezone( &self.timezone);

        r[SBS_MESSAGE] = msg.msg_type.clone();
        r[SBS_TRANSMISSION] = msg.subtype.to_string();
        r[SBS_ICAO24] = msg.icao24.to_string();
        r[SBS_DATE_GEN] = generated.format(DATE_FORMAT).to_string();
        r[SBS_TIME_GEN] = generated.format(TIME_FORMAT).to_string();
        r[SBS_DATE_LOG] = logged.format(DATE_FORMAT).to_string();
        r[SBS_TIME_LOG] = logged.format(TIME_FORMAT).to_string();

        if let Some(cs) = &msg.callsign {
            r[SBS_CALLSIGN] = match cs {
                Callsign::Blank => " ".to_string(), // non-empty cell that trims to blank
                Callsign::Id(s) => s.clone()
            }
        }
        r[SBS_ALTITUDE] = fmt_opt( &msg.altitude);
        r[SBS_GROUND_SPEED] = fmt_opt( &msg.ground_speed);
        r[SBS_TRACK] = fmt_opt( &msg.track);
        if let Some(pos) = &msg.position {
            r[SBS_LATITUDE] = format!("{:.5}", pos.lat);
            r[SBS_LONGITUDE] = format!("{:.5}", pos.lon);
        }
        r[SBS_VERTICAL_RATE] = fmt_opt( &msg.vertical_rate);
        if let Some(squawk) = &msg.squawk { r[SBS_SQUAWK] = squawk.clone(); }

        r[SBS_ALERT] = fmt_flag( &msg.alert);
        r[SBS_EMERGENCY] = fmt_flag( &msg.emergency);
        r[SBS_SPI] = fmt_flag( &msg.spi);
        r[SBS_ON_GROUND] = fmt_flag( &msg.on_ground);

        r.join(",")
    }

    fn get_utc_datetime (&self, date: &str, time: &str, line: &str)->Result<DateTime<Utc>> {
        let Ok(date) = NaiveDate::parse_from_str( date, DATE_FORMAT) else {
            return Err( parse_error!( line, "invalid date '{}'", date))
        };
        let Ok(time) = NaiveTime::parse_from_str( time, TIME_FORMAT) else {
            return Err( parse_error!( line, "invalid time '{}'", time))
        };

        let dt = match self.timezone.from_local_datetime( &date.and_time(time)) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(_, dt2) => dt2, // we don't care about that precision
            LocalResult::None => return Err( parse_error!( line, "local time {} {} does not exist in {}", date, time, self.timezone.name())),
        };
        Ok( dt.with_timezone( &Utc))
    }
}

/// parse a single SBS line with the given source timezone
pub fn parse_sbs (line: &str, source_tz: Tz)->Result<AdsbMsg> {
    SbsCodec::new( source_tz).parse( line)
}

/// serialize a message as SBS line with times in the given timezone
pub fn to_sbs (msg: &AdsbMsg, tz: Tz)->String {
    SbsCodec::new( tz).serialize( msg)
}

fn new_csv_reader<R: Read> (input: R)->csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input)
}

fn opt_i64 (cell: &str, what: &str, line: &str)->Result<Option<i64>> {
    if cell.is_empty() { return Ok(None) }
    cell.trim().parse::<i64>()
        .map( Some)
        .map_err( |_| parse_error!( line, "invalid {} '{}'", what, cell))
}

fn opt_f64 (cell: &str, what: &str, line: &str)->Result<Option<f64>> {
    if cell.is_empty() { return Ok(None) }
    cell.trim().parse::<f64>()
        .map( Some)
        .map_err( |_| parse_error!( line, "invalid {} '{}'", what, cell))
}

// dump1090 reports flags as -1 (set) or 0
fn opt_flag (cell: &str)->Option<bool> {
    let cell = cell.trim();
    if cell.is_empty() { None } else { Some( cell != "0") }
}

fn fmt_opt (v: &Option<i64>)->String {
    v.map( |v| v.to_string()).unwrap_or_default()
}

fn fmt_flag (v: &Option<bool>)->String {
    match v {
        Some(true) => "-1".to_string(),
        Some(false) => "0".to_string(),
        None => String::new()
    }
}

/// iterator over the SBS messages of a line oriented input source. Blank lines are skipped. Errors
/// refer to the line as it was read (minus the line terminator)
pub struct SbsReader<R: Read> {
    codec: SbsCodec,
    lines: Lines<BufReader<R>>,
}

impl<R: Read> SbsReader<R> {
    pub fn new (input: R, codec: SbsCodec)->Self {
        SbsReader { codec, lines: BufReader::new(input).lines() }
    }
}

impl<R: Read> Iterator for SbsReader<R> {
    type Item = Result<AdsbMsg>;

    fn next (&mut self)->Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) => {
                    let line = line.trim_end_matches('\r');
                    if !line.trim().is_empty() {
                        return Some( self.codec.parse( line))
                    }
                }
                Err(e) => return Some( Err( e.into()))
            }
        }
    }
}
