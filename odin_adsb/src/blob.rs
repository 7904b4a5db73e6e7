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

//! binary encoding of composite message batches that can be passed around as a single string
//!
//! layout (big endian):
//! ```text
//!   blob   := version:u8 n_records:u32 record*
//!   record := len:u32 <len bytes of record fields>
//!   str    := len:u32 utf8-bytes
//!   opt<T> := 0 | 1 T
//!   time   := secs:i64 nanos:u32
//! ```
//! the binary data is base64 encoded

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::{Buf, BufMut, BytesMut};
use chrono::{DateTime,Utc};

use crate::{Callsign, CompositeMsg, IcaoId, LatLon};
use crate::errors::{Result, OdinAdsbError, blob_error};

pub const BLOB_VERSION: u8 = 2;

const CS_NONE: u8 = 0;
const CS_BLANK: u8 = 1;
const CS_ID: u8 = 2;

/// encode a batch of composites as base64 string
pub fn encode_batch (msgs: &[CompositeMsg])->Result<String> {
    Ok( STANDARD.encode( encode_batch_bytes( msgs)?))
}

/// decode a string produced by [`encode_batch`]
pub fn decode_batch (blob: &str)->Result<Vec<CompositeMsg>> {
    let data = STANDARD.decode( blob.trim())?;
    decode_batch_bytes( &data)
}

/// fails if the batch, a record or a string is too large for its u32 length prefix
pub fn encode_batch_bytes (msgs: &[CompositeMsg])->Result<Vec<u8>> {
    let mut buf = BytesMut::with_capacity( 5 + msgs.len() * 128);
    buf.put_u8( BLOB_VERSION);
    buf.put_u32( len_u32( msgs.len(), "batch")?);

    let mut rec = BytesMut::with_capacity( 128);
    for m in msgs {
        rec.clear();
        write_record( &mut rec, m)?;
        buf.put_u32( len_u32( rec.len(), "record")?);
        buf.put_slice( &rec);
    }

    Ok( buf.to_vec())
}

fn len_u32 (len: usize, what: &str)->Result<u32> {
    u32::try_from( len).map_err( |_| blob_error!("{} too large for u32 length prefix ({})", what, len))
}

pub fn decode_batch_bytes (data: &[u8])->Result<Vec<CompositeMsg>> {
    let mut r = BlobReader(data);

    let version = r.u8()?;
    if version != BLOB_VERSION {
        return Err( blob_error!("unsupported version {}", version))
    }

    let n = r.u32()? as usize;
    let mut msgs = Vec::with_capacity( n.min(4096)); // don't trust the header for pre-allocation
    for i in 0..n {
        let len = r.u32()? as usize;
        let rec = r.slice( len).map_err( |_| blob_error!("truncated record {}", i))?;
        msgs.push( read_record( &mut BlobReader(rec))?);
    }

    if r.0.has_remaining() {
        return Err( blob_error!("{} trailing bytes", r.0.remaining()))
    }
    Ok(msgs)
}

fn write_record (buf: &mut BytesMut, m: &CompositeMsg)->Result<()> {
    put_str( buf, &m.msg_type)?;
    buf.put_i64( m.subtype);
    put_str( buf, m.icao24.as_str())?;
    put_time( buf, &m.generated);
    put_time( buf, &m.logged);

    match &m.callsign {
        None => buf.put_u8( CS_NONE),
        Some(Callsign::Blank) => buf.put_u8( CS_BLANK),
        Some(Callsign::Id(s)) => { buf.put_u8( CS_ID); put_str( buf, s)?; }
    }
    put_opt_i64( buf, m.altitude);
    put_opt_i64( buf, m.ground_speed);
    put_opt_i64( buf, m.track);
    buf.put_f64( m.position.lat);
    buf.put_f64( m.position.lon);
    put_opt_i64( buf, m.vertical_rate);
    match &m.squawk {
        Some(s) => { buf.put_u8(1); put_str( buf, s)?; }
        None => buf.put_u8(0)
    }

    put_opt_bool( buf, m.alert);
    put_opt_bool( buf, m.emergency);
    put_opt_bool( buf, m.spi);
    put_opt_bool( buf, m.on_ground);
    put_opt_i64( buf, m.num_stations);

    put_str( buf, &m.receiver_name)
}

fn read_record (r: &mut BlobReader)->Result<CompositeMsg> {
    let msg_type = r.string()?;
    let subtype = r.i64()?;
    let icao24 = IcaoId::new( r.string()?);
    let generated = r.time()?;
    let logged = r.time()?;

    let callsign = match r.u8()? {
        CS_NONE => None,
        CS_BLANK => Some(Callsign::Blank),
        CS_ID => Some(Callsign::Id( r.string()?)),
        tag => return Err( blob_error!("invalid callsign tag {}", tag))
    };
    let altitude = r.opt_i64()?;
    let ground_speed = r.opt_i64()?;
    let track = r.opt_i64()?;
    let position = LatLon::new( r.f64()?, r.f64()?);
    let vertical_rate = r.opt_i64()?;
    let squawk = if r.flag()? { Some( r.string()?) } else { None };

    let alert = r.opt_bool()?;
    let emergency = r.opt_bool()?;
    let spi = r.opt_bool()?;
    let on_ground = r.opt_bool()?;
    let num_stations = r.opt_i64()?;

    let receiver_name = r.string()?;

    Ok( CompositeMsg {
        msg_type, subtype, icao24, generated, logged,
        callsign, altitude, ground_speed, track, position, vertical_rate, squawk,
        alert, emergency, spi, on_ground, num_stations,
        receiver_name
    })
}

fn put_str (buf: &mut BytesMut, s: &str)->Result<()> {
    let bs = s.as_bytes();
    buf.put_u32( len_u32( bs.len(), "string")?);
    buf.put_slice( bs);
    Ok(())
}

fn put_time (buf: &mut BytesMut, dt: &DateTime<Utc>) {
    buf.put_i64( dt.timestamp());
    buf.put_u32( dt.timestamp_subsec_nanos());
}

fn put_opt_i64 (buf: &mut BytesMut, v: Option<i64>) {
    match v {
        Some(v) => { buf.put_u8(1); buf.put_i64(v); }
        None => buf.put_u8(0)
    }
}

fn put_opt_bool (buf: &mut BytesMut, v: Option<bool>) {
    buf.put_u8( match v { None => 0, Some(false) => 1, Some(true) => 2 });
}

/// bounds checked reads - `bytes::Buf` getters panic on insufficient data
struct BlobReader<'a> (&'a [u8]);

impl<'a> BlobReader<'a> {
    fn ensure (&self, n: usize)->Result<()> {
        if self.0.remaining() < n {
            Err( blob_error!("unexpected end of data (need {} bytes, have {})", n, self.0.remaining()))
        } else {
            Ok(())
        }
    }

    fn slice (&mut self, n: usize)->Result<&'a [u8]> {
        self.ensure(n)?;
        let (head,tail) = self.0.split_at(n);
        self.0 = tail;
        Ok(head)
    }

    fn u8 (&mut self)->Result<u8> { self.ensure(1)?; Ok( self.0.get_u8()) }
    fn u32 (&mut self)->Result<u32> { self.ensure(4)?; Ok( self.0.get_u32()) }
    fn i64 (&mut self)->Result<i64> { self.ensure(8)?; Ok( self.0.get_i64()) }
    fn f64 (&mut self)->Result<f64> { self.ensure(8)?; Ok( self.0.get_f64()) }

    fn flag (&mut self)->Result<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err( blob_error!("invalid option tag {}", tag))
        }
    }

    fn string (&mut self)->Result<String> {
        let len = self.u32()? as usize;
        let bs = self.slice( len)?;
        String::from_utf8( bs.to_vec()).map_err( |e| blob_error!("invalid utf8 string: {}", e))
    }

    fn time (&mut self)->Result<DateTime<Utc>> {
        let secs = self.i64()?;
        let nanos = self.u32()?;
        DateTime::from_timestamp( secs, nanos).ok_or_else( || blob_error!("invalid timestamp {}.{}", secs, nanos))
    }

    fn opt_i64 (&mut self)->Result<Option<i64>> {
        if self.flag()? { Ok( Some( self.i64()?)) } else { Ok(None) }
    }

    fn opt_bool (&mut self)->Result<Option<bool>> {
        match self.u8()? {
            0 => Ok(None),
            1 => Ok(Some(false)),
            2 => Ok(Some(true)),
            tag => Err( blob_error!("invalid flag value {}", tag))
        }
    }
}
