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


//! per-aircraft state that is used to whitelist senders and to backfill composites

use std::{collections::HashMap, fmt};
use chrono::{DateTime, TimeDelta, Utc};
use odin_adsb::{AdsbMsg, Callsign, IcaoId};

/// what we remember about a sender between messages. Only the fields that can be backfilled
/// into composites are cached - altitude is not
#[derive(Debug,Clone,PartialEq)]
pub struct SenderState {
    pub last_seen: DateTime<Utc>,
    pub ground_speed: Option<i64>,
    pub vertical_rate: Option<i64>,
    pub track: Option<i64>,
    pub callsign: Option<Callsign>,
    pub squawk: Option<String>,
}

impl SenderState {
    pub fn new (last_seen: DateTime<Utc>)->Self {
        SenderState { last_seen, ground_speed: None, vertical_rate: None, track: None, callsign: None, squawk: None }
    }

    /// overwrite cached values with whatever the message reports. Absent fields leave the cache alone
    pub fn update_from_msg (&mut self, msg: &AdsbMsg, now: DateTime<Utc>) {
        if msg.ground_speed.is_some() { self.ground_speed = msg.ground_speed }
        if msg.vertical_rate.is_some() { self.vertical_rate = msg.vertical_rate }
        if msg.track.is_some() { self.track = msg.track }
        if msg.callsign.is_some() { self.callsign = msg.callsign.clone() }
        if msg.squawk.is_some() { self.squawk = msg.squawk.clone() }

        self.last_seen = now;
    }

    pub fn quiet_time (&self, now: DateTime<Utc>)->TimeDelta {
        now - self.last_seen
    }
}

fn fmt_opt<T: fmt::Display> (v: &Option<T>)->String {
    match v {
        Some(v) => v.to_string(),
        None => "-".to_string()
    }
}

impl fmt::Display for SenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "last seen: {}, gs: {}, vr: {}, trk: {}, cs: {}, sqk: {}",
            self.last_seen.format("%H:%M:%S%.3f"),
            fmt_opt( &self.ground_speed), fmt_opt( &self.vertical_rate), fmt_opt( &self.track),
            fmt_opt( &self.callsign), fmt_opt( &self.squawk))
    }
}

/// the whitelist of senders we have received a position report from
#[derive(Debug,Default)]
pub struct SenderCache {
    senders: HashMap<IcaoId,SenderState>,
}

impl SenderCache {
    pub fn new ()->Self { SenderCache { senders: HashMap::new() } }

    pub fn get (&self, id: &IcaoId)->Option<&SenderState> { self.senders.get(id) }

    pub fn get_mut (&mut self, id: &IcaoId)->Option<&mut SenderState> { self.senders.get_mut(id) }

    pub fn contains (&self, id: &IcaoId)->bool { self.senders.contains_key(id) }

    /// add a sender with empty state. Admitting an already known sender only touches `last_seen`
    pub fn admit (&mut self, id: IcaoId, now: DateTime<Utc>)->&mut SenderState {
        let state = self.senders.entry(id).or_insert_with( || SenderState::new(now));
        state.last_seen = now;
        state
    }

    /// update the state of a known sender, returning `None` if the sender is not whitelisted
    pub fn update (&mut self, id: &IcaoId, msg: &AdsbMsg, now: DateTime<Utc>)->Option<&SenderState> {
        let state = self.senders.get_mut(id)?;
        state.update_from_msg( msg, now);
        Some(state)
    }

    pub fn remove (&mut self, id: &IcaoId)->Option<SenderState> { self.senders.remove(id) }

    pub fn len (&self)->usize { self.senders.len() }

    pub fn is_empty (&self)->bool { self.senders.is_empty() }

    pub fn iter (&self)->impl Iterator<Item=(&IcaoId,&SenderState)> { self.senders.iter() }

    /// remove all senders we have not heard from for at least `max_quiet_time`. Returns the number
    /// of removed senders
    pub fn age_out (&mut self, now: DateTime<Utc>, max_quiet_time: TimeDelta)->usize {
        let n = self.senders.len();
        self.senders.retain( |_,state| state.quiet_time(now) < max_quiet_time);
        n - self.senders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0 ()->DateTime<Utc> { Utc.with_ymd_and_hms( 2024, 3, 10, 17, 0, 0).unwrap() }

    #[test]
    fn test_update_presence () {
        let id = IcaoId::from("A4C8D2");
        let mut state = SenderState::new( t0());

        let mut msg = AdsbMsg::new( "MSG", 4, id.clone(), t0(), t0());
        msg.ground_speed = Some(420);
        msg.track = Some(93);
        state.update_from_msg( &msg, t0());

        let mut msg = AdsbMsg::new( "MSG", 4, id.clone(), t0(), t0());
        msg.ground_speed = Some(0); // observed zero overwrites
        msg.vertical_rate = Some(-64);
        msg.callsign = Some(Callsign::Blank);
        let t1 = t0() + TimeDelta::seconds(2);
        state.update_from_msg( &msg, t1);

        assert_eq!( state.ground_speed, Some(0));
        assert_eq!( state.track, Some(93));
        assert_eq!( state.vertical_rate, Some(-64));
        assert_eq!( state.callsign, Some(Callsign::Blank));
        assert_eq!( state.squawk, None);
        assert_eq!( state.last_seen, t1);
    }

    #[test]
    fn test_update_requires_admission () {
        let mut cache = SenderCache::new();
        let id = IcaoId::from("A4C8D2");
        let mut msg = AdsbMsg::new( "MSG", 4, id.clone(), t0(), t0());
        msg.track = Some(93);

        assert!( cache.update( &id, &msg, t0()).is_none());
        assert!( cache.is_empty());

        cache.admit( id.clone(), t0());
        let t1 = t0() + TimeDelta::seconds(1);
        let state = cache.update( &id, &msg, t1).unwrap();
        assert_eq!( state.track, Some(93));
        assert_eq!( state.last_seen, t1);
    }

    #[test]
    fn test_age_out_boundary () {
        let mut cache = SenderCache::new();
        cache.admit( IcaoId::from("A1"), t0());
        cache.admit( IcaoId::from("A2"), t0() + TimeDelta::seconds(1));

        let q = TimeDelta::seconds(10);
        assert_eq!( cache.age_out( t0() + q - TimeDelta::nanoseconds(1), q), 0);
        assert_eq!( cache.age_out( t0() + q, q), 1); // quiet time == max_quiet_time is removed
        assert!( !cache.contains( &IcaoId::from("A1")));
        assert!( cache.contains( &IcaoId::from("A2")));
        assert_eq!( cache.age_out( t0() + q, q), 0);
    }
}
