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


//! flush policies that decide when pending composites are handed to the consumer, and how they
//! are grouped into batches.
//!
//! [`FlatBuffer`] keeps a single list in arrival order that is flushed as a whole once its oldest
//! entry is old enough. [`TrackBuffer`] keeps one [`Track`] per aircraft and flushes each ready track
//! as a separate batch sorted by generation time, i.e. batches never mix aircraft.

use std::{collections::HashMap, mem, time::Duration};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;
use odin_adsb::{CompositeMsg, IcaoId, composite::sort_by_generated};

use crate::config::{MsgBufferConfig, to_time_delta};
use crate::consumer::BatchConsumer;

/// minimum time between two track scans
pub const TRACK_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

pub trait FlushPolicy: Send {
    fn push (&mut self, cm: CompositeMsg);

    /// number of composites that have not been flushed yet
    fn pending (&self)->usize;

    /// remove and return the batches that are due at `now`
    fn take_ready (&mut self, now: DateTime<Utc>)->Vec<Vec<CompositeMsg>>;

    /// remove and return everything, regardless of age and flush intervals
    fn take_all (&mut self, now: DateTime<Utc>)->Vec<Vec<CompositeMsg>>;
}

/* #region flat buffer ************************************************************************************/

#[derive(Debug)]
pub struct FlatBuffer {
    max_message_age: TimeDelta,
    min_publish_interval: TimeDelta,
    msgs: Vec<CompositeMsg>,
    last_flush: Option<DateTime<Utc>>,
}

impl FlatBuffer {
    pub fn new (max_message_age: Duration, min_publish_interval: Duration)->Self {
        FlatBuffer {
            max_message_age: to_time_delta( max_message_age),
            min_publish_interval: to_time_delta( min_publish_interval),
            msgs: Vec::new(),
            last_flush: None,
        }
    }

    pub fn from_config (config: &MsgBufferConfig)->Self {
        Self::new( config.max_message_age, config.min_publish_interval)
    }

    pub fn messages (&self)->&[CompositeMsg] { &self.msgs }

    pub fn last_flush (&self)->Option<DateTime<Utc>> { self.last_flush }

    fn is_due (&self, now: DateTime<Utc>)->bool {
        match self.msgs.first() {
            Some(oldest) => {
                now - oldest.generated >= self.max_message_age
                    && self.last_flush.is_none_or( |t| now - t >= self.min_publish_interval)
            }
            None => false
        }
    }
}

impl FlushPolicy for FlatBuffer {
    fn push (&mut self, cm: CompositeMsg) {
        self.msgs.push( cm)
    }

    fn pending (&self)->usize { self.msgs.len() }

    fn take_ready (&mut self, now: DateTime<Utc>)->Vec<Vec<CompositeMsg>> {
        if self.is_due( now) {
            self.take_all( now)
        } else {
            Vec::new()
        }
    }

    fn take_all (&mut self, now: DateTime<Utc>)->Vec<Vec<CompositeMsg>> {
        self.last_flush = Some(now);
        if self.msgs.is_empty() {
            Vec::new()
        } else {
            vec![ mem::take( &mut self.msgs) ]
        }
    }
}

/* #endregion flat buffer */

/* #region track buffer ***********************************************************************************/

/// the composites of a single aircraft in arrival order
#[derive(Debug,Clone)]
pub struct Track {
    start: DateTime<Utc>, // generation time of the first appended message
    msgs: Vec<CompositeMsg>,
}

impl Track {
    pub fn new (cm: CompositeMsg)->Self {
        Track { start: cm.generated, msgs: vec![cm] }
    }

    pub fn push (&mut self, cm: CompositeMsg) { self.msgs.push( cm) }

    pub fn start (&self)->DateTime<Utc> { self.start }

    pub fn age (&self, now: DateTime<Utc>)->TimeDelta { now - self.start }

    pub fn len (&self)->usize { self.msgs.len() }

    pub fn is_empty (&self)->bool { self.msgs.is_empty() }

    pub fn messages (&self)->&[CompositeMsg] { &self.msgs }

    pub fn into_sorted (mut self)->Vec<CompositeMsg> {
        sort_by_generated( &mut self.msgs);
        self.msgs
    }
}

#[derive(Debug)]
pub struct TrackBuffer {
    max_age: TimeDelta,
    tracks: HashMap<IcaoId,Track>,
    last_flush: Option<DateTime<Utc>>,
}

impl TrackBuffer {
    pub fn new (max_age: Duration)->Self {
        TrackBuffer { max_age: to_time_delta( max_age), tracks: HashMap::new(), last_flush: None }
    }

    pub fn from_config (config: &MsgBufferConfig)->Self {
        Self::new( config.track_max_age)
    }

    pub fn add_message (&mut self, cm: CompositeMsg) {
        if let Some(track) = self.tracks.get_mut( &cm.icao24) {
            track.push( cm);
        } else {
            self.tracks.insert( cm.icao24.clone(), Track::new( cm));
        }
    }

    pub fn n_tracks (&self)->usize { self.tracks.len() }

    pub fn get_track (&self, id: &IcaoId)->Option<&Track> { self.tracks.get( id) }

    pub fn tracks (&self)->impl Iterator<Item=(&IcaoId,&Track)> { self.tracks.iter() }

    /// deliver all tracks that are older than `max_age` at `now`, one batch per track.
    /// Returns the number of delivered tracks
    pub fn flush<C: BatchConsumer> (&mut self, now: DateTime<Utc>, consumer: &mut C)->usize {
        let batches = self.take_ready( now);
        let n = batches.len();
        if n > 0 { debug!("flushing {} tracks", n) }
        for batch in batches { consumer.consume( batch) }
        n
    }

    pub fn flush_all<C: BatchConsumer> (&mut self, consumer: &mut C)->usize {
        self.flush_all_at( Utc::now(), consumer)
    }

    /// deliver all tracks regardless of their age, recording `now` as the last flush time
    pub fn flush_all_at<C: BatchConsumer> (&mut self, now: DateTime<Utc>, consumer: &mut C)->usize {
        let batches = self.take_all( now);
        let n = batches.len();
        for batch in batches { consumer.consume( batch) }
        n
    }

    fn take_tracks (&mut self, pred: impl Fn(&Track)->bool)->Vec<Vec<CompositeMsg>> {
        let mut due: Vec<(DateTime<Utc>,IcaoId)> = self.tracks.iter()
            .filter( |(_,track)| pred(track))
            .map( |(id,track)| (track.start, id.clone()))
            .collect();
        due.sort(); // oldest tracks first

        due.into_iter()
            .filter_map( |(_,id)| self.tracks.remove( &id))
            .map( |track| track.into_sorted())
            .collect()
    }
}

impl FlushPolicy for TrackBuffer {
    fn push (&mut self, cm: CompositeMsg) {
        self.add_message( cm)
    }

    fn pending (&self)->usize {
        self.tracks.values().map( |track| track.len()).sum()
    }

    fn take_ready (&mut self, now: DateTime<Utc>)->Vec<Vec<CompositeMsg>> {
        if let Some(last) = self.last_flush {
            if now - last < to_time_delta( TRACK_FLUSH_INTERVAL) {
                return Vec::new()
            }
        }
        self.last_flush = Some(now);

        let max_age = self.max_age;
        self.take_tracks( |track| track.age( now) > max_age)
    }

    fn take_all (&mut self, now: DateTime<Utc>)->Vec<Vec<CompositeMsg>> {
        self.last_flush = Some(now);
        self.take_tracks( |_| true)
    }
}

/* #endregion track buffer */
