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


//! buffering of ADS-B messages into composite messages.
//!
//! Receivers report partial aircraft state in separate messages. A [`MsgBuffer`] caches the sparse
//! fields per aircraft ([`sender::SenderCache`]), turns each position report into a [`CompositeMsg`]
//! that is backfilled with the cached values ([`synthesizer::synthesize`]) and hands the composites
//! in batches to a [`consumer::BatchConsumer`] when its [`flush::FlushPolicy`] says so.
//!
//! Senders are only tracked after they reported a position (whitelist admission), and are dropped
//! again if we don't hear from them for `max_quiet_time`.
//!
//! The buffer is not synchronized - it is supposed to be owned by a single task (see [`task`])

use std::{fmt, time::Duration};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, trace};
use odin_adsb::{AdsbMsg, CompositeMsg};

pub mod errors;
pub mod config;
pub mod sender;
pub mod synthesizer;
pub mod flush;
pub mod consumer;
pub mod task;

pub use errors::{OdinMsgBufferError, Result};
pub use config::{MsgBufferConfig, load_config};
pub use sender::{SenderCache, SenderState};
pub use synthesizer::{EmitPolicy, synthesize};
pub use flush::{FlushPolicy, FlatBuffer, TrackBuffer, Track};
pub use consumer::{BatchConsumer, ChannelConsumer, CallbackConsumer, CollectingConsumer};

use config::to_time_delta;

/// minimum time between two ageout sweeps
pub const AGEOUT_INTERVAL: Duration = Duration::from_secs(1);

/// running totals of a buffer
#[derive(Debug,Default,Clone,Copy,PartialEq,Eq)]
pub struct MsgBufferStats {
    pub n_received: usize,   // messages passed into `add`
    pub n_dropped: usize,    // messages from senders that are not whitelisted and had no position
    pub n_admitted: usize,   // senders that got whitelisted
    pub n_aged_out: usize,   // senders that were removed because they went quiet
    pub n_composites: usize, // composites that were buffered
    pub n_batches: usize,    // batches delivered to the consumer
}

pub struct MsgBuffer<P,C> where P: FlushPolicy, C: BatchConsumer {
    config: MsgBufferConfig,
    max_quiet_time: TimeDelta,
    senders: SenderCache,
    policy: P,
    consumer: C,
    last_ageout: Option<DateTime<Utc>>,
    stats: MsgBufferStats,
}

impl<C> MsgBuffer<FlatBuffer,C> where C: BatchConsumer {
    pub fn flat (config: &MsgBufferConfig, consumer: C)->Self {
        Self::new( config, FlatBuffer::from_config( config), consumer)
    }
}

impl<C> MsgBuffer<TrackBuffer,C> where C: BatchConsumer {
    pub fn tracked (config: &MsgBufferConfig, consumer: C)->Self {
        Self::new( config, TrackBuffer::from_config( config), consumer)
    }
}

impl<P,C> MsgBuffer<P,C> where P: FlushPolicy, C: BatchConsumer {
    pub fn new (config: &MsgBufferConfig, policy: P, consumer: C)->Self {
        MsgBuffer {
            config: config.clone(),
            max_quiet_time: to_time_delta( config.max_quiet_time),
            senders: SenderCache::new(),
            policy,
            consumer,
            last_ageout: None,
            stats: MsgBufferStats::default(),
        }
    }

    pub fn add (&mut self, msg: &AdsbMsg) {
        self.add_at( msg, Utc::now())
    }

    /// process a message at time `now`: ageout quiet senders, whitelist (or drop) unknown senders,
    /// update the state of known senders and buffer a composite if the message has a position.
    /// Finally check if the buffer is ready to flush
    pub fn add_at (&mut self, msg: &AdsbMsg, now: DateTime<Utc>) {
        self.stats.n_received += 1;
        self.age_out_quiet_senders( now);

        if let Some(state) = self.senders.update( &msg.icao24, msg, now) {
            if let Some(cm) = synthesize( msg, Some(state), &self.config.receiver_name, self.config.emit_policy) {
                self.policy.push( cm);
                self.stats.n_composites += 1;
            }

        } else if msg.has_position() {
            trace!("admitting sender {}", msg.icao24);
            self.senders.admit( msg.icao24.clone(), now);
            self.stats.n_admitted += 1;

        } else {
            self.stats.n_dropped += 1;
        }

        self.flush_at( now);
    }

    pub fn add_composite (&mut self, cm: CompositeMsg) {
        self.add_composite_at( cm, Utc::now())
    }

    /// buffer an already synthesized composite (e.g. from another receiver). This does not touch
    /// the sender cache
    pub fn add_composite_at (&mut self, cm: CompositeMsg, now: DateTime<Utc>) {
        self.policy.push( cm);
        self.stats.n_composites += 1;
        self.flush_at( now);
    }

    pub fn flush (&mut self) {
        self.flush_at( Utc::now())
    }

    /// deliver whatever the flush policy considers due at `now`
    pub fn flush_at (&mut self, now: DateTime<Utc>) {
        let batches = self.policy.take_ready( now);
        self.deliver( batches);
    }

    pub fn final_flush (&mut self) {
        self.final_flush_at( Utc::now())
    }

    /// deliver everything that is pending, e.g. before shutting down. The buffer stays usable, `now`
    /// is recorded as the last flush time
    pub fn final_flush_at (&mut self, now: DateTime<Utc>) {
        let batches = self.policy.take_all( now);
        self.deliver( batches);
    }

    fn deliver (&mut self, batches: Vec<Vec<CompositeMsg>>) {
        for batch in batches {
            debug!("flushing {} composites", batch.len());
            self.stats.n_batches += 1;
            self.consumer.consume( batch);
        }
    }

    /// remove senders that have been quiet for at least `max_quiet_time`. This runs at most once
    /// per [`AGEOUT_INTERVAL`], otherwise it is a no-op. Returns the number of removed senders
    pub fn age_out_quiet_senders (&mut self, now: DateTime<Utc>)->usize {
        if let Some(last) = self.last_ageout {
            if now - last < to_time_delta( AGEOUT_INTERVAL) {
                return 0
            }
        }
        self.last_ageout = Some(now);

        let n = self.senders.age_out( now, self.max_quiet_time);
        if n > 0 {
            debug!("aged out {} senders, {} remaining", n, self.senders.len());
            self.stats.n_aged_out += n;
        }
        n
    }

    pub fn senders (&self)->&SenderCache { &self.senders }

    pub fn n_senders (&self)->usize { self.senders.len() }

    pub fn pending (&self)->usize { self.policy.pending() }

    pub fn config (&self)->&MsgBufferConfig { &self.config }

    pub fn policy (&self)->&P { &self.policy }

    pub fn consumer (&self)->&C { &self.consumer }

    pub fn consumer_mut (&mut self)->&mut C { &mut self.consumer }

    pub fn into_consumer (self)->C { self.consumer }

    pub fn stats (&self)->MsgBufferStats { self.stats }
}

impl<P,C> fmt::Display for MsgBuffer<P,C> where P: FlushPolicy, C: BatchConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!( f, "max message age: {:?}, min publish interval: {:?}, max quiet time: {:?}",
            self.config.max_message_age, self.config.min_publish_interval, self.config.max_quiet_time)?;
        writeln!( f, "{} senders, {} pending composites", self.senders.len(), self.policy.pending())?;

        let mut ids: Vec<_> = self.senders.iter().collect();
        ids.sort_by( |a,b| a.0.cmp( b.0));
        for (id,state) in ids {
            writeln!( f, "  {id}: {state}")?;
        }
        Ok(())
    }
}
