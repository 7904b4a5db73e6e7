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


//! receivers of flushed composite batches

use tracing::warn;
use odin_adsb::CompositeMsg;

/// something that takes ownership of flushed batches. Called synchronously from within the flush,
/// i.e. a blocking consumer stalls the next flush
pub trait BatchConsumer: Send {
    fn consume (&mut self, batch: Vec<CompositeMsg>);
}

impl BatchConsumer for Box<dyn BatchConsumer> {
    fn consume (&mut self, batch: Vec<CompositeMsg>) {
        (**self).consume( batch)
    }
}

/// blocking send into a (bounded) kanal channel. The channel capacity is the backpressure point
pub struct ChannelConsumer {
    tx: kanal::Sender<Vec<CompositeMsg>>
}

impl ChannelConsumer {
    pub fn new (tx: kanal::Sender<Vec<CompositeMsg>>)->Self { ChannelConsumer { tx } }
}

impl BatchConsumer for ChannelConsumer {
    fn consume (&mut self, batch: Vec<CompositeMsg>) {
        let n = batch.len();
        if let Err(e) = self.tx.send( batch) {
            warn!("dropped batch of {} composites: {:?}", n, e);
        }
    }
}

/// synchronous callback
pub struct CallbackConsumer<F> where F: FnMut(Vec<CompositeMsg>) + Send {
    callback: F
}

impl<F> CallbackConsumer<F> where F: FnMut(Vec<CompositeMsg>) + Send {
    pub fn new (callback: F)->Self { CallbackConsumer { callback } }
}

impl<F> BatchConsumer for CallbackConsumer<F> where F: FnMut(Vec<CompositeMsg>) + Send {
    fn consume (&mut self, batch: Vec<CompositeMsg>) {
        (self.callback)( batch)
    }
}

/// keeps all delivered batches
#[derive(Debug,Default)]
pub struct CollectingConsumer {
    pub batches: Vec<Vec<CompositeMsg>>
}

impl CollectingConsumer {
    pub fn new ()->Self { CollectingConsumer { batches: Vec::new() } }

    pub fn n_batches (&self)->usize { self.batches.len() }

    pub fn n_msgs (&self)->usize { self.batches.iter().map( |b| b.len()).sum() }

    pub fn take (&mut self)->Vec<Vec<CompositeMsg>> { std::mem::take( &mut self.batches) }
}

impl BatchConsumer for CollectingConsumer {
    fn consume (&mut self, batch: Vec<CompositeMsg>) {
        self.batches.push( batch)
    }
}
