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


//! running a [`MsgBuffer`] as the single owner of its state on a blocking tokio thread

use std::time::Duration;
use kanal::ReceiveErrorTimeout;
use tokio::task::{self, JoinHandle};
use tracing::{debug, info};
use odin_adsb::AdsbMsg;

use crate::{MsgBuffer, flush::FlushPolicy, consumer::BatchConsumer};

/// feed messages received from `input` into `buffer`. If there is no input for `tick` we check
/// if the buffer is due to flush. Once all senders of `input` are dropped the buffer is flushed
/// unconditionally and returned through the join handle
pub fn spawn_msgbuffer_task<P,C> (mut buffer: MsgBuffer<P,C>, input: kanal::Receiver<AdsbMsg>, tick: Duration)->JoinHandle<MsgBuffer<P,C>>
    where P: FlushPolicy + 'static, C: BatchConsumer + 'static
{
    task::spawn_blocking( move || {
        debug!("msgbuffer task started");
        loop {
            match input.recv_timeout( tick) {
                Ok(msg) => buffer.add( &msg),
                Err(ReceiveErrorTimeout::Timeout) => buffer.flush(),
                Err(_) => break // input closed
            }
        }

        buffer.final_flush();
        info!("msgbuffer task terminated: {:?}", buffer.stats());
        buffer
    })
}
