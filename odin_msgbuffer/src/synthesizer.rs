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


//! creating composite messages from position reports and cached sender state

use serde::{Serialize,Deserialize};
use odin_adsb::{AdsbMsg, Callsign, CompositeMsg};

use crate::sender::SenderState;

/// when to emit a composite for a position report of a whitelisted sender
#[derive(Serialize,Deserialize,Debug,Clone,Copy,PartialEq,Eq,Default)]
pub enum EmitPolicy {
    /// every position report is turned into a composite, cached values are backfilled if we have them
    #[default]
    OnPosition,

    /// only emit if the composite ends up with non-zero ground speed and track, and some callsign
    /// (an explicitly blank callsign counts)
    RequireBackfill,
}

/// turn a position report into a composite. Returns `None` if the message has no position, if
/// there is no state for its sender yet (the message is the admission event), or if the emit
/// policy rejects the result
pub fn synthesize (msg: &AdsbMsg, state: Option<&SenderState>, receiver_name: &str, policy: EmitPolicy)->Option<CompositeMsg> {
    let state = state?;
    let mut cm = CompositeMsg::from_msg( msg, receiver_name)?;

    cm.ground_speed = backfill_num( cm.ground_speed, state.ground_speed);
    cm.vertical_rate = backfill_num( cm.vertical_rate, state.vertical_rate);
    cm.track = backfill_num( cm.track, state.track);

    cm.callsign = match cm.callsign {
        Some(Callsign::Id(id)) => Some(Callsign::Id(id)),
        other => state.callsign.clone().or(other)
    };

    cm.squawk = match cm.squawk {
        Some(sq) if !sq.is_empty() => Some(sq),
        other => state.squawk.clone().or(other)
    };

    match policy {
        EmitPolicy::OnPosition => Some(cm),
        EmitPolicy::RequireBackfill => {
            if is_non_zero( cm.ground_speed) && is_non_zero( cm.track) && cm.callsign.is_some() { Some(cm) } else { None }
        }
    }
}

// zero values are not trusted - they are what most receivers report while they don't know better
fn backfill_num (v: Option<i64>, cached: Option<i64>)->Option<i64> {
    match v {
        Some(n) if n != 0 => v,
        _ => cached.or(v)
    }
}

fn is_non_zero (v: Option<i64>)->bool {
    v.is_some_and( |n| n != 0)
}
