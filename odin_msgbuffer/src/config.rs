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


//! configuration of message buffers. Durations are stored as human readable strings ("30s", "6min")
//! in RON config files

use std::{fs, path::Path, time::Duration};
use chrono::TimeDelta;
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use parse_duration::parse;

use crate::synthesizer::EmitPolicy;
use crate::errors::Result;

#[derive(Serialize,Deserialize,Debug,Clone,PartialEq)]
#[serde(default)]
pub struct MsgBufferConfig {
    /// generation age of the oldest buffered composite before the buffer becomes eligible for flush
    #[serde(serialize_with="serialize_duration", deserialize_with="deserialize_duration")]
    pub max_message_age: Duration,

    /// minimum time between two flushes of the flat buffer
    #[serde(serialize_with="serialize_duration", deserialize_with="deserialize_duration")]
    pub min_publish_interval: Duration,

    /// senders we have not heard from for this long are dropped from the whitelist
    #[serde(serialize_with="serialize_duration", deserialize_with="deserialize_duration")]
    pub max_quiet_time: Duration,

    /// age of the first message of a track before the track is flushed (track policy only)
    #[serde(serialize_with="serialize_duration", deserialize_with="deserialize_duration")]
    pub track_max_age: Duration,

    pub emit_policy: EmitPolicy,
    pub receiver_name: String, // stamped on every composite we create
    pub timezone: Tz,          // of the (non-timezoned) SBS source timestamps
}

impl Default for MsgBufferConfig {
    fn default()->Self {
        MsgBufferConfig {
            max_message_age: Duration::from_secs(30),
            min_publish_interval: Duration::from_secs(5),
            max_quiet_time: Duration::from_secs(360),
            track_max_age: Duration::from_secs(30),
            emit_policy: EmitPolicy::OnPosition,
            receiver_name: String::new(),
            timezone: Tz::UTC,
        }
    }
}

impl MsgBufferConfig {
    pub fn with_receiver_name (mut self, name: impl ToString)->Self {
        self.receiver_name = name.to_string();
        self
    }
}

pub fn load_config<P: AsRef<Path>> (path: P)->Result<MsgBufferConfig> {
    let contents = fs::read_to_string( path)?;
    let config: MsgBufferConfig = ron::from_str( &contents)?;
    Ok(config)
}

/// saturating conversion for our config durations - anything that does not fit is "forever"
pub(crate) fn to_time_delta (dur: Duration)->TimeDelta {
    TimeDelta::from_std( dur).unwrap_or( TimeDelta::MAX)
}

pub fn deserialize_duration <'a,D>(deserializer: D) -> std::result::Result<Duration,D::Error>
    where D: Deserializer<'a>
{
    String::deserialize(deserializer).and_then( |string| {
        parse(string.as_str())
            .map_err( |e| serde::de::Error::custom(format!("{:?}",e)))
    })
}

pub fn serialize_duration<S: Serializer> (dur: &Duration, s: S) -> std::result::Result<S::Ok, S::Error>  {
    let dfm = format!("{:?}", dur);
    s.serialize_str(&dfm)
}
