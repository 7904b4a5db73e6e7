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


use std::{fs::File, io::{self,Read}, path::PathBuf};
use anyhow::Result;
use chrono_tz::Tz;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use odin_adsb::{CompositeMsg, blob::encode_batch, sbs::{SbsCodec,SbsReader}};
use odin_msgbuffer::{MsgBuffer, MsgBufferConfig, CallbackConsumer, FlushPolicy, BatchConsumer, load_config};

/// buffers SBS-1 messages into composite batches and prints the batches
#[derive(Parser)]
#[command(about="turn SBS-1 messages into batches of composite messages")]
struct Args {
    /// RON config file (defaults are used if not set)
    #[arg(long)]
    config: Option<PathBuf>,

    /// timezone of message source (overrides config)
    #[arg(long)]
    tz: Option<String>,

    /// receiver name to stamp composites with (overrides config)
    #[arg(long)]
    receiver: Option<String>,

    /// flush per-aircraft tracks instead of the whole buffer
    #[arg(long)]
    track: bool,

    /// print batches as encoded blobs
    #[arg(long)]
    blob: bool,

    /// use message generation times as clock (for recorded input)
    #[arg(long)]
    replay: bool,

    /// file to read SBS messages from ('-' for stdin)
    input: String,
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())  // use RUST_LOG to set max level
        .try_init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config( path)?,
        None => MsgBufferConfig::default()
    };
    if let Some(tz) = &args.tz {
        config.timezone = tz.parse::<Tz>().map_err( |e| anyhow::anyhow!("invalid timezone {}: {}", tz, e))?;
    }
    if let Some(receiver) = &args.receiver {
        config.receiver_name = receiver.clone();
    }

    let input: Box<dyn Read> = if args.input == "-" { Box::new( io::stdin()) } else { Box::new( File::open( &args.input)?) };
    let reader = SbsReader::new( input, SbsCodec::new( config.timezone));

    let blob = args.blob;
    let consumer = CallbackConsumer::new( move |batch: Vec<CompositeMsg>| print_batch( &batch, blob));

    if args.track {
        run( MsgBuffer::tracked( &config, consumer), reader, args.replay);
    } else {
        run( MsgBuffer::flat( &config, consumer), reader, args.replay);
    }
    Ok(())
}

fn run<P,C,R> (mut buffer: MsgBuffer<P,C>, reader: SbsReader<R>, replay: bool)
    where P: FlushPolicy, C: BatchConsumer, R: Read
{
    let mut last = None;
    for res in reader {
        match res {
            Ok(msg) => {
                if replay {
                    buffer.add_at( &msg, msg.generated);
                    last = Some(msg.generated);
                } else {
                    buffer.add( &msg)
                }
            }
            Err(e) => warn!("{e}")
        }
    }

    match last {
        Some(t) => buffer.final_flush_at( t),
        None => buffer.final_flush()
    }
    eprintln!("{:?}", buffer.stats());
}

fn print_batch (batch: &[CompositeMsg], blob: bool) {
    if blob {
        match encode_batch( batch) {
            Ok(blob) => println!("{blob}"),
            Err(e) => warn!("batch not encoded: {e}")
        }
    } else {
        println!("--- batch of {} composites", batch.len());
        for cm in batch {
            println!("{cm}");
        }
    }
}
