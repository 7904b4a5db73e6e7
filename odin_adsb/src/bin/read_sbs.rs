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

use std::{fs::File, io::{self,Read}};
use anyhow::Result;
use chrono_tz::Tz;
use clap::Parser;
use odin_adsb::sbs::{SbsCodec,SbsReader};

/// SBS file dump tool
#[derive(Parser)]
#[command(about="print decoded SBS-1 messages")]
struct Args {
    /// timezone of message source
    #[arg(long, default_value="UTC")]
    tz: String,

    /// re-serialize decoded messages instead of printing them
    #[arg(long)]
    sbs: bool,

    /// file to read SBS messages from ('-' for stdin)
    input: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let tz: Tz = args.tz.parse().map_err( |e| anyhow::anyhow!("invalid timezone {}: {}", args.tz, e))?;
    let codec = SbsCodec::new( tz);

    let input: Box<dyn Read> = if args.input == "-" { Box::new( io::stdin()) } else { Box::new( File::open( &args.input)?) };

    for res in SbsReader::new( input, codec) {
        match res {
            Ok(msg) => {
                if args.sbs { println!("{}", codec.serialize( &msg)) } else { println!("{msg}") }
            }
            Err(e) => eprintln!("PARSE ERROR: {e}")
        }
    }
    Ok(())
}
