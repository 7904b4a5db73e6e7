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

 use thiserror::Error;

 pub type Result<T> = std::result::Result<T,OdinAdsbError>;


#[derive(Error,Debug)]
pub enum OdinAdsbError {

    #[error("corrupt SBS message with {n} fields: '{line}'")]
    FieldCount { n: usize, line: String },

    #[error("parse error {msg} in '{line}'")]
    Parse { msg: String, line: String },

    #[error("CSV error {0}")]
    CsvError( #[from] csv::Error),

    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("base64 error {0}")]
    Base64Error( #[from] base64::DecodeError),

    #[error("corrupt message blob {0}")]
    Blob(String),
}

impl OdinAdsbError {
    /// the SBS line this error refers to (if any)
    pub fn line (&self)->Option<&str> {
        match self {
            OdinAdsbError::FieldCount{line,..} => Some(line.as_str()),
            OdinAdsbError::Parse{line,..} => Some(line.as_str()),
            _ => None
        }
    }
}

macro_rules! parse_error {
    ($line:expr, $fmt:literal $(, $arg:expr )* ) => {
        OdinAdsbError::Parse{ msg: format!( $fmt $(, $arg)* ), line: $line.to_string() }
    };
}
pub (crate) use parse_error;

macro_rules! blob_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        OdinAdsbError::Blob( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use blob_error;
