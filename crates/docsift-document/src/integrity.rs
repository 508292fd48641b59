// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document fingerprints: SHA-256 of the source bytes, recorded in reports so
// outputs can be traced back to the exact input they came from.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use docsift_core::error::Result;

/// Hash a file without loading it into memory at once.
pub fn hash_file(path: impl AsRef<Path>) -> Result<String> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}
