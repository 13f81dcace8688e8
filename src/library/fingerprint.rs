use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use super::model::TrackId;

/// Hash the whole file so that a moved or renamed file keeps its identity.
pub fn fingerprint(path: &Path) -> io::Result<TrackId> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(TrackId::new(hex::encode(hasher.finalize())))
}
