use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

/// Opens a file and transparently peels off GZIP layers to expose the
/// underlying table text.
pub fn open_input(path: &Path) -> anyhow::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    let mut reader: Box<dyn BufRead + Send> = Box::new(BufReader::new(file));

    // Limit nesting depth to avoid looping on malformed inputs
    let mut depth = 0;
    const MAX_DEPTH: usize = 4;

    while depth < MAX_DEPTH {
        let buf = reader.fill_buf()?;
        // GZIP magic: 1f 8b
        let is_gzip = buf.len() >= 2 && buf[0] == 0x1f && buf[1] == 0x8b;
        if !is_gzip {
            break;
        }

        tracing::debug!("Detected GZIP layer");
        reader = Box::new(BufReader::new(MultiGzDecoder::new(reader)));
        depth += 1;
    }
    Ok(reader)
}
