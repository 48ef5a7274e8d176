use std::io::{self, Read};

/// Default per-stream capture limit (1 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

const READ_CHUNK: usize = 8 * 1024;

/// Bytes captured from a single stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedStream {
    pub bytes: Vec<u8>,
    pub truncated: bool,
}

impl CapturedStream {
    pub fn into_lossy_string(self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Read `reader` to EOF keeping at most `max_bytes`.
///
/// Everything past the limit is still consumed so a writer on the other end
/// of a pipe never blocks.
pub fn read_bounded<R: Read>(reader: &mut R, max_bytes: usize) -> io::Result<CapturedStream> {
    let mut captured = CapturedStream::default();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };

        let remaining = max_bytes.saturating_sub(captured.bytes.len());
        if read <= remaining {
            captured.bytes.extend_from_slice(&chunk[..read]);
        } else {
            captured.bytes.extend_from_slice(&chunk[..remaining]);
            captured.truncated = true;
        }
    }

    Ok(captured)
}
