// src/pipeline/frame_source.rs
//
// JSON-lines detections reader. Stands in for the external detector: one
// line per frame, frame index = 0-based line number, each line an object of
// label → [[x, y, w, h], ...]. A blank line is a frame with no detections.

use crate::detections::{DecodedFrame, Detections};
use crate::error::{InputError, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

#[derive(Debug)]
pub struct SourceFrame {
    pub index: u64,
    pub detections: Detections,
    /// Entries dropped at the boundary; the rest of the frame is usable.
    pub rejected: Vec<InputError>,
}

pub struct FrameSource<R: BufRead> {
    reader: R,
    buf: Vec<u8>,
    next_index: u64,
}

impl FrameSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        info!("Opened detections stream: {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> FrameSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            next_index: 0,
        }
    }

    /// Index the next frame will carry.
    pub fn position(&self) -> u64 {
        self.next_index
    }

    fn decode(index: u64, bytes: &[u8]) -> std::result::Result<DecodedFrame, InputError> {
        let line = std::str::from_utf8(bytes).map_err(|_| InputError::InvalidUtf8 { line: index })?;
        if line.trim().is_empty() {
            return Ok(DecodedFrame::default());
        }
        Detections::from_json_str(line)
    }
}

impl<R: BufRead> Iterator for FrameSource<R> {
    /// Outer error: the stream failed (`Io`) or the line is not a detections
    /// object (`Input`). Only the latter consumes a frame index.
    type Item = Result<SourceFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => return None,
            Ok(_) => {}
            Err(e) => return Some(Err(e.into())),
        }

        let mut bytes = self.buf.as_slice();
        if let Some(rest) = bytes.strip_suffix(b"\n") {
            bytes = rest.strip_suffix(b"\r").unwrap_or(rest);
        }

        let index = self.next_index;
        self.next_index += 1;

        Some(
            Self::decode(index, bytes)
                .map(|decoded| SourceFrame {
                    index,
                    detections: decoded.detections,
                    rejected: decoded.rejected,
                })
                .map_err(Into::into),
        )
    }
}
