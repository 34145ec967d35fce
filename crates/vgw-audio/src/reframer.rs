//! Audio Reframer (spec component C1, §4.1).
//!
//! Converts arbitrary-size PCM16LE chunks at a stated input rate into a
//! stream of fixed 10 ms, 48 kHz, mono, 16-bit frames (480 samples / 960
//! bytes each), buffering partial input/output across calls.

pub const OUTPUT_SAMPLE_RATE: u32 = 48_000;
pub const FRAME_SAMPLES: usize = 480;
pub const FRAME_BYTES: usize = FRAME_SAMPLES * 2;

/// Per-stream reframing state (spec §3 `PCMFeederState`).
#[derive(Debug, Default)]
pub struct Reframer {
    /// 48 kHz samples produced but not yet enough to fill a frame.
    leftover_samples: Vec<i16>,
    /// Trailing odd byte of a PCM16LE chunk, carried to the next call.
    leftover_byte: Option<u8>,
    aborted: bool,
}

impl Reframer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&mut self) {
        self.aborted = true;
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Feed one chunk of PCM16LE bytes at `input_rate`, returning zero or
    /// more complete 48 kHz 10 ms frames (each exactly [`FRAME_BYTES`] long).
    pub fn feed_chunk(&mut self, bytes: &[u8], input_rate: u32) -> Vec<Vec<u8>> {
        let mut combined = Vec::with_capacity(bytes.len() + 1);
        if let Some(b) = self.leftover_byte.take() {
            combined.push(b);
        }
        combined.extend_from_slice(bytes);

        if combined.len() % 2 == 1 {
            self.leftover_byte = combined.pop();
        }

        let input_samples: Vec<i16> =
            combined.chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]])).collect();

        let resampled = resample_to_48k(&input_samples, input_rate);
        self.leftover_samples.extend(resampled);

        let mut frames = Vec::new();
        while self.leftover_samples.len() >= FRAME_SAMPLES {
            let frame_samples: Vec<i16> = self.leftover_samples.drain(..FRAME_SAMPLES).collect();
            frames.push(samples_to_bytes(&frame_samples));
        }
        frames
    }

    /// Zero-pad and emit any partial frame, then reset reframing state
    /// (spec §4.1 "flush").
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        if self.leftover_samples.is_empty() {
            return None;
        }
        let mut samples = std::mem::take(&mut self.leftover_samples);
        samples.resize(FRAME_SAMPLES, 0);
        Some(samples_to_bytes(&samples))
    }
}

fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

/// Resample `input` at `input_rate` to 48 kHz per spec §4.1's three rules.
fn resample_to_48k(input: &[i16], input_rate: u32) -> Vec<i16> {
    if input.is_empty() {
        return Vec::new();
    }

    match input_rate {
        OUTPUT_SAMPLE_RATE => input.to_vec(),
        24_000 => {
            let mut out = Vec::with_capacity(input.len() * 2);
            for (i, &s) in input.iter().enumerate() {
                out.push(s);
                let next = input.get(i + 1).copied().unwrap_or(s);
                out.push(avg_i16(s, next));
            }
            out
        }
        r => {
            let ratio = f64::from(OUTPUT_SAMPLE_RATE) / f64::from(r);
            let out_len = ((input.len() as f64) * ratio).round() as usize;
            let mut out = Vec::with_capacity(out_len);
            for i in 0..out_len {
                let idx = ((i as f64) / ratio).floor() as usize;
                out.push(input[idx.min(input.len() - 1)]);
            }
            out
        }
    }
}

fn avg_i16(a: i16, b: i16) -> i16 {
    ((i32::from(a) + i32::from(b)) / 2) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_at_48k_produces_one_frame_per_480_samples() {
        let mut reframer = Reframer::new();
        let samples = vec![1i16; FRAME_SAMPLES];
        let bytes = samples_to_bytes(&samples);
        let frames = reframer.feed_chunk(&bytes, 48_000);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), FRAME_BYTES);
    }

    #[test]
    fn odd_length_chunk_carries_one_byte() {
        let mut reframer = Reframer::new();
        let mut bytes = samples_to_bytes(&vec![5i16; 10]);
        bytes.push(7); // trailing odd byte
        let frames_first = reframer.feed_chunk(&bytes, 48_000);
        assert!(frames_first.is_empty());

        // Second call's first byte completes the carried sample.
        let mut next = vec![9u8];
        next.extend(samples_to_bytes(&vec![2i16; FRAME_SAMPLES - 10]));
        let frames_second = reframer.feed_chunk(&next, 48_000);
        assert_eq!(frames_second.len(), 1);
    }

    #[test]
    fn upsampling_24k_to_48k_doubles_sample_count() {
        let mut reframer = Reframer::new();
        let samples = vec![100i16; 240];
        let bytes = samples_to_bytes(&samples);
        let frames = reframer.feed_chunk(&bytes, 24_000);
        // 240 input samples -> 480 output samples -> exactly one frame.
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn flush_zero_pads_partial_frame() {
        let mut reframer = Reframer::new();
        let samples = vec![3i16; 100];
        let bytes = samples_to_bytes(&samples);
        assert!(reframer.feed_chunk(&bytes, 48_000).is_empty());
        let flushed = reframer.flush().expect("partial frame");
        assert_eq!(flushed.len(), FRAME_BYTES);
        assert!(reframer.flush().is_none());
    }
}
