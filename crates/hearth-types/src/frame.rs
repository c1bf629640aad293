use std::collections::VecDeque;

/// One chunk of captured microphone audio: signed 16-bit PCM, mono.
///
/// A zero-length frame is the end-of-utterance sentinel; on the wire it
/// becomes the empty binary message that terminates the speech stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    samples: Vec<i16>,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    /// The sentinel frame marking the end of one spoken utterance.
    pub fn end_of_utterance() -> Self {
        Self { samples: Vec::new() }
    }

    pub fn is_end_of_utterance(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Raw little-endian bytes as sent to the STT service.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect()
    }
}

/// FIFO buffer of frames captured while the STT transport is not yet open.
///
/// Frames leave in exactly the order they entered; draining transfers
/// ownership to the caller, so a frame is dropped only after it has been
/// handed to the transport.
#[derive(Debug, Default)]
pub struct FrameQueue {
    frames: VecDeque<AudioFrame>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self {
            frames: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, frame: AudioFrame) {
        self.frames.push_back(frame);
    }

    /// Remove and return all queued frames, head first.
    pub fn drain(&mut self) -> impl Iterator<Item = AudioFrame> + '_ {
        self.frames.drain(..)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
