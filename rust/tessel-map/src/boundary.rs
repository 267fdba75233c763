use std::sync::LazyLock;

use crate::BoundaryConfig;

/// The number of bytes every item contributes to the rolling hash
pub const DIGEST_SIZE: usize = 32;

static BUZHASH_TABLE: LazyLock<[u32; 256]> = LazyLock::new(|| {
    let mut table = [0u32; 256];
    for (byte, slot) in table.iter_mut().enumerate() {
        let digest = blake3::hash(&[byte as u8]);
        let bytes = digest.as_bytes();
        *slot = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    table
});

/// A rolling hash (BuzHash) over the digests of the most recent items of a
/// level. It reports a boundary when the low bits selected by the pattern
/// are all set.
///
/// Once the window is full the hash only depends on the bytes inside it, so
/// two runs that feed the same items produce the same boundaries no matter
/// what came before them.
#[derive(Clone, Debug)]
pub struct BoundaryChecker {
    window: Vec<u8>,
    position: usize,
    filled: usize,
    state: u32,
    pattern: u32,
}

impl BoundaryChecker {
    /// Create a checker with an empty window.
    pub fn new(config: &BoundaryConfig) -> Self {
        BoundaryChecker {
            window: vec![0; config.window_size.max(1) * DIGEST_SIZE],
            position: 0,
            filled: 0,
            state: 0,
            pattern: config.pattern,
        }
    }

    /// Fold the bytes of one item into the window and report whether the
    /// position after it is a boundary.
    pub fn write(&mut self, bytes: &[u8]) -> bool {
        for byte in bytes {
            self.roll(*byte);
        }
        self.is_boundary()
    }

    /// Whether the current position is a boundary.
    pub fn is_boundary(&self) -> bool {
        self.state & self.pattern == self.pattern
    }

    /// Forget everything written so far.
    pub fn reset(&mut self) {
        self.position = 0;
        self.filled = 0;
        self.state = 0;
    }

    fn roll(&mut self, byte: u8) {
        let width = self.window.len();

        self.state = self.state.rotate_left(1) ^ BUZHASH_TABLE[byte as usize];

        if self.filled == width {
            let outgoing = self.window[self.position];
            self.state ^= BUZHASH_TABLE[outgoing as usize].rotate_left((width % 32) as u32);
        } else {
            self.filled += 1;
        }

        self.window[self.position] = byte;
        self.position = (self.position + 1) % width;
    }
}
