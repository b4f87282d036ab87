//! In-memory OOI device used as a bus in tests.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};

const SLOT_SIZE: usize = 15;

#[derive(Default)]
pub struct MockDevice {
    slots: HashMap<u8, [u8; SLOT_SIZE]>,
    pending: VecDeque<u8>,
    sent: Vec<Vec<u8>>,
    corrupt: bool,
    fail_writes: Option<String>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` in `slot` the way the firmware does: NUL padded.
    pub fn program(&mut self, slot: u8, data: &[u8]) {
        let mut cell = [0u8; SLOT_SIZE];
        let n = data.len().min(SLOT_SIZE);
        cell[..n].copy_from_slice(&data[..n]);
        self.slots.insert(slot, cell);
    }

    pub fn corrupt_replies(&mut self) {
        self.corrupt = true;
    }

    pub fn fail_writes(&mut self, reason: &str) {
        self.fail_writes = Some(reason.to_string());
    }

    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    fn handle(&mut self, packet: &[u8]) {
        match packet {
            [0x05, slot] => {
                // unprogrammed cells read back as erased flash
                let cell = self.slots.get(slot).copied().unwrap_or([0xFF; SLOT_SIZE]);
                let echo = if self.corrupt { slot.wrapping_add(1) } else { *slot };
                self.pending.extend([0x05, echo]);
                self.pending.extend(cell);
            }
            [0x06, slot, data @ ..] => {
                let slot = *slot;
                self.program(slot, data);
            }
            _ => (),
        }
    }
}

impl Write for MockDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(reason) = &self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::Other, reason.clone()));
        }
        self.sent.push(buf.to_vec());
        self.handle(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for MockDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "operation timed out"));
        }
        let n = buf.len().min(self.pending.len());
        for (dst, src) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}
