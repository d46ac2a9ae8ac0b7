//! Paged tag memory.
//!
//! A tag image is a fixed number of 4-byte pages. Addressing is by
//! (page, index); an out-of-range address is a caller bug and panics.

use crate::{DEFAULT_PAGE_COUNT, MAX_STRING_LEN, PAGE_SIZE};

/// In-memory image of a tag's paged storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMemory {
    pages: Vec<[u8; PAGE_SIZE]>,
}

impl TagMemory {
    /// Zero-filled image with `page_count` pages.
    pub fn new(page_count: usize) -> Self {
        Self {
            pages: vec![[0u8; PAGE_SIZE]; page_count],
        }
    }

    /// Build an image from pages read off a tag.
    pub fn from_pages(pages: Vec<[u8; PAGE_SIZE]>) -> Self {
        Self { pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, page: usize) -> [u8; PAGE_SIZE] {
        self.pages[page]
    }

    pub fn set_page(&mut self, page: usize, data: [u8; PAGE_SIZE]) {
        self.pages[page] = data;
    }

    pub fn pages(&self) -> &[[u8; PAGE_SIZE]] {
        &self.pages
    }

    pub fn read_byte(&self, page: usize, index: usize) -> u8 {
        self.pages[page][index]
    }

    pub fn write_byte(&mut self, page: usize, index: usize, value: u8) {
        self.pages[page][index] = value;
    }

    /// Address of the byte following (page, index), wrapping into the next page.
    fn next_slot(page: usize, index: usize) -> (usize, usize) {
        if index == PAGE_SIZE - 1 {
            (page + 1, 0)
        } else {
            (page, index + 1)
        }
    }

    /// Read a 16-bit field: low byte at (page, index), high byte in the next slot.
    pub fn read_u16(&self, page: usize, index: usize) -> u16 {
        let low = self.read_byte(page, index);
        let (hp, hi) = Self::next_slot(page, index);
        let high = self.read_byte(hp, hi);
        u16::from_le_bytes([low, high])
    }

    pub fn write_u16(&mut self, page: usize, index: usize, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write_byte(page, index, low);
        let (hp, hi) = Self::next_slot(page, index);
        self.write_byte(hp, hi, high);
    }

    /// Read a null-terminated string starting at byte 0 of `page`.
    ///
    /// Stops at the first zero byte or after 20 characters.
    pub fn read_string(&self, page: usize) -> String {
        let mut out = String::new();
        for i in 0..MAX_STRING_LEN {
            let byte = self.read_byte(page + i / PAGE_SIZE, i % PAGE_SIZE);
            if byte == 0 {
                break;
            }
            out.push(char::from(byte));
        }
        out
    }

    /// Write `s` starting at byte 0 of `page`, truncated to 20 bytes.
    ///
    /// The remainder of the 20-byte slot is zeroed, so shorter strings are
    /// always terminated.
    pub fn write_string(&mut self, page: usize, s: &str) {
        let bytes = s.as_bytes();
        for i in 0..MAX_STRING_LEN {
            let byte = bytes.get(i).copied().unwrap_or(0);
            self.write_byte(page + i / PAGE_SIZE, i % PAGE_SIZE, byte);
        }
    }

    /// Tag UID as uppercase hex: bytes 0..3 of page 0 and all of page 1.
    ///
    /// Byte 3 of page 0 is the BCC0 check byte and is not part of the UID.
    pub fn uid(&self) -> Option<String> {
        if self.pages.len() < 2 {
            return None;
        }
        let mut uid = Vec::with_capacity(7);
        uid.extend_from_slice(&self.pages[0][..3]);
        uid.extend_from_slice(&self.pages[1]);
        Some(hex::encode_upper(uid))
    }

    /// Render every page as `[Page NN] bb:bb:bb:bb`.
    pub fn dump(&self) -> String {
        self.pages
            .iter()
            .enumerate()
            .map(|(page, data)| {
                let bytes: Vec<String> = data.iter().map(|b| format!("{b:02x}")).collect();
                format!("[Page {page:02x}] {}", bytes.join(":"))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for TagMemory {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_COUNT)
    }
}
