//! Page read/write command framing.
//!
//! Read page p:  FF B0 00 p 04           -> 4 data bytes + 90 00
//! Write page p: FF D6 00 p 04 d0 d1 d2 d3 -> 90 00

use bytes::{BufMut, Bytes, BytesMut};

use spooltag_codec::PAGE_SIZE;

const CLA: u8 = 0xFF;
const INS_READ_BINARY: u8 = 0xB0;
const INS_UPDATE_BINARY: u8 = 0xD6;
const P1: u8 = 0x00;

/// Status word reported on success.
pub const SW_SUCCESS: [u8; 2] = [0x90, 0x00];

/// Status word a tag or reader reports for a failed operation.
pub const SW_FAILURE: [u8; 2] = [0x63, 0x00];

/// Header length: CLA INS P1 P2 Lc/Le.
const HEADER_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApduCommand {
    ReadPage { page: u8 },
    WritePage { page: u8, data: [u8; PAGE_SIZE] },
}

impl ApduCommand {
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            ApduCommand::ReadPage { page } => {
                dst.reserve(HEADER_LEN);
                dst.put_u8(CLA);
                dst.put_u8(INS_READ_BINARY);
                dst.put_u8(P1);
                dst.put_u8(*page);
                dst.put_u8(PAGE_SIZE as u8);
            }
            ApduCommand::WritePage { page, data } => {
                dst.reserve(HEADER_LEN + PAGE_SIZE);
                dst.put_u8(CLA);
                dst.put_u8(INS_UPDATE_BINARY);
                dst.put_u8(P1);
                dst.put_u8(*page);
                dst.put_u8(PAGE_SIZE as u8);
                dst.extend_from_slice(data);
            }
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Parse a command frame. Anything other than the two page commands
    /// yields `None`.
    pub fn decode(frame: &[u8]) -> Option<Self> {
        match frame {
            [CLA, INS_READ_BINARY, P1, page, 0x04] => Some(ApduCommand::ReadPage { page: *page }),
            [CLA, INS_UPDATE_BINARY, P1, page, 0x04, d0, d1, d2, d3] => Some(ApduCommand::WritePage {
                page: *page,
                data: [*d0, *d1, *d2, *d3],
            }),
            _ => None,
        }
    }
}

/// Response body plus trailing status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    pub data: Vec<u8>,
    pub sw1: u8,
    pub sw2: u8,
}

impl ApduResponse {
    pub fn success(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
            sw1: SW_SUCCESS[0],
            sw2: SW_SUCCESS[1],
        }
    }

    pub fn status(sw: [u8; 2]) -> Self {
        Self {
            data: Vec::new(),
            sw1: sw[0],
            sw2: sw[1],
        }
    }

    /// Split a raw response into data and status word.
    pub fn from_raw(raw: &[u8]) -> Option<Self> {
        let split = raw.len().checked_sub(2)?;
        let (data, sw) = raw.split_at(split);
        Some(Self {
            data: data.to_vec(),
            sw1: sw[0],
            sw2: sw[1],
        })
    }

    pub fn to_raw(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.data.len() + 2);
        raw.extend_from_slice(&self.data);
        raw.push(self.sw1);
        raw.push(self.sw2);
        raw
    }

    pub fn is_success(&self) -> bool {
        [self.sw1, self.sw2] == SW_SUCCESS
    }
}
