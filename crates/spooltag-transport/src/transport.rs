//! Page-level card operations.
//!
//! No retries here: a single failed page aborts the whole read or write.

use spooltag_codec::{TagMemory, PAGE_SIZE};

use crate::apdu::{ApduCommand, ApduResponse};
use crate::backend::CardConnection;
use crate::{Result, TransportError};

/// Trailing pages holding lock and configuration bytes.
const PROTECTED_TAIL_PAGES: usize = 5;

/// Pages 0-3 (UID, static lock bytes, capability container) and the last
/// five pages are never written.
pub fn is_protected_page(page: usize, page_count: usize) -> bool {
    page <= 3 || page >= page_count.saturating_sub(PROTECTED_TAIL_PAGES)
}

fn page_address(page: usize) -> Result<u8> {
    u8::try_from(page).map_err(|_| TransportError::PageOutOfRange(page))
}

fn transmit(conn: &mut dyn CardConnection, page: usize, cmd: ApduCommand) -> Result<ApduResponse> {
    let frame = cmd.to_bytes();
    let raw = conn.transmit(&frame)?;
    tracing::trace!(tx = %hex::encode(&frame), rx = %hex::encode(&raw), "apdu");
    let response = ApduResponse::from_raw(&raw).ok_or(TransportError::ShortResponse {
        page,
        len: raw.len(),
    })?;
    if !response.is_success() {
        return Err(TransportError::Status {
            page,
            sw1: response.sw1,
            sw2: response.sw2,
        });
    }
    Ok(response)
}

pub fn read_page(conn: &mut dyn CardConnection, page: usize) -> Result<[u8; PAGE_SIZE]> {
    let cmd = ApduCommand::ReadPage {
        page: page_address(page)?,
    };
    let response = transmit(conn, page, cmd)?;
    // Some readers return 16 bytes (four pages) for a read; keep the first.
    let data: [u8; PAGE_SIZE] = response
        .data
        .get(..PAGE_SIZE)
        .and_then(|d| d.try_into().ok())
        .ok_or(TransportError::ShortResponse {
            page,
            len: response.data.len(),
        })?;
    Ok(data)
}

pub fn write_page(conn: &mut dyn CardConnection, page: usize, data: [u8; PAGE_SIZE]) -> Result<()> {
    let cmd = ApduCommand::WritePage {
        page: page_address(page)?,
        data,
    };
    transmit(conn, page, cmd)?;
    Ok(())
}

/// Read pages `0..page_count`. Returns nothing on the first failure.
pub fn read_all(conn: &mut dyn CardConnection, page_count: usize) -> Result<TagMemory> {
    let mut pages = Vec::with_capacity(page_count);
    for page in 0..page_count {
        match read_page(conn, page) {
            Ok(data) => pages.push(data),
            Err(e) => {
                tracing::warn!(page, error = %e, "page read failed, read aborted");
                return Err(e);
            }
        }
    }
    tracing::debug!(pages = page_count, "tag read");
    Ok(TagMemory::from_pages(pages))
}

/// Write the unprotected pages of `memory`, in order.
///
/// Returns the number of pages written. A failure aborts; pages already
/// written stay written.
pub fn write_all(conn: &mut dyn CardConnection, memory: &TagMemory, page_count: usize) -> Result<usize> {
    let mut written = 0;
    for (page, data) in memory.pages().iter().enumerate().take(page_count) {
        if is_protected_page(page, page_count) {
            continue;
        }
        if let Err(e) = write_page(conn, page, *data) {
            tracing::warn!(page, written, error = %e, "page write failed, write aborted");
            return Err(e);
        }
        written += 1;
    }
    tracing::debug!(pages = written, "tag written");
    Ok(written)
}
