//! Seam between the page protocol and a concrete reader stack.

use crate::Result;

/// An open session with a card on one reader.
///
/// Dropping the connection ends the session.
pub trait CardConnection: Send {
    /// Send one command frame; returns response data followed by SW1 SW2.
    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>>;
}

/// Enumerates readers and opens card sessions on them.
pub trait CardBackend: Send + Sync {
    /// Names of the currently attached readers, in enumeration order.
    fn list_readers(&self) -> Result<Vec<String>>;

    /// Connect to the card on `reader`. Fails with `NoCard` (or a backend
    /// specific error) when no card is in the field.
    fn connect(&self, reader: &str) -> Result<Box<dyn CardConnection>>;
}
