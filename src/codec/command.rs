//-----------------------------------------------------------------------------
// Module command
// Build raw device command frames

use bytes::{BufMut, BytesMut};

//-----------------------------------------------------------------------------
// CommandBuilder

/// Raw command frame, an opcode followed by little endian parameters
/// Command frames are written to the transport as they are, without packet header
pub struct CommandBuilder {
    data: BytesMut,
}

impl CommandBuilder {
    pub fn new(opcode: u8) -> CommandBuilder {
        let mut cmd = CommandBuilder {
            data: BytesMut::with_capacity(8),
        };
        cmd.data.put_u8(opcode);
        cmd
    }

    pub fn add_u16(&mut self, value: u16) -> &mut Self {
        self.data.put_u16_le(value);
        self
    }

    pub fn add_u32(&mut self, value: u32) -> &mut Self {
        self.data.put_u32_le(value);
        self
    }

    pub fn build(&self) -> &[u8] {
        self.data.as_ref()
    }
}

//-------------------------------------------------------------------------------------------------
// Test module
