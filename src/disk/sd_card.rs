//-----------------------------------------------------------------------------
// Module sd_card
// SD card logical disk reads through the host PC read command

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use std::time::Duration;

use crate::bridge::{Progress, Transaction};
use crate::codec::CommandBuilder;
use crate::error::{Error, Result};
use crate::link::Link;
use crate::message::{Message, MessageFilter};
use crate::network::NetId;

use super::DiskReadDriver;

//-----------------------------------------------------------------------------
// SdCardReadDriver

/// Reads sectors of the device SD card
///
/// Request frame: [opcode][sector:4 LE][length:2 LE], written raw without packet header.
/// The device answers with DiskData messages on the DiskRead network until the requested length is reached.
#[derive(Debug, Clone, Copy)]
pub struct SdCardReadDriver {
    opcode: u8,
}

impl Default for SdCardReadDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SdCardReadDriver {
    pub const SECTOR_SIZE: u64 = 512;
    pub const MIN_BLOCK_SIZE: u64 = Self::SECTOR_SIZE;
    pub const MAX_BLOCK_SIZE: u64 = 16 * Self::SECTOR_SIZE;

    /// HostPcFromSdcc1 command
    pub const OPCODE_HOST_PC_FROM_SDCC1: u8 = 0x29;

    pub fn new() -> SdCardReadDriver {
        SdCardReadDriver {
            opcode: Self::OPCODE_HOST_PC_FROM_SDCC1,
        }
    }

    /// Driver for devices using another read command opcode
    pub fn with_opcode(opcode: u8) -> SdCardReadDriver {
        SdCardReadDriver { opcode }
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    // Check the request and build the command frame
    fn request(&self, pos: u64, amount: u64) -> Result<CommandBuilder> {
        let (min, max) = self.block_size_bounds();
        if amount > max {
            return Err(Error::Validation("read exceeds maximum block size"));
        }
        if amount % min != 0 {
            return Err(Error::Validation("read length is not a multiple of the block size"));
        }
        if pos % min != 0 {
            return Err(Error::Validation("read offset is not block aligned"));
        }
        let sector: u32 = (pos / Self::SECTOR_SIZE).try_into().map_err(|_| Error::Validation("sector number out of range"))?;
        let length: u16 = amount.try_into().map_err(|_| Error::Validation("read length out of range"))?;
        let mut cmd = CommandBuilder::new(self.opcode);
        cmd.add_u32(sector).add_u16(length);
        Ok(cmd)
    }
}

impl DiskReadDriver for SdCardReadDriver {
    fn block_size_bounds(&self) -> (u64, u64) {
        (Self::MIN_BLOCK_SIZE, Self::MAX_BLOCK_SIZE)
    }

    fn read_logical_disk_aligned(&self, link: &Link, pos: u64, into: &mut [u8], timeout: Duration) -> Result<u64> {
        let amount = into.len() as u64;
        let cmd = self.request(pos, amount)?;
        if amount == 0 {
            return Ok(0);
        }
        debug!("SdCardReadDriver: read pos={} len={}", pos, amount);

        let expected = into.len();
        let data = Transaction::execute(
            link.message_callbacks(),
            MessageFilter::network(NetId::DiskRead),
            Vec::with_capacity(expected),
            timeout,
            || link.raw_write(cmd.build()),
            move |acc: &mut Vec<u8>, message: &Message| match message {
                Message::DiskData(chunk) => {
                    if acc.len() + chunk.data.len() > expected {
                        return Progress::Failed(Error::Overflow("disk read response exceeds requested length"));
                    }
                    acc.extend_from_slice(&chunk.data);
                    if acc.len() == expected { Progress::Complete } else { Progress::Pending }
                }
                _ => Progress::Failed(Error::Decode("unexpected message on disk read network")),
            },
        )?;

        into.copy_from_slice(&data);
        Ok(amount)
    }
}

//-------------------------------------------------------------------------------------------------
// Test module
