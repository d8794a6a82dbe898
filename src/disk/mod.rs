//-----------------------------------------------------------------------------
// Module disk
// Logical disk read access

mod sd_card;

pub use sd_card::SdCardReadDriver;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::link::Link;

//-----------------------------------------------------------------------------
// DiskReadDriver

/// Block aligned read access to the logical disk of a device
pub trait DiskReadDriver: Send + Sync {
    /// Minimum and maximum size of one aligned read
    /// Offset and length of an aligned read must be multiples of the minimum
    fn block_size_bounds(&self) -> (u64, u64);

    /// Read into.len() bytes at pos
    /// pos and into.len() must be aligned to the minimum block size and into.len() must not exceed the maximum
    /// Nothing is sent to the device if validation fails, into is only written on success
    fn read_logical_disk_aligned(&self, link: &Link, pos: u64, into: &mut [u8], timeout: Duration) -> Result<u64>;

    /// Read into.len() bytes at pos with arbitrary alignment
    /// Splits the request into aligned reads through a bounce buffer, all of them within one overall timeout
    fn read_logical_disk(&self, link: &Link, pos: u64, into: &mut [u8], timeout: Duration) -> Result<u64> {
        let (min, max) = self.block_size_bounds();
        if min == 0 || max < min {
            return Err(Error::Validation("invalid block size bounds"));
        }
        let max = max - max % min;
        let amount = into.len() as u64;
        pos.checked_add(amount).ok_or(Error::Validation("read exceeds disk address range"))?;

        // None reads without deadline
        let deadline = Instant::now().checked_add(timeout);
        let mut bounce = vec![0u8; max as usize];
        let mut done: u64 = 0;
        while done < amount {
            let cur = pos + done;
            let start = cur - cur % min;
            let skip = cur - start;
            let wanted = skip + (amount - done);
            let chunk = wanted.div_ceil(min).saturating_mul(min).min(max);

            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => timeout,
            };
            if remaining.is_zero() {
                return Err(Error::Timeout(timeout.as_millis()));
            }
            trace!("read_logical_disk: aligned read pos={} len={}", start, chunk);
            let read = self.read_logical_disk_aligned(link, start, &mut bounce[..chunk as usize], remaining)?;
            if read <= skip {
                return Err(Error::Decode("aligned read returned no usable data"));
            }
            let n = (read - skip).min(amount - done);
            into[done as usize..(done + n) as usize].copy_from_slice(&bounce[skip as usize..(skip + n) as usize]);
            done += n;
        }
        Ok(amount)
    }
}
