//-----------------------------------------------------------------------------
// Shared integration test helpers

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use vnetlink::codec::Packetizer;
use vnetlink::{Link, LinkConfig, NetId, Transport};

pub fn test_setup() {
    let _ = env_logger::builder().is_test(true).filter_level(log::LevelFilter::Info).try_init();
}

//-----------------------------------------------------------------------------
// MockTransport

/// Records all outbound frames
#[derive(Default)]
pub struct MockTransport {
    frames: Mutex<Vec<Vec<u8>>>,
    taken: Mutex<usize>,
    fail: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<MockTransport> {
        Arc::new(MockTransport::default())
    }

    /// All frames written so far
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().clone()
    }

    /// Frames written since the last call
    pub fn take_new_frames(&self) -> Vec<Vec<u8>> {
        let frames = self.frames.lock();
        let mut taken = self.taken.lock();
        let new = frames[*taken..].to_vec();
        *taken = frames.len();
        new
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl Transport for MockTransport {
    fn write(&self, bytes: &[u8]) -> std::io::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "mock transport failure"));
        }
        self.frames.lock().push(bytes.to_vec());
        Ok(())
    }
}

pub fn new_link(config: LinkConfig) -> (Arc<Link>, Arc<MockTransport>) {
    let transport = MockTransport::new();
    let link = Arc::new(Link::new(transport.clone(), config));
    (link, transport)
}

//-----------------------------------------------------------------------------
// Fake SD card

/// Content of the fake disk at byte offset pos
pub fn disk_byte(pos: u64) -> u8 {
    (pos % 251) as u8
}

/// Frame one DiskRead response chunk
pub fn disk_chunk(data: &[u8]) -> Vec<u8> {
    Packetizer::frame(NetId::DiskRead, data).unwrap()
}

/// Answers disk read requests written to transport with disk_byte content, in chunks of chunk_size
pub struct DiskResponder {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl DiskResponder {
    pub fn spawn(link: Arc<Link>, transport: Arc<MockTransport>, chunk_size: usize) -> DiskResponder {
        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        let thread = std::thread::spawn(move || {
            while r.load(Ordering::SeqCst) {
                for frame in transport.take_new_frames() {
                    if frame.len() != 7 {
                        continue;
                    }
                    let sector = u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]) as u64;
                    let length = u16::from_le_bytes([frame[5], frame[6]]) as u64;
                    let base = sector * 512;
                    let data: Vec<u8> = (base..base + length).map(disk_byte).collect();
                    for chunk in data.chunks(chunk_size) {
                        link.on_receive(&disk_chunk(chunk));
                    }
                }
                std::thread::sleep(Duration::from_millis(1));
            }
        });
        DiskResponder { running, thread: Some(thread) }
    }
}

impl Drop for DiskResponder {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
