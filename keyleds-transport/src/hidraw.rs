//! Linux hidraw backend
//!
//! Reports go through plain `read`/`write` on the device node. Waiting for a
//! response uses `poll` so that a silent device surfaces as
//! [`TransportError::Timedout`] instead of blocking the render thread.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::TransportError;
use crate::Transport;

// hidraw ioctl numbers, from the Linux _IOC macro:
//   _IOC(dir, type, nr, size) = (dir << 30) | (size << 16) | (type << 8) | nr
//   type = 'H', _IOC_READ = 2
const IOC_READ: u32 = 2;
const HID_MAX_DESCRIPTOR_SIZE: usize = 4096;

const fn ioc(dir: u32, ty: u32, nr: u32, size: u32) -> libc::c_ulong {
    ((dir << 30) | (size << 16) | (ty << 8) | nr) as libc::c_ulong
}

const HIDIOCGRDESCSIZE: libc::c_ulong = ioc(IOC_READ, b'H' as u32, 0x01, 4);
const HIDIOCGRDESC: libc::c_ulong = ioc(
    IOC_READ,
    b'H' as u32,
    0x02,
    (4 + HID_MAX_DESCRIPTOR_SIZE) as u32,
);
const HIDIOCGRAWINFO: libc::c_ulong = ioc(IOC_READ, b'H' as u32, 0x03, 8);

#[repr(C)]
struct RawDescriptor {
    size: u32,
    value: [u8; HID_MAX_DESCRIPTOR_SIZE],
}

#[repr(C)]
#[derive(Default)]
struct RawDevInfo {
    bustype: u32,
    vendor: i16,
    product: i16,
}

/// Bus and USB ids of a hidraw node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInfo {
    pub bustype: u32,
    pub vid: u16,
    pub pid: u16,
}

/// A hidraw device node opened read/write
pub struct HidrawTransport {
    file: File,
    path: String,
}

impl HidrawTransport {
    pub fn open(path: &str) -> Result<Self, TransportError> {
        debug!("opening device {path}");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_CLOEXEC)
            .open(path)?;
        info!("opened {path}");
        Ok(Self {
            file,
            path: path.to_string(),
        })
    }

    /// Bus type and USB ids as reported by the kernel
    pub fn raw_info(&self) -> Result<RawInfo, TransportError> {
        let mut info = RawDevInfo::default();
        // SAFETY: HIDIOCGRAWINFO writes exactly one hidraw_devinfo into `info`.
        let ret = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                HIDIOCGRAWINFO,
                &mut info as *mut RawDevInfo,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(RawInfo {
            bustype: info.bustype,
            vid: info.vendor as u16,
            pid: info.product as u16,
        })
    }

    fn set_nonblocking(&self, enabled: bool) -> io::Result<()> {
        let fd = self.file.as_raw_fd();
        // SAFETY: plain fcntl flag manipulation on a descriptor we own.
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFL);
            if flags < 0 {
                return Err(io::Error::last_os_error());
            }
            let flags = if enabled {
                flags | libc::O_NONBLOCK
            } else {
                flags & !libc::O_NONBLOCK
            };
            if libc::fcntl(fd, libc::F_SETFL, flags) < 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    /// Wait until the node is readable or the deadline passes.
    fn wait_readable(&self, deadline: Instant) -> Result<(), TransportError> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let timeout_ms = poll_timeout(remaining);
            let mut pfd = libc::pollfd {
                fd: self.file.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            };
            // SAFETY: one valid pollfd, count matches.
            let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
            if ret < 0 {
                return Err(io::Error::last_os_error().into());
            }
            if ret > 0 {
                return Ok(());
            }
            if Instant::now() >= deadline {
                debug!("device timeout while reading {}", self.path);
                return Err(TransportError::Timedout);
            }
        }
    }
}

/// Milliseconds for `poll`, rounded up so a sub-millisecond rest still sleeps
fn poll_timeout(remaining: Duration) -> i32 {
    remaining.as_micros().div_ceil(1000).min(i32::MAX as u128) as i32
}

impl Transport for HidrawTransport {
    fn path(&self) -> &str {
        &self.path
    }

    fn report_descriptor(&self) -> Result<Vec<u8>, TransportError> {
        let fd = self.file.as_raw_fd();
        let mut size: libc::c_int = 0;
        // SAFETY: HIDIOCGRDESCSIZE writes one int.
        if unsafe { libc::ioctl(fd, HIDIOCGRDESCSIZE, &mut size as *mut libc::c_int) } < 0 {
            return Err(io::Error::last_os_error().into());
        }

        let mut desc = Box::new(RawDescriptor {
            size: size as u32,
            value: [0; HID_MAX_DESCRIPTOR_SIZE],
        });
        // SAFETY: the kernel fills at most HID_MAX_DESCRIPTOR_SIZE bytes of `value`.
        if unsafe { libc::ioctl(fd, HIDIOCGRDESC, &mut *desc as *mut RawDescriptor) } < 0 {
            return Err(io::Error::last_os_error().into());
        }

        let len = (desc.size as usize).min(HID_MAX_DESCRIPTOR_SIZE);
        debug!("report descriptor is {len} bytes");
        Ok(desc.value[..len].to_vec())
    }

    fn write_report(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        Ok(self.file.write(data)?)
    }

    fn read_report(&mut self, buf: &mut [u8], deadline: Instant) -> Result<usize, TransportError> {
        self.wait_readable(deadline)?;
        Ok(self.file.read(buf)?)
    }

    fn drain(&mut self) -> Result<(), TransportError> {
        self.set_nonblocking(true)?;
        let mut buf = [0u8; 64];
        let result = loop {
            match self.file.read(&mut buf) {
                Ok(0) => break Ok(()),
                Ok(n) => debug!("discarding stale {n}-byte report"),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        self.set_nonblocking(false)?;
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ioctl_numbers() {
        // Values from <linux/hidraw.h> on x86_64
        assert_eq!(HIDIOCGRDESCSIZE, 0x8004_4801);
        assert_eq!(HIDIOCGRDESC, 0x9004_4802);
        assert_eq!(HIDIOCGRAWINFO, 0x8008_4803);
    }

    #[test]
    fn test_poll_timeout_rounds_up() {
        assert_eq!(poll_timeout(Duration::ZERO), 0);
        assert_eq!(poll_timeout(Duration::from_micros(1)), 1);
        assert_eq!(poll_timeout(Duration::from_micros(999)), 1);
        assert_eq!(poll_timeout(Duration::from_millis(5)), 5);
        assert_eq!(poll_timeout(Duration::from_micros(5_001)), 6);
        assert_eq!(poll_timeout(Duration::from_secs(u64::MAX)), i32::MAX);
    }

    #[test]
    fn test_open_missing_node() {
        let err = HidrawTransport::open("/dev/hidraw-does-not-exist")
            .err()
            .unwrap();
        assert_eq!(err.errno(), Some(libc::ENOENT));
        assert!(!err.is_recoverable());
    }
}
