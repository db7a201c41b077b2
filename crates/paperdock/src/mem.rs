//! Process resident-memory reporting, `/proc` based.

use std::io;

/// Resident set size of this process in bytes.
#[cfg(target_os = "linux")]
pub fn resident_bytes() -> io::Result<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm")?;
    let resident_pages: u64 = statm
        .split_whitespace()
        .nth(1)
        .and_then(|field| field.parse().ok())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "unexpected /proc/self/statm format",
            )
        })?;

    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size <= 0 {
        return Err(io::Error::other("sysconf(_SC_PAGESIZE) failed"));
    }

    Ok(resident_pages * page_size as u64)
}

#[cfg(not(target_os = "linux"))]
pub fn resident_bytes() -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "resident memory reporting requires /proc",
    ))
}
