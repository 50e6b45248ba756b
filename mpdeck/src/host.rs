//! Host capacity discovery
//!
//! Resource forms validate against what the host can actually give a VM:
//! at most every online CPU, and at most 75% of physical memory.

#![allow(unsafe_code)] // sysconf() requires unsafe

/// Share of host memory a single VM may be given
const MEMORY_CEILING_PERCENT: u64 = 75;

/// Smallest memory size the backend accepts, in MiB
pub const MIN_MEMORY_MB: u64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapacity {
    pub cpus: u32,
    pub memory_mb: u64,
}

impl HostCapacity {
    /// Query the running host.
    #[must_use]
    pub fn detect() -> Self {
        let cpus = online_cpus().unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map_or(1, |n| u32::try_from(n.get()).unwrap_or(u32::MAX))
        });
        let memory_mb = physical_memory_mb().unwrap_or(0);
        log::info!("Host capacity: {cpus} CPUs, {memory_mb} MiB memory");
        Self { cpus, memory_mb }
    }

    /// Largest memory size a VM may be given, in MiB.
    #[must_use]
    pub fn max_memory_mb(&self) -> u64 {
        self.memory_mb * MEMORY_CEILING_PERCENT / 100
    }
}

fn online_cpus() -> Option<u32> {
    // SAFETY: sysconf has no preconditions; -1 signals an unsupported name
    let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    u32::try_from(n).ok().filter(|&n| n > 0)
}

fn physical_memory_mb() -> Option<u64> {
    // SAFETY: as above
    let pages = unsafe { libc::sysconf(libc::_SC_PHYS_PAGES) };
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    let pages = u64::try_from(pages).ok()?;
    let page_size = u64::try_from(page_size).ok()?;
    Some(pages.checked_mul(page_size)? >> 20)
}
