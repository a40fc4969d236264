//! Chunked map-and-copy of an in-process table into its backing file.

use std::fs::File;

use memmap2::MmapOptions;

use crate::error::Result;

/// Upper bound on a single mapping while scattering a table (64 MB)
pub const MAX_MAP_CHUNK: usize = 64 * 1024 * 1024;

/// Copy `slot_count` slots of `slot_width` bytes into `file` at `offset`
///
/// The file is extended when it is too short. Each chunk covers whole slots
/// and is mapped, filled by `encode(first_slot, chunk)`, flushed and
/// unmapped before the next one.
pub(crate) fn scatter<F>(
    file: &File,
    offset: u64,
    slot_count: usize,
    slot_width: usize,
    mut encode: F,
) -> Result<()>
where
    F: FnMut(usize, &mut [u8]),
{
    let total = (slot_count * slot_width) as u64;
    if total == 0 {
        return Ok(());
    }

    let end = offset + total;
    if file.metadata()?.len() < end {
        file.set_len(end)?;
    }

    let slots_per_chunk = (MAX_MAP_CHUNK / slot_width).max(1);
    let mut first = 0usize;
    while first < slot_count {
        let n = slots_per_chunk.min(slot_count - first);
        let chunk_offset = offset + (first * slot_width) as u64;

        // SAFETY: the mapping is private to this call and dropped before
        // returning; the file is held open by the caller and the store's
        // exclusive lock keeps other writers away.
        let mut map = unsafe {
            MmapOptions::new()
                .offset(chunk_offset)
                .len(n * slot_width)
                .map_mut(file)?
        };
        encode(first, &mut map[..]);
        map.flush()?;

        first += n;
    }

    tracing::trace!("Scattered {} slots ({} bytes) at offset {}", slot_count, total, offset);
    Ok(())
}
