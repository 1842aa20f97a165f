use alta_storage::{StoreError, Volume};
use thiserror::Error;
use tracing::info;

use crate::memory::{AddressSpace, ADDRESS_SPACE_SIZE};

/// Why a program image could not be placed into guest memory.
///
/// Any of these aborts the run before execution starts.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("program not found: {0}")]
    NotFound(String),

    #[error("program {path} ({size} bytes) does not fit at {base:#06x}")]
    TooLarge { path: String, size: u64, base: u16 },

    #[error("error reading program {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: StoreError,
    },
}

/// Copies the file at `path` verbatim into guest memory starting at `base`.
///
/// The size check runs before any byte lands, and the image is staged off to
/// the side first, so a failed load leaves the address space untouched. The
/// rejection bound keeps the image clear of the ROM sentinel byte at the top
/// of the space.
pub fn load_program(
    volume: &dyn Volume,
    path: &str,
    memory: &mut AddressSpace,
    base: u16,
) -> Result<(), LoadError> {
    info!("loading {path}");

    let mut file = volume.open(path).map_err(|err| match err {
        StoreError::NotFound(_) => LoadError::NotFound(path.to_string()),
        other => LoadError::Read {
            path: path.to_string(),
            source: other,
        },
    })?;

    let size = file.size();
    if u64::from(base) + size >= ADDRESS_SPACE_SIZE as u64 {
        return Err(LoadError::TooLarge {
            path: path.to_string(),
            size,
            base,
        });
    }

    let mut image = vec![0u8; size as usize];
    let mut filled = 0;
    while filled < image.len() {
        let n = file
            .read(&mut image[filled..])
            .map_err(|source| LoadError::Read {
                path: path.to_string(),
                source,
            })?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    image.truncate(filled);

    memory.copy_from(base, &image);
    info!("loaded {filled} bytes at {base:#06x}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alta_storage::MemVolume;

    #[test]
    fn loads_bytes_at_the_requested_base() {
        let volume = MemVolume::new();
        volume.insert("/prog.bin", vec![1u8, 2, 3]);

        let mut mem = AddressSpace::new();
        load_program(&volume, "/prog.bin", &mut mem, 0x0100).unwrap();

        assert_eq!(mem.read(0x0100), 1);
        assert_eq!(mem.read(0x0101), 2);
        assert_eq!(mem.read(0x0102), 3);
        assert_eq!(mem.read(0x00FF), 0);
        assert_eq!(mem.read(0x0103), 0);
    }

    #[test]
    fn missing_file_reports_not_found() {
        let volume = MemVolume::new();
        let mut mem = AddressSpace::new();
        assert!(matches!(
            load_program(&volume, "/nope.bin", &mut mem, 0),
            Err(LoadError::NotFound(_))
        ));
    }

    #[test]
    fn oversized_image_fails_without_mutating_memory() {
        let volume = MemVolume::new();
        volume.insert("/big.bin", vec![0xEEu8; 0x200]);

        let mut mem = AddressSpace::new();
        let result = load_program(&volume, "/big.bin", &mut mem, 0xFF00);
        assert!(matches!(result, Err(LoadError::TooLarge { .. })));

        let untouched = AddressSpace::new();
        assert_eq!(mem.as_slice(), untouched.as_slice());
    }

    #[test]
    fn image_may_fill_up_to_the_rom_sentinel_but_not_over_it() {
        let volume = MemVolume::new();

        // Ends at 0xFFFE: allowed.
        volume.insert("/fits.bin", vec![0x55u8; 0xFF]);
        let mut mem = AddressSpace::new();
        load_program(&volume, "/fits.bin", &mut mem, 0xFF00).unwrap();
        assert_eq!(mem.read(0xFFFE), 0x55);
        assert_eq!(mem.read(0xFFFF), 0xFF);

        // One byte more would cover the sentinel: rejected.
        volume.insert("/toobig.bin", vec![0x55u8; 0x100]);
        let mut mem = AddressSpace::new();
        assert!(matches!(
            load_program(&volume, "/toobig.bin", &mut mem, 0xFF00),
            Err(LoadError::TooLarge { .. })
        ));
    }
}
