use embedded_sdmmc::{Error, Mode, SdCard, SdCardError, TimeSource, VolumeIdx, VolumeManager};

use super::weather_log::LogStore;

/// FAT storage on the first volume of an SD card.
///
/// These SD card operations are blocking. Every call opens the volume and the
/// root directory and closes them again, so a card pulled between serve
/// cycles only costs the writes made while it was out.
pub struct SdCardStorage<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    volume_mgr: VolumeManager<SdCard<S, D>, T, 4, 4, 1>,
}

impl<S, D, T> SdCardStorage<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    /// Create a new SD card storage manager
    pub fn new(sd_card: SdCard<S, D>, ts: T) -> Self {
        let volume_mgr = VolumeManager::new(sd_card, ts);

        Self { volume_mgr }
    }

    fn write_file(
        &self,
        file_name: &str,
        mode: Mode,
        data: &[u8],
    ) -> Result<(), Error<SdCardError>> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;
        let file = root_dir.open_file_in_dir(file_name, mode)?;

        file.write(data)?;

        // Resources are automatically closed when dropped (RAII)
        // Explicitly close them to handle errors
        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(())
    }

    /// Reads up to `buffer.len()` bytes from the start of `file_name`.
    pub fn read_file(
        &self,
        file_name: &str,
        buffer: &mut [u8],
    ) -> Result<usize, Error<SdCardError>> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;
        let file = root_dir.open_file_in_dir(file_name, Mode::ReadOnly)?;

        let mut filled = 0;
        while filled < buffer.len() {
            let bytes_read = file.read(&mut buffer[filled..])?;
            if bytes_read == 0 {
                break; // EOF
            }
            filled += bytes_read;
        }

        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(filled)
    }
}

impl<S, D, T> LogStore for SdCardStorage<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    type Error = Error<SdCardError>;

    fn create_new(&mut self, name: &str, contents: &[u8]) -> Result<bool, Self::Error> {
        match self.write_file(name, Mode::ReadWriteCreate, contents) {
            Ok(()) => Ok(true),
            Err(Error::FileAlreadyExists) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn append(&mut self, name: &str, contents: &[u8]) -> Result<(), Self::Error> {
        self.write_file(name, Mode::ReadWriteCreateOrAppend, contents)
    }
}
