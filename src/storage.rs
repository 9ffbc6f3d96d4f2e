//! Persistent peer identity in internal flash.
//!
//! Uses the nRF52840's internal flash via the `sequential-storage` map
//! so the address of the last authenticated peer survives power
//! cycles. One key, one 6-byte value; `sequential-storage` handles
//! wear levelling and GC across the reserved pages.

use crate::config::{STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
use crate::error::StoreError;
use crate::identity::{IdentityStore, PeerAddress};
use defmt::Debug2Format;
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{fetch_item, store_item};

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

/// Start address of our storage region.
const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;

/// End address (exclusive) of our storage region.
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

/// Map key under which the peer address blob lives.
const KEY_PEER_ADDRESS: u8 = 0x01;

/// Scratch buffer size for `sequential-storage` (word-aligned, covers
/// item header + 6-byte value with room to spare).
const SCRATCH_SIZE: usize = 32;

/// [`IdentityStore`] backed by a NOR flash region.
///
/// On target the flash handle is `nrf_softdevice::Flash`, taken once
/// at boot and owned by the dispatcher task through the coordinator.
pub struct FlashIdentityStore<F> {
    flash: F,
}

impl<F: NorFlash> FlashIdentityStore<F> {
    pub fn new(flash: F) -> Self {
        Self { flash }
    }
}

impl<F: NorFlash> IdentityStore for FlashIdentityStore<F> {
    async fn load(&mut self) -> Option<PeerAddress> {
        let mut buf = [0u8; SCRATCH_SIZE];
        match fetch_item::<u8, &[u8], _>(
            &mut self.flash,
            STORAGE_START..STORAGE_END,
            &mut NoCache::new(),
            &mut buf,
            &KEY_PEER_ADDRESS,
        )
        .await
        {
            // A wrong-length blob decodes to None: absence, not an error.
            Ok(Some(data)) => {
                let addr = PeerAddress::from_slice(data);
                if addr.is_some() {
                    info!("loaded stored peer address");
                } else {
                    warn!("stored peer blob has bad length {}, ignoring", data.len());
                }
                addr
            }
            Ok(None) => {
                info!("no peer address in flash");
                None
            }
            Err(e) => {
                error!("flash read error: {:?}", Debug2Format(&e));
                None
            }
        }
    }

    async fn save(&mut self, addr: PeerAddress) -> Result<(), StoreError> {
        let mut buf = [0u8; SCRATCH_SIZE];
        let bytes = addr.bytes();
        match store_item::<u8, &[u8], _>(
            &mut self.flash,
            STORAGE_START..STORAGE_END,
            &mut NoCache::new(),
            &mut buf,
            &KEY_PEER_ADDRESS,
            &&bytes[..],
        )
        .await
        {
            Ok(()) => {
                info!("peer address saved");
                Ok(())
            }
            Err(e) => {
                error!("flash write error: {:?}", Debug2Format(&e));
                Err(StoreError::WriteFailed)
            }
        }
    }
}
