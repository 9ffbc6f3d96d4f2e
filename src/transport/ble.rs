//! Bluetooth transport binding - SoftDevice S140, peripheral role.
//!
//! The device presents itself as a HID consumer-control remote. The
//! coordinator talks to [`BleTransport`], which forwards requests over
//! a channel to [`ble_task`]; that task owns the radio, advertises
//! (directed at the stored peer for reconnect, undirected otherwise),
//! serves the GATT table while a peer is connected, and reports
//! connect/auth/disconnect outcomes back through the dispatcher.

use crate::dispatch::{Dispatcher, LifecycleEvent, WorkItem};
use crate::error::TransportError;
use crate::identity::PeerAddress;
use crate::media::{ControlReport, CONTROL_REPORT_SIZE};
use crate::transport::{ControlAction, MediaTransport};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Receiver, Sender, TrySendError};
use embassy_time::{Duration, Timer};
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{
    gatt_server, peripheral, Address, AddressType, Connection, EncryptionInfo, IdentityKey,
    MasterId, SecurityMode,
};
use nrf_softdevice::Softdevice;
use static_cell::StaticCell;

/// Depth of the request channel into the radio task.
pub const REQUEST_QUEUE_DEPTH: usize = 4;

/// Requests forwarded from the coordinator to the radio task.
#[derive(Clone, Copy)]
pub enum TransportRequest {
    Register,
    Connect(PeerAddress),
    Discoverable,
    Control(ControlAction),
}

/// Channel-fed [`MediaTransport`] front handed to the coordinator.
pub struct BleTransport {
    requests: Sender<'static, CriticalSectionRawMutex, TransportRequest, REQUEST_QUEUE_DEPTH>,
}

impl BleTransport {
    pub fn new(
        requests: Sender<'static, CriticalSectionRawMutex, TransportRequest, REQUEST_QUEUE_DEPTH>,
    ) -> Self {
        Self { requests }
    }
}

impl MediaTransport for BleTransport {
    async fn register_capabilities(&mut self) -> Result<(), TransportError> {
        self.requests.send(TransportRequest::Register).await;
        Ok(())
    }

    async fn connect(&mut self, addr: PeerAddress) -> Result<(), TransportError> {
        self.requests.send(TransportRequest::Connect(addr)).await;
        Ok(())
    }

    async fn set_discoverable(&mut self) -> Result<(), TransportError> {
        self.requests.send(TransportRequest::Discoverable).await;
        Ok(())
    }

    async fn send_control(&mut self, action: ControlAction) -> Result<(), TransportError> {
        // Controls are best-effort; don't stall the dispatcher when the
        // radio task is behind.
        self.requests
            .try_send(TransportRequest::Control(action))
            .map_err(|e| match e {
                TrySendError::Full(_) => TransportError::Busy,
            })
    }
}

// GATT table

/// HID service (0x1812) exposing a single consumer-control report.
#[nrf_softdevice::gatt_service(uuid = "1812")]
pub struct MediaHidService {
    /// HID Report (input): one 16-bit consumer usage, little-endian.
    #[characteristic(uuid = "2a4d", read, notify)]
    report: [u8; 2],

    /// HID Report Map: see `media::CONTROL_REPORT_DESCRIPTOR`.
    #[characteristic(uuid = "2a4b", read)]
    report_map: [u8; 23],

    /// HID Information: bcdHID, country code, flags.
    #[characteristic(uuid = "2a4a", read)]
    hid_info: [u8; 4],
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub hid: MediaHidService,
}

// Advertising payloads

#[rustfmt::skip]
const ADV_DATA: &[u8] = &[
    0x02, 0x01, 0x06,                                     // flags: LE general discoverable
    0x03, 0x03, 0x12, 0x18,                               // 16-bit service UUIDs: HID (0x1812)
    0x03, 0x19, 0x80, 0x01,                               // appearance: generic remote control
    0x08, 0x09, b'b', b't', b'w', b'h', b'e', b'e', b'l', // complete local name
];

const SCAN_DATA: &[u8] = &[];

// Bonding

#[derive(Clone, Copy)]
struct PeerBond {
    master_id: MasterId,
    key: EncryptionInfo,
}

/// Single-peer security handler: the newest bond replaces any prior
/// one, mirroring the one-peer identity store.
struct Bonder {
    bond: core::cell::Cell<Option<PeerBond>>,
}

impl SecurityHandler for Bonder {
    fn io_capabilities(&self) -> IoCapabilities {
        IoCapabilities::None
    }

    fn can_bond(&self, _conn: &Connection) -> bool {
        true
    }

    fn on_bonded(
        &self,
        _conn: &Connection,
        master_id: MasterId,
        key: EncryptionInfo,
        _peer_id: IdentityKey,
    ) {
        self.bond.set(Some(PeerBond { master_id, key }));
    }

    fn get_key(&self, _conn: &Connection, master_id: MasterId) -> Option<EncryptionInfo> {
        self.bond
            .get()
            .filter(|b| b.master_id == master_id)
            .map(|b| b.key)
    }

    fn on_security_update(&self, _conn: &Connection, mode: SecurityMode) {
        info!("BLE security mode updated: {}", mode);
    }
}

fn bonder() -> &'static Bonder {
    static BONDER: StaticCell<Bonder> = StaticCell::new();
    BONDER.init(Bonder {
        bond: core::cell::Cell::new(None),
    })
}

// Radio task

/// Own the radio: advertise, serve connections, report outcomes.
pub async fn ble_task(
    sd: &'static Softdevice,
    server: &'static Server,
    requests: Receiver<'static, CriticalSectionRawMutex, TransportRequest, REQUEST_QUEUE_DEPTH>,
    queue: &'static Dispatcher,
) -> ! {
    let bonder = bonder();

    loop {
        match requests.receive().await {
            TransportRequest::Register => {
                // The GATT table is built before the executor starts;
                // this is just the runtime acknowledgement.
                info!("transport capabilities registered");
            }

            TransportRequest::Connect(addr) => {
                info!("directed advertising to stored peer");
                let peer = Address::new(AddressType::Public, addr.bytes());
                let adv = peripheral::ConnectableAdvertisement::NonscannableDirected { peer };
                // High-duty directed advertising times out on its own
                // (~1.3 s) if the peer isn't around.
                match peripheral::advertise_pairable(sd, adv, &peripheral::Config::default(), bonder)
                    .await
                {
                    Ok(conn) => {
                        queue
                            .enqueue(WorkItem::Lifecycle(LifecycleEvent::ConnectSucceeded))
                            .await;
                        serve(server, &conn, &requests, queue).await;
                    }
                    Err(_) => {
                        queue
                            .enqueue(WorkItem::Lifecycle(LifecycleEvent::ConnectFailed))
                            .await;
                    }
                }
            }

            TransportRequest::Discoverable => {
                info!("advertising, waiting to be paired");
                let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
                    adv_data: ADV_DATA,
                    scan_data: SCAN_DATA,
                };
                match peripheral::advertise_pairable(sd, adv, &peripheral::Config::default(), bonder)
                    .await
                {
                    Ok(conn) => {
                        if wait_for_secure_link(&conn).await {
                            let addr = PeerAddress::new(conn.peer_address().bytes());
                            queue
                                .enqueue(WorkItem::Lifecycle(LifecycleEvent::AuthSucceeded(addr)))
                                .await;
                            serve(server, &conn, &requests, queue).await;
                        } else {
                            warn!("peer never secured the link");
                            let _ = conn.disconnect();
                            queue
                                .enqueue(WorkItem::Lifecycle(LifecycleEvent::AuthFailed))
                                .await;
                        }
                    }
                    Err(e) => {
                        warn!("advertising error: {:?}", e);
                        Timer::after(Duration::from_secs(1)).await;
                        // Reported as an auth failure so the coordinator
                        // re-arms discoverable mode.
                        queue
                            .enqueue(WorkItem::Lifecycle(LifecycleEvent::AuthFailed))
                            .await;
                    }
                }
            }

            TransportRequest::Control(_) => {
                debug!("no link, dropping control message");
            }
        }
    }
}

/// Serve one connection until the peer drops it, notifying control
/// reports as they arrive from the coordinator.
async fn serve(
    server: &'static Server,
    conn: &Connection,
    requests: &Receiver<'static, CriticalSectionRawMutex, TransportRequest, REQUEST_QUEUE_DEPTH>,
    queue: &'static Dispatcher,
) {
    let gatt = gatt_server::run(conn, server, |_| {});

    let control = async {
        loop {
            match requests.receive().await {
                TransportRequest::Control(action) => {
                    let mut buf = [0u8; CONTROL_REPORT_SIZE];
                    ControlReport::from(action).serialize(&mut buf);
                    if let Err(e) = server.hid.report_notify(conn, &buf) {
                        warn!("report notify failed: {:?}", e);
                        continue;
                    }
                    // Key-up half of the press.
                    let mut release = [0u8; CONTROL_REPORT_SIZE];
                    ControlReport::release().serialize(&mut release);
                    if let Err(e) = server.hid.report_notify(conn, &release) {
                        warn!("release notify failed: {:?}", e);
                    }
                }
                _ => debug!("ignoring transport request while connected"),
            }
        }
    };

    match select(gatt, control).await {
        Either::First(_) => {
            info!("peer disconnected");
            queue
                .enqueue(WorkItem::Lifecycle(LifecycleEvent::PeerDisconnected))
                .await;
        }
        Either::Second(_) => {}
    }
}

/// Give the peer a few seconds to encrypt/pair after connecting.
async fn wait_for_secure_link(conn: &Connection) -> bool {
    for _ in 0..25 {
        match conn.security_mode() {
            SecurityMode::NoAccess | SecurityMode::Open => {
                Timer::after(Duration::from_millis(200)).await
            }
            _ => return true,
        }
    }
    false
}
