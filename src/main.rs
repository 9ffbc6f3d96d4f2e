//! Embedded entry point - nRF52840 + SoftDevice S140.
//!
//! Task layout (one execution context per input source, one consumer):
//!
//! - `dash_button_task`  - GPIO edge wait → debounce → enqueue
//! - `can_rx_task`       - MCP2515 poll → debounce → enqueue
//! - `dispatcher_task`   - sole consumer; runs the coordinator
//! - `radio_task`        - owns the SoftDevice radio (advertising,
//!                         GATT serving, control notifications)
//! - `softdevice_task`   - SoftDevice event pump
//!
//! Only the dispatcher task ever touches the connection phase or the
//! identity store.

#![no_std]
#![no_main]

use defmt::unwrap;
use defmt_rtt as _;
use panic_probe as _;

use btwheel::config::BT_DEVICE_NAME;
use btwheel::coordinator::Coordinator;
use btwheel::dispatch::{Command, Dispatcher, LifecycleEvent, WorkItem};
use btwheel::input::mcp2515::Mcp2515;
use btwheel::input::{button, can};
use btwheel::media::CONTROL_REPORT_DESCRIPTOR;
use btwheel::storage::FlashIdentityStore;
use btwheel::transport::ble::{self, BleTransport, Server, TransportRequest, REQUEST_QUEUE_DEPTH};
use embassy_executor::Spawner;
use embassy_nrf::gpio::{AnyPin, Level, Output, OutputDrive, Pin};
use embassy_nrf::interrupt::Priority;
use embassy_nrf::{bind_interrupts, peripherals, spim};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};
use nrf_softdevice::{raw, Flash, Softdevice};
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    SPIM3 => spim::InterruptHandler<peripherals::SPI3>;
});

/// The single ordered work queue every producer feeds.
static WORK_QUEUE: Dispatcher = Dispatcher::new();

/// Coordinator → radio task request channel.
static TRANSPORT_REQUESTS: Channel<CriticalSectionRawMutex, TransportRequest, REQUEST_QUEUE_DEPTH> =
    Channel::new();

static SERVER: StaticCell<Server> = StaticCell::new();

type CanBus = Mcp2515<spim::Spim<'static, peripherals::SPI3>, Output<'static>>;

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn radio_task(sd: &'static Softdevice, server: &'static Server) -> ! {
    ble::ble_task(sd, server, TRANSPORT_REQUESTS.receiver(), &WORK_QUEUE).await
}

#[embassy_executor::task]
async fn dispatcher_task(sd: &'static Softdevice) -> ! {
    let store = FlashIdentityStore::new(Flash::take(sd));
    let transport = BleTransport::new(TRANSPORT_REQUESTS.sender());
    let mut coordinator = Coordinator::new(store, transport);

    // Kick off the startup sequence; everything after this is driven
    // by dispatched events.
    WORK_QUEUE
        .enqueue(WorkItem::Lifecycle(LifecycleEvent::StackReady))
        .await;

    coordinator.run(&WORK_QUEUE).await
}

#[embassy_executor::task]
async fn dash_button_task(pin: AnyPin) -> ! {
    button::button_task(pin, Command::Next, &WORK_QUEUE).await
}

#[embassy_executor::task]
async fn can_rx_task(bus: CanBus) -> ! {
    can::can_task(bus, &WORK_QUEUE).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // SoftDevice reserves the highest interrupt priorities.
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);

    let sd_config = nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_XTAL as u8,
            rc_ctiv: 0,
            rc_temp_ctiv: 0,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_20_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 256 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: BT_DEVICE_NAME.as_ptr() as _,
            current_len: BT_DEVICE_NAME.len() as u16,
            max_len: BT_DEVICE_NAME.len() as u16,
            write_perm: unsafe { core::mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    };

    let sd = Softdevice::enable(&sd_config);
    let server = SERVER.init(unwrap!(Server::new(sd)));

    // Static GATT values the peer reads during HID enumeration.
    let mut report_map = [0u8; 23];
    report_map.copy_from_slice(CONTROL_REPORT_DESCRIPTOR);
    unwrap!(server.hid.report_map_set(&report_map));
    // bcdHID 1.11, country 0, normally-connectable flag.
    unwrap!(server.hid.hid_info_set(&[0x11, 0x01, 0x00, 0x02]));

    // CAN controller on SPI3 (see config.rs for the pinout).
    let mut spi_config = spim::Config::default();
    spi_config.frequency = spim::Frequency::M1;
    let spi = spim::Spim::new(p.SPI3, Irqs, p.P0_19, p.P0_21, p.P0_20, spi_config);
    let cs = Output::new(p.P0_22.degrade(), Level::High, OutputDrive::Standard);
    let mut can_bus = Mcp2515::new(spi, cs);

    // Let the MCP2515 oscillator settle before the reset/config burst.
    Timer::after(Duration::from_millis(10)).await;
    if let Err(e) = can_bus.init() {
        // Degrade to button-only operation rather than refusing to boot.
        defmt::error!("CAN controller init failed: {:?}", e);
    }

    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(radio_task(sd, server)));
    unwrap!(spawner.spawn(dispatcher_task(sd)));
    unwrap!(spawner.spawn(dash_button_task(p.P0_11.degrade())));
    unwrap!(spawner.spawn(can_rx_task(can_bus)));

    defmt::info!("btwheel up");
}
