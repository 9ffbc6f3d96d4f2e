//! Minimal MCP2515 driver - listen-only RX path.
//!
//! The nRF52840 has no CAN controller, so the panel bus comes in
//! through an SPI-attached MCP2515. We only need one thing from it:
//! receive the 0x206 panel frame. TX, interrupts, and the second RX
//! buffer are intentionally not wired up; the chip runs listen-only
//! with a hardware filter on the panel ID.
//!
//! Exposes the `embedded-can` traits so the receive task stays
//! controller-agnostic.

use crate::config::CAN_PANEL_FRAME_ID;
use embedded_can::{ErrorKind, Id, StandardId};
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

// SPI instruction set
const CMD_RESET: u8 = 0xC0;
const CMD_READ: u8 = 0x03;
const CMD_WRITE: u8 = 0x02;
const CMD_READ_RX0: u8 = 0x90; // reads RXB0SIDH.., auto-clears RX0IF

// Registers
const REG_CANCTRL: u8 = 0x0F;
const REG_CNF3: u8 = 0x28;
const REG_CANINTF: u8 = 0x2C;
const REG_RXB0CTRL: u8 = 0x60;
const REG_RXF0SIDH: u8 = 0x00;
const REG_RXM0SIDH: u8 = 0x20;

/// CANINTF: RX buffer 0 full.
const RX0IF: u8 = 0x01;

/// Request listen-only mode (REQOP = 011).
const MODE_LISTEN_ONLY: u8 = 0x60;

/// Bit timing for 95.2 kbps with a 16 MHz crystal:
/// BRP=3 (TQ = 0.5 µs), SJW=3, 21 TQ per bit (1+8+8+4).
const CNF: [u8; 3] = [0x03, 0xBF, 0x83]; // CNF3, CNF2, CNF1 (ascending addresses)

/// Driver errors. The receive task treats all of them as transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CanError {
    /// SPI transaction failed.
    Spi,
    /// TX attempted while in listen-only mode.
    ListenOnly,
}

impl embedded_can::Error for CanError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// A received frame. Standard IDs only - the body bus doesn't use
/// extended addressing.
#[derive(Clone, Copy, Debug)]
pub struct RxFrame {
    id: StandardId,
    remote: bool,
    dlc: usize,
    data: [u8; 8],
}

impl embedded_can::Frame for RxFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        let Id::Standard(id) = id.into() else {
            return None;
        };
        if data.len() > 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        buf[..data.len()].copy_from_slice(data);
        Some(Self {
            id,
            remote: false,
            dlc: data.len(),
            data: buf,
        })
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        let Id::Standard(id) = id.into() else {
            return None;
        };
        if dlc > 8 {
            return None;
        }
        Some(Self {
            id,
            remote: true,
            dlc,
            data: [0; 8],
        })
    }

    fn is_extended(&self) -> bool {
        false
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        Id::Standard(self.id)
    }

    fn dlc(&self) -> usize {
        self.dlc
    }

    fn data(&self) -> &[u8] {
        &self.data[..self.dlc]
    }
}

/// Listen-only MCP2515 on a blocking SPI bus with a manual CS line.
pub struct Mcp2515<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI: SpiBus<u8>, CS: OutputPin> Mcp2515<SPI, CS> {
    pub fn new(spi: SPI, cs: CS) -> Self {
        Self { spi, cs }
    }

    /// Reset the chip, program bit timing and the panel-ID filter,
    /// then drop into listen-only mode.
    ///
    /// Must be called after the chip's oscillator settles; the caller
    /// delays ~10 ms after power-up before invoking this.
    pub fn init(&mut self) -> Result<(), CanError> {
        self.command(&[CMD_RESET])?;

        // CNF3..CNF1 are adjacent, one write burst.
        self.write_regs(REG_CNF3, &CNF)?;

        // Filter 0 + mask 0: accept exactly the panel frame ID.
        let sidh = (CAN_PANEL_FRAME_ID >> 3) as u8;
        let sidl = ((CAN_PANEL_FRAME_ID & 0x7) << 5) as u8;
        self.write_regs(REG_RXF0SIDH, &[sidh, sidl])?;
        self.write_regs(REG_RXM0SIDH, &[0xFF, 0xE0])?;

        // RXB0: filters on, no rollover.
        self.write_regs(REG_RXB0CTRL, &[0x00])?;

        self.write_regs(REG_CANCTRL, &[MODE_LISTEN_ONLY])
    }

    fn command(&mut self, bytes: &[u8]) -> Result<(), CanError> {
        self.cs.set_low().map_err(|_| CanError::Spi)?;
        let res = self.spi.write(bytes).and_then(|_| self.spi.flush());
        self.cs.set_high().map_err(|_| CanError::Spi)?;
        res.map_err(|_| CanError::Spi)
    }

    fn write_regs(&mut self, addr: u8, values: &[u8]) -> Result<(), CanError> {
        self.cs.set_low().map_err(|_| CanError::Spi)?;
        let res = self
            .spi
            .write(&[CMD_WRITE, addr])
            .and_then(|_| self.spi.write(values))
            .and_then(|_| self.spi.flush());
        self.cs.set_high().map_err(|_| CanError::Spi)?;
        res.map_err(|_| CanError::Spi)
    }

    fn read_regs(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), CanError> {
        self.cs.set_low().map_err(|_| CanError::Spi)?;
        let res = self
            .spi
            .write(&[CMD_READ, addr])
            .and_then(|_| self.spi.read(buf))
            .and_then(|_| self.spi.flush());
        self.cs.set_high().map_err(|_| CanError::Spi)?;
        res.map_err(|_| CanError::Spi)
    }

    /// Pull RXB0: SIDH, SIDL, EID8, EID0, DLC, D0..D7. The read
    /// instruction clears RX0IF in hardware.
    fn read_rx0(&mut self) -> Result<RxFrame, CanError> {
        let mut raw = [0u8; 13];
        self.cs.set_low().map_err(|_| CanError::Spi)?;
        let res = self
            .spi
            .write(&[CMD_READ_RX0])
            .and_then(|_| self.spi.read(&mut raw))
            .and_then(|_| self.spi.flush());
        self.cs.set_high().map_err(|_| CanError::Spi)?;
        res.map_err(|_| CanError::Spi)?;

        let id = ((raw[0] as u16) << 3) | ((raw[1] >> 5) as u16);
        let id = StandardId::new(id).unwrap_or(StandardId::ZERO);
        let remote = raw[1] & 0x10 != 0; // SRR
        let dlc = (raw[4] & 0x0F).min(8) as usize;
        let mut data = [0u8; 8];
        data.copy_from_slice(&raw[5..13]);

        Ok(RxFrame {
            id,
            remote,
            dlc,
            data,
        })
    }
}

impl<SPI: SpiBus<u8>, CS: OutputPin> embedded_can::nb::Can for Mcp2515<SPI, CS> {
    type Frame = RxFrame;
    type Error = CanError;

    fn transmit(&mut self, _frame: &Self::Frame) -> nb::Result<Option<Self::Frame>, Self::Error> {
        Err(nb::Error::Other(CanError::ListenOnly))
    }

    fn receive(&mut self) -> nb::Result<Self::Frame, Self::Error> {
        let mut intf = [0u8; 1];
        self.read_regs(REG_CANINTF, &mut intf)
            .map_err(nb::Error::Other)?;

        if intf[0] & RX0IF == 0 {
            return Err(nb::Error::WouldBlock);
        }

        self.read_rx0().map_err(nb::Error::Other)
    }
}
