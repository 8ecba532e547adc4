use std::path::Path;

use tracing::info;

use rawlink_port::{PortHandle, SyncPort, TransferMode};

use crate::config::LinkConfig;
use crate::error::Result;
use crate::receiver::Receiver;
use crate::sender::Sender;

/// One configured port session: an open device with the link settings,
/// idle pattern and transfer sizes applied.
///
/// Split into a receiver and a sender to run both directions from
/// separate threads; the paths share nothing but the device itself.
pub struct LinkSession {
    port: SyncPort,
    config: LinkConfig,
}

impl LinkSession {
    /// Open and configure a port device.
    pub fn open(path: impl AsRef<Path>, config: LinkConfig) -> Result<Self> {
        let port = SyncPort::open(path)?;
        Self::attach(port, config)
    }

    /// Configure an already-open port.
    pub fn attach(mut port: SyncPort, config: LinkConfig) -> Result<Self> {
        port.apply_settings(&config.settings)?;
        port.set_transmit_idle_pattern(config.format.idle() as u16)?;
        port.set_receive_transfer_size(config.read_chunk_size)?;
        port.set_transmit_transfer_mode(if config.continuous_send {
            TransferMode::Pio
        } else {
            TransferMode::Dma
        })?;
        info!(path = ?port.path(), "link session configured");
        Ok(Self { port, config })
    }

    /// Enable the receiver and split into receive and transmit halves.
    ///
    /// The receiver half owns the port (and its close-on-drop cleanup);
    /// the sender half writes through a duplicated handle. The deframer
    /// starts empty, matching the hardware receiver entering hunt mode.
    pub fn split(mut self) -> Result<(Receiver<SyncPort>, Sender<PortHandle>)> {
        let tx = self.port.try_clone()?;
        self.port.enable_receiver()?;
        let receiver = Receiver::new(self.port, self.config.format, self.config.read_chunk_size);
        let sender = Sender::new(tx, self.config.format);
        Ok((receiver, sender))
    }

    /// The session configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Borrow the underlying port.
    pub fn port(&self) -> &SyncPort {
        &self.port
    }

    /// Mutably borrow the underlying port, e.g. to toggle signal lines.
    pub fn port_mut(&mut self) -> &mut SyncPort {
        &mut self.port
    }
}
