//! Error types for the remote

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Wi-Fi credential outside the accepted length bound
    #[error("Invalid config: {field} must be 8 to 255 bytes, got {len}")]
    InvalidConfig { field: &'static str, len: usize },

    /// Datagram that does not match any known layout
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    /// Settings value that cannot be used
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),

    #[cfg(feature = "gpio")]
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[cfg(feature = "gpio")]
    #[error("SPI error: {0}")]
    Spi(#[from] rppal::spi::Error),
}
