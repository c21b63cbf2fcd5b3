// MIT License - Copyright (c) 2026 Peter Wright
//
//! # simplex-facp
//!
//! Serial monitoring for Simplex fire-alarm control panels.
//!
//! The panel only reports state through a serial command interface. This
//! crate logs in, polls the active-point list, turns the panel's text into
//! [`PointStatus`] records and reports what changed between polls as
//! [`Transition`]s.
//!
//! Two link variants are supported: the panel's interactive command shell
//! ([`InteractiveLink`]) and the checksummed framed protocol
//! ([`FramedLink`]). Both sit behind the [`PanelLink`] trait.
//!
//! ## Quick Start
//!
//! ```no_run
//! use simplex_facp::{InteractiveLink, LogSink, Monitor, MonitorConfig, NoDirectory};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MonitorConfig::builder()
//!         .port("/dev/ttyUSB0")
//!         .passcode("1234")
//!         .build();
//!
//!     let port = config.serial.open()?;
//!     let link = InteractiveLink::new(port);
//!     let mut monitor = Monitor::from_config(link, NoDirectory, &config);
//!
//!     let handle = monitor.handle();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         handle.stop();
//!     });
//!
//!     monitor.run(&mut LogSink).await?;
//!     monitor.close().await;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod checksum;
pub mod config;
pub mod constants;
pub mod diff;
pub mod error;
pub mod event;
pub mod monitor;
pub mod point;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use catalog::{NoDirectory, PointCatalog, PointDetails, PointDirectory};
pub use config::{MonitorConfig, MonitorConfigBuilder, Passcode};
pub use diff::{detect, Snapshot, Transition, TransitionKind};
pub use error::{FacpError, Result};
pub use event::{EventReceiver, EventSender, LogSink, TransitionEvent, TransitionSink};
pub use monitor::{Monitor, MonitorExit, MonitorHandle, MonitorState, RetryPolicy};
pub use point::{PointStatus, PointType, RawPoint, StateType};
pub use session::{Session, SessionState};
pub use transport::{FramedLink, InteractiveLink, PanelLink, Protocol, SerialSettings};
