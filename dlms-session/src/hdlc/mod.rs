//! HDLC framing (IEC 62056-46)

pub mod address;
pub mod fcs;
pub mod frame;
pub mod oracle;

pub use address::{HdlcAddress, reserved};
pub use fcs::FcsCalc;
pub use frame::{FLAG, FrameType, HdlcFrame, LLC_REQUEST, LLC_RESPONSE};
pub use oracle::HdlcFrameOracle;
