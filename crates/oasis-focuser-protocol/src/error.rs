//! Codec errors.

use oasis_hid_common::HidCommonError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed frame 0x{code:02X}: {source}")]
    Malformed {
        code: u8,
        #[source]
        source: HidCommonError,
    },

    #[error("Unexpected report id 0x{0:02X}")]
    UnexpectedReportId(u8),
}

impl ProtocolError {
    pub(crate) fn malformed(code: u8) -> impl FnOnce(HidCommonError) -> Self {
        move |source| Self::Malformed { code, source }
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
