// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Signed 32-bit status codes.
//!
//! Every remote operation, item and property reports its outcome as a
//! [`StatusCode`]. The sign bit marks failure:
//!
//! ```text
//!  31 30 29 28 ........ 16 15 ............. 0
//! ┌──┬──┬──┬──────────────┬──────────────────┐
//! │S │R │C │   facility   │      offset      │
//! └──┴──┴──┴──────────────┴──────────────────┘
//!  S = 1 ⇒ failure (value < 0)
//! ```
//!
//! The constants below are bit-exact with the values servers put on the
//! wire. Human-readable descriptions live in the
//! [`StatusRegistry`](crate::registry::StatusRegistry), which is seeded from
//! [`WELL_KNOWN`].
//!
//! # Examples
//!
//! ```
//! use opcda_core::StatusCode;
//!
//! assert!(StatusCode::S_OK.succeeded());
//! assert!(StatusCode::OPC_E_UNKNOWNITEMID.failed());
//! assert!(StatusCode::OPC_S_UNSUPPORTEDRATE.succeeded());
//! assert!(StatusCode::RPC_E_SERVER_DIED.is_transport_fatal());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A signed 32-bit result code; negative values are failures.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(i32);

impl StatusCode {
    // =========================================================================
    // Generic success / failure codes
    // =========================================================================

    /// The operation succeeded.
    pub const S_OK: Self = Self::from_bits(0x0000_0000);
    /// The operation succeeded with partial or no results.
    pub const S_FALSE: Self = Self::from_bits(0x0000_0001);
    /// Not implemented.
    pub const E_NOTIMPL: Self = Self::from_bits(0x8000_4001);
    /// No such interface supported.
    pub const E_NOINTERFACE: Self = Self::from_bits(0x8000_4002);
    /// Invalid pointer.
    pub const E_POINTER: Self = Self::from_bits(0x8000_4003);
    /// Operation aborted.
    pub const E_ABORT: Self = Self::from_bits(0x8000_4004);
    /// Unspecified error.
    pub const E_FAIL: Self = Self::from_bits(0x8000_4005);
    /// General access denied error.
    pub const E_ACCESSDENIED: Self = Self::from_bits(0x8007_0005);
    /// Ran out of memory.
    pub const E_OUTOFMEMORY: Self = Self::from_bits(0x8007_000E);
    /// One or more arguments are invalid.
    pub const E_INVALIDARG: Self = Self::from_bits(0x8007_0057);

    // =========================================================================
    // Data access codes (facility ITF)
    // =========================================================================

    /// The handle is invalid.
    pub const OPC_E_INVALIDHANDLE: Self = Self::from_bits(0xC004_0001);
    /// The server cannot convert between the requested and canonical type.
    pub const OPC_E_BADTYPE: Self = Self::from_bits(0xC004_0004);
    /// The operation cannot be done on a public group.
    pub const OPC_E_PUBLIC: Self = Self::from_bits(0xC004_0005);
    /// The item's access rights do not allow the operation.
    pub const OPC_E_BADRIGHTS: Self = Self::from_bits(0xC004_0006);
    /// The item path is not defined in the server address space.
    pub const OPC_E_UNKNOWNITEMID: Self = Self::from_bits(0xC004_0007);
    /// The item path does not conform to the server's syntax.
    pub const OPC_E_INVALIDITEMID: Self = Self::from_bits(0xC004_0008);
    /// The filter string is not valid.
    pub const OPC_E_INVALIDFILTER: Self = Self::from_bits(0xC004_0009);
    /// The item's access path is not known to the server.
    pub const OPC_E_UNKNOWNPATH: Self = Self::from_bits(0xC004_000A);
    /// The value was out of range.
    pub const OPC_E_RANGE: Self = Self::from_bits(0xC004_000B);
    /// Duplicate name not allowed.
    pub const OPC_E_DUPLICATENAME: Self = Self::from_bits(0xC004_000C);
    /// The server uses the closest supported rate instead of the requested one.
    pub const OPC_S_UNSUPPORTEDRATE: Self = Self::from_bits(0x0004_000D);
    /// A written value was accepted but clamped.
    pub const OPC_S_CLAMP: Self = Self::from_bits(0x0004_000E);
    /// The object is still referenced.
    pub const OPC_S_INUSE: Self = Self::from_bits(0x0004_000F);
    /// The server's configuration file has an invalid format.
    pub const OPC_E_INVALIDCONFIGFILE: Self = Self::from_bits(0xC004_0010);
    /// The requested object was not found.
    pub const OPC_E_NOTFOUND: Self = Self::from_bits(0xC004_0011);
    /// The property id is not valid for the item.
    pub const OPC_E_INVALID_PID: Self = Self::from_bits(0xC004_0203);
    /// The item deadband has not been set.
    pub const OPC_E_DEADBANDNOTSET: Self = Self::from_bits(0xC004_0400);
    /// The item does not support deadband.
    pub const OPC_E_DEADBANDNOTSUPPORTED: Self = Self::from_bits(0xC004_0401);
    /// The server does not support buffering of data items.
    pub const OPC_E_NOBUFFERING: Self = Self::from_bits(0xC004_0402);
    /// The continuation point is not valid.
    pub const OPC_E_INVALIDCONTINUATIONPOINT: Self = Self::from_bits(0xC004_0403);
    /// Not every queued data change could be delivered.
    pub const OPC_S_DATAQUEUEOVERFLOW: Self = Self::from_bits(0x0004_0404);
    /// The item's sampling rate has not been set.
    pub const OPC_E_RATENOTSET: Self = Self::from_bits(0xC004_0405);
    /// The server does not support the operation.
    pub const OPC_E_NOTSUPPORTED: Self = Self::from_bits(0xC004_0406);

    // =========================================================================
    // Transport (RPC) codes
    // =========================================================================

    /// The call was rejected by the callee.
    pub const RPC_E_CALL_REJECTED: Self = Self::from_bits(0x8001_0001);
    /// The remote call failed and did not execute.
    pub const RPC_E_SERVER_DIED: Self = Self::from_bits(0x8001_0007);
    /// The client process died during the call.
    pub const RPC_E_CLIENT_DIED: Self = Self::from_bits(0x8001_0008);
    /// The remote call failed and may or may not have executed.
    pub const RPC_E_SERVER_DIED_DNE: Self = Self::from_bits(0x8001_0012);
    /// The object invoked has disconnected from its clients.
    pub const RPC_E_DISCONNECTED: Self = Self::from_bits(0x8001_0108);
    /// The call timed out in the transport.
    pub const RPC_E_TIMEOUT: Self = Self::from_bits(0x8001_011F);
    /// The RPC server is unavailable.
    pub const RPC_S_SERVER_UNAVAILABLE: Self = Self::from_bits(0x8007_06BA);

    /// Codes that mean the connection itself is broken.
    pub const TRANSPORT_FATAL: [Self; 5] = [
        Self::RPC_E_DISCONNECTED,
        Self::RPC_E_SERVER_DIED,
        Self::RPC_E_SERVER_DIED_DNE,
        Self::RPC_E_CLIENT_DIED,
        Self::RPC_S_SERVER_UNAVAILABLE,
    ];

    /// Facility of the data access interface codes.
    pub const FACILITY_ITF: u16 = 0x0004;

    /// Creates a status code from its signed value.
    #[inline]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Creates a status code from its unsigned bit pattern.
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits as i32)
    }

    /// Returns the signed value.
    #[inline]
    pub const fn value(self) -> i32 {
        self.0
    }

    /// Returns the unsigned bit pattern.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0 as u32
    }

    /// Returns `true` if the code denotes success (`value >= 0`).
    #[inline]
    pub const fn succeeded(self) -> bool {
        self.0 >= 0
    }

    /// Returns `true` if the code denotes failure (`value < 0`).
    #[inline]
    pub const fn failed(self) -> bool {
        self.0 < 0
    }

    /// Returns the facility field.
    #[inline]
    pub const fn facility(self) -> u16 {
        ((self.bits() >> 16) & 0x1FFF) as u16
    }

    /// Returns the low 16-bit offset within the facility.
    #[inline]
    pub const fn offset(self) -> u16 {
        (self.bits() & 0xFFFF) as u16
    }

    /// Returns `true` if the code reports a broken connection rather than a
    /// failed request.
    pub fn is_transport_fatal(self) -> bool {
        Self::TRANSPORT_FATAL.contains(&self)
    }

    /// Returns the symbolic name of a well-known code.
    pub fn name(self) -> Option<&'static str> {
        WELL_KNOWN
            .iter()
            .find(|entry| entry.code == self)
            .map(|entry| entry.name)
    }

    /// Returns the description from the shared registry, or a numeric
    /// fallback for unregistered codes.
    pub fn describe(self) -> String {
        crate::registry::StatusRegistry::global().describe(self)
    }

    /// Converts the code into a `Result`, failing on negative codes.
    pub fn into_result(self) -> Result<Self, Self> {
        if self.succeeded() {
            Ok(self)
        } else {
            Err(self)
        }
    }
}

impl fmt::Debug for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "StatusCode(0x{:08X} {})", self.bits(), name),
            None => write!(f, "StatusCode(0x{:08X})", self.bits()),
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:08X})", name, self.bits()),
            None => write!(f, "0x{:08X}", self.bits()),
        }
    }
}

impl From<i32> for StatusCode {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<StatusCode> for i32 {
    fn from(code: StatusCode) -> Self {
        code.0
    }
}

// =============================================================================
// Fixed Table
// =============================================================================

/// An entry of the fixed status table.
#[derive(Debug, Clone, Copy)]
pub struct WellKnownStatus {
    /// The code.
    pub code: StatusCode,
    /// Symbolic name.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
}

const fn entry(code: StatusCode, name: &'static str, description: &'static str) -> WellKnownStatus {
    WellKnownStatus {
        code,
        name,
        description,
    }
}

/// The fixed table the status registry is seeded from.
pub const WELL_KNOWN: &[WellKnownStatus] = &[
    entry(StatusCode::S_OK, "S_OK", "The operation succeeded"),
    entry(StatusCode::S_FALSE, "S_FALSE", "The operation succeeded with partial results"),
    entry(StatusCode::E_NOTIMPL, "E_NOTIMPL", "Not implemented"),
    entry(StatusCode::E_NOINTERFACE, "E_NOINTERFACE", "No such interface supported"),
    entry(StatusCode::E_POINTER, "E_POINTER", "Invalid pointer"),
    entry(StatusCode::E_ABORT, "E_ABORT", "Operation aborted"),
    entry(StatusCode::E_FAIL, "E_FAIL", "Unspecified error"),
    entry(StatusCode::E_ACCESSDENIED, "E_ACCESSDENIED", "General access denied error"),
    entry(StatusCode::E_OUTOFMEMORY, "E_OUTOFMEMORY", "Ran out of memory"),
    entry(StatusCode::E_INVALIDARG, "E_INVALIDARG", "One or more arguments are invalid"),
    entry(StatusCode::OPC_E_INVALIDHANDLE, "OPC_E_INVALIDHANDLE", "The value of the handle is invalid"),
    entry(
        StatusCode::OPC_E_BADTYPE,
        "OPC_E_BADTYPE",
        "The server cannot convert the data between the requested data type and the canonical data type",
    ),
    entry(StatusCode::OPC_E_PUBLIC, "OPC_E_PUBLIC", "The requested operation cannot be done on a public group"),
    entry(StatusCode::OPC_E_BADRIGHTS, "OPC_E_BADRIGHTS", "The item's access rights do not allow the operation"),
    entry(
        StatusCode::OPC_E_UNKNOWNITEMID,
        "OPC_E_UNKNOWNITEMID",
        "The item path is not defined in the server address space or no longer exists",
    ),
    entry(
        StatusCode::OPC_E_INVALIDITEMID,
        "OPC_E_INVALIDITEMID",
        "The item path does not conform to the server's syntax",
    ),
    entry(StatusCode::OPC_E_INVALIDFILTER, "OPC_E_INVALIDFILTER", "The filter string was not valid"),
    entry(StatusCode::OPC_E_UNKNOWNPATH, "OPC_E_UNKNOWNPATH", "The item's access path is not known to the server"),
    entry(StatusCode::OPC_E_RANGE, "OPC_E_RANGE", "The value was out of range"),
    entry(StatusCode::OPC_E_DUPLICATENAME, "OPC_E_DUPLICATENAME", "Duplicate name not allowed"),
    entry(
        StatusCode::OPC_S_UNSUPPORTEDRATE,
        "OPC_S_UNSUPPORTEDRATE",
        "The server does not support the requested rate but will use the closest available rate",
    ),
    entry(StatusCode::OPC_S_CLAMP, "OPC_S_CLAMP", "A value passed to write was accepted but the output was clamped"),
    entry(
        StatusCode::OPC_S_INUSE,
        "OPC_S_INUSE",
        "The operation cannot be performed because the object is being referenced",
    ),
    entry(
        StatusCode::OPC_E_INVALIDCONFIGFILE,
        "OPC_E_INVALIDCONFIGFILE",
        "The server's configuration file is an invalid format",
    ),
    entry(StatusCode::OPC_E_NOTFOUND, "OPC_E_NOTFOUND", "The requested object was not found"),
    entry(StatusCode::OPC_E_INVALID_PID, "OPC_E_INVALID_PID", "The specified property id is not valid for the item"),
    entry(StatusCode::OPC_E_DEADBANDNOTSET, "OPC_E_DEADBANDNOTSET", "The item deadband has not been set"),
    entry(
        StatusCode::OPC_E_DEADBANDNOTSUPPORTED,
        "OPC_E_DEADBANDNOTSUPPORTED",
        "The item does not support deadband",
    ),
    entry(StatusCode::OPC_E_NOBUFFERING, "OPC_E_NOBUFFERING", "The server does not support buffering of data items"),
    entry(
        StatusCode::OPC_E_INVALIDCONTINUATIONPOINT,
        "OPC_E_INVALIDCONTINUATIONPOINT",
        "The continuation point is not valid",
    ),
    entry(
        StatusCode::OPC_S_DATAQUEUEOVERFLOW,
        "OPC_S_DATAQUEUEOVERFLOW",
        "Not every detected change has been returned since the buffer overflowed",
    ),
    entry(StatusCode::OPC_E_RATENOTSET, "OPC_E_RATENOTSET", "There is no sampling rate set for the item"),
    entry(StatusCode::OPC_E_NOTSUPPORTED, "OPC_E_NOTSUPPORTED", "The server does not support the operation"),
    entry(StatusCode::RPC_E_CALL_REJECTED, "RPC_E_CALL_REJECTED", "The call was rejected by the callee"),
    entry(
        StatusCode::RPC_E_SERVER_DIED,
        "RPC_E_SERVER_DIED",
        "The remote procedure call failed and did not execute",
    ),
    entry(StatusCode::RPC_E_CLIENT_DIED, "RPC_E_CLIENT_DIED", "The caller died while the callee was executing"),
    entry(
        StatusCode::RPC_E_SERVER_DIED_DNE,
        "RPC_E_SERVER_DIED_DNE",
        "The remote procedure call failed and may or may not have executed",
    ),
    entry(
        StatusCode::RPC_E_DISCONNECTED,
        "RPC_E_DISCONNECTED",
        "The object invoked has disconnected from its clients",
    ),
    entry(StatusCode::RPC_E_TIMEOUT, "RPC_E_TIMEOUT", "This operation returned because the timeout period expired"),
    entry(StatusCode::RPC_S_SERVER_UNAVAILABLE, "RPC_S_SERVER_UNAVAILABLE", "The RPC server is unavailable"),
];

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_bit_marks_failure() {
        assert!(StatusCode::S_OK.succeeded());
        assert!(StatusCode::S_FALSE.succeeded());
        assert!(StatusCode::OPC_S_UNSUPPORTEDRATE.succeeded());
        assert!(StatusCode::E_FAIL.failed());
        assert!(StatusCode::OPC_E_INVALIDCONTINUATIONPOINT.failed());
        assert!(StatusCode::new(-1).failed());
    }

    #[test]
    fn test_bit_exact_values() {
        assert_eq!(StatusCode::OPC_E_UNKNOWNITEMID.bits(), 0xC004_0007);
        assert_eq!(StatusCode::OPC_E_INVALIDITEMID.bits(), 0xC004_0008);
        assert_eq!(StatusCode::OPC_E_UNKNOWNPATH.bits(), 0xC004_000A);
        assert_eq!(StatusCode::OPC_E_INVALIDFILTER.bits(), 0xC004_0009);
        assert_eq!(StatusCode::OPC_E_INVALID_PID.bits(), 0xC004_0203);
        assert_eq!(StatusCode::OPC_E_INVALIDCONTINUATIONPOINT.bits(), 0xC004_0403);
        assert_eq!(StatusCode::OPC_S_UNSUPPORTEDRATE.value(), 0x0004_000D);
    }

    #[test]
    fn test_facility_and_offset() {
        let code = StatusCode::OPC_E_INVALID_PID;
        assert_eq!(code.facility(), StatusCode::FACILITY_ITF);
        assert_eq!(code.offset(), 0x0203);
    }

    #[test]
    fn test_transport_fatal_set() {
        for code in StatusCode::TRANSPORT_FATAL {
            assert!(code.is_transport_fatal(), "{code} should be fatal");
        }
        assert!(!StatusCode::OPC_E_UNKNOWNITEMID.is_transport_fatal());
        assert!(!StatusCode::RPC_E_CALL_REJECTED.is_transport_fatal());
        assert!(!StatusCode::E_FAIL.is_transport_fatal());
    }

    #[test]
    fn test_display_and_debug() {
        assert_eq!(
            StatusCode::OPC_E_UNKNOWNITEMID.to_string(),
            "OPC_E_UNKNOWNITEMID (0xC0040007)"
        );
        assert_eq!(StatusCode::from_bits(0x8004_1234).to_string(), "0x80041234");
        assert!(format!("{:?}", StatusCode::S_OK).contains("S_OK"));
    }

    #[test]
    fn test_into_result() {
        assert_eq!(StatusCode::S_FALSE.into_result(), Ok(StatusCode::S_FALSE));
        assert_eq!(StatusCode::E_FAIL.into_result(), Err(StatusCode::E_FAIL));
    }

    #[test]
    fn test_well_known_names_unique() {
        let mut codes: Vec<_> = WELL_KNOWN.iter().map(|e| e.code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), WELL_KNOWN.len());
    }
}
