//! Report schema and field vocabularies.

use super::types::Endpoint;

/// Report columns, in output order.
pub const REPORT_FIELDS: &[&str] = &[
    "MACAddress",
    "phoneDN",
    "modelNumber",
    "versionID",
    "hardwareRevision",
    "serialNumber",
    "DHCPEnabled",
    "DHCPServer",
    "IPAddress",
    "SubNetMask",
    "DefaultRouter",
    "DNSServer1",
    "DNSServer2",
    "DNSServer3",
    "DomainName",
    "AltTFTP",
    "TFTPServer1",
    "TFTPServer2",
    "CallManager1",
    "CallManager2",
    "CallManager3",
    "CallManager4",
    "CallManager5",
    "VLANId",
    "AdminVLANId",
    "CDPNeighborDeviceId",
    "CDPNeighborIP",
    "CDPNeighborPort",
    "LLDPNeighborDeviceId",
    "LLDPNeighborIP",
    "LLDPNeighborPort",
    "PortSpeed",
    PORT_ERRORS_FIELD,
    STATUS_ERRORS_FIELD,
    TRUST_STATUS_FIELD,
    OUT_OF_SERVICE_FIELD,
];

pub const PORT_SPEED_FIELD: &str = "PortSpeed";
pub const PORT_ERRORS_FIELD: &str = "PortErrors";
pub const STATUS_ERRORS_FIELD: &str = "StatusErrors";
pub const TRUST_STATUS_FIELD: &str = "TrustStatus";
pub const OUT_OF_SERVICE_FIELD: &str = "OutOfServiceReason";

/// PortSpeed value for phones without a PC port.
pub const PORT_SPEED_NOT_APPLICABLE: &str = "N/A";

/// Older firmware names the router field `DefaultRouter1`.
pub const LEGACY_ROUTER_FIELD: &str = "DefaultRouter1";
pub const ROUTER_FIELD: &str = "DefaultRouter";

/// Error counters summed into `PortErrors`.
pub const PORT_COUNTERS: &[&str] = &[
    "RxalignErr",
    "RxcrcErr",
    "RxlongErr",
    "RxshortErr",
    "RxtokenDrop",
    "Txcollisions",
    "TxexcessDefer",
    "TxexcessLength",
    "TxlateCollision",
];

pub fn is_report_field(name: &str) -> bool {
    REPORT_FIELDS.contains(&name)
}

/// Whether a classified page of `endpoint` keeps the field `name`.
///
/// Port pages also keep the raw error counters so they can be summed.
pub fn is_known_field(endpoint: Endpoint, name: &str) -> bool {
    is_report_field(name)
        || (endpoint == Endpoint::PortInformation && PORT_COUNTERS.contains(&name))
}
