//! Port counter aggregation.

use super::schema::{PORT_COUNTERS, PORT_SPEED_FIELD, PORT_SPEED_NOT_APPLICABLE};
use super::types::FieldMap;

/// Sum of the switch-port error counters on a PortInformation page.
///
/// Missing or non-numeric counters count as zero.
pub fn port_error_total(port: &FieldMap) -> u64 {
    PORT_COUNTERS
        .iter()
        .filter_map(|name| port.get(name))
        .filter_map(|raw| raw.trim().parse::<u64>().ok())
        .fold(0u64, u64::saturating_add)
}

/// PC port speed/duplex, or `N/A` for phones without a PC port.
pub fn pc_port_speed(port: &FieldMap) -> &str {
    port.get(PORT_SPEED_FIELD).unwrap_or(PORT_SPEED_NOT_APPLICABLE)
}
