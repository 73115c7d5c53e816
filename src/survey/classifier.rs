//! Response classifier: one raw page → one FieldMap.
//!
//! Failure kinds are kept apart so the prober can log them precisely:
//! an empty body, a body that is not well-formed XML, and a well-formed
//! body without the endpoint's top-level container (typically an HTML
//! error page from a phone with web access disabled).

use super::error::SurveyError;
use super::schema::{is_known_field, LEGACY_ROUTER_FIELD, ROUTER_FIELD};
use super::types::{Endpoint, FieldMap};
use super::xml::{parse_document, XmlValue};

/// Parse `raw` and return the content of the endpoint's container element.
pub fn parse_container(endpoint: Endpoint, raw: &str) -> Result<XmlValue, SurveyError> {
    if raw.trim().is_empty() {
        return Err(SurveyError::EmptyPage(endpoint));
    }

    let doc = parse_document(raw).map_err(|e| SurveyError::Malformed {
        endpoint,
        reason: e.to_string(),
    })?;

    let container = endpoint.container();
    doc.container(container)
        .cloned()
        .ok_or(SurveyError::MissingContainer {
            endpoint,
            container,
        })
}

/// Classify a page into the fields the survey knows about.
///
/// Unknown keys and nested structures are dropped. `DefaultRouter1` on the
/// network page is reported as `DefaultRouter`.
pub fn classify_page(endpoint: Endpoint, raw: &str) -> Result<FieldMap, SurveyError> {
    let container = parse_container(endpoint, raw)?;
    let mut fields = FieldMap::new();

    for (key, value) in container.entries() {
        let Some(text) = value.as_text() else {
            continue;
        };

        if endpoint == Endpoint::NetworkConfiguration && key == LEGACY_ROUTER_FIELD {
            fields.insert(ROUTER_FIELD, text);
            continue;
        }

        if is_known_field(endpoint, key) {
            fields.insert(key.as_str(), text);
        }
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETWORK_PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<NetworkConfiguration>
  <DHCPServer>10.0.0.254</DHCPServer>
  <MACAddress>001122334455</MACAddress>
  <HostName>SEP001122334455</HostName>
  <IPAddress>10.0.0.2</IPAddress>
  <SubNetMask>255.255.255.0</SubNetMask>
  <DefaultRouter>10.0.0.1</DefaultRouter>
  <AltTFTP>No</AltTFTP>
  <TFTPServer1>10.0.10.5</TFTPServer1>
</NetworkConfiguration>"#;

    #[test]
    fn keeps_schema_fields_and_drops_unknown_ones() {
        let fields = classify_page(Endpoint::NetworkConfiguration, NETWORK_PAGE).unwrap();

        assert_eq!(fields.get("IPAddress"), Some("10.0.0.2"));
        assert_eq!(fields.get("DefaultRouter"), Some("10.0.0.1"));
        assert_eq!(fields.get("AltTFTP"), Some("No"));
        assert!(!fields.contains_key("HostName"));
    }

    #[test]
    fn legacy_router_field_is_renamed() {
        let page = "<NetworkConfiguration><DefaultRouter1>10.9.9.1</DefaultRouter1></NetworkConfiguration>";
        let fields = classify_page(Endpoint::NetworkConfiguration, page).unwrap();

        assert_eq!(fields.get("DefaultRouter"), Some("10.9.9.1"));
        assert!(!fields.contains_key("DefaultRouter1"));
    }

    #[test]
    fn no_router_field_means_no_router_key() {
        let page = "<NetworkConfiguration><IPAddress>10.0.0.2</IPAddress></NetworkConfiguration>";
        let fields = classify_page(Endpoint::NetworkConfiguration, page).unwrap();
        assert!(!fields.contains_key("DefaultRouter"));
    }

    #[test]
    fn port_page_keeps_counters() {
        let page = "<PortInformation><PortSpeed>100Mb Full</PortSpeed><RxcrcErr>3</RxcrcErr><Foo>1</Foo></PortInformation>";
        let fields = classify_page(Endpoint::PortInformation, page).unwrap();

        assert_eq!(fields.get("PortSpeed"), Some("100Mb Full"));
        assert_eq!(fields.get("RxcrcErr"), Some("3"));
        assert!(!fields.contains_key("Foo"));
    }

    #[test]
    fn nested_values_are_skipped() {
        let page = "<DeviceInformation><modelNumber>CP-8845</modelNumber><versionID><a>1</a><b>2</b></versionID></DeviceInformation>";
        let fields = classify_page(Endpoint::DeviceInformation, page).unwrap();

        assert_eq!(fields.get("modelNumber"), Some("CP-8845"));
        assert!(!fields.contains_key("versionID"));
    }

    #[test]
    fn missing_container_is_distinct_from_empty_page() {
        let missing = classify_page(
            Endpoint::NetworkConfiguration,
            "<html><body>Web Access Disabled</body></html>",
        )
        .unwrap_err();
        assert!(matches!(missing, SurveyError::MissingContainer { .. }));

        let empty = classify_page(Endpoint::NetworkConfiguration, "  \n").unwrap_err();
        assert!(matches!(empty, SurveyError::EmptyPage(Endpoint::NetworkConfiguration)));
    }

    #[test]
    fn empty_container_classifies_to_empty_map() {
        let fields = classify_page(Endpoint::PortInformation, "<PortInformation/>").unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn malformed_markup_is_an_error() {
        let err = classify_page(
            Endpoint::DeviceInformation,
            "<DeviceInformation><serialNumber>FCH1</DeviceInformation>",
        )
        .unwrap_err();
        assert!(matches!(err, SurveyError::Malformed { .. }));
    }

    #[test]
    fn trailing_content_after_the_page_is_malformed() {
        for raw in [
            "<NetworkConfiguration><IPAddress>10.0.0.2</IPAddress></NetworkConfiguration><html><body>x</body></html>",
            "<NetworkConfiguration><IPAddress>10.0.0.2</IPAddress></NetworkConfiguration> trailing junk",
        ] {
            let err = classify_page(Endpoint::NetworkConfiguration, raw).unwrap_err();
            assert!(matches!(err, SurveyError::Malformed { .. }), "{raw}");
        }
    }
}
