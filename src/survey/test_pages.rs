//! Sample phone pages shared by the survey tests.

pub const NETWORK_PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<NetworkConfiguration>
  <DHCPServer>10.0.0.254</DHCPServer>
  <MACAddress>001122334455</MACAddress>
  <HostName>SEP001122334455</HostName>
  <DHCPEnabled>Yes</DHCPEnabled>
  <IPAddress>10.0.0.2</IPAddress>
  <SubNetMask>255.255.255.0</SubNetMask>
  <DefaultRouter>10.0.0.1</DefaultRouter>
  <DNSServer1>10.0.5.10</DNSServer1>
  <DomainName>voice.example.net</DomainName>
  <AltTFTP>No</AltTFTP>
  <TFTPServer1>10.0.10.5</TFTPServer1>
  <CallManager1>cucm-sub1 Active</CallManager1>
  <VLANId>110</VLANId>
  <CDPNeighborDeviceId>access-sw-3</CDPNeighborDeviceId>
  <CDPNeighborPort>GigabitEthernet1/0/14</CDPNeighborPort>
</NetworkConfiguration>"#;

pub const NETWORK_PAGE_ALT_TFTP: &str = r#"<NetworkConfiguration>
  <MACAddress>00AABBCCDDEE</MACAddress>
  <IPAddress>10.0.0.3</IPAddress>
  <AltTFTP>Yes</AltTFTP>
  <TFTPServer1>10.99.0.5</TFTPServer1>
</NetworkConfiguration>"#;

/// 79xx firmware: router reported as `DefaultRouter1`.
pub const NETWORK_PAGE_79XX: &str = r#"<NetworkConfiguration>
  <MACAddress>B8BEBF227D79</MACAddress>
  <IPAddress>10.0.0.4</IPAddress>
  <DefaultRouter1>10.0.0.1</DefaultRouter1>
  <AltTFTP>No</AltTFTP>
</NetworkConfiguration>"#;

pub const PORT_PAGE: &str = r#"<PortInformation>
  <PortSpeed>100Mb Full</PortSpeed>
  <RxcrcErr>3</RxcrcErr>
  <Txcollisions>2</Txcollisions>
  <RxtotalPkt>123456</RxtotalPkt>
</PortInformation>"#;

pub const DEVICE_PAGE: &str = r#"<DeviceInformation>
  <MACAddress>001122334455</MACAddress>
  <phoneDN>4101</phoneDN>
  <modelNumber>CP-8845</modelNumber>
  <versionID>sip88xx.14-1-1-0001-125</versionID>
  <hardwareRevision>2</hardwareRevision>
  <serialNumber>FCH2201ABCD</serialNumber>
  <udi>phone</udi>
</DeviceInformation>"#;

pub const STATUS_PAGE: &str = r#"<DeviceLog>
  <status>[8:52:30am 10/01/19] ITL installed</status>
  <status>[8:53:01am 10/01/19] TFTP Timeout : SEP001122334455.cnf.xml.sgn</status>
  <status>[8:55:12am 10/02/19] Trust List Updated</status>
</DeviceLog>"#;

pub const DEBUG_PAGE: &str = r#"<DeviceLog>
  <status>[8:54:12am 08/20/19] DeviceTLInfo: ReasonForOutOfServiceText=CMclosedTCP</status>
</DeviceLog>"#;

pub const HTML_ERROR_PAGE: &str = "<html><body>Web Access Disabled</body></html>";
