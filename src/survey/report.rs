//! Report writers: the CSV device report and the unreachable list.
//!
//! Both files are written to `<name>.tmp` first and renamed into place, so
//! an interrupted run never leaves a half-written report behind.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::error::SurveyError;
use super::schema::REPORT_FIELDS;
use super::types::{DeviceRecord, UnreachableDevice};

/// One CSV row in `REPORT_FIELDS` order; absent fields are blank.
pub fn report_row(record: &DeviceRecord) -> Vec<&str> {
    REPORT_FIELDS
        .iter()
        .map(|field| record.get(field).unwrap_or(""))
        .collect()
}

/// Write header plus one row per record.
pub fn write_report_to<W: Write>(writer: W, records: &[DeviceRecord]) -> Result<(), SurveyError> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);

    wtr.write_record(REPORT_FIELDS)?;
    for record in records {
        wtr.write_record(report_row(record))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the CSV report to `path`. Returns the number of rows written.
pub fn write_report(path: &Path, records: &[DeviceRecord]) -> Result<usize, SurveyError> {
    write_atomic(path, |file| write_report_to(file, records))?;
    tracing::info!(path = %path.display(), rows = records.len(), "Report written");
    Ok(records.len())
}

/// One address per line.
pub fn write_unreachable_to<W: Write>(mut writer: W, devices: &[UnreachableDevice]) -> Result<(), SurveyError> {
    for device in devices {
        writeln!(writer, "{}", device.address)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_unreachable(path: &Path, devices: &[UnreachableDevice]) -> Result<usize, SurveyError> {
    write_atomic(path, |file| write_unreachable_to(file, devices))?;
    tracing::info!(path = %path.display(), devices = devices.len(), "Unreachable list written");
    Ok(devices.len())
}

/// Write an address list, one per line (used to save discovered phones).
pub fn write_address_list(path: &Path, addresses: &[String]) -> Result<(), SurveyError> {
    write_atomic(path, |file| {
        for address in addresses {
            writeln!(file, "{address}")?;
        }
        file.flush()?;
        Ok(())
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_atomic<F>(path: &Path, write: F) -> Result<(), SurveyError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), SurveyError>,
{
    let tmp = tmp_path(path);
    let mut file = BufWriter::new(File::create(&tmp)?);
    if let Err(e) = write(&mut file) {
        drop(file);
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    drop(file);
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::types::{Endpoint, FieldMap};

    fn record(address: &str, fields: &[(&str, &str)]) -> DeviceRecord {
        DeviceRecord {
            address: address.to_string(),
            fields: fields.iter().copied().collect::<FieldMap>(),
        }
    }

    fn read_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
        let mut rdr = csv::Reader::from_path(path).unwrap();
        let header = rdr.headers().unwrap().iter().map(str::to_string).collect();
        let rows = rdr
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        (header, rows)
    }

    #[test]
    fn header_is_the_fixed_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Results.csv");

        assert_eq!(write_report(&path, &[]).unwrap(), 0);

        let (header, rows) = read_rows(&path);
        assert_eq!(header, REPORT_FIELDS.iter().map(|f| f.to_string()).collect::<Vec<_>>());
        assert!(rows.is_empty());
    }

    #[test]
    fn missing_fields_are_blank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Results.csv");
        let records = vec![record(
            "10.0.0.2",
            &[("MACAddress", "001122334455"), ("PortSpeed", "N/A"), ("PortErrors", "0")],
        )];

        write_report(&path, &records).unwrap();

        let (header, rows) = read_rows(&path);
        assert_eq!(rows.len(), 1);
        let column = |name: &str| header.iter().position(|h| h == name).unwrap();
        assert_eq!(rows[0][column("MACAddress")], "001122334455");
        assert_eq!(rows[0][column("PortSpeed")], "N/A");
        assert_eq!(rows[0][column("modelNumber")], "");
        assert_eq!(rows[0].len(), REPORT_FIELDS.len());
    }

    #[test]
    fn values_with_delimiters_are_quoted() {
        let mut out = Vec::new();
        let records = vec![record(
            "10.0.0.2",
            &[("StatusErrors", "10/01/19 TFTP Timeout, retrying\r\n10/01/19 Error")],
        )];

        write_report_to(&mut out, &records).unwrap();

        let mut rdr = csv::Reader::from_reader(out.as_slice());
        let row = rdr.records().next().unwrap().unwrap();
        let position = REPORT_FIELDS.iter().position(|f| *f == "StatusErrors").unwrap();
        assert_eq!(&row[position], "10/01/19 TFTP Timeout, retrying\r\n10/01/19 Error");
    }

    #[test]
    fn unreachable_list_is_one_address_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_web_access_or_unreachable.txt");
        let devices: Vec<UnreachableDevice> = ["10.0.0.1", "10.0.0.7"]
            .iter()
            .map(|a| UnreachableDevice {
                address: a.to_string(),
                endpoint: Endpoint::NetworkConfiguration,
                reason: "refused".into(),
            })
            .collect();

        assert_eq!(write_unreachable(&path, &devices).unwrap(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "10.0.0.1\n10.0.0.7\n");
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn rewrite_replaces_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Results.csv");
        write_report(&path, &[record("10.0.0.2", &[]), record("10.0.0.3", &[])]).unwrap();
        write_report(&path, &[record("10.0.0.4", &[])]).unwrap();

        let (_, rows) = read_rows(&path);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn unwritable_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("Results.csv");

        let err = write_report(&path, &[]).unwrap_err();
        assert!(matches!(err, SurveyError::Io(_)));
    }

    #[test]
    fn address_list_round_trips_through_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ip_input.csv");
        write_address_list(&path, &["10.0.0.2".into(), "10.0.0.3".into()]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "10.0.0.2\n10.0.0.3\n");
    }
}
