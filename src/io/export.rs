//! CSV export for sampled telemetry snapshots.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::telemetry::TelemetrySnapshot;

/// Column header for CSV telemetry export.
const HEADER: &str = "timestamp,solar_kw,teg_kw,generation_kw,load_kw,\
                       battery_soc_pct,charging_rate_kw,deficit_kw,shedding_level,\
                       grid_import_kw,grid_export_kw,grid_sync,hot_water_temp_c,\
                       efficiency_pct,fault_risk_pct,alert_count";

/// Exports snapshots to a CSV file at the given path.
///
/// Writes a header row followed by one data row per snapshot, in order.
///
/// # Arguments
///
/// * `snapshots` - Sampled snapshots, oldest first
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(snapshots: &[TelemetrySnapshot], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(snapshots, buf)
}

/// Writes snapshots as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(snapshots: &[TelemetrySnapshot], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for s in snapshots {
        wtr.write_record(&[
            s.timestamp.clone(),
            format!("{:.2}", s.solar_output_kw),
            format!("{:.2}", s.teg_output_kw),
            format!("{:.2}", s.total_generation_kw),
            format!("{:.2}", s.total_load_kw),
            format!("{:.1}", s.battery_soc_pct),
            format!("{:.2}", s.charging_rate_kw),
            format!("{:.2}", s.energy_deficit_kw),
            s.load_shedding_level.to_string(),
            format!("{:.2}", s.grid_power_import_kw),
            format!("{:.2}", s.grid_power_export_kw),
            s.grid_sync_status.to_string(),
            format!("{:.1}", s.hot_water_temp_c),
            format!("{:.1}", s.efficiency_pct),
            s.fault_risk_pct.to_string(),
            s.alerts.len().to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::clock::ClockSample;
    use crate::sim::draws::ScriptedDraws;
    use crate::telemetry::TelemetryGenerator;

    fn series(n: i64) -> Vec<TelemetrySnapshot> {
        let generator = TelemetryGenerator::default();
        let mut draws = ScriptedDraws::constant(0.5);
        let start = ClockSample::utc(2024, 6, 15, 6, 0, 0).unwrap();
        (0..n)
            .map(|h| generator.generate(&start.plus_hours(h), &mut draws))
            .collect()
    }

    #[test]
    fn header_and_row_count() {
        let mut buf = Vec::new();
        write_csv(&series(6), &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with("timestamp,solar_kw,teg_kw,generation_kw"));
        assert!(lines[0].ends_with("fault_risk_pct,alert_count"));
    }

    #[test]
    fn rows_parse_back() {
        let snapshots = series(3);
        let mut buf = Vec::new();
        write_csv(&snapshots, &mut buf).unwrap();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        assert_eq!(rdr.headers().unwrap().len(), 16);
        for (rec, snap) in rdr.records().zip(&snapshots) {
            let rec = rec.unwrap();
            assert_eq!(&rec[0], snap.timestamp);
            let generation: f64 = rec[3].parse().unwrap();
            assert!((generation - snap.total_generation_kw).abs() < 0.005);
            let level: u8 = rec[8].parse().unwrap();
            assert_eq!(level, snap.load_shedding_level.as_u8());
            assert!(matches!(&rec[11], "synchronized" | "islanded"));
        }
    }

    #[test]
    fn empty_series_writes_header_only() {
        let mut buf = Vec::new();
        write_csv(&[], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }
}
