use super::*;

impl ScanReporter {
    pub fn json_format<W: std::io::Write>(
        &self,
        mut writer: W,
        reports: &[ScanReport],
    ) -> Result<()> {
        let records = self.build_service_records(reports);
        if !records.is_empty() {
            serde_json::to_writer_pretty(&mut writer, &records)?;
            writeln!(writer)?;
        }
        Ok(())
    }

    pub fn jsonl_format<W: std::io::Write>(
        &self,
        mut writer: W,
        reports: &[ScanReport],
    ) -> Result<()> {
        let records = self.build_service_records(reports);
        for record in records {
            serde_json::to_writer(&mut writer, &record)?;
            writeln!(writer)?;
        }
        Ok(())
    }
}
