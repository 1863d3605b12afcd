use std::io::Write;

use serde::{Deserialize, Serialize};
use streak_core::TrialRecord;

use crate::error::RecordError;

/// A trial slot given up after too many early responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonedTrial {
    pub block: String,
    pub trial_index: usize,
    pub block_trial: usize,
    pub early_responses: u32,
    pub at_ms: u64,
}

/// Sink for finished trials. Takes ownership of each record.
pub trait Recorder {
    fn append(&mut self, record: TrialRecord) -> Result<(), RecordError>;

    fn abandoned(&mut self, notice: AbandonedTrial) -> Result<(), RecordError> {
        tracing::warn!(
            block = %notice.block,
            trial = notice.trial_index,
            early = notice.early_responses,
            "trial abandoned"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRecorder {
    pub records: Vec<TrialRecord>,
    pub abandoned: Vec<AbandonedTrial>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Recorder for MemoryRecorder {
    fn append(&mut self, record: TrialRecord) -> Result<(), RecordError> {
        self.records.push(record);
        Ok(())
    }

    fn abandoned(&mut self, notice: AbandonedTrial) -> Result<(), RecordError> {
        self.abandoned.push(notice);
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Line<'a> {
    Trial(&'a TrialRecord),
    Abandoned(&'a AbandonedTrial),
}

/// Writes one JSON object per line.
pub struct JsonLinesRecorder<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesRecorder<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &Line<'_>) -> Result<(), RecordError> {
        serde_json::to_writer(&mut self.out, line)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> Recorder for JsonLinesRecorder<W> {
    fn append(&mut self, record: TrialRecord) -> Result<(), RecordError> {
        self.write_line(&Line::Trial(&record))
    }

    fn abandoned(&mut self, notice: AbandonedTrial) -> Result<(), RecordError> {
        self.write_line(&Line::Abandoned(&notice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abandoned_notice_is_tagged() {
        let mut rec = JsonLinesRecorder::new(Vec::new());
        rec.abandoned(AbandonedTrial {
            block: "R1".into(),
            trial_index: 3,
            block_trial: 3,
            early_responses: 4,
            at_ms: 12_000,
        })
        .unwrap();
        let text = String::from_utf8(rec.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["type"], "abandoned");
        assert_eq!(value["early_responses"], 4);
        assert!(text.ends_with('\n'));
    }
}
