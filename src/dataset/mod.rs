//! Supervised fine-tuning samples and dataset loading.
//!
//! A dataset is a sequence of samples in one of two shapes: flat
//! instruction/input/output records ("alpaca") or alternating-turn dialogues
//! ("sharegpt"). Samples without ids get sequential ids assigned at load
//! time, in original order. Unknown fields are preserved so the result
//! artifact can carry the original record through unchanged.

use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DatasetError;

/// Shape of a dataset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DatasetFormat {
    /// Flat instruction/input/output records.
    Alpaca,
    /// Alternating user/assistant dialogue turns.
    ShareGpt,
}

/// One dialogue turn in a sharegpt-shaped sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub from: String,
    pub value: String,
}

/// A unit of work addressed by a stable integer id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversations: Vec<Turn>,
    /// Fields outside the known shape, carried through to the result record.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Sample {
    /// Number of request/response turn pairs in a dialogue sample.
    pub fn turn_pairs(&self) -> usize {
        self.conversations.len() / 2
    }

    /// Whether this sample takes the sequential multi-turn path.
    pub fn is_multi_turn(&self, format: DatasetFormat) -> bool {
        format == DatasetFormat::ShareGpt && self.turn_pairs() >= 2
    }
}

/// The instruction/input/output view a pipeline run operates on.
#[derive(Debug, Clone)]
pub struct SampleQuery {
    pub id: u64,
    pub instruction: String,
    pub input: String,
    pub output: String,
}

impl SampleQuery {
    /// Builds the single-turn query for a sample.
    ///
    /// Alpaca samples map directly; sharegpt samples use the first
    /// request/response pair.
    pub fn single_turn(sample: &Sample, format: DatasetFormat) -> Self {
        match format {
            DatasetFormat::Alpaca => Self {
                id: sample.id.unwrap_or_default(),
                instruction: sample.instruction.clone(),
                input: sample.input.clone(),
                output: sample.output.clone(),
            },
            DatasetFormat::ShareGpt => Self {
                id: sample.id.unwrap_or_default(),
                instruction: sample
                    .conversations
                    .first()
                    .map(|t| t.value.clone())
                    .unwrap_or_default(),
                input: String::new(),
                output: sample
                    .conversations
                    .get(1)
                    .map(|t| t.value.clone())
                    .unwrap_or_default(),
            },
        }
    }
}

/// A loaded dataset slice ready for scheduling.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub format: DatasetFormat,
    pub samples: Vec<Sample>,
}

impl Dataset {
    /// Loads a dataset file (JSON array or JSONL), assigns missing ids, and
    /// slices the requested index range.
    pub fn load(
        path: impl AsRef<Path>,
        format: DatasetFormat,
        start_index: usize,
        end_index: Option<usize>,
    ) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let path_text = path.display().to_string();
        info!(path = %path_text, format = ?format, "Loading dataset");

        let raw = std::fs::read_to_string(path).map_err(|source| DatasetError::Read {
            path: path_text.clone(),
            source,
        })?;

        let mut samples = parse_samples(&raw, &path_text)?;
        if samples.is_empty() {
            return Err(DatasetError::Empty(path_text));
        }

        for (index, sample) in samples.iter_mut().enumerate() {
            if sample.id.is_none() {
                sample.id = Some(index as u64);
            }
        }

        if format == DatasetFormat::ShareGpt {
            for sample in &samples {
                // Turns always come in request/response pairs.
                if sample.conversations.len() % 2 != 0 {
                    return Err(DatasetError::OddTurnCount {
                        id: sample.id.unwrap_or_default(),
                        turns: sample.conversations.len(),
                    });
                }
            }
        }

        let end = end_index.unwrap_or(samples.len()).min(samples.len());
        if start_index >= end {
            return Err(DatasetError::InvalidRange {
                start: start_index,
                end,
            });
        }
        let samples = samples.drain(start_index..end).collect::<Vec<_>>();

        info!(count = samples.len(), "Dataset loaded");
        Ok(Self { format, samples })
    }

    /// Number of samples in this slice.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the slice is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn parse_samples(raw: &str, path: &str) -> Result<Vec<Sample>, DatasetError> {
    // A whole-file JSON array first, JSONL as the fallback.
    if let Ok(samples) = serde_json::from_str::<Vec<Sample>>(raw) {
        return Ok(samples);
    }
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str::<Sample>(line).map_err(|e| DatasetError::Parse {
                path: path.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn loads_json_array_and_assigns_ids() {
        let file = write_temp(
            r#"[{"instruction": "a", "input": "", "output": "x"},
                {"instruction": "b", "input": "", "output": "y"}]"#,
        );
        let dataset = Dataset::load(file.path(), DatasetFormat::Alpaca, 0, None).expect("load");
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.samples[0].id, Some(0));
        assert_eq!(dataset.samples[1].id, Some(1));
    }

    #[test]
    fn loads_jsonl_lines() {
        let file = write_temp(
            "{\"instruction\": \"a\", \"output\": \"x\"}\n{\"instruction\": \"b\", \"output\": \"y\"}\n",
        );
        let dataset = Dataset::load(file.path(), DatasetFormat::Alpaca, 0, None).expect("load");
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.samples[1].instruction, "b");
    }

    #[test]
    fn preserves_unknown_fields() {
        let file = write_temp(r#"[{"instruction": "a", "output": "x", "source": "web"}]"#);
        let dataset = Dataset::load(file.path(), DatasetFormat::Alpaca, 0, None).expect("load");
        assert_eq!(
            dataset.samples[0].extra.get("source"),
            Some(&serde_json::Value::String("web".to_string()))
        );
    }

    #[test]
    fn rejects_odd_turn_counts() {
        let file = write_temp(
            r#"[{"conversations": [
                {"from": "human", "value": "q"},
                {"from": "gpt", "value": "a"},
                {"from": "human", "value": "q2"}]}]"#,
        );
        let err = Dataset::load(file.path(), DatasetFormat::ShareGpt, 0, None).unwrap_err();
        match err {
            DatasetError::OddTurnCount { turns, .. } => assert_eq!(turns, 3),
            other => panic!("expected OddTurnCount, got {:?}", other),
        }
    }

    #[test]
    fn slices_index_range() {
        let file = write_temp(
            r#"[{"instruction": "a", "output": "x"},
                {"instruction": "b", "output": "y"},
                {"instruction": "c", "output": "z"}]"#,
        );
        let dataset = Dataset::load(file.path(), DatasetFormat::Alpaca, 1, Some(2)).expect("load");
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.samples[0].id, Some(1));
    }

    #[test]
    fn read_error_reports_the_path() {
        let err =
            Dataset::load("/nonexistent/data.json", DatasetFormat::Alpaca, 0, None).unwrap_err();
        match err {
            DatasetError::Read { path, .. } => assert!(path.contains("data.json")),
            other => panic!("expected Read error, got {:?}", other),
        }
    }

    #[test]
    fn invalid_range_is_rejected() {
        let file = write_temp(r#"[{"instruction": "a", "output": "x"}]"#);
        let err = Dataset::load(file.path(), DatasetFormat::Alpaca, 5, None).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidRange { .. }));
    }

    #[test]
    fn sharegpt_single_turn_query_uses_first_pair() {
        let sample = Sample {
            id: Some(3),
            instruction: String::new(),
            input: String::new(),
            output: String::new(),
            conversations: vec![
                Turn {
                    from: "human".to_string(),
                    value: "question".to_string(),
                },
                Turn {
                    from: "gpt".to_string(),
                    value: "answer".to_string(),
                },
            ],
            extra: serde_json::Map::new(),
        };
        let query = SampleQuery::single_turn(&sample, DatasetFormat::ShareGpt);
        assert_eq!(query.instruction, "question");
        assert_eq!(query.output, "answer");
        assert!(!sample.is_multi_turn(DatasetFormat::ShareGpt));
    }
}
