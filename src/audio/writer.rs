use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{info, warn};

use super::capture::{AudioFrame, SAMPLE_RATE};

/// The finished audio artifact for a recording.
#[derive(Debug, Clone)]
pub struct RecordingArtifact {
    pub file_path: PathBuf,
    pub sample_count: usize,
    pub duration_secs: f64,
}

/// Writes captured frames to a single WAV file.
pub struct RecordingWriter {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    file_path: PathBuf,
    sample_count: usize,
}

impl RecordingWriter {
    pub fn create(file_path: PathBuf) -> Result<Self> {
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).context("Failed to create recordings directory")?;
        }

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&file_path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", file_path))?;

        info!("Recording artifact: {:?}", file_path);

        Ok(Self {
            writer: Some(writer),
            file_path,
            sample_count: 0,
        })
    }

    pub fn write_frame(&mut self, frame: &AudioFrame) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            for &sample in &frame.samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            self.sample_count += frame.samples.len();
        }
        Ok(())
    }

    pub fn finalize(mut self) -> Result<RecordingArtifact> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().context("Failed to finalize WAV file")?;
        }

        Ok(RecordingArtifact {
            file_path: self.file_path.clone(),
            sample_count: self.sample_count,
            duration_secs: self.sample_count as f64 / SAMPLE_RATE as f64,
        })
    }
}

impl Drop for RecordingWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(samples: Vec<i16>, sequence: u64) -> AudioFrame {
        AudioFrame {
            samples,
            sequence,
            timestamp_ms: sequence * 256,
        }
    }

    #[test]
    fn test_writer_finalizes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording.wav");

        let mut writer = RecordingWriter::create(path.clone()).unwrap();
        writer.write_frame(&frame(vec![0i16; 4096], 0)).unwrap();
        writer.write_frame(&frame(vec![100i16; 4096], 1)).unwrap();

        let artifact = writer.finalize().unwrap();
        assert_eq!(artifact.sample_count, 8192);
        assert!((artifact.duration_secs - 0.512).abs() < 1e-9);

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len(), 8192);
    }

    #[test]
    fn test_writer_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/recording.wav");

        let writer = RecordingWriter::create(path.clone()).unwrap();
        drop(writer);

        assert!(path.exists());
    }
}
