use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use uuid::Uuid;

/// Recording produced when a capture stops
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub capture_id: Uuid,
    /// WAV-encoded audio
    pub wav: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_count: usize,
}

impl AudioArtifact {
    pub fn encode(capture_id: Uuid, samples: &[i16], sample_rate: u32, channels: u16) -> Result<Self> {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).context("Failed to start WAV encoder")?;
            for &sample in samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            writer.finalize().context("Failed to finalize WAV")?;
        }

        Ok(Self {
            capture_id,
            wav: cursor.into_inner(),
            sample_rate,
            channels,
            sample_count: samples.len(),
        })
    }

    pub fn duration_seconds(&self) -> f64 {
        self.sample_count as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    /// Decode the WAV payload back into samples
    pub fn samples(&self) -> Result<Vec<i16>> {
        let reader = WavReader::new(Cursor::new(self.wav.as_slice())).context("Failed to open WAV data")?;
        reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")
    }
}
