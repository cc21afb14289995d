use std::{
    fs::File,
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use evopolicy_env::{FrameExporter, Recording};

#[derive(Debug)]
pub enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::from_output_path(output_path)?;
        output.write_json(value)
    }

    pub fn from_output_path(output_path: Option<PathBuf>) -> anyhow::Result<Self> {
        match output_path {
            Some(path) => Output::open(path),
            None => Ok(Output::stdout()),
        }
    }

    pub fn stdout() -> Self {
        Output::Stdout {
            writer: io::stdout().lock(),
        }
    }

    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn display_path(&self) -> String {
        match self {
            Output::Stdout { .. } => "stdout".to_string(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn write_json<T>(&mut self, value: T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer_pretty(&mut *self, &value)
            .with_context(|| format!("Failed to write JSON to {}", self.display_path()))?;
        writeln!(&mut *self).with_context(|| {
            format!(
                "Failed to write newline after JSON to {}",
                self.display_path()
            )
        })?;
        self.flush()
            .with_context(|| format!("Failed to flush output to {}", self.display_path()))?;
        Ok(())
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout { writer } => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout { writer } => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Writes recorded frames as a JSON array of `{width, height, pixels}` objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFrameExporter;

impl FrameExporter for JsonFrameExporter {
    type Error = anyhow::Error;

    fn export(&self, recording: &Recording) -> anyhow::Result<()> {
        Output::save_json(&recording.frames, Some(recording.path.clone()))?;
        log::info!(
            "Saved {} frames to {}",
            recording.frames.len(),
            recording.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use evopolicy_env::Frame;

    use super::*;

    #[test]
    fn test_exported_frames_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let recording = Recording {
            path: dir.path().join("frames.json"),
            frames: vec![Frame::filled(2, 1, [1, 2, 3]), Frame::filled(2, 1, [4, 5, 6])],
        };
        JsonFrameExporter.export(&recording).unwrap();
        let frames: Vec<Frame> = read_json_file("frames", &recording.path).unwrap();
        assert_eq!(frames, recording.frames);
    }

    #[test]
    fn test_missing_file_reports_kind_and_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = read_json_file::<Vec<u8>, _>("model", &path).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("model"));
        assert!(message.contains("absent.json"));
    }
}
