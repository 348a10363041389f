use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;

pub const VCF_EXTENSION: &str = "vcf";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("patient id '{0}' cannot be used as a file name")]
    UnsafeFileName(String),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write document for patient {patient}: {source}")]
    Stream {
        patient: String,
        #[source]
        source: io::Error,
    },
}

/// Destination for finished per-patient documents.
pub trait PatientSink {
    fn accept(&mut self, patient: &str, document: &str) -> Result<(), OutputError>;
}

impl<T: PatientSink + ?Sized> PatientSink for Box<T> {
    fn accept(&mut self, patient: &str, document: &str) -> Result<(), OutputError> {
        (**self).accept(patient, document)
    }
}

/// Writes `<dir>/<patient>.vcf` for every patient.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self, OutputError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| OutputError::Write {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            written: Vec::new(),
        })
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn path_for(&self, patient: &str) -> Result<PathBuf, OutputError> {
        if !is_safe_file_stem(patient) {
            return Err(OutputError::UnsafeFileName(patient.to_string()));
        }
        Ok(self.dir.join(format!("{patient}.{VCF_EXTENSION}")))
    }
}

impl PatientSink for DirectorySink {
    fn accept(&mut self, patient: &str, document: &str) -> Result<(), OutputError> {
        let path = self.path_for(patient)?;
        fs::write(&path, document).map_err(|source| OutputError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::info!(patient, path = %path.display(), "wrote VCF");
        self.written.push(path);
        Ok(())
    }
}

/// Concatenates every document onto one stream.
pub struct WriterSink<W> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<io::BufWriter<io::Stdout>> {
    pub fn stdout() -> Self {
        Self::new(io::BufWriter::new(io::stdout()))
    }
}

impl<W: Write> PatientSink for WriterSink<W> {
    fn accept(&mut self, patient: &str, document: &str) -> Result<(), OutputError> {
        self.writer
            .write_all(document.as_bytes())
            .and_then(|()| self.writer.flush())
            .map_err(|source| OutputError::Stream {
                patient: patient.to_string(),
                source,
            })
    }
}

fn is_safe_file_stem(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
