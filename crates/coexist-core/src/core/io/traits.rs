use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for text file formats exchanged with the simulator.
///
/// Implementors parse from any buffered reader and serialize to any writer;
/// the path helpers wrap those in buffered file handles.
pub trait SimulatorFile: Sized {
    /// The error type for I/O and parse failures.
    type Error: Error + From<io::Error>;

    /// Parses the format from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead) -> Result<Self, Self::Error>;

    /// Serializes the format to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(&self, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads the format from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes the format to a file path, replacing any existing file.
    fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
