use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThermoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("No thermo output found in log")]
    NoThermoOutput,
}

/// The thermo output of a single `run` command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThermoTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl ThermoTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, matched case-insensitively (`temp` finds `Temp`).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    pub fn last(&self, name: &str) -> Option<f64> {
        let idx = self.column_index(name)?;
        self.rows.last().map(|r| r[idx])
    }

    /// Mean of a column over the last `fraction` of the rows (at least one row).
    pub fn trailing_mean(&self, name: &str, fraction: f64) -> Option<f64> {
        let values = self.column(name)?;
        if values.is_empty() {
            return None;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        let count = ((values.len() as f64 * fraction).ceil() as usize).max(1);
        let tail = &values[values.len() - count..];
        Some(tail.iter().sum::<f64>() / tail.len() as f64)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ThermoError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.columns)?;
        for row in &self.rows {
            csv_writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_csv_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ThermoError> {
        self.write_csv(File::create(path)?)
    }
}

/// Something recognized in one line of simulator output.
#[derive(Debug, Clone, PartialEq)]
pub enum ThermoEvent {
    Header(Vec<String>),
    Row(Vec<f64>),
    End,
}

/// Incremental recognizer for thermo tables in LAMMPS output.
///
/// Feed it the log (or stdout) one line at a time. A header starts with
/// `Step`; rows are lines of exactly as many numbers as there are columns;
/// `Loop time` closes the table. Anything else (warnings, neighbor list
/// summaries) is ignored.
#[derive(Debug, Default)]
pub struct ThermoScanner {
    columns: Option<usize>,
}

impl ThermoScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, line: &str) -> Option<ThermoEvent> {
        let trimmed = line.trim();
        if trimmed.starts_with("Loop time") {
            return self.columns.take().map(|_| ThermoEvent::End);
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.first() == Some(&"Step") {
            self.columns = Some(fields.len());
            return Some(ThermoEvent::Header(
                fields.into_iter().map(str::to_string).collect(),
            ));
        }

        let expected = self.columns?;
        if fields.len() != expected {
            return None;
        }
        let values: Option<Vec<f64>> = fields.iter().map(|f| f.parse().ok()).collect();
        values.map(ThermoEvent::Row)
    }
}

/// Every thermo table printed during a LAMMPS session, in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThermoLog {
    pub runs: Vec<ThermoTable>,
}

impl ThermoLog {
    pub fn parse(reader: &mut impl BufRead) -> Result<Self, ThermoError> {
        let mut scanner = ThermoScanner::new();
        let mut runs = Vec::new();
        let mut current: Option<ThermoTable> = None;

        for line in reader.lines() {
            match scanner.feed(&line?) {
                Some(ThermoEvent::Header(columns)) => {
                    runs.extend(current.take());
                    current = Some(ThermoTable {
                        columns,
                        rows: Vec::new(),
                    });
                }
                Some(ThermoEvent::Row(row)) => {
                    if let Some(table) = current.as_mut() {
                        table.rows.push(row);
                    }
                }
                Some(ThermoEvent::End) => runs.extend(current.take()),
                None => {}
            }
        }
        // A truncated log (simulator killed mid-run) still yields its rows.
        runs.extend(current.take());

        if runs.is_empty() {
            return Err(ThermoError::NoThermoOutput);
        }
        Ok(Self { runs })
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ThermoError> {
        let file = File::open(path)?;
        Self::parse(&mut BufReader::new(file))
    }

    pub fn last_run(&self) -> Option<&ThermoTable> {
        self.runs.last()
    }
}
