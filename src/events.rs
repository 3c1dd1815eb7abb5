use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::HcpError;

pub const EV_COLUMNS: [&str; 3] = ["onset", "duration", "amplitude"];

/// Onset, duration and amplitude of one condition within one run, in
/// seconds except for the amplitude.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventTable {
    pub onset: Vec<f64>,
    pub duration: Vec<f64>,
    pub amplitude: Vec<f64>,
}

impl EventTable {
    pub fn len(&self) -> usize {
        self.onset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.onset.is_empty()
    }

    /// Column by name: `onset`, `duration` or `amplitude`.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        match name {
            "onset" => Some(&self.onset),
            "duration" => Some(&self.duration),
            "amplitude" => Some(&self.amplitude),
            _ => None,
        }
    }

    /// Rows as `(onset, duration, amplitude)`.
    pub fn rows(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.onset
            .iter()
            .zip(&self.duration)
            .zip(&self.amplitude)
            .map(|((onset, duration), amplitude)| (*onset, *duration, *amplitude))
    }

    pub fn read(path: &Path) -> Result<Self, HcpError> {
        if !path.is_file() {
            return Err(HcpError::MissingFile(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)
            .map_err(|err| HcpError::Filesystem(format!("read {}: {err}", path.display())))?;
        Self::parse(&content).map_err(|(line, message)| HcpError::EventParse {
            path: path.to_path_buf(),
            line,
            message,
        })
    }

    /// Whitespace-separated rows of three numbers. Blank lines and `#`
    /// comments are ignored.
    pub fn parse(content: &str) -> Result<Self, (usize, String)> {
        let mut table = EventTable::default();
        for (index, raw) in content.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let fields = line.split_whitespace().collect::<Vec<_>>();
            if fields.len() != EV_COLUMNS.len() {
                return Err((
                    index + 1,
                    format!("expected 3 columns, found {}", fields.len()),
                ));
            }
            let mut values = [0f64; 3];
            for (slot, field) in values.iter_mut().zip(&fields) {
                *slot = field
                    .parse()
                    .map_err(|_| (index + 1, format!("not a number: {field}")))?;
            }
            table.onset.push(values[0]);
            table.duration.push(values[1]);
            table.amplitude.push(values[2]);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_columns() {
        let table = EventTable::parse("36.0\t27.5\t1\n# note\n\n 108.2  27.5 1.0\n").unwrap();
        assert_eq!(table.onset, vec![36.0, 108.2]);
        assert_eq!(table.duration, vec![27.5, 27.5]);
        assert_eq!(table.amplitude, vec![1.0, 1.0]);
        assert_eq!(table.column("duration"), Some(&[27.5, 27.5][..]));
        assert_eq!(table.column("weight"), None);
    }

    #[test]
    fn single_row_is_one_event() {
        let table = EventTable::parse("8.0 2.0 1.0").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows().collect::<Vec<_>>(), vec![(8.0, 2.0, 1.0)]);
    }

    #[test]
    fn empty_file_is_empty_table() {
        let table = EventTable::parse("").unwrap();
        assert!(table.is_empty());
        assert!(table.amplitude.is_empty());
    }

    #[test]
    fn wrong_column_count_reports_line() {
        let err = EventTable::parse("1 2 3\n4 5\n").unwrap_err();
        assert_eq!(err.0, 2);
    }

    #[test]
    fn non_numeric_field() {
        let err = EventTable::parse("1 2 x\n").unwrap_err();
        assert_eq!(err, (1, "not a number: x".to_string()));
    }
}
