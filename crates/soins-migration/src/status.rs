use crate::error::MigrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLabel {
    Pending,
    UpToDate,
}

/// Parsed view of the tool's free-form `status` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub label: StatusLabel,
    pub current_version: Option<String>,
    pub executed: u64,
    pub pending: u64,
}

impl MigrationStatus {
    /// Scans the output line by line. Recognized markers:
    /// `Migration Status:` (PENDING / UP TO DATE / OK / Already at latest
    /// version), `Current Version:`, `Executed Files:`, `Pending Files:`.
    /// `No migration applied yet` forces an empty executed count.
    pub fn parse(raw: &str) -> Result<Self, MigrationError> {
        let mut label = None;
        let mut current_version = None;
        let mut executed = None;
        let mut pending = None;
        let mut nothing_applied = false;

        for line in raw.lines() {
            if let Some(rest) = after_marker(line, "Migration Status:") {
                let upper = rest.to_uppercase();
                if upper.contains("PENDING") {
                    label = Some(StatusLabel::Pending);
                } else if upper.contains("UP TO DATE")
                    || upper.contains("OK")
                    || upper.contains("ALREADY AT LATEST VERSION")
                {
                    label = Some(StatusLabel::UpToDate);
                }
            } else if let Some(rest) = after_marker(line, "Current Version:") {
                let value = rest.trim();
                if !value.is_empty() && value != "--" {
                    current_version = Some(value.to_string());
                }
            } else if let Some(rest) = after_marker(line, "Executed Files:") {
                executed = first_integer(rest);
            } else if let Some(rest) = after_marker(line, "Pending Files:") {
                pending = first_integer(rest);
            }

            if line.contains("No migration applied yet") {
                nothing_applied = true;
            }
        }

        let label = label.ok_or_else(|| MigrationError::StatusUnparseable(raw.to_string()))?;
        if nothing_applied {
            executed = Some(0);
            current_version = None;
        }

        Ok(Self {
            label,
            current_version,
            executed: executed.unwrap_or(0),
            pending: pending.unwrap_or(0),
        })
    }
}

fn after_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.find(marker).map(|pos| &line[pos + marker.len()..])
}

fn first_integer(text: &str) -> Option<u64> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pending_status() {
        let raw = "\
Migration Status: PENDING
  -- Current Version: 20240101120000
  -- Next Version:    20240201120000
  -- Executed Files:  3
  -- Pending Files:   2
";
        let status = MigrationStatus::parse(raw).unwrap();
        assert_eq!(status.label, StatusLabel::Pending);
        assert_eq!(status.current_version.as_deref(), Some("20240101120000"));
        assert_eq!(status.executed, 3);
        assert_eq!(status.pending, 2);
    }

    #[test]
    fn parses_up_to_date_with_ok_marker() {
        let raw = "Migration Status: OK\n  -- Executed Files: 7\n  -- Pending Files: 0\n";
        let status = MigrationStatus::parse(raw).unwrap();
        assert_eq!(status.label, StatusLabel::UpToDate);
        assert_eq!(status.executed, 7);
        assert_eq!(status.pending, 0);
    }

    #[test]
    fn already_at_latest_version_means_up_to_date() {
        let raw = "Migration Status: Already at latest version\n";
        let status = MigrationStatus::parse(raw).unwrap();
        assert_eq!(status.label, StatusLabel::UpToDate);
    }

    #[test]
    fn no_migration_applied_yet_zeroes_the_executed_count() {
        let raw = "\
Migration Status: UP TO DATE
  -- Current Version: No migration applied yet
  -- Executed Files:  0
  -- Pending Files:   0
";
        let status = MigrationStatus::parse(raw).unwrap();
        assert_eq!(status.executed, 0);
        assert_eq!(status.current_version, None);
    }

    #[test]
    fn output_without_a_status_line_is_unparseable() {
        let err = MigrationStatus::parse("atlas: something unexpected\n").unwrap_err();
        assert!(matches!(err, MigrationError::StatusUnparseable(_)));
    }
}
