/// Heuristic names for drift migrations. The output is informational only:
/// callers rely on it being non-empty, carrying at most three classification
/// tokens and ending with the change count.
pub fn derive_migration_name(changes: &[String]) -> String {
    if changes.is_empty() {
        return "empty_schema_sync".to_string();
    }

    let mut tokens: Vec<&'static str> = Vec::new();
    let mut tables: Vec<String> = Vec::new();
    let mut every_change_names_a_table = true;

    for change in changes {
        let lower = change.to_lowercase();

        if let Some(token) = classify(&lower) {
            if !tokens.contains(&token) && tokens.len() < 3 {
                tokens.push(token);
            }
        }

        match table_name(&lower) {
            Some(table) => {
                if !tables.contains(&table) {
                    tables.push(table);
                }
            }
            None => every_change_names_a_table = false,
        }
    }

    let mut name = if tokens.is_empty() {
        "schema_changes".to_string()
    } else {
        tokens.join("_")
    };

    if every_change_names_a_table && tables.len() == 1 {
        name.push('_');
        name.push_str(&tables[0]);
    }

    format!("{name}_{}_changes", changes.len())
}

fn classify(lower: &str) -> Option<&'static str> {
    if lower.contains("create table") {
        Some("create_table")
    } else if lower.contains("drop table") {
        Some("drop_table")
    } else if lower.contains("alter table") {
        Some("alter_table")
    } else if lower.contains("create index") || lower.contains("create unique index") {
        Some("create_index")
    } else if lower.contains("drop index") {
        Some("drop_index")
    } else {
        None
    }
}

/// Unqualified table name following the `table` keyword, quotes and schema
/// prefix stripped.
fn table_name(lower: &str) -> Option<String> {
    let mut words = lower.split_whitespace().peekable();
    while let Some(word) = words.next() {
        if word == "table" {
            let mut raw = words.next()?;
            for noise in ["if", "not", "exists"] {
                if raw == noise {
                    raw = words.next()?;
                }
            }
            let unqualified = raw.rsplit('.').next().unwrap_or(raw);
            let cleaned: String = unqualified
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            return Some(cleaned);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn no_changes_is_an_empty_sync() {
        assert_eq!(derive_migration_name(&[]), "empty_schema_sync");
    }

    #[test]
    fn unclassifiable_changes_fall_back_to_schema_changes() {
        let name = derive_migration_name(&lines(&["COMMENT ON COLUMN x.y IS 'z'"]));
        assert!(name.starts_with("schema_changes"));
        assert!(name.ends_with("_1_changes"));
    }

    #[test]
    fn single_table_changes_carry_the_table_name() {
        let name = derive_migration_name(&lines(&[
            "CREATE TABLE \"public\".\"patients\" (id uuid)",
            "ALTER TABLE \"public\".\"patients\" ADD COLUMN dob date",
        ]));
        assert!(name.contains("create_table"));
        assert!(name.contains("alter_table"));
        assert!(name.contains("patients"));
        assert!(name.ends_with("_2_changes"));
    }

    #[test]
    fn classification_tokens_are_capped_at_three() {
        let name = derive_migration_name(&lines(&[
            "CREATE TABLE a (x int)",
            "DROP TABLE b",
            "ALTER TABLE c ADD COLUMN y int",
            "CREATE INDEX idx_a ON a (x)",
            "DROP INDEX idx_b",
        ]));

        let known = [
            "create_table",
            "drop_table",
            "alter_table",
            "create_index",
            "drop_index",
        ];
        let count = known.iter().filter(|token| name.contains(*token)).count();
        assert!(count <= 3, "too many classification tokens in {name}");
        assert!(name.ends_with("_5_changes"));
    }

    #[test]
    fn multi_table_changes_do_not_carry_a_table_name() {
        let name = derive_migration_name(&lines(&[
            "CREATE TABLE patients (id uuid)",
            "CREATE TABLE visites (id uuid)",
        ]));
        assert!(!name.contains("patients"));
        assert!(!name.contains("visites"));
        assert!(name.ends_with("_2_changes"));
    }

    #[test]
    fn index_only_changes_never_name_a_table() {
        let name = derive_migration_name(&lines(&["DROP INDEX idx_patients_nom"]));
        assert!(name.contains("drop_index"));
        assert!(name.ends_with("_1_changes"));
    }
}
