use std::path::{Path, PathBuf};

use crate::error::MigrationError;

/// Header prepended to generated files that call the UUID generator without
/// requiring its extension.
pub const UUID_EXTENSION_HEADER: &str =
    "-- Extension UUID requise\nCREATE EXTENSION IF NOT EXISTS \"uuid-ossp\";\n\n";

/// Post-generation artifact fixup: opens the newest `.sql` file in the
/// migration directory and, when its body uses `uuid_generate_v4()` without a
/// `CREATE EXTENSION … uuid-ossp` statement, prepends the extension header.
/// Returns the touched path so the caller can re-seal the digest.
pub async fn inject_uuid_extension(dir: &Path) -> Result<Option<PathBuf>, MigrationError> {
    let Some(path) = newest_sql_file(dir).await? else {
        return Ok(None);
    };

    let body = tokio::fs::read_to_string(&path).await?;
    if !needs_uuid_extension(&body) {
        return Ok(None);
    }

    let patched = format!("{UUID_EXTENSION_HEADER}{body}");
    tokio::fs::write(&path, patched).await?;
    tracing::info!(file = %path.display(), "injected uuid-ossp extension into generated migration");
    Ok(Some(path))
}

/// Generated files carry a sortable timestamp prefix, so the lexicographically
/// greatest file name is the newest artifact.
async fn newest_sql_file(dir: &Path) -> Result<Option<PathBuf>, MigrationError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut newest: Option<(String, PathBuf)> = None;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("sql") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
            continue;
        };
        match &newest {
            Some((current, _)) if *current >= name => {}
            _ => newest = Some((name, path)),
        }
    }

    Ok(newest.map(|(_, path)| path))
}

pub fn needs_uuid_extension(body: &str) -> bool {
    body.contains("uuid_generate_v4()") && !has_uuid_extension(body)
}

fn has_uuid_extension(body: &str) -> bool {
    body.lines().any(|line| {
        let lower = line.to_lowercase();
        lower.contains("create extension") && lower.contains("uuid-ossp")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, body).await.unwrap();
        path
    }

    #[tokio::test]
    async fn prepends_extension_when_generator_is_used_without_it() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "20250101120000_initial_schema_from_sql_files.sql",
            "CREATE TABLE patients (id uuid DEFAULT uuid_generate_v4());\n",
        )
        .await;

        let touched = inject_uuid_extension(dir.path()).await.unwrap();
        assert_eq!(touched.as_deref(), Some(path.as_path()));

        let body = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(body.starts_with("-- Extension UUID requise\n"));
        assert!(body.contains("CREATE EXTENSION IF NOT EXISTS \"uuid-ossp\";"));
        assert!(body.contains("CREATE TABLE patients"));
    }

    #[tokio::test]
    async fn leaves_files_that_already_require_the_extension() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "20250101120000_init.sql",
            "CREATE EXTENSION IF NOT EXISTS \"uuid-ossp\";\nCREATE TABLE t (id uuid DEFAULT uuid_generate_v4());\n",
        )
        .await;

        assert!(inject_uuid_extension(dir.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn leaves_files_without_the_generator() {
        let dir = TempDir::new().unwrap();
        write(&dir, "20250101120000_init.sql", "CREATE TABLE t (id bigserial);\n").await;

        assert!(inject_uuid_extension(dir.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn only_the_newest_artifact_is_inspected() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "20250101120000_old.sql",
            "CREATE TABLE a (id uuid DEFAULT uuid_generate_v4());\n",
        )
        .await;
        let newest = write(&dir, "20250202120000_new.sql", "DROP TABLE a;\n").await;

        assert!(inject_uuid_extension(dir.path()).await.unwrap().is_none());

        let untouched = tokio::fs::read_to_string(&newest).await.unwrap();
        assert_eq!(untouched, "DROP TABLE a;\n");
    }

    #[tokio::test]
    async fn empty_directory_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        assert!(inject_uuid_extension(dir.path()).await.unwrap().is_none());
    }
}
