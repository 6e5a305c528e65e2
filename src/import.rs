//! # Resident Bulk Import
//!
//! Imports resident accounts from a parsed spreadsheet payload. Rows are
//! processed in bounded-concurrency batches; every row either succeeds or is
//! reported individually, so one malformed row never aborts the run.
//! Re-running an import is idempotent: rows are upserted by email.

use metrics::counter;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use utoipa::ToSchema;

use crate::auth::{self, AccountStatus, Role, hash_password};
use crate::config::ImportConfig;
use crate::error::ApiError;
use crate::repositories::principal::{CreatePrincipalRequest, PrincipalRepository};

/// One resident row from the uploaded sheet. Field names follow the sheet's
/// column headers.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    pub email: String,
    /// Initial password; an unguessable one is generated when absent
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Row sequence number from the sheet
    #[serde(default)]
    pub sequence: Option<u32>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub sub_unit: Option<String>,
    #[serde(default)]
    pub qr_text: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub ownership_ratio: Option<f64>,
    /// Account status; anything but "disabled" imports as active
    #[serde(default)]
    pub status: Option<String>,
}

impl ImportRow {
    /// Pack the household columns into the JSON document stored on the
    /// principal. Absent columns are omitted entirely.
    fn household(&self) -> Option<serde_json::Value> {
        let mut fields = serde_json::Map::new();

        if let Some(sequence) = self.sequence {
            fields.insert("sequence".to_string(), sequence.into());
        }
        for (key, value) in [
            ("unit", &self.unit),
            ("subUnit", &self.sub_unit),
            ("qrText", &self.qr_text),
            ("address", &self.address),
            ("area", &self.area),
        ] {
            if let Some(value) = value {
                fields.insert(key.to_string(), value.clone().into());
            }
        }
        if let Some(ratio) = self.ownership_ratio {
            fields.insert("ownershipRatio".to_string(), ratio.into());
        }

        if fields.is_empty() {
            None
        } else {
            Some(serde_json::Value::Object(fields))
        }
    }
}

/// A row the import could not apply.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RowFailure {
    /// 1-based position of the row in the uploaded sheet
    pub row: usize,
    pub email: String,
    pub reason: String,
}

/// Outcome of an import run. `succeeded + failed == total` always holds.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImportReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<RowFailure>,
}

/// Import resident rows into a community.
///
/// Rows are chunked by the configured batch size and each chunk runs its
/// rows concurrently. New accounts get an unguessable generated password;
/// residents pick their own through the password reset flow.
pub async fn run_import(
    db: &DatabaseConnection,
    config: &ImportConfig,
    community_slug: &str,
    rows: Vec<ImportRow>,
) -> Result<ImportReport, ApiError> {
    if rows.len() > config.max_rows {
        let message = format!(
            "Import exceeds the {} row limit ({} rows)",
            config.max_rows,
            rows.len()
        );
        return Err(crate::error::validation_error(
            &message,
            serde_json::json!({ "max_rows": config.max_rows, "rows": rows.len() }),
        ));
    }

    let total = rows.len();
    let mut failures = Vec::new();

    let batch_size = config.batch_size.max(1);
    for (chunk_index, chunk) in rows.chunks(batch_size).enumerate() {
        let mut tasks: JoinSet<Result<(), RowFailure>> = JoinSet::new();

        for (offset, row) in chunk.iter().cloned().enumerate() {
            let row_number = chunk_index * batch_size + offset + 1;
            let db = db.clone();
            let community_slug = community_slug.to_string();

            tasks.spawn(async move {
                import_row(&db, &community_slug, row_number, row).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(failure)) => failures.push(failure),
                Err(join_error) => {
                    // A panicked task loses its row context; surface what we have.
                    tracing::error!(%join_error, "Import worker task failed");
                    failures.push(RowFailure {
                        row: 0,
                        email: String::new(),
                        reason: "internal import worker failure".to_string(),
                    });
                }
            }
        }
    }

    failures.sort_by_key(|failure| failure.row);

    let failed = failures.len();
    let report = ImportReport {
        total,
        succeeded: total - failed,
        failed,
        failures,
    };

    counter!("courtyard_import_rows_total", "outcome" => "succeeded")
        .increment(report.succeeded as u64);
    counter!("courtyard_import_rows_total", "outcome" => "failed").increment(report.failed as u64);
    tracing::info!(
        community_slug,
        total = report.total,
        succeeded = report.succeeded,
        failed = report.failed,
        "Resident import finished"
    );

    Ok(report)
}

async fn import_row(
    db: &DatabaseConnection,
    community_slug: &str,
    row_number: usize,
    row: ImportRow,
) -> Result<(), RowFailure> {
    let failure = |reason: String| RowFailure {
        row: row_number,
        email: row.email.clone(),
        reason,
    };

    // A sheet may carry an initial password; otherwise new accounts get an
    // unguessable placeholder. Existing accounts keep their password either
    // way: the upsert never touches the stored hash.
    let initial_password = match &row.password {
        Some(password) => password.clone(),
        None => auth::issue_token(1).token,
    };
    let password_hash = hash_password(&initial_password).map_err(|e| failure(e.to_string()))?;

    let household = row.household();
    let request = CreatePrincipalRequest {
        email: row.email.clone(),
        password_hash,
        display_name: row.display_name.clone(),
        phone: row.phone.clone(),
        photo_url: row.photo_url.clone(),
        role: Role::Resident,
        community_slug: Some(community_slug.to_string()),
        household,
    };

    let repo = PrincipalRepository::new(db);
    let imported = repo
        .upsert_resident(request)
        .await
        .map_err(|e| failure(e.to_string()))?;

    if row.status.as_deref() == Some(AccountStatus::Disabled.as_str()) {
        repo.set_status(imported.id, AccountStatus::Disabled)
            .await
            .map_err(|e| failure(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    fn row(email: &str) -> ImportRow {
        ImportRow {
            email: email.to_string(),
            display_name: Some("住戶".to_string()),
            unit: Some("3F-1".to_string()),
            ..ImportRow::default()
        }
    }

    #[tokio::test]
    async fn import_counts_always_reconcile() {
        let db = setup_test_db().await;
        let config = ImportConfig {
            batch_size: 2,
            max_rows: 100,
        };

        let rows = vec![
            row("a@example.com"),
            row("not-an-email"),
            row("b@example.com"),
            row(""),
            row("c@example.com"),
        ];

        let report = run_import(&db, &config, "sunrise-court", rows)
            .await
            .unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(report.succeeded + report.failed, report.total);

        let bad_rows: Vec<usize> = report.failures.iter().map(|f| f.row).collect();
        assert_eq!(bad_rows, vec![2, 4]);

        let repo = PrincipalRepository::new(&db);
        assert_eq!(repo.count_by_community("sunrise-court").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn rerunning_an_import_is_idempotent() {
        let db = setup_test_db().await;
        let config = ImportConfig::default();
        let rows = vec![row("a@example.com"), row("b@example.com")];

        run_import(&db, &config, "sunrise-court", rows.clone())
            .await
            .unwrap();

        let repo = PrincipalRepository::new(&db);
        let first_hash = repo
            .find_by_email("a@example.com")
            .await
            .unwrap()
            .unwrap()
            .password_hash;

        let report = run_import(&db, &config, "sunrise-court", rows)
            .await
            .unwrap();
        assert_eq!(report.failed, 0);
        assert_eq!(repo.count_by_community("sunrise-court").await.unwrap(), 2);

        // The rerun must not rotate an existing account's credential.
        let second_hash = repo
            .find_by_email("a@example.com")
            .await
            .unwrap()
            .unwrap()
            .password_hash;
        assert_eq!(first_hash, second_hash);
    }

    #[tokio::test]
    async fn sheet_columns_map_onto_the_stored_record() {
        let db = setup_test_db().await;
        let config = ImportConfig::default();

        let rows = vec![ImportRow {
            email: "unit@example.com".to_string(),
            password: Some("chosen-by-the-sheet".to_string()),
            display_name: Some("林小姐".to_string()),
            phone: Some("0987-654-321".to_string()),
            photo_url: Some("https://cdn.example.com/p/1.jpg".to_string()),
            sequence: Some(12),
            unit: Some("3F-1".to_string()),
            sub_unit: Some("B".to_string()),
            qr_text: Some("COURT-3F-1".to_string()),
            address: Some("仁愛路 100 號".to_string()),
            area: Some("34.5".to_string()),
            ownership_ratio: Some(0.0125),
            status: Some("disabled".to_string()),
        }];

        let report = run_import(&db, &config, "sunrise-court", rows)
            .await
            .unwrap();
        assert_eq!(report.failed, 0);

        let stored = PrincipalRepository::new(&db)
            .find_by_email("unit@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.display_name.as_deref(), Some("林小姐"));
        assert_eq!(
            stored.photo_url.as_deref(),
            Some("https://cdn.example.com/p/1.jpg")
        );
        assert_eq!(stored.status, "disabled");
        assert!(
            crate::auth::verify_password("chosen-by-the-sheet", &stored.password_hash).unwrap()
        );

        let household = stored.household.unwrap();
        assert_eq!(household["sequence"], 12);
        assert_eq!(household["unit"], "3F-1");
        assert_eq!(household["subUnit"], "B");
        assert_eq!(household["qrText"], "COURT-3F-1");
        assert_eq!(household["ownershipRatio"], 0.0125);
    }

    #[tokio::test]
    async fn oversized_import_is_rejected_up_front() {
        let db = setup_test_db().await;
        let config = ImportConfig {
            batch_size: 10,
            max_rows: 2,
        };

        let rows = vec![
            row("a@example.com"),
            row("b@example.com"),
            row("c@example.com"),
        ];

        let result = run_import(&db, &config, "sunrise-court", rows).await;
        assert!(result.is_err());

        // Nothing was applied.
        let repo = PrincipalRepository::new(&db);
        assert_eq!(repo.count_by_community("sunrise-court").await.unwrap(), 0);
    }
}
