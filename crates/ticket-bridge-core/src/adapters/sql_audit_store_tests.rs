use super::*;
use crate::audit::AuditOutcome;
use tempfile::TempDir;

async fn file_store(dir: &TempDir) -> SqlAuditStore {
    let url = format!("sqlite://{}", dir.path().join("audit.sqlite").display());
    SqlAuditStore::connect(&url).await.unwrap()
}

mod backend_tests {
    use super::*;

    #[test]
    fn test_backend_detected_from_scheme() {
        assert_eq!(
            SqlBackend::from_url("sqlite://audit.db").unwrap(),
            SqlBackend::Sqlite
        );
        assert_eq!(
            SqlBackend::from_url("postgres://u@h/db").unwrap(),
            SqlBackend::Postgres
        );
        assert_eq!(
            SqlBackend::from_url("postgresql://u@h/db").unwrap(),
            SqlBackend::Postgres
        );
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        let result = SqlBackend::from_url("mysql://u@h/db");
        assert!(matches!(result, Err(AuditError::Connection { .. })));
    }

    #[test]
    fn test_sqlite_path_extraction() {
        assert_eq!(
            sqlite_path("sqlite://ticket-bridge.sqlite?mode=rwc"),
            Some("ticket-bridge.sqlite")
        );
        assert_eq!(sqlite_path("sqlite:///var/lib/tb/a.db"), Some("/var/lib/tb/a.db"));
        assert_eq!(sqlite_path("sqlite::memory:"), None);
        assert_eq!(sqlite_path("postgres://h/db"), None);
    }
}

mod store_tests {
    use super::*;

    #[tokio::test]
    async fn test_record_assigns_increasing_ids() {
        let dir = TempDir::new().unwrap();
        let store = file_store(&dir).await;

        let first = store
            .record(NewAuditRecord::created("issues", "d-1", TicketKey::new("ENG-1")))
            .await
            .unwrap();
        let second = store
            .record(NewAuditRecord::created("pull_request", "d-2", TicketKey::new("ENG-2")))
            .await
            .unwrap();

        assert!(second.id > first.id);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_records_are_read_back_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = file_store(&dir).await;

        store
            .record(NewAuditRecord::created("issues", "d-1", TicketKey::new("ENG-1")))
            .await
            .unwrap();
        store
            .record(
                NewAuditRecord::failed("pull_request", "d-2", "Jira API error 500: boom")
                    .with_payload(r#"{"action":"opened"}"#),
            )
            .await
            .unwrap();

        let records = store.list_recent(10).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].delivery_id, "d-2");
        assert_eq!(records[0].outcome, AuditOutcome::Failed);
        assert!(records[0].ticket_key.is_none());
        assert_eq!(
            records[0].failure_reason.as_deref(),
            Some("Jira API error 500: boom")
        );
        assert_eq!(records[0].payload.as_deref(), Some(r#"{"action":"opened"}"#));

        assert_eq!(records[1].delivery_id, "d-1");
        assert_eq!(records[1].source_event, "issues");
        assert_eq!(records[1].ticket_key, Some(TicketKey::new("ENG-1")));
        assert!(records[1].created_at <= records[0].created_at);
    }

    #[tokio::test]
    async fn test_same_delivery_recorded_twice_yields_two_rows() {
        let dir = TempDir::new().unwrap();
        let store = file_store(&dir).await;

        for key in ["ENG-1", "ENG-2"] {
            store
                .record(NewAuditRecord::created("issues", "same-delivery", TicketKey::new(key)))
                .await
                .unwrap();
        }

        let records = store.list_recent(10).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.delivery_id == "same-delivery"));
    }

    #[tokio::test]
    async fn test_list_recent_honours_limit() {
        let dir = TempDir::new().unwrap();
        let store = file_store(&dir).await;

        for i in 0..5 {
            store
                .record(NewAuditRecord::created(
                    "issues",
                    format!("d-{}", i),
                    TicketKey::new(format!("ENG-{}", i)),
                ))
                .await
                .unwrap();
        }

        let records = store.list_recent(2).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].delivery_id, "d-4");
    }

    #[tokio::test]
    async fn test_records_survive_reconnect() {
        let dir = TempDir::new().unwrap();
        {
            let store = file_store(&dir).await;
            store
                .record(NewAuditRecord::created("issues", "d-1", TicketKey::new("ENG-1")))
                .await
                .unwrap();
            store.close().await;
        }

        let reopened = file_store(&dir).await;
        assert_eq!(reopened.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_parent_directory_is_created() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("deeper").join("audit.sqlite");
        assert!(!db_path.parent().unwrap().exists());

        let store = SqlAuditStore::connect(&format!("sqlite://{}", db_path.display()))
            .await
            .unwrap();

        assert!(db_path.parent().unwrap().exists());
        assert_eq!(store.backend(), SqlBackend::Sqlite);
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_in_memory_database_is_shared_across_queries() {
        let store = SqlAuditStore::connect("sqlite::memory:").await.unwrap();

        store
            .record(NewAuditRecord::created("issues", "d-1", TicketKey::new("ENG-1")))
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_read_only_connection_does_not_create_missing_file() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("typo").join("audit.sqlite");

        let result =
            SqlAuditStore::connect_read_only(&format!("sqlite://{}", db_path.display())).await;

        assert!(matches!(result, Err(AuditError::Connection { .. })));
        assert!(!db_path.exists());
        assert!(!db_path.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn test_read_only_connection_lists_existing_rows() {
        let dir = TempDir::new().unwrap();
        let writer = file_store(&dir).await;
        writer
            .record(NewAuditRecord::created("issues", "d-1", TicketKey::new("ENG-1")))
            .await
            .unwrap();
        writer.close().await;

        let url = format!("sqlite://{}", dir.path().join("audit.sqlite").display());
        let reader = SqlAuditStore::connect_read_only(&url).await.unwrap();

        assert_eq!(reader.count().await.unwrap(), 1);
        assert_eq!(reader.list_recent(10).await.unwrap()[0].delivery_id, "d-1");

        let write = reader
            .record(NewAuditRecord::failed("issues", "d-2", "nope"))
            .await;
        assert!(matches!(write, Err(AuditError::Write { .. })));
    }
}
