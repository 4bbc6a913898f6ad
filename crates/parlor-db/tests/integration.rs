use parlor_db::{create_pool, run_migrations, DbRuntimeSettings};

#[test]
fn on_disk_initialization_survives_reopen() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let db_path = dir.path().join("parlor.db");
    let db_path = db_path.to_str().expect("utf-8 path");

    {
        let pool =
            create_pool(db_path, DbRuntimeSettings::default()).expect("failed to create pool");
        let conn = pool.get().expect("failed to get connection");
        let applied = run_migrations(&conn).expect("failed to run migrations");
        assert_eq!(applied, 3);

        assert!(parlor_db::seed_default_agent(&conn).expect("seed should succeed"));
    }

    // Reopen: migrations are no-ops and the seeded agent is still there.
    let pool = create_pool(db_path, DbRuntimeSettings::default()).expect("failed to reopen pool");
    let conn = pool.get().expect("failed to get connection");
    let applied = run_migrations(&conn).expect("failed to rerun migrations");
    assert_eq!(applied, 0);

    let agents = parlor_db::list_agents(&conn).expect("failed to list agents");
    assert_eq!(agents.len(), 1);
    assert!(agents[0].is_default);
}
