//! Shared test fixtures.

use parlor_server::attachments::AttachmentStore;
use parlor_server::pdf::PdfRenderer;
use parlor_server::sessions::SessionRegistry;
use parlor_server::AppState;
use std::sync::{Arc, RwLock};

/// Builds an [`AppState`] backed by a scratch on-disk database with
/// migrations applied and the default agent seeded. The returned `TempDir`
/// must stay alive for the duration of the test.
pub fn test_state() -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let db_path = dir.path().join("parlor.db");
    let db_path = db_path.to_str().expect("utf-8 path");

    let pool = parlor_db::create_pool(db_path, parlor_db::DbRuntimeSettings::default())
        .expect("failed to create pool");
    {
        let conn = pool.get().expect("failed to get connection");
        parlor_db::run_migrations(&conn).expect("failed to run migrations");
        parlor_db::seed_default_agent(&conn).expect("failed to seed default agent");
    }

    let state = AppState {
        pool,
        llm: parlor_llm::LlmClient::new("").expect("local client"),
        stt: Arc::new(parlor_voice::SttService::new("model.bin", "whisper-cli")),
        tts: Arc::new(parlor_voice::TtsService::new("piper", "voices", 22_050)),
        pdf: PdfRenderer::new("pdfinfo", "pdftoppm"),
        attachments: AttachmentStore::new(),
        sessions: SessionRegistry::new(),
        models: Arc::new(RwLock::new(vec![
            "gemma3:4b".to_string(),
            "qwen3:8b".to_string(),
        ])),
        current_model: Arc::new(RwLock::new("gemma3:4b".to_string())),
    };

    (state, dir)
}
