mod common;

use common::{test_config, FakePortal};
use pami_auto::error::AppError;
use pami_auto::infrastructure::{NoPacing, PageDriver, WaitState};
use pami_auto::services::PortalLogin;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn login_service(dir: &std::path::Path) -> PortalLogin {
    PortalLogin::new(
        Arc::new(test_config(dir)),
        Arc::new(NoPacing::new(CancellationToken::new())),
    )
}

#[tokio::test]
async fn login_opens_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let portal = FakePortal::new();
    let login = login_service(dir.path());

    tokio_test::assert_ok!(login.login(&portal).await);
    let workspace = tokio_test::assert_ok!(login.open_workspace(&portal).await);

    let search = pami_auto::config::Selectors::default().search_ndo;
    workspace
        .wait_for(&search, WaitState::Visible, Duration::from_millis(10))
        .await
        .unwrap();
}

#[tokio::test]
async fn rejected_credentials_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let portal = FakePortal::new().with_bad_credentials();

    let err = login_service(dir.path()).login(&portal).await.unwrap_err();

    match err {
        AppError::FatalAuthFailure(message) => {
            assert!(message.contains("usuario o contraseña incorrectos"), "{}", message)
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(portal.searches().is_empty());
}
