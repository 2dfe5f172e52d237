//! Browser-backed tests.
//!
//! These tests require Chrome to be installed and available.
//! Run with: cargo test --test browser -- --ignored

use webrunner::{Automation, BrowserSession, Runner, Script, SessionConfig, SetValueOptions};

const FORM_PAGE: &str = r##"data:text/html,
    <title>Signup</title>
    <input id="name" class="field wide">
    <input id="agree" type="checkbox">
    <select id="country"><option>Canada</option><option>Norway</option></select>
    <div class="otp"><input><input><input></div>
    <p id="status">Ready</p>
"##;

/// Check if Chrome is available
fn chrome_available() -> bool {
    eoka::stealth::patcher::find_chrome().is_ok()
}

fn headless() -> SessionConfig {
    SessionConfig {
        headless: true,
        timeout_secs: 5,
        ..SessionConfig::default()
    }
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_session_reads_and_writes() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let mut session = BrowserSession::launch(headless())
        .await
        .expect("Failed to launch browser");
    session.go(FORM_PAGE).await.expect("Failed to navigate");

    assert_eq!(session.title().await.unwrap(), "Signup");
    assert_eq!(session.count(".otp input").await.unwrap(), 3);
    assert_eq!(session.get_text("#status").await.unwrap(), "Ready");

    session
        .set_value("#name", "Ada", SetValueOptions::default())
        .await
        .unwrap();
    assert_eq!(session.get_value("#name").await.unwrap(), "Ada");

    session.click("#agree").await.unwrap();
    assert!(session.is_selected("#agree").await.unwrap());

    session.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_script_against_page() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let script = Script::parse_json(&serde_json::json!([
        {"go": FORM_PAGE},
        {"assert_title": "Signup"},
        {"set_value": ["#name", "(( eval|'Grace' ))"]},
        {"assert_value_of_element": ["#name", "(( vars|eval ))"]},
        {"assert_element_has_class": ["#name", "wide"]},
        {"set_select_by_text": ["#country", "Norway"]},
        {"fill_otp": [".otp input", "123"]},
        {"assert_value_of_elements": [".otp input", "3"]},
        {"js": "console.log('hello from page')"},
        {"assert_text_in_log": "hello from page"},
        {"assert_js_errors_count": 0}
    ])
    .to_string())
    .unwrap();

    let session = BrowserSession::launch(headless())
        .await
        .expect("Failed to launch browser");
    let mut runner = Runner::new(session);
    let result = runner.command_script(&script).await.unwrap();
    runner.into_session().close().await.unwrap();

    assert!(result.success(), "{:?}", result.failures);
    assert_eq!(result.commands_executed, 11);
}
