use std::fs;
use std::path::PathBuf;

use raycanvas::{FocusPoint, FormValues, PointerEvent, RenderConfig};

fn golden_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from("tests/goldens/expected");
    p.push(name);
    p
}

fn check_golden(name: &str, digest: &str) {
    let expected_path = golden_path(name);
    if std::env::var("UPDATE_GOLDENS").is_ok() {
        fs::create_dir_all("tests/goldens/expected").ok();
        fs::write(&expected_path, digest).expect("write golden");
        println!("Updated golden: {:?}", expected_path);
        return;
    }

    if !expected_path.exists() {
        println!(
            "No golden at {:?}; run with UPDATE_GOLDENS=1 to create it. Skipping.",
            expected_path
        );
        return;
    }

    let exp = fs::read_to_string(&expected_path).expect("unable to read golden");
    assert_eq!(digest, exp.trim());
}

#[tokio::test]
async fn golden_default_frame_matches_fixture() {
    let session = raycanvas::new_session(RenderConfig::default());
    session.page_loaded().await.expect("render");
    let digest = session.with_surface(|s| s.digest());
    check_golden("default_300x300.sha256", &digest);
}

#[tokio::test]
async fn golden_focused_frame_matches_fixture() {
    let session = raycanvas::new_session(RenderConfig::default());
    session
        .pointer_down(
            PointerEvent { client_x: 60.0, client_y: 80.0 },
            &FormValues::new("150", "200"),
        )
        .await
        .expect("render");
    let digest = session.with_surface(|s| s.digest());
    check_golden("focused_150x200.sha256", &digest);
}

#[tokio::test]
async fn identical_requests_produce_identical_frames() {
    let a = raycanvas::new_session(RenderConfig::default());
    let b = raycanvas::new_session(RenderConfig::default());
    let form = FormValues::new("64", "48");
    a.form_submitted(&form).await.unwrap();
    b.form_submitted(&form).await.unwrap();
    assert_eq!(a.with_surface(|s| s.digest()), b.with_surface(|s| s.digest()));

    // a focus point changes the frame
    let c = raycanvas::new_session(RenderConfig::default());
    let focus = FocusPoint::new(32.0, 24.0);
    c.pointer_down(PointerEvent { client_x: focus.x, client_y: focus.y }, &form)
        .await
        .unwrap();
    assert_ne!(a.with_surface(|s| s.digest()), c.with_surface(|s| s.digest()));
}
