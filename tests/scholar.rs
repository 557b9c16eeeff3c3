use assert_cmd::Command;

fn network_available() -> bool {
    let config = ureq::Agent::config_builder()
        .timeout_connect(Some(std::time::Duration::from_secs(2)))
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build();
    let agent = ureq::Agent::new_with_config(config);
    agent
        .get("https://scholar.google.com/")
        .call()
        .map(|res| !res.status().is_server_error())
        .unwrap_or(false)
}

#[test]
fn list_from_scholar_profile() -> Result<(), Box<dyn std::error::Error>> {
    if !network_available() {
        eprintln!("skipping list_from_scholar_profile: network unavailable");
        return Ok(());
    }
    let mut cmd = Command::cargo_bin("pubsync")?;
    cmd.env("NO_COLOR", "1").env_remove("SCHOLAR_ID");

    let output = cmd.arg("list").arg("kWYDz2UAAAAJ").output()?;
    let stdout = String::from_utf8(output.stdout)?;
    let stderr = String::from_utf8(strip_ansi_escapes::strip(output.stderr))?;

    // Scholar rate-limits aggressively; a blocked request must still end as a clean failure.
    match output.status.code() {
        Some(0) => assert!(
            stdout.starts_with("1. ") && stderr.contains("✓ found"),
            "stdout=\n{stdout}\nstderr=\n{stderr}"
        ),
        Some(1) => assert!(
            stderr.contains("failed to fetch publications")
                || stderr.contains("no publications found"),
            "stderr=\n{stderr}"
        ),
        other => panic!("unexpected exit status {other:?}, stderr=\n{stderr}"),
    }
    Ok(())
}
