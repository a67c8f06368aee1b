// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Wrapper for the FRR reload utility (frr-reload.py). The candidate file
//! is validated with `--test` before `--reload` is attempted, so a broken
//! candidate never disturbs the running configuration.

use std::process::{Command, Stdio};

use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("failed to spawn {bin}: {err}")]
    Spawn { bin: String, err: std::io::Error },
    #[error("failed to wait for {bin}: {err}")]
    Wait { bin: String, err: std::io::Error },
    #[error("reload printed an error message. status: {status}, stdout: {stdout}, stderr: {stderr}")]
    Stderr {
        status: String,
        stdout: String,
        stderr: String,
    },
    #[error("reload exited with non-zero status. status: {status}, stdout: {stdout}, stderr: {stderr}")]
    NonZero {
        status: String,
        stdout: String,
        stderr: String,
    },
}

pub(crate) fn reload_frr(reload_bin: &str, candidate_file: &str) -> Result<(), ReloadError> {
    frr_test_config(reload_bin, candidate_file)?;
    frr_do_reload(reload_bin, candidate_file)?;

    info!("FRR successfully reloaded");
    Ok(())
}

fn frr_test_config(reload_bin: &str, candidate_file: &str) -> Result<(), ReloadError> {
    run_frr_reload_script(reload_bin, candidate_file, &["--test"])
}

fn frr_do_reload(reload_bin: &str, candidate_file: &str) -> Result<(), ReloadError> {
    run_frr_reload_script(reload_bin, candidate_file, &["--reload", "--overwrite"])
}

fn run_frr_reload_script(
    reload_bin: &str,
    candidate_file: &str,
    action_args: &[&str],
) -> Result<(), ReloadError> {
    let output = Command::new(reload_bin)
        .args(action_args)
        .arg(candidate_file)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| ReloadError::Spawn {
            bin: reload_bin.to_string(),
            err,
        })?
        .wait_with_output()
        .map_err(|err| ReloadError::Wait {
            bin: reload_bin.to_string(),
            err,
        })?;

    if !output.stderr.is_empty() {
        return Err(ReloadError::Stderr {
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    if !output.status.success() {
        return Err(ReloadError::NonZero {
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(())
}
