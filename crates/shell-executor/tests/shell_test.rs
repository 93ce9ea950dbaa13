//! Integration tests driving /bin/sh, a shell that's available on most
//! platforms.

use channel_pump::ChannelParams;
use shell_executor::{DiscardCommander, Parameters, RecallCommander, Sentinel, Shell};
use std::sync::Arc;
use std::time::Duration;

/// A word unlikely to appear in legitimate command output.
const UNLIKELY_WORD: &str = "supercalifragilisticexpialidocious";

const DEADLINE: Duration = Duration::from_secs(5);

fn sh_parameters() -> Parameters {
    Parameters {
        pump: ChannelParams {
            path: "/bin/sh".into(),
            ..Default::default()
        },
        sentinel_out: Sentinel {
            command: format!("echo {UNLIKELY_WORD}"),
            value: UNLIKELY_WORD.into(),
        },
        sentinel_err: None,
    }
}

#[smol_potat::test]
async fn happy_path() {
    let sh = Shell::new(sh_parameters());
    sh.start(DEADLINE).await.unwrap();
    let cmdr = RecallCommander::new("echo alpha\ncommand -v cat");
    sh.run(DEADLINE, &cmdr).await.unwrap();
    sh.stop(DEADLINE, None).await.unwrap();

    let lines = cmdr.data_out();
    assert_eq!(lines.len(), 2, "got: {lines:?}");
    assert_eq!(lines[0], "alpha");
    assert!(lines[1].ends_with("/cat"), "got: {lines:?}");
    // No delivered line carries the sentinel value as a suffix.
    assert!(lines.iter().all(|l| !l.ends_with(UNLIKELY_WORD)));
}

#[smol_potat::test]
async fn consecutive_runs_stay_delimited() {
    let sh = Shell::new(sh_parameters());
    sh.start(DEADLINE).await.unwrap();

    let first = RecallCommander::new("echo alpha");
    sh.run(DEADLINE, &first).await.unwrap();
    let second = RecallCommander::new("echo beta");
    sh.run(DEADLINE, &second).await.unwrap();
    sh.stop(DEADLINE, None).await.unwrap();

    assert_eq!(first.data_out(), vec!["alpha"]);
    assert_eq!(second.data_out(), vec!["beta"]);
}

#[smol_potat::test]
async fn restart_law() {
    let sh = Shell::new(sh_parameters());
    sh.start(DEADLINE).await.unwrap();
    sh.stop(DEADLINE, None).await.unwrap();
    sh.start(DEADLINE).await.unwrap();
    let cmdr = RecallCommander::new("echo again");
    sh.run(DEADLINE, &cmdr).await.unwrap();
    sh.stop(DEADLINE, None).await.unwrap();
    assert_eq!(cmdr.data_out(), vec!["again"]);
}

#[smol_potat::test]
async fn run_without_start_is_illegal() {
    let sh = Shell::new(sh_parameters());
    let err = sh
        .run(DEADLINE, &DiscardCommander { command: "pwd".into() })
        .await
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("run called, but shell not started yet"));
}

#[smol_potat::test]
async fn stop_without_start_is_illegal() {
    let sh = Shell::new(sh_parameters());
    let err = sh.stop(DEADLINE, None).await.unwrap_err();
    assert!(err
        .to_string()
        .contains("stop called, but shell not started yet"));
}

#[smol_potat::test]
async fn start_while_started_is_illegal() {
    let sh = Shell::new(sh_parameters());
    sh.start(DEADLINE).await.unwrap();
    let err = sh.start(DEADLINE).await.unwrap_err();
    assert!(err
        .to_string()
        .contains("start called, but shell is already started"));
    sh.stop(DEADLINE, None).await.unwrap();
}

#[smol_potat::test]
async fn stop_after_stop_is_illegal() {
    let sh = Shell::new(sh_parameters());
    sh.start(DEADLINE).await.unwrap();
    sh.stop(DEADLINE, None).await.unwrap();
    assert!(sh.stop(DEADLINE, None).await.is_err());
}

#[smol_potat::test]
async fn bad_path_fails_start() {
    let mut params = sh_parameters();
    params.pump.path = "beamMeUpScotty".into();
    let sh = Shell::new(params);
    let err = sh.start(DEADLINE).await.unwrap_err();
    assert!(
        err.to_string().contains(r#"path "beamMeUpScotty" not available"#),
        "got: {err}"
    );
}

#[smol_potat::test]
async fn short_sentinel_value_fails_start() {
    let mut params = sh_parameters();
    params.sentinel_out.value = String::new();
    let sh = Shell::new(params);
    let err = sh.start(DEADLINE).await.unwrap_err();
    assert!(err.to_string().contains("too short at len=0"), "got: {err}");
}

#[smol_potat::test]
async fn slow_command_times_out_and_turns_shell_off() {
    let sh = Shell::new(sh_parameters());
    sh.start(DEADLINE).await.unwrap();
    let deadline = Duration::from_millis(300);
    let err = sh
        .run(DEADLINE.min(deadline), &DiscardCommander { command: "sleep 2".into() })
        .await
        .unwrap_err();
    assert!(
        err.to_string().contains("no sentinels found after 300ms"),
        "got: {err}"
    );
    // The subprocess was abandoned; the shell needs a fresh start.
    let err = sh
        .run(DEADLINE, &DiscardCommander { command: "pwd".into() })
        .await
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("run called, but shell not started yet"));
}

#[smol_potat::test]
async fn crashed_subprocess_is_restartable() {
    let sh = Shell::new(sh_parameters());
    sh.start(DEADLINE).await.unwrap();

    // This kills the shell before the sentinels can echo.
    let err = sh
        .run(DEADLINE, &DiscardCommander { command: "exit 7".into() })
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("closed before sentinel")
            || msg.contains("unable to write to stdin")
            || msg.contains("exit status 7")
            || msg.contains("subprocess finished"),
        "got: {msg}"
    );

    // A fresh start on the same shell works.
    sh.start(DEADLINE).await.unwrap();
    let cmdr = RecallCommander::new("echo recovered");
    sh.run(DEADLINE, &cmdr).await.unwrap();
    sh.stop(DEADLINE, None).await.unwrap();
    assert_eq!(cmdr.data_out(), vec!["recovered"]);
}

#[smol_potat::test]
async fn stop_surfaces_nonzero_exit() {
    let sh = Shell::new(sh_parameters());
    sh.start(DEADLINE).await.unwrap();
    let err = sh.stop(DEADLINE, Some("exit 3")).await.unwrap_err();
    assert!(err.to_string().contains("exit status 3"), "got: {err}");
    // Off after stop, whatever the outcome.
    assert!(sh.start(DEADLINE).await.is_ok());
    sh.stop(DEADLINE, None).await.unwrap();
}

#[smol_potat::test]
async fn error_sentinel_sweeps_stderr() {
    let mut params = sh_parameters();
    // An unknown command is a good stderr sentinel for sh: the complaint
    // ends with "not found" in every common implementation.
    params.sentinel_err = Some(Sentinel {
        command: UNLIKELY_WORD.into(),
        value: "not found".into(),
    });
    let sh = Shell::new(params);
    sh.start(DEADLINE).await.unwrap();

    let cmdr = RecallCommander::new("echo alpha\nls /definitely/not/there/xyz");
    sh.run(DEADLINE, &cmdr).await.unwrap();
    sh.stop(DEADLINE, None).await.unwrap();

    assert_eq!(cmdr.data_out(), vec!["alpha"]);
    let errs = cmdr.data_err();
    assert_eq!(errs.len(), 1, "got: {errs:?}");
    assert!(
        errs[0].contains("/definitely/not/there/xyz"),
        "got: {errs:?}"
    );
}

#[smol_potat::test]
async fn concurrent_callers_see_mutual_exclusion() {
    let sh = Arc::new(Shell::new(sh_parameters()));
    sh.start(DEADLINE).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..4 {
        let sh = sh.clone();
        tasks.push(smol::spawn(async move {
            let cmdr = RecallCommander::new(format!("echo task-{i}"));
            sh.run(DEADLINE, &cmdr).await.unwrap();
            assert_eq!(cmdr.data_out(), vec![format!("task-{i}")]);
        }));
    }
    for t in tasks {
        t.await;
    }
    sh.stop(DEADLINE, None).await.unwrap();
}
