// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests: scripted logcat sessions through to a recording actuator.

use std::time::Duration;

use shield_watcher::actuator::{Component, RecordingActuator, ServerInfo};
use shield_watcher::mirror::{Mirror, seed_state};
use shield_watcher::source::{ScriptedLogSource, ScriptedSession};
use shield_watcher::state::CurrentStateTable;
use shield_watcher::supervisor::{ConnectPolicy, SupervisorConfig, SupervisorState};
use shield_watcher::types::{HdrMode, PowerMode};
use shield_watcher::watcher::Watcher;

const WAKE: &str = "07-19 10:22:05.123 1000 1000 I PowerManagerService: Waking up";
const SLEEP: &str = "07-19 23:01:44.870 1000 1000 I PowerManagerService: Sleeping";
const HDR_FLIP: &str = "07-19 10:22:06.000 1234 5678 I hwcomposer: Flip new SMPTE 2086 metadata";
const HDR_CLEAR: &str = "07-19 10:40:12.311 1234 5678 I hwcomposer: HDR: Clear cached SMPTE 2086 metadata";
const MOONLIGHT_HDR: &str =
    "07-19 21:15:00.004 4321 4400 I com.limelight.LimeLog: Display HDR mode: enabled";

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

fn sleeping_server() -> RecordingActuator {
    RecordingActuator::with_info(ServerInfo::from_components([
        (Component::Hdr, false),
        (Component::LedDevice, false),
        (Component::VideoGrabber, false),
    ]))
}

#[tokio::test(start_paused = true)]
async fn wake_is_mirrored_from_seeded_state() {
    let actuator = sleeping_server();
    let seed = seed_state(&actuator).await;
    assert_eq!(seed, CurrentStateTable::new(HdrMode::Off, PowerMode::Sleeping));

    let (mirror, worker) = Mirror::spawn(actuator.clone());
    let source = ScriptedLogSource::new().with_session(
        ScriptedSession::new()
            .with_stdout_line("--------- beginning of main")
            .with_stdout_line(WAKE),
    );
    let mut watcher = Watcher::builder(source).with_initial_state(seed).build();
    mirror.install(watcher.callbacks_mut());

    watcher.start().await.unwrap();
    settle().await;
    let report = watcher.tick().await;
    assert_eq!(report.transitions.len(), 1);
    assert_eq!(watcher.state().power(), PowerMode::On);

    drop(watcher);
    drop(mirror);
    worker.await.unwrap();

    assert_eq!(
        actuator.history(),
        vec![
            (Component::Hdr, false),
            (Component::LedDevice, true),
            (Component::VideoGrabber, true),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn toggles_within_one_tick_are_collapsed() {
    let actuator = sleeping_server();
    let (mirror, worker) = Mirror::spawn(actuator.clone());

    let source = ScriptedLogSource::new().with_session(
        ScriptedSession::new()
            .with_stdout_line(HDR_FLIP)
            .with_stdout_line(HDR_CLEAR)
            .with_stdout_line(MOONLIGHT_HDR)
            .with_stdout_line(HDR_CLEAR),
    );
    let mut watcher = Watcher::builder(source)
        .with_initial_state(CurrentStateTable::new(HdrMode::Off, PowerMode::On))
        .build();
    mirror.install(watcher.callbacks_mut());

    watcher.start().await.unwrap();
    settle().await;
    let report = watcher.tick().await;

    assert_eq!(report.applied, 4);
    assert!(report.transitions.is_empty());

    drop(watcher);
    drop(mirror);
    worker.await.unwrap();
    assert!(actuator.history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stream_restart_resumes_mirroring() {
    let actuator = sleeping_server();
    let (mirror, worker) = Mirror::spawn(actuator.clone());

    let first = ScriptedSession::new().with_stdout_line(WAKE);
    let first_handle = first.handle();
    let source = ScriptedLogSource::new()
        .with_session(first)
        .with_session(
            ScriptedSession::new()
                .with_stdout_line(HDR_FLIP)
                .with_stderr_line("logcat: Unexpected EOF!"),
        )
        .with_session(ScriptedSession::new().with_stdout_line(SLEEP));

    let mut watcher = Watcher::builder(source)
        .with_initial_state(CurrentStateTable::new(HdrMode::Off, PowerMode::Sleeping))
        .with_supervisor_config(
            SupervisorConfig::new().with_policy(ConnectPolicy::retry_every(Duration::from_secs(1))),
        )
        .build();
    mirror.install(watcher.callbacks_mut());

    watcher.start().await.unwrap();
    settle().await;
    watcher.tick().await;
    assert_eq!(watcher.state().power(), PowerMode::On);

    // First session dies: restart into the HDR session.
    first_handle.exit();
    watcher.tick().await;
    watcher.tick().await;
    assert_eq!(watcher.supervisor().state(), SupervisorState::Streaming);
    settle().await;
    // The same tick commits HDR and notices the stderr marker.
    watcher.tick().await;
    assert_eq!(watcher.state().hdr(), HdrMode::On);
    assert!(watcher.supervisor().state().is_failed());
    assert_eq!(watcher.supervisor().restarts(), 1);
    watcher.tick().await;
    assert_eq!(watcher.supervisor().state(), SupervisorState::Streaming);
    assert_eq!(watcher.supervisor().restarts(), 2);
    settle().await;
    watcher.tick().await;
    assert_eq!(
        *watcher.state(),
        CurrentStateTable::new(HdrMode::On, PowerMode::Sleeping)
    );

    drop(watcher);
    drop(mirror);
    worker.await.unwrap();

    assert_eq!(
        actuator.history(),
        vec![
            (Component::Hdr, false),
            (Component::LedDevice, true),
            (Component::VideoGrabber, true),
            (Component::Hdr, true),
            (Component::Hdr, false),
            (Component::LedDevice, false),
            (Component::VideoGrabber, false),
        ]
    );
}
